use crate::errors::StoreError;
use crate::store::RegistrationStore;
use rodada_schema::records::DashboardSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

pub type SnapshotReceiver = watch::Receiver<Arc<DashboardSnapshot>>;

/// Live query over all registrations, newest first.
///
/// A background thread polls the store revision and publishes a full
/// replacement snapshot whenever it changes. Subscribers only ever see whole
/// snapshots; the thread exits once the last receiver is dropped.
pub struct LiveQuery;

impl LiveQuery {
    pub fn start(
        store: RegistrationStore,
        poll_interval: Duration,
    ) -> Result<SnapshotReceiver, StoreError> {
        let initial = store.snapshot()?;
        let (tx, rx) = watch::channel(Arc::new(initial));

        std::thread::spawn(move || loop {
            std::thread::sleep(poll_interval);
            if tx.receiver_count() == 0 {
                debug!("live query has no subscribers, stopping");
                break;
            }
            refresh(&store, &tx);
        });

        Ok(rx)
    }
}

/// Publishes a new snapshot if the store moved past the one currently held.
/// Returns whether anything was sent.
pub fn refresh(store: &RegistrationStore, tx: &watch::Sender<Arc<DashboardSnapshot>>) -> bool {
    let current = tx.borrow().revision;
    match store.revision() {
        Ok(revision) if revision == current => return false,
        Ok(_) => {}
        Err(err) => {
            warn!(%err, "live query revision check failed");
            return false;
        }
    }

    match store.snapshot() {
        Ok(snapshot) => {
            debug!(
                registrations = snapshot.stats.registrations,
                "publishing registration snapshot"
            );
            tx.send_replace(Arc::new(snapshot));
            true
        }
        Err(err) => {
            warn!(%err, "live query snapshot failed");
            false
        }
    }
}
