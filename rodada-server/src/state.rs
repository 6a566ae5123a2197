use std::path::PathBuf;
use std::sync::Arc;

use rodada_core::auth::AccountStore;
use rodada_core::config::{Config, ConfigError};
use rodada_core::errors::{ErrorSink, TracingSink};
use rodada_core::live::{LiveQuery, SnapshotReceiver};
use rodada_core::receipts::ReceiptBucket;
use rodada_core::store::RegistrationStore;
use rodada_core::submit::SubmitOptions;
use rodada_schema::access::AdminPolicy;
use rodada_schema::pricing::PriceTable;
use tracing::{info, warn};

use crate::error::StartupError;

pub struct AppState {
    pub store: RegistrationStore,
    pub accounts: AccountStore,
    pub bucket: ReceiptBucket,
    pub policy: AdminPolicy,
    pub submit: SubmitOptions,
    pub sink: Arc<dyn ErrorSink>,
    pub live: SnapshotReceiver,
    pub session_ttl_secs: i64,
    pub static_dir: Option<PathBuf>,
    pub allowed_origin: Option<String>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Arc<Self>, StartupError> {
        let ttl_hours = config.session_ttl_hours;
        let ttl_error = || ConfigError::Invalid {
            key: "RODADA_SESSION_TTL_HOURS",
            value: ttl_hours.to_string(),
            reason: "session lifetime out of range".into(),
        };
        let session_ttl = chrono::Duration::try_hours(ttl_hours)
            .filter(|ttl| *ttl > chrono::Duration::zero())
            .ok_or_else(ttl_error)?;

        let store = RegistrationStore::open(&config.db_path)?;
        let accounts = AccountStore::open(&config.db_path, session_ttl)?;
        let bucket = ReceiptBucket::open(
            &config.receipts_dir,
            &config.public_url,
            config.max_receipt_bytes,
        )?;

        let policy = AdminPolicy::new(config.admin_email.as_deref());
        match (policy.admin_email(), config.admin_password.as_deref()) {
            (Some(email), Some(password)) => {
                accounts.ensure_account(email, password)?;
            }
            (Some(email), None) => info!(%email, "admin account is managed outside the server"),
            (None, _) => warn!("RODADA_ADMIN_EMAIL not set, the admin dashboard is closed"),
        }

        info!(path = %config.db_path.display(), "starting live registration query");
        let live = LiveQuery::start(store.clone(), config.live_poll)?;

        Ok(Arc::new(Self {
            store,
            accounts,
            bucket,
            policy,
            submit: SubmitOptions {
                prices: PriceTable::standard(),
                receipt_policy: config.receipt_policy,
            },
            sink: Arc::new(TracingSink),
            live,
            session_ttl_secs: session_ttl.num_seconds(),
            static_dir: config.static_dir.clone(),
            allowed_origin: config.allowed_origin.clone(),
        }))
    }
}
