use std::{convert::Infallible, sync::Arc};

use axum::{
    Json,
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures::{Stream, stream};
use rodada_schema::records::DashboardSnapshot;
use tokio::task::spawn_blocking;
use tracing::{debug, warn};

use crate::{
    error::AppError,
    session::{admin_access, require_admin},
    state::AppState,
};

pub async fn registrations_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<DashboardSnapshot>, AppError> {
    require_admin(&state, &headers).await?;

    let store = state.store.clone();
    let snapshot = spawn_blocking(move || store.snapshot()).await??;
    Ok(Json(snapshot))
}

/// Server-sent events: the current snapshot, then a full snapshot after every change.
pub async fn stream_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let account = require_admin(&state, &headers).await?;
    debug!(email = %account.email, "dashboard subscribed");

    let rx = state.live.clone();
    let events = stream::unfold((rx, true), |(mut rx, first)| async move {
        if !first && rx.changed().await.is_err() {
            return None;
        }
        let snapshot = rx.borrow_and_update().clone();
        Some((Ok(snapshot_event(&snapshot)), (rx, false)))
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

fn snapshot_event(snapshot: &DashboardSnapshot) -> Event {
    Event::default().json_data(snapshot).unwrap_or_else(|err| {
        warn!(%err, "failed to encode dashboard snapshot");
        Event::default().comment("snapshot unavailable")
    })
}

/// Redirects anyone but the admin away from the dashboard pages.
pub async fn admin_page_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let headers = request.headers().clone();
    match admin_access(&state, &headers).await {
        Ok((decision, _)) => match decision.redirect_target() {
            None => next.run(request).await,
            Some(target) => AppError::Redirect(target).into_response(),
        },
        Err(err) => err.into_response(),
    }
}
