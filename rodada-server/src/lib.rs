//! HTTP surface of the Rodada event registration service.
//!
//! Public routes take registrations (with an optional payment receipt) and
//! publish the jersey price table. Everything under `/api/admin` and the
//! receipts themselves are restricted to the single configured admin
//! account, which can also follow the registration list live over
//! server-sent events.

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
    middleware,
    routing::{get, post},
};
use rodada_core::config::Config;
use tokio::{net::TcpListener, signal::ctrl_c};
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

pub mod admin;
pub mod error;
pub mod registration;
pub mod session;
pub mod state;

use error::StartupError;
use state::AppState;

/// Room for the JSON part and multipart framing on top of the receipt itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/api/health", get(|| async { "ok" }))
        .route("/api/pricing", get(registration::pricing_handler))
        .route("/api/form-settings", get(registration::form_settings_handler))
        .route("/api/registrations", post(registration::submit_handler))
        .route(
            "/api/session",
            post(session::login_handler)
                .get(session::current_handler)
                .delete(session::logout_handler),
        )
        .route("/api/admin/registrations", get(admin::registrations_handler))
        .route("/api/admin/stream", get(admin::stream_handler))
        .route("/receipts/:id", get(registration::receipt_handler))
        .layer(DefaultBodyLimit::max(
            state.bucket.max_bytes() + FORM_OVERHEAD_BYTES,
        ));

    let app = match &state.static_dir {
        Some(dir) => {
            let index = dir.join("index.html");
            let admin_page = Router::new()
                .route_service("/admin", ServeFile::new(&index))
                .route_service("/admin/", ServeFile::new(&index))
                .route_service("/admin/*rest", ServeFile::new(&index))
                .route_layer(middleware::from_fn_with_state(
                    state.clone(),
                    admin::admin_page_gate,
                ));
            api.merge(admin_page)
                .fallback_service(ServeDir::new(dir).fallback(ServeFile::new(&index)))
        }
        None => api,
    };

    app.layer(TraceLayer::new_for_http())
        .layer(cors_layer(state.allowed_origin.as_deref()))
        .with_state(state)
}

fn cors_layer(origin: Option<&str>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .max_age(Duration::from_secs(60 * 60));

    match origin.map(HeaderValue::from_str) {
        Some(Ok(origin)) => cors.allow_origin(origin).allow_credentials(true),
        Some(Err(err)) => {
            warn!(%err, "ignoring invalid RODADA_ALLOWED_ORIGIN");
            cors
        }
        None => cors,
    }
}

pub async fn start_server() -> Result<(), StartupError> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let config = Config::from_env()?;

    info!("Initializing state...");
    let state = AppState::new(&config)?;
    let app = build_router(state);

    info!("Binding to {}", config.bind);
    let listener = TcpListener::bind(&config.bind).await?;
    info!("Server running on {}", config.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = ctrl_c().await {
            warn!(%err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!(%err, "failed to install terminate handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
