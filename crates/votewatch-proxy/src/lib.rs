//! Header-replaying proxy for the upstream nominee API.
//!
//! The browser-facing leaderboard can not call the upstream directly: it
//! blocks cross-origin requests and expects a mobile client's header
//! fingerprint, including an API token that must stay server-side. This crate
//! exposes one stateless endpoint that rebuilds that fingerprint from
//! configuration and relays the response.
//!
//! # Endpoint
//!
//! `GET /api/nominee[?keyCategory&typeSort&typePeriod]`
//!
//! - `200`: upstream JSON body verbatim, `Cache-Control: no-store`
//! - `500` `missing-config`: required env var absent; no upstream call made
//! - `503` `network-failure`: DNS or connect error
//! - `504` `upstream-timeout`: no complete response within the timeout
//! - `502` `invalid-shape`: body is not JSON, or lacks `status`/`nominee[]`
//! - upstream status `upstream-error`: non-2xx relayed with an 800-char body sample
//!
//! Every error body is `{ok: false, kind, ...}` and carries the constructed
//! `upstream` URL where one exists. Credentials only travel in headers and
//! never appear in error bodies.
//!
//! # Configuration
//!
//! See [`config::ProxyConfig`]. Only `FANCA_X_API_TOKEN` is required.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
pub mod upstream;

pub use config::{ConfigError, ProxyConfig};
pub use error::ProxyError;
pub use state::AppState;
pub use upstream::{NomineeParams, Upstream};

pub const NOMINEE_ROUTE: &str = "/api/nominee";

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route(NOMINEE_ROUTE, get(routes::nominee_handler))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until Ctrl+C or SIGTERM.
pub async fn serve(address: SocketAddr, config: ProxyConfig) -> std::io::Result<()> {
    let missing = config.missing_keys();
    if !missing.is_empty() {
        error!(missing = ?missing, "proxy configuration incomplete; requests will return 500");
    }

    let state = AppState::new(config).map_err(std::io::Error::other)?;
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    info!("Proxy running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Proxy shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {e}");
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
