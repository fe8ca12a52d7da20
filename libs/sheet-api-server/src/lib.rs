mod error;
mod http;

use std::sync::Arc;

use axum::Router;
use axum::http::{Method, header};
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use sheet_engine::Gateway;

pub use error::{ApiError, status_for};

#[derive(Clone)]
pub(crate) struct AppState {
    gateway: Arc<Gateway>,
}

/// Routes:
///
/// - `GET /` service info
/// - `GET /{dataset}?col=value&format=&filename=` dataset read
/// - `POST /post` append a record
/// - `POST /update` update the first matching record
pub fn router(gateway: Arc<Gateway>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/", get(http::handle_info))
        .route("/post", post(http::handle_insert))
        .route("/update", post(http::handle_update))
        .route("/{dataset}", get(http::handle_read))
        .with_state(AppState { gateway })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Serve the API on `bind:port` until `shutdown` is cancelled.
pub async fn run(
    bind: &str,
    port: u16,
    gateway: Arc<Gateway>,
    shutdown: CancellationToken,
) -> Result<(), String> {
    let app = router(gateway);

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .map_err(|e| format!("bind api {bind}:{port}: {e}"))?;
    tracing::info!(bind, port, "api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| format!("axum serve: {e}"))?;

    Ok(())
}
