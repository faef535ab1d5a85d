use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
};

use axum::{
    Json, Router,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use log::info;
use tower_http::services::ServeDir;
use tracker_domain::{ServiceError, service::ArcMatchService};

mod matches;
mod summary;


pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

#[derive(Clone)]
pub struct AppState {
    pub match_service: ArcMatchService,
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub addr: SocketAddr,
    /// Directory of the bundled front-end, served for every non-API path.
    pub public_dir: PathBuf,
}

pub fn router(state: AppState, public_dir: &Path) -> Router {
    Router::new()
        .nest(
            "/api",
            Router::new()
                .route("/matches", get(matches::list).post(matches::create))
                .route("/matches/replace", post(matches::replace))
                .route("/matches/{id}", delete(matches::remove))
                .route("/backup", get(matches::backup))
                .route("/summary", get(summary::get_summary)),
        )
        .fallback_service(ServeDir::new(public_dir))
        .with_state(state)
}

pub async fn run(
    state: AppState,
    config: HttpConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let router = router(state, &config.public_dir);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;

    info!("API server listening on {}", config.addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("HTTP API shut down gracefully");
    Ok(())
}

fn internal_error_response() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": INTERNAL_ERROR_MESSAGE })),
    )
        .into_response()
}

/// Maps service errors onto status codes. Internal details are logged and
/// never sent to the client.
pub struct ApiError(ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self.0 {
            ServiceError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ServiceError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ServiceError::Internal(msg) => {
                log::error!("Internal server error: {}", msg);
                return internal_error_response();
            }
        };
        let body = serde_json::json!({ "error": msg });
        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(value: ServiceError) -> Self {
        ApiError(value)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(value: JsonRejection) -> Self {
        ApiError(ServiceError::BadRequest(value.body_text()))
    }
}

#[derive(serde::Serialize)]
pub struct OkResponse {
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            count: None,
        }
    }

    pub fn with_count(count: usize) -> Self {
        Self {
            ok: true,
            count: Some(count),
        }
    }
}
