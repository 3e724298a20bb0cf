//! HTTP surface: routes, handlers, and the outcome-to-status mapping.
//!
//! Every failure is recovered here and converted into the uniform
//! `{success:false, error, details?}` body; a failed prediction never
//! affects other in-flight requests.

use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::debug;

use crate::api::{FailureResponse, HealthResponse, PredictResponse, SymptomsResponse};
use crate::bridge::{BridgeError, InferenceBridge};
use crate::catalog::{CatalogError, SymptomCatalog};
use crate::config::ServiceConfig;
use crate::request::{PredictionRequest, RequestError};

/// Shared state for all handlers.
pub struct AppState {
    pub config: ServiceConfig,
    pub bridge: InferenceBridge,
    /// Flips to `true` on graceful shutdown; in-flight invocations observe it.
    pub shutdown: watch::Receiver<bool>,
}

impl AppState {
    pub fn new(config: ServiceConfig, shutdown: watch::Receiver<bool>) -> Self {
        let bridge = InferenceBridge::new(
            config.worker_command(),
            config.worker_timeout(),
            config.worker.max_concurrent,
        );
        AppState {
            config,
            bridge,
            shutdown,
        }
    }
}

/// Build the service router.
pub fn router(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .route("/health", get(health))
        .route("/symptoms", get(symptoms))
        .route("/predict", post(predict));

    if let Some(dir) = &state.config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app.layer(CorsLayer::permissive()).with_state(state)
}

// ── Outcome-to-status mapping ─────────────────────────────────────────────

/// A failure outcome with its transport status, rendered as the uniform body.
struct ApiError {
    status: StatusCode,
    body: FailureResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn catalog_error(err: CatalogError) -> ApiError {
    ApiError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: FailureResponse::new(err.to_string()),
    }
}

fn request_error(err: RequestError) -> ApiError {
    ApiError {
        status: StatusCode::BAD_REQUEST,
        body: FailureResponse::new(err.to_string()),
    }
}

fn bridge_error(err: BridgeError) -> ApiError {
    let status = match &err {
        BridgeError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
        BridgeError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let details = match &err {
        BridgeError::WorkerFailed { stderr, .. } => stderr.clone(),
        BridgeError::Decode(decode) => match decode {
            crate::decode::DecodeError::NotJson { raw, .. } => raw.clone(),
            crate::decode::DecodeError::BadShape { raw, .. } => raw.clone(),
        },
        BridgeError::Launch { source, .. } => source.to_string(),
        _ => String::new(),
    };
    ApiError {
        status,
        body: FailureResponse::new(err.to_string()).with_details(details),
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn symptoms(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SymptomsResponse>, ApiError> {
    // Reread per request: the catalog is immutable, no caching guarantee.
    let catalog = SymptomCatalog::load(&state.config.catalog_path)
        .await
        .map_err(catalog_error)?;
    Ok(Json(SymptomsResponse {
        success: true,
        symptoms: catalog,
    }))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    // Validation owns the JSON parse so every failure path, including a
    // body that is not JSON at all, produces the uniform response shape.
    let request = PredictionRequest::parse(&body).map_err(request_error)?;
    debug!(symptoms = request.symptoms().len(), "prediction requested");

    let result = state
        .bridge
        .invoke_cancellable(&request, state.shutdown.clone())
        .await
        .map_err(bridge_error)?;

    Ok(Json(PredictResponse {
        success: true,
        prediction: result.label,
        confidence: result.confidence,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overloaded_maps_to_503() {
        let err = bridge_error(BridgeError::Overloaded);
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn timeout_maps_to_504() {
        let err = bridge_error(BridgeError::Timeout { timeout_secs: 30 });
        assert_eq!(err.status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn worker_failure_maps_to_500_with_stderr_details() {
        let err = bridge_error(BridgeError::WorkerFailed {
            status: std::process::ExitStatus::default(),
            stderr: "model error".into(),
        });
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.details.as_deref(), Some("model error"));
    }

    #[test]
    fn malformed_result_carries_raw_output() {
        let err = bridge_error(BridgeError::Decode(
            crate::decode::DecodeError::NotJson {
                message: "expected value".into(),
                raw: "not json".into(),
            },
        ));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.details.as_deref(), Some("not json"));
    }

    #[test]
    fn validation_failure_maps_to_400() {
        let err = request_error(RequestError::Empty);
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert!(!err.body.success);
    }
}
