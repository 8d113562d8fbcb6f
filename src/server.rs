//! HTTP server for the shopping assistant

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::assistant::{SharedAssistant, TurnRequest};
use crate::error::AssistantError;
use crate::types::{unix_now, ComparisonReport, ReplyPayload, SearchResults, SimilarProducts};

#[derive(Debug, Deserialize)]
pub struct SearchRequestHttp {
    pub query: String,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequestHttp {
    #[serde(default)]
    pub product_ids: Vec<String>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub generator_configured: bool,
    pub product_count: usize,
    pub session_count: usize,
    pub timestamp: u64,
}

type HttpError = (StatusCode, Json<ErrorResponse>);

fn status_for(err: &AssistantError) -> StatusCode {
    match err {
        AssistantError::InvalidInput(_) | AssistantError::InsufficientProducts { .. } => StatusCode::BAD_REQUEST,
        AssistantError::ProductNotFound(_) => StatusCode::NOT_FOUND,
        AssistantError::UpstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn error_label(err: &AssistantError) -> &'static str {
    match err {
        AssistantError::InvalidInput(_) => "Invalid input",
        AssistantError::InsufficientProducts { .. } => "Insufficient products",
        AssistantError::ProductNotFound(_) => "Product not found",
        AssistantError::UpstreamUnavailable(_) => "Upstream unavailable",
    }
}

fn into_http(err: AssistantError) -> HttpError {
    let status = status_for(&err);
    if status.is_server_error() {
        error!("Request failed: {:?}", err);
    } else {
        warn!("Request rejected: {}", err);
    }
    (
        status,
        Json(ErrorResponse {
            error: error_label(&err).to_string(),
            details: Some(err.to_string()),
        }),
    )
}

/// Conversational turn handler
async fn chat_handler(
    State(assistant): State<SharedAssistant>,
    Json(req): Json<TurnRequest>,
) -> Result<Json<ReplyPayload>, HttpError> {
    info!("Received chat request: session_id='{}', lang={:?}", req.session_id, req.lang);
    assistant.handle_turn(req).await.map(Json).map_err(into_http)
}

async fn search_handler(
    State(assistant): State<SharedAssistant>,
    Json(req): Json<SearchRequestHttp>,
) -> Result<Json<SearchResults>, HttpError> {
    assistant.search(&req.query).await.map(Json).map_err(into_http)
}

async fn compare_handler(
    State(assistant): State<SharedAssistant>,
    Json(req): Json<CompareRequestHttp>,
) -> Result<Json<ComparisonReport>, HttpError> {
    info!("Received compare request for {} ids", req.product_ids.len());
    assistant.compare(&req.product_ids).await.map(Json).map_err(into_http)
}

async fn similar_handler(
    State(assistant): State<SharedAssistant>,
    Path(product_id): Path<String>,
) -> Result<Json<SimilarProducts>, HttpError> {
    assistant.similar(&product_id).await.map(Json).map_err(into_http)
}

/// Health check handler
async fn health_handler(State(assistant): State<SharedAssistant>) -> Json<HealthResponse> {
    let status = assistant.status().await;
    Json(HealthResponse {
        ok: true,
        service: "zuhall-assist".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        generator_configured: status.generator_configured,
        product_count: status.product_count,
        session_count: status.session_count,
        timestamp: unix_now(),
    })
}

/// Create and configure the HTTP router
pub fn create_router(assistant: SharedAssistant) -> Router {
    Router::new()
        .route("/api/ai/health", get(health_handler))
        .route("/api/ai/chat", post(chat_handler))
        .route("/api/ai/search", post(search_handler))
        .route("/api/ai/compare", post(compare_handler))
        .route("/api/ai/similar/:id", get(similar_handler))
        .with_state(assistant)
}

/// Run the HTTP server
pub async fn run_server(assistant: SharedAssistant, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    info!("Starting shopping assistant server on {}", addr);

    let app = create_router(assistant);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(status_for(&AssistantError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&AssistantError::InsufficientProducts { found: 1 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&AssistantError::ProductNotFound("p".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&AssistantError::UpstreamUnavailable("catalog".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_error_body_carries_details() {
        let (status, Json(body)) = into_http(AssistantError::ProductNotFound("p9".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.error, "Product not found");
        assert_eq!(body.details.as_deref(), Some("product not found: p9"));
    }
}
