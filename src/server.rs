use crate::engine::SummarizerEngine;
use crate::error::ApiError;
use crate::messages::{
    BatchSummarizeRequest, BatchSummarizeResponse, HealthResponse, SummarizeRequest,
    SummarizeResponse,
};
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Builds the HTTP API around an already running engine.
pub fn router(engine: Arc<SummarizerEngine>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/summarize", post(summarize))
        .route("/batch_summarize", post(batch_summarize))
        .layer(CorsLayer::permissive())
        .with_state(engine)
}

async fn health(State(engine): State<Arc<SummarizerEngine>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Summarization API is running".to_string(),
        engine: engine.state().as_str().to_string(),
        profile: engine.profile().to_string(),
    })
}

async fn summarize(
    State(engine): State<Arc<SummarizerEngine>>,
    body: Bytes,
) -> Result<Json<SummarizeResponse>, ApiError> {
    let request = SummarizeRequest::from_body(&body)?;

    let summary = engine
        .summarize(request.text.clone(), request.overrides)
        .await
        .map_err(ApiError::Summarize)?;

    Ok(Json(SummarizeResponse::new(&request.text, summary)))
}

async fn batch_summarize(
    State(engine): State<Arc<SummarizerEngine>>,
    body: Bytes,
) -> Result<Json<BatchSummarizeResponse>, ApiError> {
    let request = BatchSummarizeRequest::from_body(&body)?;
    log::info!("Batch summarizing {} texts", request.texts.len());

    let summaries = engine
        .batch_summarize(request.texts, request.overrides)
        .await
        .map_err(ApiError::BatchSummarize)?;

    Ok(Json(BatchSummarizeResponse { summaries }))
}
