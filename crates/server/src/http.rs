//! HTTP Endpoints
//!
//! - `GET /` welcome message with the pipeline status
//! - `GET /docs` endpoint listing
//! - `GET /health` liveness
//! - `GET /ready` readiness (503 until the pipeline is ready)
//! - `POST /api/v1/chat/ask` question answering

use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, FromRequest, Json, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use mentor_core::{AppError, AppResult};
use mentor_knowledge::{AskError, PipelineStatus, RagPipeline, SourceDocument};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

const WELCOME_MESSAGE: &str = "Bem-vindo à API da IA Multi-Autor!";
const DOCS_PATH: &str = "/docs";
const ASK_PATH: &str = "/api/v1/chat/ask";

/// Ask request body.
#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub query: String,
}

/// Ask response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub source_documents: Vec<SourceDocument>,
}

/// JSON body extractor whose rejections use the `{detail}` error shape.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// Error body: `{"detail": "..."}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl From<AskError> for ApiError {
    fn from(err: AskError) -> Self {
        let status = match &err {
            AskError::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            AskError::EmptyQuery => StatusCode::BAD_REQUEST,
            AskError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::warn!("Rejected request body: {}", rejection.body_text());
        Self::new(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "detail": self.detail }))).into_response()
    }
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route(DOCS_PATH, get(docs))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route(ASK_PATH, post(ask))
        .route("/api/v1/chat/ask/", post(ask))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: &str, pipeline: Arc<RagPipeline>) -> AppResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", addr, e)))?;

    tracing::info!(
        "Listening on http://{} (RAG status: {})",
        listener.local_addr()?,
        pipeline.status()
    );

    axum::serve(listener, create_router(AppState::new(pipeline)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": WELCOME_MESSAGE,
        "rag_status": state.pipeline.status().label(),
        "docs_url": DOCS_PATH,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Endpoint listing
async fn docs() -> impl IntoResponse {
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": [
            { "method": "GET", "path": "/", "description": "Welcome message and RAG status" },
            { "method": "GET", "path": "/health", "description": "Liveness" },
            { "method": "GET", "path": "/ready", "description": "503 until the RAG pipeline is ready" },
            {
                "method": "POST",
                "path": ASK_PATH,
                "description": "Answer a question",
                "request": { "query": "string" },
                "response": { "answer": "string", "source_documents": "array" }
            }
        ]
    }))
}

/// Health check
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness check
async fn readiness_check(State(state): State<AppState>) -> Response {
    match state.pipeline.status() {
        PipelineStatus::Ready { chunks } => {
            Json(serde_json::json!({ "status": "ready", "chunks": chunks })).into_response()
        }
        status => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": status.label(),
                "detail": status.to_string(),
            })),
        )
            .into_response(),
    }
}

/// Answer a question
async fn ask(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if request.query.trim().is_empty() {
        tracing::warn!("Rejected empty query");
        return Err(AskError::EmptyQuery.into());
    }

    let answer = state.pipeline.ask(&request.query).await?;

    Ok(Json(AskResponse {
        answer: answer.answer,
        source_documents: answer.sources,
    }))
}
