use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use tokio::signal;
use tracing::info;

use crate::application::{AnswerQuestionUseCase, RetrieveUseCase};
use crate::domain::{DomainError, SearchResult};

const DEFAULT_TOP_K: usize = 4;

pub struct AppState {
    retriever: Arc<RetrieveUseCase>,
    answerer: Option<Arc<AnswerQuestionUseCase>>,
}

impl AppState {
    pub fn new(
        retriever: Arc<RetrieveUseCase>,
        answerer: Option<Arc<AnswerQuestionUseCase>>,
    ) -> Self {
        Self {
            retriever,
            answerer,
        }
    }
}

#[derive(Deserialize)]
pub struct QueryRequest {
    pub text: Option<String>,
    pub image_path: Option<String>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

#[derive(Serialize)]
pub struct QueryResponse {
    pub results: Vec<QueryHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

#[derive(Serialize)]
pub struct QueryHit {
    pub asin: String,
    pub product_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    pub snippet: String,
    pub distance: f32,
}

impl QueryHit {
    fn from_result(result: &SearchResult) -> Self {
        let meta = result.chunk().metadata();
        Self {
            asin: meta.asin().to_string(),
            product_name: meta.product_name().to_string(),
            image_path: meta.image_path().map(String::from),
            snippet: result.chunk().snippet(140),
            distance: result.distance(),
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/query", post(query))
        .with_state(state)
}

/// Bind and serve until Ctrl+C.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<(), DomainError> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(DomainError::IoError)?;
    info!("Serving HTTP API on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DomainError::internal(format!("HTTP server failed: {e}")))
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_err() {
        tracing::warn!("Failed to listen for shutdown signal");
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Handler: POST /query
///
/// Dispatches on which modalities are present: text only, image only, or
/// both. At least one is required.
async fn query(
    State(state): State<Arc<AppState>>,
    Json(body): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, (StatusCode, String)> {
    let text = body.text.as_deref().filter(|t| !t.trim().is_empty());
    let image = body.image_path.as_deref().filter(|p| !p.is_empty());

    let results = match (text, image) {
        (Some(text), None) => state.retriever.by_text(text, body.top_k).await,
        (None, Some(image)) => state.retriever.by_image(Path::new(image), body.top_k).await,
        (Some(text), Some(image)) => {
            state
                .retriever
                .by_text_and_image(text, Path::new(image), body.top_k)
                .await
        }
        (None, None) => {
            return Err((
                StatusCode::BAD_REQUEST,
                "provide a text query, an image path, or both".to_string(),
            ))
        }
    }
    .map_err(error_response)?;

    let answer = match &state.answerer {
        Some(answerer) => {
            let question = text.unwrap_or("Describe the product shown in the image.");
            Some(
                answerer
                    .answer_with_context(question, &results)
                    .await
                    .map_err(error_response)?,
            )
        }
        None => None,
    };

    Ok(Json(QueryResponse {
        results: results.iter().map(QueryHit::from_result).collect(),
        answer,
    }))
}

fn error_response(error: DomainError) -> (StatusCode, String) {
    let status = match &error {
        DomainError::InvalidArgument(_) | DomainError::EmptyInput(_) => StatusCode::BAD_REQUEST,
        DomainError::EmbeddingError(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::IndexCorrupt(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, error.to_string())
}
