//! HTTP API server for integration with other systems.
//!
//! Exposes a liveness probe, the query path, and the ingestion pipeline.

use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAiEmbedder;
use crate::error::SvarError;
use crate::orchestrator::Orchestrator;
use crate::rag::{OpenAiGenerator, RagEngine};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    engine: RagEngine,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let orchestrator = Orchestrator::new(settings.clone())?;

    let embedder = Arc::new(OpenAiEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    ));
    let generator = Arc::new(OpenAiGenerator::new(&settings.rag.model));
    let engine = RagEngine::new(orchestrator.vector_store(), embedder, generator);

    let state = Arc::new(AppState {
        orchestrator,
        engine,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(home))
        .route("/query", post(query))
        .route("/update", post(update))
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Svar API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Status", "GET  /");
    Output::kv("Query", "POST /query?question=...&top_k=3");
    Output::kv("Update", "POST /update?limit=5");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct QueryParams {
    question: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    3
}

#[derive(Serialize)]
struct QueryResponse {
    answer: String,
}

#[derive(Deserialize)]
struct UpdateParams {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    5
}

#[derive(Serialize)]
struct UpdateResponse {
    status: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Map an error kind to the status code the surface reports.
///
/// Client mistakes are 4xx, upstream provider failures are 502, and
/// everything wrong on our side is 500. A failing handler never responds
/// with a success status carrying an error payload.
fn status_for(err: &SvarError) -> StatusCode {
    match err {
        SvarError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        SvarError::EmptyIndex | SvarError::EmbeddingModelMismatch { .. } => StatusCode::CONFLICT,
        SvarError::Fetch(_)
        | SvarError::Download(_)
        | SvarError::Transcription(_)
        | SvarError::Embedding(_)
        | SvarError::Retrieval { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: SvarError) -> axum::response::Response {
    (
        status_for(&err),
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn home() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "service": "svar" }))
}

async fn query(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryParams>,
) -> impl IntoResponse {
    match state.engine.answer(&params.question, params.top_k).await {
        Ok(result) => Json(QueryResponse {
            answer: result.answer,
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

async fn update(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UpdateParams>,
) -> impl IntoResponse {
    match state.orchestrator.run_batch(params.limit).await {
        Ok(report) => Json(UpdateResponse {
            status: report.status_line(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetrievalStage;

    #[test]
    fn test_error_kinds_map_to_distinct_codes() {
        assert_eq!(
            status_for(&SvarError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&SvarError::EmptyIndex), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&SvarError::Retrieval {
                stage: RetrievalStage::Generation,
                message: "down".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&SvarError::Fetch("unreachable".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&SvarError::Config("bad".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
