//! API routes for the answer server

pub mod answer;

use axum::{extract::State, routing::get, Json, Router};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Answer (JSON body or query string)
        .route("/answer", get(answer::answer_get).post(answer::answer_post))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let orchestrator = state.orchestrator();
    let config = state.config();

    Json(serde_json::json!({
        "name": "askdocs",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering grounded on retrieved documents",
        "backend": config.backend,
        "retriever": orchestrator.retrieval().provider().name(),
        "generator": orchestrator.generation().provider().name(),
        "model": orchestrator.generation().provider().model(),
        "retrieval": {
            "default_top_k": config.retrieval.default_top_k,
            "max_top_k": config.retrieval.max_top_k,
        },
        "endpoints": {
            "POST /api/answer": "Answer a question ({query, instructions?, top_k?, conversation_id?, history?})",
            "GET /api/answer?question=...": "Answer a question (query-string form)",
            "GET /api/info": "Service information",
            "GET /health": "Liveness",
            "GET /ready": "Readiness"
        }
    }))
}
