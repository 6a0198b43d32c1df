//! Answer endpoint

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query as QueryParams, State,
    },
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::error::Error;
use crate::server::state::AppState;
use crate::types::{Answer, AnswerResponse, Query, QueryRequest};

/// Query-string form of the answer request
#[derive(Debug, Deserialize)]
pub struct AnswerParams {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl From<AnswerParams> for QueryRequest {
    fn from(params: AnswerParams) -> Self {
        Self {
            query: params.question,
            instructions: params.instructions,
            top_k: params.top_k,
            conversation_id: None,
            history: Vec::new(),
        }
    }
}

/// POST /api/answer - Answer a question from retrieved documents
pub async fn answer_post(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AnswerResponse>), Error> {
    let Json(request) = body.map_err(|e| Error::invalid_query(e.body_text()))?;
    Ok(respond(answer(&state, request).await))
}

/// GET /api/answer?question=...&instructions=... - Query-string variant
pub async fn answer_get(
    State(state): State<AppState>,
    params: Result<QueryParams<AnswerParams>, QueryRejection>,
) -> Result<(StatusCode, Json<AnswerResponse>), Error> {
    let QueryParams(params) = params.map_err(|e| Error::invalid_query(e.body_text()))?;
    Ok(respond(answer(&state, params.into()).await))
}

async fn answer(state: &AppState, request: QueryRequest) -> Answer {
    tracing::info!("Question: \"{}\"", request.query);
    state.orchestrator().handle(Query::from(request)).await
}

fn respond(answer: Answer) -> (StatusCode, Json<AnswerResponse>) {
    let status = answer
        .error_kind()
        .map(|kind| kind.status_code())
        .unwrap_or(StatusCode::OK);
    (status, Json(AnswerResponse::from(answer)))
}
