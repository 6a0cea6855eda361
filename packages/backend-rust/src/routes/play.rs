use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::require_learner;
use crate::services::ledger::SubmitAnswer;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/problem", get(next_problem))
        .route("/submit", post(submit))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProblemQuery {
    #[serde(default)]
    archetype_slug: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest {
    #[serde(default)]
    problem_id: Option<String>,
    #[serde(default)]
    chosen_id: Option<String>,
    #[serde(default)]
    time_ms: Option<i64>,
}

async fn next_problem(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<ProblemQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::invalid_input(e.body_text()))?;
    let slug = query
        .archetype_slug
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::invalid_input("Archetype slug required"))?;

    let learner_id = require_learner(&state, &headers).await?;
    let view = state.session().next_problem(&learner_id, slug.trim()).await?;
    Ok(ok(view))
}

async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SubmitRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body.map_err(|e| AppError::invalid_input(e.body_text()))?;
    let (Some(problem_id), Some(chosen_id)) = (
        body.problem_id.filter(|s| !s.is_empty()),
        body.chosen_id.filter(|s| !s.is_empty()),
    ) else {
        return Err(AppError::invalid_input("problemId and chosenId are required"));
    };

    let learner_id = require_learner(&state, &headers).await?;
    let answer = SubmitAnswer {
        item_id: problem_id,
        chosen: chosen_id,
        time_ms: body
            .time_ms
            .unwrap_or(0)
            .clamp(0, i64::from(i32::MAX)) as i32,
    };
    let outcome = state.session().submit(&learner_id, &answer).await?;
    Ok(ok(outcome))
}
