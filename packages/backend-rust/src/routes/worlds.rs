use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::require_learner;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_worlds))
        .route("/enroll", post(enroll))
        .route("/:slug", get(world_detail))
        .route("/:slug/:domain_slug", get(domain_detail))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    #[serde(default)]
    domain_id: Option<String>,
}

async fn enroll(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<EnrollRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(body) = body.map_err(|e| AppError::invalid_input(e.body_text()))?;
    let domain_id = body
        .domain_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::invalid_input("domainId is required"))?;

    let learner_id = require_learner(&state, &headers).await?;
    let outcome = state.session().enroll(&learner_id, &domain_id).await?;
    Ok(ok(outcome))
}

async fn list_worlds(State(state): State<AppState>, headers: HeaderMap) -> Result<Response, AppError> {
    let learner_id = require_learner(&state, &headers).await?;
    let worlds = state.session().worlds(&learner_id).await?;
    Ok(ok(worlds))
}

async fn world_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(slug): Path<String>,
) -> Result<Response, AppError> {
    let learner_id = require_learner(&state, &headers).await?;
    let detail = state.session().world_detail(&learner_id, &slug).await?;
    Ok(ok(detail))
}

async fn domain_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((slug, domain_slug)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let learner_id = require_learner(&state, &headers).await?;
    let detail = state
        .session()
        .domain_detail(&learner_id, &slug, &domain_slug)
        .await?;
    Ok(ok(detail))
}
