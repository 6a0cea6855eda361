use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::response::{ok, AppError};
use crate::routes::require_learner;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/:archetype_slug/history", get(history))
}

#[derive(Debug, Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    limit: Option<i64>,
}

async fn history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(archetype_slug): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let Query(query) = query.map_err(|e| AppError::invalid_input(e.body_text()))?;
    let learner_id = require_learner(&state, &headers).await?;
    let events = state
        .session()
        .rating_history(&learner_id, &archetype_slug, query.limit)
        .await?;
    Ok(ok(events))
}
