use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::{verify_admin, AdminAuthError};
use crate::db::models::{RatingEvent, Standing};
use crate::response::{ok, AppError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/rating-change", post(rating_change))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatingChangeRequest {
    user_id: String,
    archetype_id: String,
    rating: i32,
}

#[derive(Serialize)]
struct RatingChangeResponse {
    standing: Standing,
    event: RatingEvent,
}

async fn rating_change(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<RatingChangeRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    verify_admin(&headers, state.config().admin_token.as_deref()).map_err(|err| match err {
        AdminAuthError::Missing => AppError::unauthorized(err.to_string()),
        AdminAuthError::Mismatch | AdminAuthError::Disabled => AppError::forbidden(err.to_string()),
    })?;

    let Json(body) = body.map_err(|e| AppError::invalid_input(e.body_text()))?;
    if body.user_id.trim().is_empty() || body.archetype_id.trim().is_empty() {
        return Err(AppError::invalid_input("userId and archetypeId are required"));
    }

    let (standing, event) = state
        .session()
        .override_rating(&body.user_id, &body.archetype_id, body.rating)
        .await?;
    Ok(ok(RatingChangeResponse { standing, event }))
}
