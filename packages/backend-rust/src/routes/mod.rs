mod health;
mod pipeline;
mod play;
mod standings;
mod worlds;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;

use crate::auth::resolve_learner;
use crate::config::env_bool;
use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let healthcheck_endpoint = normalize_healthcheck_endpoint(
        std::env::var("HEALTHCHECK_ENDPOINT")
            .ok()
            .as_deref()
            .unwrap_or("/health"),
    );

    let mut app = Router::new()
        .nest("/api/play", play::router())
        .nest("/api/worlds", worlds::router())
        .nest("/api/standings", standings::router());

    if env_bool("ENABLE_PIPELINE_ROUTES").unwrap_or(true) {
        app = app.nest("/api/pipeline", pipeline::router());
    }

    let mut health_paths = vec![healthcheck_endpoint];
    if !health_paths.iter().any(|path| path == "/api/health") {
        health_paths.push("/api/health".to_string());
    }
    for path in &health_paths {
        app = app.nest(path.as_str(), health::router());
    }

    app.fallback(fallback_handler).with_state(state)
}

/// Learner id for the request, or 401.
pub(crate) async fn require_learner(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<String, AppError> {
    let learner_id = resolve_learner(state.store(), state.config().single_user, headers).await?;
    Ok(learner_id)
}

fn normalize_healthcheck_endpoint(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return "/health".to_string();
    }

    let with_slash = if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    };
    with_slash.trim_end_matches('/').to_string()
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}
