use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::db::{CalibrationStore, DbMode};
use crate::state::AppState;

const DB_CHECK_TIMEOUT: Duration = Duration::from_secs(2);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/info", get(info))
        .route("/live", get(live))
        .route("/ready", get(ready))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthInfoResponse {
    service: &'static str,
    version: &'static str,
    database_mode: &'static str,
    start_time: String,
    uptime: u64,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_latency_ms: Option<u64>,
}

async fn root(State(state): State<AppState>) -> Response {
    let ok = matches!(database_check(&state).await, DbCheckStatus::Connected { .. });

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        database: if ok { "connected" } else { "disconnected" },
        timestamp: now_iso(),
    };
    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn info(State(state): State<AppState>) -> Response {
    let database_mode = match DbMode::detect(state.config()) {
        DbMode::ServerPostgres => "postgres",
        DbMode::DesktopSqlite => "sqlite",
    };
    let response = HealthInfoResponse {
        service: "calibra-backend",
        version: env!("CARGO_PKG_VERSION"),
        database_mode,
        start_time: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
    };
    Json(response).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    let (status, database, latency) = match database_check(&state).await {
        DbCheckStatus::Connected { latency_ms } => ("healthy", "connected", Some(latency_ms)),
        DbCheckStatus::Timeout => ("unhealthy", "timeout", None),
        DbCheckStatus::Disconnected => ("unhealthy", "disconnected", None),
    };

    let response = ReadinessResponse {
        status,
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
        database,
        database_latency_ms: latency,
    };
    let status_code = if status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

enum DbCheckStatus {
    Connected { latency_ms: u64 },
    Timeout,
    Disconnected,
}

async fn database_check(state: &AppState) -> DbCheckStatus {
    let started = Instant::now();
    match tokio::time::timeout(DB_CHECK_TIMEOUT, state.store().ping()).await {
        Ok(Ok(())) => DbCheckStatus::Connected {
            latency_ms: started.elapsed().as_millis() as u64,
        },
        Ok(Err(err)) => {
            tracing::warn!(error = %err, "health check ping failed");
            DbCheckStatus::Disconnected
        }
        Err(_) => DbCheckStatus::Timeout,
    }
}

fn system_time_iso(time: std::time::SystemTime) -> String {
    let datetime: chrono::DateTime<chrono::Utc> = time.into();
    datetime.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

fn now_iso() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
