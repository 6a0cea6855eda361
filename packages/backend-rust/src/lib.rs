//! calibra backend: adaptive calibration of learner ratings per skill unit,
//! served over HTTP on PostgreSQL (server) or SQLite (desktop).

pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{DbInitError, Store};
use crate::state::AppState;

/// Connects the configured store and builds the router on top of it.
pub async fn create_app(config: Config) -> Result<(axum::Router, Store), DbInitError> {
    let store = db::connect(&config).await?;
    Ok((app_with_store(config, store.clone()), store))
}

pub fn app_with_store(config: Config, store: Store) -> axum::Router {
    let state = AppState::new(config, store);

    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
