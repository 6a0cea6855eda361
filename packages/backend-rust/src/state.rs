use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::config::Config;
use crate::db::Store;
use crate::services::calibration::CalibrationSession;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    config: Arc<Config>,
    session: Arc<CalibrationSession<Store>>,
}

impl AppState {
    pub fn new(config: Config, store: Store) -> Self {
        let session = CalibrationSession::new(store, config.calibration);
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            config: Arc::new(config),
            session: Arc::new(session),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &CalibrationSession<Store> {
        &self.session
    }

    pub fn store(&self) -> &Store {
        self.session.store()
    }
}
