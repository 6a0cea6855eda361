use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use calibra_algo::{BAND_RADIUS, INITIAL_RATING};

/// Tunables of the calibration engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationSettings {
    pub initial_rating: i32,
    pub band_radius: i32,
    /// How many times a submit re-reads the standing after losing an
    /// optimistic version race.
    pub commit_retries: u32,
}

impl Default for CalibrationSettings {
    fn default() -> Self {
        Self {
            initial_rating: INITIAL_RATING,
            band_radius: BAND_RADIUS,
            commit_retries: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    /// Server mode when set; desktop SQLite mode otherwise.
    pub database_url: Option<String>,
    pub sqlite_path: PathBuf,
    pub db_max_connections: u32,
    pub admin_token: Option<String>,
    /// Every request acts as the local learner; no session lookup.
    pub single_user: bool,
    pub calibration: CalibrationSettings,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_parse("PORT").unwrap_or(3000);

        let host = env_parse::<IpAddr>("HOST").unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));

        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let database_url = env_non_empty("DATABASE_URL");
        let sqlite_path = env_non_empty("SQLITE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(default_sqlite_path);

        let defaults = CalibrationSettings::default();
        let calibration = CalibrationSettings {
            initial_rating: env_parse::<i32>("CALIBRATION_INITIAL_RATING")
                .filter(|v| *v >= 0)
                .unwrap_or(defaults.initial_rating),
            band_radius: env_parse::<i32>("CALIBRATION_BAND_RADIUS")
                .filter(|v| *v >= 0)
                .unwrap_or(defaults.band_radius),
            commit_retries: env_parse("CALIBRATION_COMMIT_RETRIES")
                .unwrap_or(defaults.commit_retries),
        };

        Self {
            host,
            port,
            log_level,
            sqlite_path,
            db_max_connections: env_parse::<u32>("DB_MAX_CONNECTIONS")
                .filter(|v| *v > 0)
                .unwrap_or(10),
            admin_token: env_non_empty("ADMIN_TOKEN"),
            single_user: env_bool("SINGLE_USER_MODE").unwrap_or(database_url.is_none()),
            database_url,
            calibration,
        }
    }

    /// Desktop config against an explicit SQLite file.
    pub fn desktop(sqlite_path: impl Into<PathBuf>) -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            sqlite_path: sqlite_path.into(),
            db_max_connections: 10,
            admin_token: None,
            single_user: true,
            calibration: CalibrationSettings::default(),
        }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    let value = env_non_empty(key)?;
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_non_empty(key).and_then(|v| v.parse::<T>().ok())
}

fn default_sqlite_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("com.calibra.app")
        .join("calibra.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_desktop_config_defaults() {
        let config = Config::desktop("/tmp/calibra-test.db");
        assert!(config.database_url.is_none());
        assert!(config.single_user);
        assert_eq!(config.calibration.initial_rating, 200);
        assert_eq!(config.calibration.band_radius, 200);
        assert_eq!(config.bind_addr().port(), 3000);
    }

    #[test]
    fn test_default_sqlite_path_is_app_scoped() {
        let path = default_sqlite_path();
        assert!(path.ends_with("com.calibra.app/calibra.db"));
    }
}
