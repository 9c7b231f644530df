use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Diacare";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model version recorded with a risk snapshot when the caller does not name one.
pub const DEFAULT_RISK_MODEL_VERSION: &str = "risk_v1";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
const DEFAULT_PREDICTION_URL: &str = "http://127.0.0.1:5000";
const DEFAULT_PREDICTION_TIMEOUT_SECS: u64 = 90;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "diacare=info,diacare_lib=info,tower_http=warn"
}

/// Get the application data directory.
/// Falls back to the working directory when the platform has no data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("diacare")
}

/// Default SQLite database location.
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("diacare.db")
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}

/// Runtime configuration, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub prediction_url: String,
    pub prediction_timeout: Duration,
    pub cors_origins: Vec<String>,
}

impl Config {
    /// Load configuration from `DIACARE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Split out from `from_env` so tests do not have to mutate the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("DIACARE_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let bind_raw = lookup("DIACARE_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .trim()
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidValue {
                var: "DIACARE_BIND_ADDR",
                value: bind_raw.clone(),
            })?;

        let prediction_url = lookup("DIACARE_PREDICTION_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PREDICTION_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let prediction_timeout = match lookup("DIACARE_PREDICTION_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidValue {
                    var: "DIACARE_PREDICTION_TIMEOUT_SECS",
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => Duration::from_secs(DEFAULT_PREDICTION_TIMEOUT_SECS),
        };

        Ok(Self {
            db_path,
            bind_addr,
            prediction_url,
            prediction_timeout,
            cors_origins: parse_origins(lookup("DIACARE_CORS_ORIGINS").as_deref()),
        })
    }
}

/// Comma-separated origin list, trimmed and deduplicated in order.
fn parse_origins(raw: Option<&str>) -> Vec<String> {
    let mut origins: Vec<String> = Vec::new();
    for origin in raw.unwrap_or_default().split(',') {
        let origin = origin.trim();
        if !origin.is_empty() && !origins.iter().any(|o| o == origin) {
            origins.push(origin.to_string());
        }
    }
    origins
}
