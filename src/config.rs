use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Symptom Intelligence";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Store key holding the recent-assessment list.
pub const HISTORY_KEY: &str = "symptom_history";

/// Engine base URL used when `SYMPTOM_ENGINE_URL` is unset.
pub const DEFAULT_ENGINE_URL: &str = "http://localhost:8000";

/// Whole-request timeout for one analysis call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

const ENGINE_URL_VAR: &str = "SYMPTOM_ENGINE_URL";
const ENGINE_TIMEOUT_VAR: &str = "SYMPTOM_ENGINE_TIMEOUT_SECS";

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "symptom_intelligence=info,warn"
}

/// Get the application data directory.
/// Falls back to a dot-directory under the working directory on
/// platforms without a data dir.
pub fn app_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("symptom-intelligence"))
        .unwrap_or_else(|| PathBuf::from(".symptom-intelligence"))
}

/// Directory backing the durable history store
pub fn history_dir() -> PathBuf {
    app_data_dir().join("history")
}

/// Default directory for exported reports
pub fn exports_dir() -> PathBuf {
    app_data_dir().join("exports")
}

/// Where and how to reach the triage engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl ServiceConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Read `SYMPTOM_ENGINE_URL` and `SYMPTOM_ENGINE_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let base_url = lookup(ENGINE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENGINE_URL.to_string());
        let mut config = Self::new(base_url.trim());

        if let Some(raw) = lookup(ENGINE_TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout_secs = secs,
                _ => tracing::warn!(value = %raw, "Ignoring invalid {ENGINE_TIMEOUT_VAR}"),
            }
        }
        config
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_URL)
    }
}
