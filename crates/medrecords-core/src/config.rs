//! Client configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::FALLBACK_SPECIALTY_ID;

/// Application-level constants
pub const APP_NAME: &str = "medrecords";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_API_URL: &str = "MEDRECORDS_API_URL";
pub const ENV_UPLOADS_PATH: &str = "MEDRECORDS_UPLOADS_PATH";
pub const ENV_TIMEOUT_SECS: &str = "MEDRECORDS_TIMEOUT_SECS";
pub const ENV_DEMO_PATIENT: &str = "MEDRECORDS_DEMO_PATIENT";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_UPLOADS_PATH: &str = "uploads";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default `tracing` filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "info,medrecords_core=debug,medrecords_http=debug"
}

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings shared by every backend and engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// REST API root, without trailing slash
    pub api_base_url: String,
    /// Path under the API root where bare attachment filenames live
    pub uploads_path: String,
    /// Per-request timeout
    pub request_timeout_secs: u64,
    /// `specialtyId` sent when the specialty is not in the catalog
    pub fallback_specialty_id: u32,
    /// Patient the root route redirects to, if any
    pub default_patient_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            uploads_path: DEFAULT_UPLOADS_PATH.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            fallback_specialty_id: FALLBACK_SPECIALTY_ID,
            default_patient_id: None,
        }
    }
}

impl ClientConfig {
    /// Create a config pointing at `api_base_url`, everything else default.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: trim_base(api_base_url.into()),
            ..Self::default()
        }
    }

    /// Load from a JSON file; missing keys take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut config: Self = serde_json::from_str(&text)?;
        config.api_base_url = trim_base(config.api_base_url);
        Ok(config)
    }

    /// Defaults overridden by `MEDRECORDS_*` environment variables.
    pub fn from_env() -> ConfigResult<Self> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the environment, in production).
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_base_url = trim_base(url);
        }
        if let Some(path) = lookup(ENV_UPLOADS_PATH) {
            self.uploads_path = path.trim_matches('/').to_string();
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TIMEOUT_SECS,
                value: raw.clone(),
            })?;
        }
        if let Some(patient) = lookup(ENV_DEMO_PATIENT) {
            let patient = patient.trim().to_string();
            self.default_patient_id = (!patient.is_empty()).then_some(patient);
        }
        Ok(self)
    }

    /// Resolve an attachment reference to a fetchable URL.
    ///
    /// References that already carry an http(s) scheme are used as-is; bare
    /// filenames live under the uploads path.
    pub fn attachment_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            return reference.to_string();
        }
        format!(
            "{}/{}/{}",
            self.api_base_url,
            self.uploads_path,
            reference.trim_start_matches('/')
        )
    }
}

fn trim_base(url: String) -> String {
    url.trim().trim_end_matches('/').to_string()
}
