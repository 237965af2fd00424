use crate::error::{EsgenError, Result};
use crate::version::EngineVersion;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Requests shorter than this are raised to it.
pub const MIN_REQUEST_TIMEOUT_SECS: u64 = 30;

const DEFAULT_URL: &str = "http://127.0.0.1:9200";
const DEFAULT_ENGINE_VERSION: &str = "5.6";
const DEFAULT_MAX_FAN_OUT: usize = 256;

/// Connection settings for the search engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub url: String,
    pub engine_version: String,
    pub request_timeout_secs: u64,
    /// Upper bound on the number of (index, type) combinations a request
    /// with omitted index/type may expand into.
    pub max_fan_out: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            url: DEFAULT_URL.to_string(),
            engine_version: DEFAULT_ENGINE_VERSION.to_string(),
            request_timeout_secs: MIN_REQUEST_TIMEOUT_SECS,
            max_fan_out: DEFAULT_MAX_FAN_OUT,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// `ESGEN_ENV=debug` selects `ESGEN_DEBUG_URL` / `ESGEN_DEBUG_VERSION`,
    /// anything else selects `ESGEN_RELEASE_URL` / `ESGEN_RELEASE_VERSION`.
    ///
    /// Optional: `ESGEN_REQUEST_TIMEOUT_SECS` (floor 30),
    /// `ESGEN_MAX_FAN_OUT` (default 256).
    pub fn from_env() -> Result<Self> {
        let profile = if env::var("ESGEN_ENV")
            .map(|v| v.eq_ignore_ascii_case("debug"))
            .unwrap_or(false)
        {
            "DEBUG"
        } else {
            "RELEASE"
        };

        let url = env::var(format!("ESGEN_{}_URL", profile))
            .unwrap_or_else(|_| DEFAULT_URL.to_string());
        let engine_version = env::var(format!("ESGEN_{}_VERSION", profile))
            .unwrap_or_else(|_| DEFAULT_ENGINE_VERSION.to_string());

        let request_timeout_secs = match env::var("ESGEN_REQUEST_TIMEOUT_SECS") {
            Ok(s) => s.parse::<u64>().map_err(|_| {
                EsgenError::Config(format!("Invalid ESGEN_REQUEST_TIMEOUT_SECS: {}", s))
            })?,
            Err(_) => MIN_REQUEST_TIMEOUT_SECS,
        };

        let max_fan_out = match env::var("ESGEN_MAX_FAN_OUT") {
            Ok(s) => s
                .parse::<usize>()
                .map_err(|_| EsgenError::Config(format!("Invalid ESGEN_MAX_FAN_OUT: {}", s)))?,
            Err(_) => DEFAULT_MAX_FAN_OUT,
        };

        let config = EngineConfig {
            url,
            engine_version,
            request_timeout_secs: request_timeout_secs.max(MIN_REQUEST_TIMEOUT_SECS),
            max_fan_out,
        };
        config.validate()?;

        tracing::info!(
            "Loaded engine config: url={}, version={}, profile={}",
            config.url,
            config.engine_version,
            profile.to_lowercase()
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(EsgenError::Config(format!(
                "Engine URL must start with http:// or https://, got: {}",
                self.url
            )));
        }
        if self.max_fan_out == 0 {
            return Err(EsgenError::Config(
                "max_fan_out must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn version(&self) -> EngineVersion {
        EngineVersion::detect(&self.engine_version)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(MIN_REQUEST_TIMEOUT_SECS))
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_engine_version(mut self, version: impl Into<String>) -> Self {
        self.engine_version = version.into();
        self
    }
}
