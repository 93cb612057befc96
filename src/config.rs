//! Configuration types for lingohub

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// HTTP transport configuration used by [`HttpClient`](crate::client::HttpClient)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

/// Export workflow configuration (polling and on-disk layout)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Delay between two export status checks (default: 5 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Maximum number of status checks before giving up (default: 360, i.e. 30 minutes)
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Root holding one pre-existing directory per locale (default: "app/locales")
    #[serde(default = "default_locales_root")]
    pub locales_root: PathBuf,

    /// Directory under which per-export workspaces are created (default: system temp dir)
    #[serde(default = "std::env::temp_dir")]
    pub workspace_root: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_poll_attempts: default_max_poll_attempts(),
            locales_root: default_locales_root(),
            workspace_root: std::env::temp_dir(),
        }
    }
}

/// Main configuration for a [`RemoteProject`](crate::RemoteProject)
///
/// - [`http`](HttpConfig): transport timeout and user agent
/// - [`export`](ExportConfig): polling bounds, locale tree, workspace location
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Export workflow settings
    #[serde(default)]
    pub export: ExportConfig,
}

impl Config {
    /// Check values that deserialize fine but cannot drive the export workflow
    pub fn validate(&self) -> Result<()> {
        if self.export.poll_interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("export.poll_interval".to_string()),
            });
        }
        if self.export.max_poll_attempts == 0 {
            return Err(Error::Config {
                message: "at least one export status check is required".to_string(),
                key: Some("export.max_poll_attempts".to_string()),
            });
        }
        if self.http.timeout.is_zero() {
            return Err(Error::Config {
                message: "request timeout must be greater than zero".to_string(),
                key: Some("http.timeout".to_string()),
            });
        }
        Ok(())
    }
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    format!("lingohub-rs/{}", env!("CARGO_PKG_VERSION"))
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_max_poll_attempts() -> u32 {
    360
}

fn default_locales_root() -> PathBuf {
    PathBuf::from("app/locales")
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
