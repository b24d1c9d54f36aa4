//! Application configuration for the topic annotator.
//!
//! An optional TOML file provides the base values. CLI flags and environment
//! variables override file values, which override defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, TopicAnnotatorError};

/// Default PAC base URL, used for both reads and writes.
const DEFAULT_PAC_URL: &str = "http://test.api.ft.com";

// ---------------------------------------------------------------------------
// Config structs (matching the TOML schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Service identity and listener settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Smartlogic (taxonomy) endpoint.
    #[serde(default)]
    pub smartlogic: SmartlogicConfig,

    /// PAC (annotations) endpoints.
    #[serde(default)]
    pub pac: PacConfig,

    /// Outbound HTTP client settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// `[service]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// System code reported by the operational endpoints.
    #[serde(default = "default_app_name")]
    pub system_code: String,

    /// Application name.
    #[serde(default = "default_app_name")]
    pub name: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            system_code: default_app_name(),
            name: default_app_name(),
            port: default_port(),
        }
    }
}

fn default_app_name() -> String {
    "topic-annotator".into()
}
fn default_port() -> u16 {
    8080
}

/// `[smartlogic]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartlogicConfig {
    /// Value sent verbatim as the `Authorization` header.
    #[serde(default)]
    pub api_key: String,

    /// Full URL concepts are POSTed to.
    #[serde(default)]
    pub request_url: String,
}

/// `[pac]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacConfig {
    /// Value sent as the `X-Api-Key` header.
    #[serde(default)]
    pub api_key: String,

    /// Base URL for `GET /content/{uuid}/annotations`.
    #[serde(default = "default_pac_url")]
    pub read_url: String,

    /// Base URL for `POST /drafts/content/{uuid}/annotations/publish`.
    #[serde(default = "default_pac_url")]
    pub write_url: String,
}

impl Default for PacConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            read_url: default_pac_url(),
            write_url: default_pac_url(),
        }
    }
}

fn default_pac_url() -> String {
    DEFAULT_PAC_URL.into()
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout applied to every outbound request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content =
        std::fs::read_to_string(path).map_err(|e| TopicAnnotatorError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        TopicAnnotatorError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

impl AppConfig {
    /// Check that every required credential and endpoint is present.
    ///
    /// Called once at startup, before the listener binds.
    pub fn validate(&self) -> Result<()> {
        require_non_empty("smartlogic.api_key", &self.smartlogic.api_key)?;
        require_url("smartlogic.request_url", &self.smartlogic.request_url)?;
        require_non_empty("pac.api_key", &self.pac.api_key)?;
        require_url("pac.read_url", &self.pac.read_url)?;
        require_url("pac.write_url", &self.pac.write_url)?;

        if self.http.timeout_secs == 0 {
            return Err(TopicAnnotatorError::config(
                "http.timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

fn require_non_empty(key: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(TopicAnnotatorError::config(format!(
            "{key} is required but was not set"
        )));
    }
    Ok(())
}

fn require_url(key: &str, value: &str) -> Result<()> {
    require_non_empty(key, value)?;
    Url::parse(value)
        .map(|_| ())
        .map_err(|e| TopicAnnotatorError::config(format!("{key} is not a valid URL ({value}): {e}")))
}
