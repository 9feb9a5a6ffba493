use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_SCHEME: &str = "https";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOOL_LIST_SCRIPT: &str = "GetToolList";

/// Connection settings as collected from flags, env or `.env`, before
/// validation. Every field of the FileMaker connection is optional here so
/// that all missing settings can be reported at once.
#[derive(Debug, Clone, Default)]
pub struct RawConnectionSettings {
    pub host: Option<String>,
    pub database: Option<String>,
    pub layout: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub scheme: Option<String>,
    pub timeout_secs: Option<u64>,
    pub tool_list_script: Option<String>,
}

impl RawConnectionSettings {
    /// Validate into a [`FileMakerConfig`]. Missing or blank required
    /// settings fail with one error naming every missing variable.
    pub fn resolve(self) -> Result<FileMakerConfig> {
        let mut missing = Vec::new();
        // Blank counts as missing. Values come back untrimmed.
        let mut take = |value: Option<String>, env_name: &'static str| -> String {
            match value {
                Some(v) if !v.trim().is_empty() => v,
                _ => {
                    missing.push(env_name);
                    String::new()
                }
            }
        };

        let host = take(self.host, "FM_HOST").trim().to_string();
        let database = take(self.database, "FM_DATABASE").trim().to_string();
        let layout = take(self.layout, "FM_LAYOUT").trim().to_string();
        let username = take(self.username, "FM_USERNAME").trim().to_string();
        // Spaces can be part of a FileMaker password.
        let password = take(self.password, "FM_PASSWORD");

        if !missing.is_empty() {
            return Err(Error::config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let scheme = self
            .scheme
            .map(|s| s.trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SCHEME.to_string());
        if scheme != "https" && scheme != "http" {
            return Err(Error::config(format!(
                "FM_SCHEME must be 'https' or 'http', got '{scheme}'"
            )));
        }

        let timeout_secs = self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::config("FM_TIMEOUT_SECS must be greater than zero"));
        }

        let tool_list_script = self
            .tool_list_script
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_TOOL_LIST_SCRIPT.to_string());

        Ok(FileMakerConfig {
            host: host.trim_end_matches('/').to_string(),
            database,
            layout,
            username,
            password,
            scheme,
            timeout: Duration::from_secs(timeout_secs),
            tool_list_script,
        })
    }
}

/// Validated FileMaker Data API connection settings.
#[derive(Clone)]
pub struct FileMakerConfig {
    /// Host name, optionally with a port (`fm.example.com`, `127.0.0.1:8443`)
    pub host: String,
    pub database: String,
    pub layout: String,
    pub username: String,
    pub password: String,
    /// `https` unless explicitly overridden
    pub scheme: String,
    /// Upper bound for every remote call
    pub timeout: Duration,
    /// Script that lists the exposed tools
    pub tool_list_script: String,
}

impl FileMakerConfig {
    /// `{scheme}://{host}`. The Data API path is appended by the client.
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host)
    }
}

impl fmt::Debug for FileMakerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMakerConfig")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("layout", &self.layout)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("scheme", &self.scheme)
            .field("timeout", &self.timeout)
            .field("tool_list_script", &self.tool_list_script)
            .finish()
    }
}
