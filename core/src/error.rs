use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Structured error payload returned to agents and to the form UI.
/// Every failed tool call carries enough information for the caller to
/// understand what went wrong and how to fix it.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    /// Machine-readable error code (e.g. "auth_failed", "invalid_arguments")
    pub error: String,
    /// Human/agent-readable description of what went wrong
    pub message: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
    /// Extra structured context (HTTP status, script name, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error codes used across the workspace
pub mod codes {
    pub const CONFIG_INVALID: &str = "config_invalid";
    pub const AUTH_FAILED: &str = "auth_failed";
    pub const SCRIPT_FAILED: &str = "script_failed";
    pub const MALFORMED_ENVELOPE: &str = "malformed_envelope";
    pub const DISCOVERY_FAILED: &str = "discovery_failed";
    pub const REGISTRATION_REJECTED: &str = "registration_rejected";
    pub const INVALID_ARGUMENTS: &str = "invalid_arguments";
}

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or invalid startup configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Bad credentials or unreachable host. `status` is `None` when no HTTP
    /// response was received.
    #[error("authentication failed{}: {body}", status_suffix(.status))]
    Auth { status: Option<u16>, body: String },

    /// The remote script call failed (non-2xx, timeout, transport).
    #[error("script '{script}' failed{}: {body}", status_suffix(.status))]
    Invocation {
        script: String,
        status: Option<u16>,
        body: String,
    },

    /// The remote answered 2xx with a body that is not a Data API envelope.
    #[error("script '{script}' returned a malformed response: {message}")]
    MalformedEnvelope { script: String, message: String },

    /// The tool list could not be fetched or understood.
    #[error("tool discovery failed: {0}")]
    Discovery(String),

    /// One descriptor could not be turned into a registered tool.
    #[error("tool '{name}' was not registered: {reason}")]
    Registration { name: String, reason: String },

    /// Arguments supplied to a tool do not match its signature.
    #[error("invalid arguments for tool '{tool}': {message}")]
    Argument { tool: String, message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!(" with status {status}"),
        None => String::new(),
    }
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery(msg.into())
    }

    pub fn argument(tool: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Argument {
            tool: tool.into(),
            message: msg.into(),
        }
    }

    pub fn registration(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Registration {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True when the remote rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            Error::Auth {
                status: Some(401),
                ..
            } | Error::Invocation {
                status: Some(401),
                ..
            }
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => codes::CONFIG_INVALID,
            Error::Auth { .. } => codes::AUTH_FAILED,
            Error::Invocation { .. } => codes::SCRIPT_FAILED,
            Error::MalformedEnvelope { .. } => codes::MALFORMED_ENVELOPE,
            Error::Discovery(_) => codes::DISCOVERY_FAILED,
            Error::Registration { .. } => codes::REGISTRATION_REJECTED,
            Error::Argument { .. } => codes::INVALID_ARGUMENTS,
        }
    }

    fn docs_hint(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some(
                "Set FM_HOST, FM_DATABASE, FM_LAYOUT, FM_USERNAME and FM_PASSWORD (env, .env or flags).",
            ),
            Error::Auth { .. } => Some(
                "Check FM_USERNAME/FM_PASSWORD and that the account has the fmrest extended privilege.",
            ),
            Error::Argument { .. } => Some("Call tools/list to see the tool's input schema."),
            Error::Discovery(_) => {
                Some("The discovery script must return {\"tools\": [...]} as its script result.")
            }
            _ => None,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::Auth { status, .. } => Some(serde_json::json!({ "status": status })),
            Error::Invocation { script, status, .. } => {
                Some(serde_json::json!({ "script": script, "status": status }))
            }
            Error::MalformedEnvelope { script, .. } => {
                Some(serde_json::json!({ "script": script }))
            }
            Error::Argument { tool, .. } => Some(serde_json::json!({ "tool": tool })),
            Error::Registration { name, .. } => Some(serde_json::json!({ "tool": name })),
            Error::Config(_) | Error::Discovery(_) => None,
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            error: self.code().to_string(),
            message: self.to_string(),
            docs_hint: self.docs_hint().map(str::to_string),
            details: self.details(),
        }
    }
}
