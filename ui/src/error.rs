use axum::Json;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use fmtools_core::{Error, ErrorPayload};
use serde_json::json;

use crate::render;

/// Errors that end a UI request early. Tool failures are not errors here:
/// the form shows them as the result text.
#[derive(Debug)]
pub enum UiError {
    /// No registered tool has this name (404 page)
    UnknownTool(String),
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        match self {
            UiError::UnknownTool(name) => {
                tracing::debug!(tool = %name, "unknown tool requested");
                (StatusCode::NOT_FOUND, Html(render::not_found_page(&name))).into_response()
            }
        }
    }
}

/// Failure of a JSON API call, rendered as `{ok: false, error: {...}}`.
#[derive(Debug)]
pub struct ApiFailure {
    status: StatusCode,
    payload: ErrorPayload,
}

impl ApiFailure {
    pub fn unknown_tool(name: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            payload: ErrorPayload {
                error: "unknown_tool".to_string(),
                message: format!("No tool named '{name}' is registered"),
                docs_hint: Some("GET / lists every registered tool.".to_string()),
                details: None,
            },
        }
    }

    pub fn bad_body(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            payload: ErrorPayload {
                error: "invalid_body".to_string(),
                message: message.into(),
                docs_hint: Some("Send the tool arguments as a JSON object.".to_string()),
                details: None,
            },
        }
    }
}

impl From<Error> for ApiFailure {
    fn from(err: Error) -> Self {
        let status = match &err {
            Error::Argument { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Auth { .. } | Error::Invocation { .. } | Error::MalformedEnvelope { .. } => {
                StatusCode::BAD_GATEWAY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            payload: err.to_payload(),
        }
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(json!({ "ok": false, "error": self.payload })),
        )
            .into_response()
    }
}
