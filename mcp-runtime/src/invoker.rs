use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use fmtools_core::{Error, FileMakerConfig, Result, ScriptOutcome};
use reqwest::{StatusCode, Url};
use serde_json::{Map, Value};

use crate::data_api::{self, DataApi};
use crate::session::{Session, SessionManager};

/// Runs a named remote script with optional named parameters.
///
/// Everything above this trait (discovery, synthesized tools, the MCP
/// server, the form UI) only ever talks to a `ScriptInvoker`, so tests swap
/// in a fake.
#[async_trait]
pub trait ScriptInvoker: Send + Sync {
    async fn invoke(
        &self,
        script: &str,
        params: Option<&Map<String, Value>>,
    ) -> Result<ScriptOutcome>;
}

/// [`ScriptInvoker`] backed by the FileMaker Data API.
pub struct FileMakerInvoker {
    http: reqwest::Client,
    api: DataApi,
    sessions: Arc<SessionManager>,
}

impl FileMakerInvoker {
    pub fn new(config: &FileMakerConfig) -> Result<Self> {
        let http = data_api::client(config)?;
        let api = DataApi::new(config)?;
        let sessions = Arc::new(SessionManager::with_client(
            http.clone(),
            api.clone(),
            config,
        ));
        Ok(Self {
            http,
            api,
            sessions,
        })
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    fn script_url(&self, script: &str, params: Option<&Map<String, Value>>) -> Result<Url> {
        let mut url = self.api.script_url(script)?;
        if let Some(params) = params.filter(|p| !p.is_empty()) {
            let encoded = Value::Object(params.clone()).to_string();
            url.query_pairs_mut().append_pair("script.param", &encoded);
        }
        Ok(url)
    }

    async fn send(&self, url: &Url, session: &Session, script: &str) -> Result<(StatusCode, String)> {
        let response = self
            .http
            .get(url.clone())
            .bearer_auth(&session.token)
            .send()
            .await
            .map_err(|e| Error::Invocation {
                script: script.to_string(),
                status: None,
                body: e.to_string(),
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|e| Error::Invocation {
            script: script.to_string(),
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;
        Ok((status, body))
    }
}

#[async_trait]
impl ScriptInvoker for FileMakerInvoker {
    async fn invoke(
        &self,
        script: &str,
        params: Option<&Map<String, Value>>,
    ) -> Result<ScriptOutcome> {
        let url = self.script_url(script, params)?;
        let started = Instant::now();

        let session = self.sessions.current().await?;
        let (mut status, mut body) = self.send(&url, &session, script).await?;
        if status == StatusCode::UNAUTHORIZED {
            let fresh = self.sessions.refresh(&session).await?;
            (status, body) = self.send(&url, &fresh, script).await?;
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        if !status.is_success() {
            let err = Error::Invocation {
                script: script.to_string(),
                status: Some(status.as_u16()),
                body,
            };
            if err.is_unauthorized() {
                tracing::warn!(script, elapsed_ms, "token rejected again after re-authentication");
            } else {
                tracing::warn!(script, status = status.as_u16(), elapsed_ms, "script call failed");
            }
            return Err(err);
        }

        let outcome = decode_envelope(script, &body)?;
        tracing::info!(script, status = status.as_u16(), elapsed_ms, "script call completed");
        Ok(outcome)
    }
}

/// Decode a 2xx Data API body into a [`ScriptOutcome`].
///
/// The payload is `response.scriptResult`. A string result is parsed as JSON
/// when possible and kept as raw text otherwise. Without a `scriptResult`
/// the `response` object itself (or the whole body, when that is missing)
/// is the result.
pub fn decode_envelope(script: &str, body: &str) -> Result<ScriptOutcome> {
    let envelope: Value = serde_json::from_str(body).map_err(|e| Error::MalformedEnvelope {
        script: script.to_string(),
        message: format!("response body is not JSON: {e}"),
    })?;

    let response = match envelope.get("response") {
        Some(response) => response,
        None => &envelope,
    };

    if let Some(code) = response.get("scriptError").filter(|c| !is_zero_error(c)) {
        tracing::warn!(script, script_error = %code, "script reported an error code");
    }

    Ok(match response.get("scriptResult") {
        Some(Value::String(text)) => ScriptOutcome::decode(text),
        Some(other) => ScriptOutcome::Structured(other.clone()),
        None => ScriptOutcome::Structured(response.clone()),
    })
}

fn is_zero_error(code: &Value) -> bool {
    match code {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty() || s.trim() == "0",
        Value::Number(n) => n.as_i64() == Some(0),
        _ => false,
    }
}
