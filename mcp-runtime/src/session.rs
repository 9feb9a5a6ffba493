use std::time::Instant;

use chrono::{DateTime, Utc};
use fmtools_core::{Error, FileMakerConfig, Result};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use crate::data_api::{self, DataApi};

/// An authenticated Data API session.
///
/// `generation` increases by one each time the manager opens a new session,
/// so a caller holding a rejected token can tell whether someone else has
/// already replaced it.
#[derive(Debug, Clone)]
pub struct Session {
    pub token: String,
    pub obtained_at: DateTime<Utc>,
    pub generation: u64,
}

/// Owns the one live session token for the process.
///
/// All mutation goes through a single async lock: concurrent callers that
/// find the token stale wait for one re-authentication instead of starting
/// their own.
pub struct SessionManager {
    http: reqwest::Client,
    api: DataApi,
    username: String,
    password: String,
    current: Mutex<Option<Session>>,
}

impl SessionManager {
    pub fn new(config: &FileMakerConfig) -> Result<Self> {
        Ok(Self::with_client(
            data_api::client(config)?,
            DataApi::new(config)?,
            config,
        ))
    }

    pub(crate) fn with_client(
        http: reqwest::Client,
        api: DataApi,
        config: &FileMakerConfig,
    ) -> Self {
        Self {
            http,
            api,
            username: config.username.clone(),
            password: config.password.clone(),
            current: Mutex::new(None),
        }
    }

    /// Open a new session with basic auth.
    ///
    /// Does not touch the cached session and returns it with generation 0;
    /// use [`SessionManager::current`] or [`SessionManager::refresh`] to
    /// install one.
    pub async fn authenticate(&self) -> Result<Session> {
        let url = self.api.sessions_url()?;
        let started = Instant::now();

        let response = self
            .http
            .post(url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| Error::Auth {
                status: None,
                body: e.to_string(),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Error::Auth {
            status: Some(status.as_u16()),
            body: e.to_string(),
        })?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "FileMaker rejected the login");
            return Err(Error::Auth {
                status: Some(status.as_u16()),
                body,
            });
        }

        let token = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|v| {
                v.pointer("/response/token")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Auth {
                status: Some(status.as_u16()),
                body: "login response did not contain a session token".to_string(),
            })?;

        tracing::info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "FileMaker session opened"
        );
        Ok(Session {
            token,
            obtained_at: Utc::now(),
            generation: 0,
        })
    }

    /// The live session, authenticating first if there is none.
    pub async fn current(&self) -> Result<Session> {
        let mut guard = self.current.lock().await;
        if let Some(session) = guard.as_ref() {
            return Ok(session.clone());
        }
        let session = self.open(0).await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    /// Replace `stale` with a fresh session.
    ///
    /// If another caller already replaced it while this one waited for the
    /// lock, the newer session is returned without re-authenticating.
    pub async fn refresh(&self, stale: &Session) -> Result<Session> {
        let mut guard = self.current.lock().await;
        let previous = match guard.as_ref() {
            Some(held) if held.generation > stale.generation => {
                tracing::debug!(generation = held.generation, "session already refreshed");
                return Ok(held.clone());
            }
            Some(held) => held.generation,
            None => stale.generation,
        };
        let age_secs = (Utc::now() - stale.obtained_at).num_seconds();
        tracing::info!(
            generation = previous,
            age_secs,
            "session token rejected, re-authenticating"
        );
        let session = self.open(previous).await?;
        *guard = Some(session.clone());
        Ok(session)
    }

    async fn open(&self, previous_generation: u64) -> Result<Session> {
        let mut session = self.authenticate().await?;
        session.generation = previous_generation + 1;
        Ok(session)
    }

    /// Release the server-side session. Best effort: failures are logged
    /// and swallowed.
    pub async fn close(&self) {
        let Some(session) = self.current.lock().await.take() else {
            return;
        };
        let url = match self.api.session_url(&session.token) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("could not build session URL: {e}");
                return;
            }
        };
        match self.http.delete(url).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::info!("FileMaker session closed");
            }
            Ok(response) => {
                tracing::warn!(
                    status = response.status().as_u16(),
                    "FileMaker refused to close the session"
                );
            }
            Err(e) => tracing::warn!("failed to close FileMaker session: {e}"),
        }
    }

    /// Generation of the cached session, if one is open.
    pub async fn generation(&self) -> Option<u64> {
        self.current.lock().await.as_ref().map(|s| s.generation)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use fmtools_core::RawConnectionSettings;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) const SESSIONS_PATH: &str = "/fmi/data/v1/databases/Invoices/sessions";

    pub(crate) fn config_for(server: &MockServer) -> FileMakerConfig {
        let address = server.address();
        RawConnectionSettings {
            host: Some(address.to_string()),
            database: Some("Invoices".to_string()),
            layout: Some("API".to_string()),
            username: Some("api".to_string()),
            password: Some("pw".to_string()),
            scheme: Some("http".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        }
        .resolve()
        .expect("mock server settings should resolve")
    }

    pub(crate) fn login_ok(token: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "response": { "token": token },
            "messages": [{ "code": "0", "message": "OK" }]
        }))
    }

    #[tokio::test]
    async fn authenticate_posts_basic_auth_and_reads_token() {
        let server = MockServer::start().await;
        // "api:pw" in base64
        Mock::given(method("POST"))
            .and(path(SESSIONS_PATH))
            .and(header("authorization", "Basic YXBpOnB3"))
            .respond_with(login_ok("tok-1"))
            .expect(1)
            .mount(&server)
            .await;

        let manager = SessionManager::new(&config_for(&server)).expect("session manager should build");
        let session = manager.authenticate().await.unwrap();
        assert_eq!(session.token, "tok-1");
        assert_eq!(session.generation, 0);
        assert_eq!(manager.generation().await, None);
    }

    #[tokio::test]
    async fn bad_credentials_fail_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SESSIONS_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid user account"))
            .mount(&server)
            .await;

        let manager = SessionManager::new(&config_for(&server)).expect("session manager should build");
        let err = manager.current().await.unwrap_err();
        match err {
            Error::Auth { status, body } => {
                assert_eq!(status, Some(401));
                assert!(body.contains("Invalid user account"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(manager.generation().await, None);
    }

    #[tokio::test]
    async fn missing_token_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SESSIONS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": {} })))
            .mount(&server)
            .await;

        let manager = SessionManager::new(&config_for(&server)).expect("session manager should build");
        assert!(matches!(
            manager.authenticate().await,
            Err(Error::Auth { status: Some(200), .. })
        ));
    }

    #[tokio::test]
    async fn current_reuses_the_cached_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SESSIONS_PATH))
            .respond_with(login_ok("tok-1"))
            .expect(1)
            .mount(&server)
            .await;

        let manager = SessionManager::new(&config_for(&server)).expect("session manager should build");
        let first = manager.current().await.unwrap();
        let second = manager.current().await.unwrap();
        assert_eq!(first.token, second.token);
        assert_eq!(second.generation, 1);
    }

    #[tokio::test]
    async fn concurrent_refreshes_reauthenticate_once() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SESSIONS_PATH))
            .respond_with(login_ok("tok"))
            .expect(2)
            .mount(&server)
            .await;

        let manager = Arc::new(SessionManager::new(&config_for(&server)).expect("session manager should build"));
        let stale = manager.current().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            let stale = stale.clone();
            handles.push(tokio::spawn(async move { manager.refresh(&stale).await }));
        }
        for handle in handles {
            let session = handle.await.unwrap().unwrap();
            assert_eq!(session.generation, 2);
        }
        assert_eq!(manager.generation().await, Some(2));
    }

    #[tokio::test]
    async fn close_deletes_the_session_and_forgets_it() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SESSIONS_PATH))
            .respond_with(login_ok("tok-9"))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{SESSIONS_PATH}/tok-9")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": {} })))
            .expect(1)
            .mount(&server)
            .await;

        let manager = SessionManager::new(&config_for(&server)).expect("session manager should build");
        manager.current().await.unwrap();
        manager.close().await;
        assert_eq!(manager.generation().await, None);
        // nothing left to close
        manager.close().await;
    }
}
