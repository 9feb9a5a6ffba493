use fmtools_core::{Error, FileMakerConfig, Result};
use reqwest::Url;

/// Builds FileMaker Data API URLs for one database/layout pair.
///
/// Every caller-supplied piece (database, layout, script name, token) is
/// pushed as a path segment so it is percent-encoded.
#[derive(Debug, Clone)]
pub struct DataApi {
    origin: Url,
    database: String,
    layout: String,
}

impl DataApi {
    pub fn new(config: &FileMakerConfig) -> Result<Self> {
        let origin = Url::parse(&config.origin())
            .map_err(|e| Error::config(format!("Invalid FM_HOST '{}': {e}", config.host)))?;
        if origin.cannot_be_a_base() || origin.host_str().is_none() {
            return Err(Error::config(format!(
                "Invalid FM_HOST '{}': not a host name",
                config.host
            )));
        }
        Ok(Self {
            origin,
            database: config.database.clone(),
            layout: config.layout.clone(),
        })
    }

    fn database_url(&self, tail: &[&str]) -> Result<Url> {
        let mut url = self.origin.clone();
        url.path_segments_mut()
            .map_err(|_| Error::config("FileMaker origin cannot carry a path"))?
            .clear()
            .extend(["fmi", "data", "v1", "databases", self.database.as_str()])
            .extend(tail);
        Ok(url)
    }

    /// `POST` here to open a session.
    pub fn sessions_url(&self) -> Result<Url> {
        self.database_url(&["sessions"])
    }

    /// `DELETE` here to close a session.
    pub fn session_url(&self, token: &str) -> Result<Url> {
        self.database_url(&["sessions", token])
    }

    /// `GET` here to run a script in the context of the configured layout.
    pub fn script_url(&self, script: &str) -> Result<Url> {
        self.database_url(&["layouts", self.layout.as_str(), "script", script])
    }
}

/// HTTP client shared by the session manager and the invoker. The timeout
/// bounds every remote call.
pub fn client(config: &FileMakerConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("fmtools/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))
}
