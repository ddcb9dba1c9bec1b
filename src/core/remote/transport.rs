use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::core::config::ServerEntry;
use crate::error::{HostwatchError, Result};

/// REST API version spoken by remote servers
pub const API_VERSION: u8 = 4;

/// Request/response access to a remote server's stats.
pub trait RemoteTransport: Send + Sync {
    /// Succeeds when the server answers its status endpoint.
    fn ping(&self, server: &ServerEntry) -> Result<()>;

    /// JSON document at `path`, relative to the API root.
    fn get_json(&self, server: &ServerEntry, path: &str) -> Result<Value>;
}

/// Blocking HTTP client for the `/api/4` REST endpoints.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("hostwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HostwatchError::remote(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    fn get(&self, server: &ServerEntry, path: &str) -> Result<reqwest::blocking::Response> {
        let url = endpoint(server, path)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| HostwatchError::remote(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(HostwatchError::remote(format!(
                "{} returned status {}",
                url,
                response.status()
            )));
        }
        Ok(response)
    }
}

impl RemoteTransport for HttpTransport {
    fn ping(&self, server: &ServerEntry) -> Result<()> {
        self.get(server, "status").map(|_| ())
    }

    fn get_json(&self, server: &ServerEntry, path: &str) -> Result<Value> {
        self.get(server, path)?
            .json()
            .map_err(|e| HostwatchError::remote(format!("invalid JSON from {}: {}", server.host, e)))
    }
}

/// `http://<host>:<port>/api/4/<path>`
pub fn endpoint(server: &ServerEntry, path: &str) -> Result<Url> {
    let base = format!("http://{}:{}/api/{}/", server.host, server.port, API_VERSION);
    Url::parse(&base)
        .and_then(|base| base.join(path.trim_start_matches('/')))
        .map_err(|e| HostwatchError::remote(format!("invalid server address {}: {}", server.host, e)))
}
