use crate::error::{MixerError, Result};
use crate::protocol::FunctionCall;
use std::time::Duration;

/// HTTP connection to the mixer API
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Clone, Debug)]
pub struct Connection {
    http: reqwest::Client,
    endpoint: String,
}

impl Connection {
    /// Create a connection for an API base URL such as `http://10.0.0.5:8088/api`
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/');
        if base.is_empty() {
            return Err(MixerError::InvalidConfig("empty base URL".to_string()));
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            http,
            endpoint: format!("{}/", base),
        })
    }

    /// URL serving the state document and accepting function calls
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Fetch the state document text
    pub async fn fetch_state(&self) -> Result<String> {
        self.get_text(&self.endpoint).await
    }

    /// GET a URL and return its body, failing on non-success status
    pub async fn get_text(&self, url: &str) -> Result<String> {
        tracing::debug!("GET {}", url);

        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MixerError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Issue a function call; the response body is ignored
    pub async fn call(&self, call: &FunctionCall) -> Result<()> {
        let query = call.query();
        tracing::debug!("Calling {} {:?}", call.function(), query);

        let response = self.http.get(&self.endpoint).query(&query).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MixerError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(())
    }
}
