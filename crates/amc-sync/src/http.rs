use reqwest::header::ACCEPT;
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::SyncError;
use crate::transport::Transport;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// reqwest-backed transport rooted at a fixed base URL.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    base: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SyncError> {
        let parsed = Url::parse(base_url.trim()).map_err(|err| {
            SyncError::InvalidRequest(format!("invalid base url {base_url:?}: {err}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SyncError::InvalidRequest(format!(
                "unsupported scheme {:?} in base url",
                parsed.scheme()
            )));
        }
        let client = reqwest::Client::builder()
            .user_agent(concat!("amc-sync/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| SyncError::Transport {
                path: String::new(),
                message: format!("failed to build http client: {err}"),
            })?;
        Ok(Self {
            client,
            base: parsed.as_str().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn read_json(path: &str, response: reqwest::Response) -> Result<Value, SyncError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body_line = body.lines().next().unwrap_or_default().trim().to_string();
            return Err(SyncError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body: body_line,
            });
        }
        let body = response.text().await.map_err(|err| SyncError::Transport {
            path: path.to_string(),
            message: format!("failed to read body: {err}"),
        })?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|err| SyncError::decode(path, err))
    }
}

impl Transport for HttpTransport {
    async fn get(&self, path: &str) -> Result<Value, SyncError> {
        let response = self
            .client
            .get(self.url_for(path))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|err| transport_error(path, err))?;
        Self::read_json(path, response).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> Result<Value, SyncError> {
        let mut request = self
            .client
            .post(self.url_for(path))
            .header(ACCEPT, "application/json");
        if let Some(body) = body.as_ref() {
            request = request.json(body);
        }
        let response = request
            .send()
            .await
            .map_err(|err| transport_error(path, err))?;
        Self::read_json(path, response).await
    }
}

fn transport_error(path: &str, err: reqwest::Error) -> SyncError {
    let message = if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("backend unreachable: {err}")
    } else {
        err.to_string()
    };
    SyncError::Transport {
        path: path.to_string(),
        message,
    }
}
