use crate::{PinError, PinResult};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// Timeout for JSON store requests.
const STORE_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for multipart file uploads; larger payloads expected.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport strategy for a single pin attempt.
///
/// Selected at construction time ([`crate::PinClient::with_backend`]);
/// the HTTP implementation is the default and is always correct, richer
/// SDK-style integrations can be injected without touching the client's
/// retry loop. Implementations return the service's raw response
/// document; CID extraction happens in one place, in the client.
#[async_trait]
pub trait PinBackend: std::fmt::Debug + Send + Sync {
    /// Stores a JSON document, returning the service response.
    async fn store_json(&self, payload: &Value) -> PinResult<Value>;

    /// Uploads a local file, returning the service response.
    async fn upload_file(&self, path: &Path) -> PinResult<Value>;
}

/// Direct HTTP transport against the service's `/store` and `/upload`
/// endpoints with bearer-token auth.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    store_url: String,
    upload_url: String,
    credential: String,
    client: reqwest::Client,
}

impl HttpBackend {
    pub const DEFAULT_API_URL: &'static str = "https://api.nft.storage";

    pub fn new(api_url: &str, credential: impl Into<String>) -> Self {
        let base = api_url.trim_end_matches('/');
        HttpBackend {
            store_url: format!("{base}/store"),
            upload_url: format!("{base}/upload"),
            credential: credential.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn check_response(response: reqwest::Response) -> PinResult<Value> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(PinError::HttpFailWithBody(status, text));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PinBackend for HttpBackend {
    async fn store_json(&self, payload: &Value) -> PinResult<Value> {
        let response = self
            .client
            .post(&self.store_url)
            .bearer_auth(&self.credential)
            .timeout(STORE_TIMEOUT)
            .json(payload)
            .send()
            .await?;
        Self::check_response(response).await
    }

    async fn upload_file(&self, path: &Path) -> PinResult<Value> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_owned());
        let form = Form::new().part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(&self.upload_url)
            .bearer_auth(&self.credential)
            .timeout(UPLOAD_TIMEOUT)
            .multipart(form)
            .send()
            .await?;
        Self::check_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls_from_base() {
        let backend = HttpBackend::new("https://pin.example.com/", "KEY");
        assert_eq!(backend.store_url, "https://pin.example.com/store");
        assert_eq!(backend.upload_url, "https://pin.example.com/upload");
    }
}
