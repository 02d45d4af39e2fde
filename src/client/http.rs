//! reqwest implementation of the detection service contract

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{
    ClientError, DetectionReply, DetectionService, HealthReport, LoadModelReply, ModelEntry,
    ModelsReply,
};
use crate::pipeline::{MediaFile, Modality};

/// Default API root of the detection server
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api";

/// HTTP client for the detection server
///
/// No request timeout is configured: a call that never resolves keeps its
/// busy indicator up until a newer operation replaces it.
#[derive(Debug, Clone)]
pub struct HttpDetectionClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetectionClient {
    /// Create a client rooted at `base_url` (e.g. `http://localhost:5000/api`)
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("safety-dashboard/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Get the API root
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Read a JSON body whatever the status; the server reports failures as `{error}` with 4xx/5xx
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status().as_u16();
        let body = response.bytes().await?;
        parse_body(status, &body)
    }
}

/// Separate "nothing is listening" from other transport failures
fn send_error(e: reqwest::Error) -> ClientError {
    if e.is_connect() {
        ClientError::Unreachable(e.to_string())
    } else {
        ClientError::Transport(e)
    }
}

pub(crate) fn parse_body<T: DeserializeOwned>(status: u16, body: &[u8]) -> Result<T, ClientError> {
    serde_json::from_slice(body).map_err(|e| ClientError::Decode {
        status,
        reason: e.to_string(),
    })
}

#[async_trait]
impl DetectionService for HttpDetectionClient {
    async fn health(&self) -> Result<HealthReport, ClientError> {
        let response = self.client.get(self.endpoint("health")).send().await.map_err(send_error)?;
        Self::decode(response).await
    }

    async fn models(&self) -> Result<Vec<ModelEntry>, ClientError> {
        let response = self.client.get(self.endpoint("models")).send().await.map_err(send_error)?;
        let reply: ModelsReply = Self::decode(response).await?;
        Ok(reply.models)
    }

    async fn load_model(&self, model_path: &str) -> Result<LoadModelReply, ClientError> {
        let response = self
            .client
            .post(self.endpoint("load-model"))
            .json(&serde_json::json!({ "model_path": model_path }))
            .send()
            .await
            .map_err(send_error)?;
        Self::decode(response).await
    }

    async fn detect(
        &self,
        modality: Modality,
        file: &MediaFile,
        confidence: f32,
    ) -> Result<DetectionReply, ClientError> {
        let part = Part::bytes(file.data.to_vec())
            .file_name(file.name.clone())
            .mime_str(&file.mime)?;
        let form = Form::new()
            .part(modality.field_name(), part)
            .text("confidence", confidence.to_string());

        debug!(
            "POST {} ({} bytes, confidence {})",
            modality.endpoint(),
            file.len(),
            confidence
        );

        let response = self
            .client
            .post(self.endpoint(modality.endpoint()))
            .multipart(form)
            .send()
            .await
            .map_err(send_error)?;
        Self::decode(response).await
    }

    fn stream_url(&self, cache_bust: u64) -> String {
        format!("{}?t={}", self.endpoint("stream"), cache_bust)
    }

    fn video_url(&self, output_path: &str) -> String {
        self.endpoint(&format!("video/{}", output_path))
    }
}
