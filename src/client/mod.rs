//! Remote Detection Service
//!
//! The contract the dashboard consumes from the detection server, plus the
//! reqwest-backed implementation used by the binary.

pub mod http;
#[cfg(test)]
pub mod fake;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::{MediaFile, Modality};

pub use http::HttpDetectionClient;

/// Class label counted as a helmet in aggregate statistics
pub const HELMET_LABEL: &str = "Helmet";
/// Class label counted as a vest in aggregate statistics
pub const VEST_LABEL: &str = "Vest";

/// Errors reaching the service or reading its reply
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, TLS or protocol error from the HTTP stack
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// No connection could be opened to the service
    #[error("service unreachable: {0}")]
    Unreachable(String),
    /// The reply body was not the JSON we expected
    #[error("unreadable response (HTTP {status}): {reason}")]
    Decode { status: u16, reason: String },
}

/// `GET /health`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub model_loaded: bool,
    #[serde(default)]
    pub status: Option<String>,
}

/// One entry of `GET /models`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    /// Server-side path passed back to `/load-model`
    pub path: String,
    /// Display name
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ModelsReply {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

/// `POST /load-model`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadModelReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// A single detected object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub label: String,
    #[serde(default)]
    pub confidence: f32,
    /// Pixel box as (x1, y1, x2, y2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[i32; 4]>,
}

impl Detection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
            bbox: None,
        }
    }
}

/// Reply of `POST /detect/image` and `POST /detect/video`
///
/// Both endpoints share one shape; fields that only one modality fills are
/// optional. A body without `success` is a failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// Annotated JPEG, base64 encoded (image only)
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub total_detections: Option<u64>,
    #[serde(default)]
    pub detections: Vec<Detection>,
    /// Server-side name of the annotated video (video only)
    #[serde(default)]
    pub output_path: Option<String>,
    #[serde(default)]
    pub frame_count: Option<u64>,
    #[serde(default)]
    pub fps: Option<f64>,
}

#[cfg(test)]
impl DetectionReply {
    /// A failed reply carrying the server's error text
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Operations the dashboard needs from the detection server
#[async_trait]
pub trait DetectionService: Send + Sync {
    async fn health(&self) -> Result<HealthReport, ClientError>;

    async fn models(&self) -> Result<Vec<ModelEntry>, ClientError>;

    async fn load_model(&self, model_path: &str) -> Result<LoadModelReply, ClientError>;

    /// Upload one file with the confidence threshold to the modality's endpoint
    async fn detect(
        &self,
        modality: Modality,
        file: &MediaFile,
        confidence: f32,
    ) -> Result<DetectionReply, ClientError>;

    /// URL of the continuously updating live feed
    fn stream_url(&self, cache_bust: u64) -> String;

    /// URL where an annotated video can be played back
    fn video_url(&self, output_path: &str) -> String;
}
