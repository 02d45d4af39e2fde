//! Scripted in-process detection service for tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use super::{
    ClientError, DetectionReply, DetectionService, HealthReport, LoadModelReply, ModelEntry,
};
use crate::pipeline::{MediaFile, Modality};

/// A canned reply, optionally delivered after a delay
struct Scripted<T> {
    delay: Duration,
    outcome: Result<T, String>,
}

impl<T> Scripted<T> {
    async fn deliver(self) -> Result<T, ClientError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.outcome.map_err(ClientError::Unreachable)
    }
}

/// One recorded `detect` call
#[derive(Debug, Clone, PartialEq)]
pub struct DetectCall {
    pub modality: Modality,
    pub file_name: String,
    pub confidence: f32,
}

/// Replays queued replies; falls back to a healthy, empty service when a queue is empty
#[derive(Default)]
pub struct FakeService {
    health: Mutex<VecDeque<Scripted<HealthReport>>>,
    models: Mutex<VecDeque<Scripted<Vec<ModelEntry>>>>,
    load_model: Mutex<VecDeque<Scripted<LoadModelReply>>>,
    detect: Mutex<VecDeque<Scripted<DetectionReply>>>,
    detect_calls: Mutex<Vec<DetectCall>>,
    load_model_calls: Mutex<Vec<String>>,
    health_calls: Mutex<usize>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_health(&self, outcome: Result<HealthReport, &str>) {
        self.health.lock().push_back(Scripted {
            delay: Duration::ZERO,
            outcome: outcome.map_err(str::to_string),
        });
    }

    pub fn push_models(&self, outcome: Result<Vec<ModelEntry>, &str>) {
        self.models.lock().push_back(Scripted {
            delay: Duration::ZERO,
            outcome: outcome.map_err(str::to_string),
        });
    }

    pub fn push_load_model(&self, outcome: Result<LoadModelReply, &str>) {
        self.load_model.lock().push_back(Scripted {
            delay: Duration::ZERO,
            outcome: outcome.map_err(str::to_string),
        });
    }

    pub fn push_detect(&self, reply: DetectionReply) {
        self.push_detect_after(Duration::ZERO, Ok(reply));
    }

    pub fn push_detect_after(&self, delay: Duration, outcome: Result<DetectionReply, &str>) {
        self.detect.lock().push_back(Scripted {
            delay,
            outcome: outcome.map_err(str::to_string),
        });
    }

    pub fn detect_calls(&self) -> Vec<DetectCall> {
        self.detect_calls.lock().clone()
    }

    pub fn load_model_calls(&self) -> Vec<String> {
        self.load_model_calls.lock().clone()
    }

    pub fn health_calls(&self) -> usize {
        *self.health_calls.lock()
    }
}

fn immediate<T>(value: T) -> Scripted<T> {
    Scripted {
        delay: Duration::ZERO,
        outcome: Ok(value),
    }
}

#[async_trait]
impl DetectionService for FakeService {
    async fn health(&self) -> Result<HealthReport, ClientError> {
        *self.health_calls.lock() += 1;
        let next = self.health.lock().pop_front();
        next.unwrap_or_else(|| {
            immediate(HealthReport {
                model_loaded: true,
                status: Some("healthy".to_string()),
            })
        })
        .deliver()
        .await
    }

    async fn models(&self) -> Result<Vec<ModelEntry>, ClientError> {
        let next = self.models.lock().pop_front();
        next.unwrap_or_else(|| immediate(Vec::new())).deliver().await
    }

    async fn load_model(&self, model_path: &str) -> Result<LoadModelReply, ClientError> {
        self.load_model_calls.lock().push(model_path.to_string());
        let next = self.load_model.lock().pop_front();
        next.unwrap_or_else(|| {
            immediate(LoadModelReply {
                success: true,
                ..Default::default()
            })
        })
        .deliver()
        .await
    }

    async fn detect(
        &self,
        modality: Modality,
        file: &MediaFile,
        confidence: f32,
    ) -> Result<DetectionReply, ClientError> {
        self.detect_calls.lock().push(DetectCall {
            modality,
            file_name: file.name.clone(),
            confidence,
        });
        let next = self.detect.lock().pop_front();
        next.unwrap_or_else(|| {
            immediate(DetectionReply {
                success: true,
                total_detections: Some(0),
                ..Default::default()
            })
        })
        .deliver()
        .await
    }

    fn stream_url(&self, cache_bust: u64) -> String {
        format!("http://fake/api/stream?t={}", cache_bust)
    }

    fn video_url(&self, output_path: &str) -> String {
        format!("http://fake/api/video/{}", output_path)
    }
}
