//! Media Submission Pipeline
//!
//! Validate, preview, submit and render for one upload modality. The image
//! and video pipelines are the same type, parameterized by [`Modality`].

pub mod media;
pub mod result;

pub use media::{MediaFile, Modality, PreviewImage};
pub use result::{DetectionResult, DetectionStats, RenderedMedia};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use media::UploadArtifact;

use crate::busy::BusyGate;
use crate::client::DetectionService;
use crate::error::DetectionError;
use crate::notifications::{NotificationQueue, Severity};
use crate::shared::{UiSink, UiUpdate};

/// Submission pipeline for one modality
///
/// Results are published last-completed-wins: whichever submission finishes
/// last owns the displayed result, with no further locking in the renderer.
pub struct MediaSubmissionPipeline {
    modality: Modality,
    service: Arc<dyn DetectionService>,
    busy: Arc<BusyGate>,
    notifications: NotificationQueue,
    sink: UiSink,
    /// Upload owning the preview slot; replacing it releases the old preview
    artifact: Arc<Mutex<Option<UploadArtifact>>>,
    next_artifact: AtomicU64,
}

impl MediaSubmissionPipeline {
    pub fn new(
        modality: Modality,
        service: Arc<dyn DetectionService>,
        busy: Arc<BusyGate>,
        notifications: NotificationQueue,
        sink: UiSink,
    ) -> Self {
        Self {
            modality,
            service,
            busy,
            notifications,
            sink,
            artifact: Arc::new(Mutex::new(None)),
            next_artifact: AtomicU64::new(0),
        }
    }

    /// Run one submission end to end
    ///
    /// Every failure is logged and reported as a single error notification;
    /// `None` means the attempt produced no result.
    pub async fn submit(&self, file: MediaFile, confidence: f32) -> Option<DetectionResult> {
        match self.try_submit(file, confidence).await {
            Ok(result) => Some(result),
            Err(err) => {
                match &err {
                    DetectionError::InvalidMediaType { .. } => warn!("Rejected upload: {}", err),
                    _ => error!("{} detection failed: {}", self.modality, err),
                }
                self.notifications
                    .push(err.user_message(self.modality), Severity::Error);
                None
            }
        }
    }

    async fn try_submit(
        &self,
        file: MediaFile,
        confidence: f32,
    ) -> Result<DetectionResult, DetectionError> {
        self.validate(&file)?;
        self.begin_preview(&file);

        info!(
            "Submitting {} {} ({} bytes) at confidence {:.2}",
            self.modality,
            file.name,
            file.len(),
            confidence
        );

        let reply = {
            let _busy = self.busy.scoped(self.modality.busy_message());
            self.service.detect(self.modality, &file, confidence).await?
        };

        if !reply.success {
            return Err(DetectionError::ServiceFailure(reply.error));
        }

        let result =
            DetectionResult::from_reply(self.modality, &file.name, reply, self.service.as_ref())?;
        self.render(&result);
        Ok(result)
    }

    fn validate(&self, file: &MediaFile) -> Result<(), DetectionError> {
        if self.modality.accepts(&file.mime) {
            Ok(())
        } else {
            Err(DetectionError::InvalidMediaType {
                expected: self.modality,
                declared: file.mime.clone(),
            })
        }
    }

    /// Take over the preview slot and decode the preview in the background
    ///
    /// Never awaited by the submission: the preview shows whenever decoding
    /// finishes, and a decode failure does not stop the upload.
    fn begin_preview(&self, file: &MediaFile) {
        let id = self.next_artifact.fetch_add(1, Ordering::Relaxed) + 1;
        let upload = UploadArtifact::new(id, self.modality, self.sink.clone());
        let superseded = self.artifact.lock().replace(upload);
        drop(superseded);

        let modality = self.modality;
        let file = file.clone();
        let slot = Arc::clone(&self.artifact);
        tokio::spawn(async move {
            let preview =
                match tokio::task::spawn_blocking(move || PreviewImage::build(modality, id, &file))
                    .await
                {
                    Ok(preview) => preview,
                    Err(e) => {
                        warn!("Preview worker for {} #{} failed: {}", modality, id, e);
                        return;
                    }
                };

            let mut slot = slot.lock();
            match slot.as_mut() {
                Some(upload) if upload.id() == id => upload.show_preview(preview),
                _ => debug!("Discarding preview of superseded {} #{}", modality, id),
            }
        });
    }

    /// Replace the displayed result and refresh the statistics panel
    fn render(&self, result: &DetectionResult) {
        self.sink.send(UiUpdate::Result(result.clone()));
        if result.has_detection_list() {
            self.sink.send(UiUpdate::Statistics(result.stats()));
        }
        debug!(
            "{} result rendered: {} detections",
            self.modality,
            result.metrics().total_detections
        );
    }
}

#[cfg(test)]
impl MediaSubmissionPipeline {
    /// Id of the upload currently owning the preview slot
    pub fn current_upload(&self) -> Option<u64> {
        self.artifact.lock().as_ref().map(UploadArtifact::id)
    }
}
