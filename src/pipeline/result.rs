//! Detection results and aggregate statistics

use base64::Engine;
use std::sync::Arc;

use super::Modality;
use crate::client::{
    ClientError, Detection, DetectionReply, DetectionService, HELMET_LABEL, VEST_LABEL,
};
use crate::error::DetectionError;

/// Annotated media returned by the service
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedMedia {
    /// JPEG bytes with boxes drawn in
    Image(Arc<[u8]>),
    /// Where the annotated video can be played back
    Video { url: String },
    /// The reply carried no media
    Missing,
}

/// Modality-specific numbers reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResultMetrics {
    pub total_detections: u64,
    /// Frames processed (video only)
    pub frame_count: Option<u64>,
    /// Frame rate of the annotated output (video only)
    pub fps: Option<f64>,
}

/// Counts shown in the statistics panel
///
/// Labels other than helmet and vest count towards the total only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectionStats {
    pub total: usize,
    pub helmets: usize,
    pub vests: usize,
}

impl DetectionStats {
    /// Tally a detection list
    pub fn from_detections(detections: &[Detection]) -> Self {
        Self::from_labels(detections.iter().map(|d| d.label.as_str()))
    }

    /// Tally a sequence of class labels
    pub fn from_labels<'a>(labels: impl IntoIterator<Item = &'a str>) -> Self {
        labels.into_iter().fold(Self::default(), |mut stats, label| {
            stats.total += 1;
            match label {
                HELMET_LABEL => stats.helmets += 1,
                VEST_LABEL => stats.vests += 1,
                _ => {}
            }
            stats
        })
    }
}

/// Outcome of one successful submission; never changes after construction
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    modality: Modality,
    /// Name of the uploaded file
    file_name: String,
    detections: Vec<Detection>,
    media: RenderedMedia,
    metrics: ResultMetrics,
}

impl DetectionResult {
    pub fn new(
        modality: Modality,
        file_name: impl Into<String>,
        detections: Vec<Detection>,
        media: RenderedMedia,
        metrics: ResultMetrics,
    ) -> Self {
        Self {
            modality,
            file_name: file_name.into(),
            detections,
            media,
            metrics,
        }
    }

    /// Build a result from a successful service reply
    pub fn from_reply(
        modality: Modality,
        file_name: &str,
        reply: DetectionReply,
        service: &dyn DetectionService,
    ) -> Result<Self, DetectionError> {
        let media = match modality {
            Modality::Image => match reply.image.as_deref() {
                Some(encoded) => {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(encoded.trim())
                        .map_err(|e| ClientError::Decode {
                            status: 200,
                            reason: format!("annotated image payload: {}", e),
                        })?;
                    RenderedMedia::Image(bytes.into())
                }
                None => RenderedMedia::Missing,
            },
            Modality::Video => match reply.output_path.as_deref() {
                Some(path) => RenderedMedia::Video {
                    url: service.video_url(path),
                },
                None => RenderedMedia::Missing,
            },
        };

        let metrics = ResultMetrics {
            total_detections: reply
                .total_detections
                .unwrap_or(reply.detections.len() as u64),
            frame_count: reply.frame_count,
            fps: reply.fps,
        };

        Ok(Self::new(modality, file_name, reply.detections, media, metrics))
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn media(&self) -> &RenderedMedia {
        &self.media
    }

    pub fn metrics(&self) -> ResultMetrics {
        self.metrics
    }

    /// Aggregate counts over the detection list
    pub fn stats(&self) -> DetectionStats {
        DetectionStats::from_detections(&self.detections)
    }

    /// Whether the service returned per-object detections to aggregate
    pub fn has_detection_list(&self) -> bool {
        self.modality == Modality::Image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::fake::FakeService;

    #[test]
    fn test_stats_count_known_labels() {
        let detections = vec![
            Detection::new("Helmet", 0.9),
            Detection::new("Vest", 0.8),
            Detection::new("Helmet", 0.7),
        ];
        let stats = DetectionStats::from_detections(&detections);
        assert_eq!(stats, DetectionStats { total: 3, helmets: 2, vests: 1 });
    }

    #[test]
    fn test_stats_tolerate_unknown_labels() {
        let stats = DetectionStats::from_labels(["Helmet", "Gloves", "vest", "Vest"]);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.helmets, 1);
        assert_eq!(stats.vests, 1);
    }

    #[test]
    fn test_image_reply_decodes_payload() {
        let service = FakeService::new();
        let reply = DetectionReply {
            success: true,
            image: Some("/9j/AA==".to_string()),
            total_detections: Some(1),
            detections: vec![Detection::new("Vest", 0.66)],
            ..Default::default()
        };

        let result =
            DetectionResult::from_reply(Modality::Image, "cam1.png", reply, &service).unwrap();
        assert_eq!(result.file_name(), "cam1.png");
        assert_eq!(result.media(), &RenderedMedia::Image(vec![0xff, 0xd8, 0xff, 0x00].into()));
        assert_eq!(result.metrics().total_detections, 1);
        assert!(result.has_detection_list());
    }

    #[test]
    fn test_bad_image_payload_is_transport_failure() {
        let service = FakeService::new();
        let reply = DetectionReply {
            success: true,
            image: Some("!!not base64!!".to_string()),
            ..Default::default()
        };

        let err = DetectionResult::from_reply(Modality::Image, "cam1.png", reply, &service)
            .unwrap_err();
        assert!(matches!(err, DetectionError::TransportFailure(_)));
    }

    #[test]
    fn test_video_reply_builds_playback_url() {
        let service = FakeService::new();
        let reply = DetectionReply {
            success: true,
            output_path: Some("output_video_9.mp4".to_string()),
            frame_count: Some(300),
            total_detections: Some(42),
            fps: Some(25.0),
            ..Default::default()
        };

        let result =
            DetectionResult::from_reply(Modality::Video, "shift.mp4", reply, &service).unwrap();
        assert_eq!(
            result.media(),
            &RenderedMedia::Video {
                url: "http://fake/api/video/output_video_9.mp4".to_string()
            }
        );
        assert_eq!(result.metrics().frame_count, Some(300));
        assert_eq!(result.metrics().total_detections, 42);
        assert!(!result.has_detection_list());
    }
}
