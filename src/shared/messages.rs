//! Message types for communication between the UI surface and the orchestrator

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;

use crate::client::ModelEntry;
use crate::notifications::{Notification, NotificationId};
use crate::pipeline::{DetectionResult, DetectionStats, MediaFile, Modality, PreviewImage};
use crate::shared::ServiceStatus;
use crate::stream::RecentEvent;

/// User actions sent from the UI to the orchestrator
#[derive(Debug, Clone)]
pub enum DashboardEvent {
    /// A model was picked from the list
    SelectModel(String),
    /// The confidence slider moved
    SetConfidence(f32),
    /// A file was picked or dropped on the image area
    ImageSelected(MediaFile),
    /// A file was picked or dropped on the video area
    VideoSelected(MediaFile),
    /// Start the live stream
    StartStream,
    /// Stop the live stream
    StopStream,
    /// Re-run the health check
    RefreshHealth,
    /// Re-read the model list
    RefreshModels,
    /// Close a notification before it expires
    DismissNotification(NotificationId),
    /// Stop the event loop
    Shutdown,
}

/// State changes sent from the orchestrator to the UI
#[derive(Debug, Clone)]
pub enum UiUpdate {
    /// Loading indicator: `Some(message)` to show, `None` to hide
    Busy(Option<String>),
    /// A notification appeared
    NotificationShown(Notification),
    /// A notification was dismissed or expired
    NotificationRetired(NotificationId),
    /// Service connection status
    ServiceStatus(ServiceStatus),
    /// Models available on the server
    Models(Vec<ModelEntry>),
    /// Local preview of a newly selected file
    PreviewShown(PreviewImage),
    /// A preview was superseded or torn down
    PreviewReleased { modality: Modality, preview_id: u64 },
    /// A completed detection, replacing the previous result of its modality
    Result(DetectionResult),
    /// Aggregate counts of the latest image result
    Statistics(DetectionStats),
    /// Live feed binding: `Some(url)` while streaming, `None` when idle
    StreamSource(Option<String>),
    /// Counts from the latest live statistics refresh
    LiveStatistics(DetectionStats),
    /// Recent live events, newest first
    RecentEvents(Vec<RecentEvent>),
}

/// Outbound half of the UI channel
///
/// Sending never blocks and never fails: once the UI has gone away updates
/// are dropped.
#[derive(Debug, Clone)]
pub struct UiSink {
    tx: Sender<UiUpdate>,
}

impl UiSink {
    /// Wrap an existing sender
    pub fn new(tx: Sender<UiUpdate>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiver the UI drains
    pub fn channel() -> (Self, Receiver<UiUpdate>) {
        let (tx, rx) = unbounded();
        (Self::new(tx), rx)
    }

    /// Publish an update to the UI
    pub fn send(&self, update: UiUpdate) {
        if self.tx.send(update).is_err() {
            trace!("UI receiver dropped, discarding update");
        }
    }
}
