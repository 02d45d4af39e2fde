//! Dashboard orchestrator
//!
//! Owns the session configuration and routes UI events to the submission
//! pipelines, the stream session and the model and health requests.

use parking_lot::{Mutex, RwLock};
use std::ops::ControlFlow;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::busy::BusyGate;
use crate::client::DetectionService;
use crate::config::AppConfig;
use crate::notifications::{NotificationQueue, NotificationId, Severity};
use crate::pipeline::{MediaFile, MediaSubmissionPipeline, Modality};
use crate::shared::{DashboardEvent, ServiceStatus, SessionConfig, UiSink, UiUpdate};
use crate::stream::{PlaceholderSource, StreamSession};

/// Loading indicator text while a model loads
const LOADING_MODEL: &str = "Loading model...";

/// Coordinates every user-triggered operation
pub struct DashboardOrchestrator {
    session: RwLock<SessionConfig>,
    status: RwLock<ServiceStatus>,
    service: Arc<dyn DetectionService>,
    busy: Arc<BusyGate>,
    notifications: NotificationQueue,
    image: Arc<MediaSubmissionPipeline>,
    video: Arc<MediaSubmissionPipeline>,
    stream: StreamSession,
    sink: UiSink,
    /// Operations started by events and still running
    tasks: Mutex<JoinSet<()>>,
}

impl DashboardOrchestrator {
    /// Build the orchestrator and its components
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(
        session: SessionConfig,
        config: &AppConfig,
        service: Arc<dyn DetectionService>,
        sink: UiSink,
    ) -> Arc<Self> {
        let busy = Arc::new(BusyGate::new(sink.clone()));
        let notifications = NotificationQueue::with_ttl(sink.clone(), config.notifications.ttl());

        let pipeline = |modality| {
            Arc::new(MediaSubmissionPipeline::new(
                modality,
                service.clone(),
                busy.clone(),
                notifications.clone(),
                sink.clone(),
            ))
        };
        let image = pipeline(Modality::Image);
        let video = pipeline(Modality::Video);

        let stream = StreamSession::new(
            service.clone(),
            sink.clone(),
            config.stream.refresh_interval(),
            config.stream.recent_capacity,
            Box::new(PlaceholderSource::default()),
        );

        Arc::new(Self {
            session: RwLock::new(session),
            status: RwLock::new(ServiceStatus::Unknown),
            service,
            busy,
            notifications,
            image,
            video,
            stream,
            sink,
            tasks: Mutex::new(JoinSet::new()),
        })
    }

    /// Process events until `Shutdown` or until every sender is gone
    pub async fn run(self: Arc<Self>, mut events: mpsc::Receiver<DashboardEvent>) {
        self.startup().await;

        while let Some(event) = events.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }

        info!("Dashboard shutting down");
        self.stream.stop();
        self.settle().await;
    }

    /// One-shot reads shown at startup: model list and service health
    pub async fn startup(&self) {
        futures_util::future::join(self.refresh_models(), self.check_health()).await;
    }

    /// Route one UI event; long-running work is spawned so events keep flowing
    pub fn handle(self: &Arc<Self>, event: DashboardEvent) -> ControlFlow<()> {
        debug!("Event: {:?}", event);
        match event {
            DashboardEvent::SelectModel(path) => {
                let this = Arc::clone(self);
                self.spawn(async move { this.load_model(&path).await });
            }
            DashboardEvent::SetConfidence(value) => self.set_confidence(value),
            DashboardEvent::ImageSelected(file) => self.submit(Modality::Image, file),
            DashboardEvent::VideoSelected(file) => self.submit(Modality::Video, file),
            DashboardEvent::StartStream => {
                self.stream.start();
            }
            DashboardEvent::StopStream => {
                self.stream.stop();
            }
            DashboardEvent::RefreshHealth => {
                let this = Arc::clone(self);
                self.spawn(async move {
                    this.check_health().await;
                });
            }
            DashboardEvent::RefreshModels => {
                let this = Arc::clone(self);
                self.spawn(async move { this.refresh_models().await });
            }
            DashboardEvent::DismissNotification(id) => self.dismiss(id),
            DashboardEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Submit a file with the threshold as it is right now
    pub fn submit(&self, modality: Modality, file: MediaFile) {
        let (confidence, model) = {
            let session = self.session.read();
            (session.confidence_threshold, session.selected_model.clone())
        };
        debug!(
            "Submitting {} with model {} at {:.2}",
            file.name,
            model.as_deref().unwrap_or("(server default)"),
            confidence
        );
        let pipeline = match modality {
            Modality::Image => Arc::clone(&self.image),
            Modality::Video => Arc::clone(&self.video),
        };
        self.spawn(async move {
            pipeline.submit(file, confidence).await;
        });
    }

    /// Update the threshold used by the next submission
    pub fn set_confidence(&self, value: f32) {
        let mut session = self.session.write();
        if session.set_confidence(value) {
            debug!("Confidence threshold set to {:.2}", session.confidence_threshold);
        } else {
            warn!("Ignoring confidence threshold {}", value);
        }
    }

    /// Ask the server to load a model and record it on success
    pub async fn load_model(&self, model_path: &str) {
        let model_path = model_path.trim();
        if model_path.is_empty() {
            return;
        }

        let outcome = {
            let _busy = self.busy.scoped(LOADING_MODEL);
            self.service.load_model(model_path).await
        };

        match outcome {
            Ok(reply) if reply.success => {
                info!(
                    "Model loaded: {} ({})",
                    model_path,
                    reply.message.as_deref().unwrap_or("no detail")
                );
                self.session.write().select_model(model_path);
                self.notifications
                    .push("Model loaded successfully!", Severity::Success);
                self.check_health().await;
            }
            Ok(reply) => {
                warn!(
                    "Server refused model {}: {}",
                    model_path,
                    reply.error.as_deref().unwrap_or("no detail")
                );
                self.notifications.push("Failed to load model", Severity::Error);
            }
            Err(e) => {
                error!("Error loading model {}: {}", model_path, e);
                self.notifications.push("Error loading model", Severity::Error);
            }
        }
    }

    /// Query `/health` and publish the connection status
    pub async fn check_health(&self) -> ServiceStatus {
        let status = match self.service.health().await {
            Ok(report) => {
                debug!(
                    "Health: {} (model loaded: {})",
                    report.status.as_deref().unwrap_or("unknown"),
                    report.model_loaded
                );
                if report.model_loaded {
                    ServiceStatus::Connected
                } else {
                    ServiceStatus::ModelLoading
                }
            }
            Err(e) => {
                warn!("Health check failed: {}", e);
                ServiceStatus::Disconnected
            }
        };
        let previous = std::mem::replace(&mut *self.status.write(), status);
        if previous != status {
            info!("Service status: {}", status.name());
        }
        self.sink.send(UiUpdate::ServiceStatus(status));
        status
    }

    /// Re-read the model list; failures are only logged
    pub async fn refresh_models(&self) {
        match self.service.models().await {
            Ok(models) => {
                info!("{} models available", models.len());
                self.sink.send(UiUpdate::Models(models));
            }
            Err(e) => error!("Failed to load models: {}", e),
        }
    }

    pub fn dismiss(&self, id: NotificationId) {
        if !self.notifications.dismiss(id) {
            debug!("Notification {} already gone", id);
        }
    }

    /// Wait for every operation started so far
    pub async fn settle(&self) {
        loop {
            let mut tasks = std::mem::take(&mut *self.tasks.lock());
            if tasks.is_empty() {
                return;
            }
            while let Some(joined) = tasks.join_next().await {
                if let Err(e) = joined {
                    error!("Dashboard task failed: {}", e);
                }
            }
        }
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }
}

#[cfg(test)]
impl DashboardOrchestrator {
    /// Snapshot of the session configuration
    pub fn session(&self) -> SessionConfig {
        self.session.read().clone()
    }

    /// Last published connection status
    pub fn status(&self) -> ServiceStatus {
        *self.status.read()
    }

    pub fn busy(&self) -> &BusyGate {
        &self.busy
    }

    pub fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    pub fn stream(&self) -> &StreamSession {
        &self.stream
    }
}
