//! Session-level state owned by the orchestrator

use serde::{Deserialize, Serialize};

/// Default confidence threshold for new sessions
pub const DEFAULT_CONFIDENCE: f32 = 0.5;

/// User selections that parameterize every submission
///
/// Mutated only in response to explicit user events. Submissions take a
/// copy at submit time, so a threshold change never affects a request that
/// is already in flight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Server-side path of the model the user selected
    pub selected_model: Option<String>,
    /// Minimum detection confidence (0.0 - 1.0)
    pub confidence_threshold: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            selected_model: None,
            confidence_threshold: DEFAULT_CONFIDENCE,
        }
    }
}

impl SessionConfig {
    /// Create a session starting from the given threshold
    pub fn with_confidence(confidence: f32) -> Self {
        let mut config = Self::default();
        config.set_confidence(confidence);
        config
    }

    /// Set the confidence threshold, clamped into [0, 1]
    ///
    /// Returns false (and leaves the value untouched) for NaN or infinities.
    pub fn set_confidence(&mut self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.confidence_threshold = value.clamp(0.0, 1.0);
        true
    }

    /// Record the model the server confirmed as loaded
    pub fn select_model(&mut self, model_path: impl Into<String>) {
        self.selected_model = Some(model_path.into());
    }
}

/// Connection state shown in the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceStatus {
    /// Not yet checked
    #[default]
    Unknown,
    /// Reachable with a model loaded
    Connected,
    /// Reachable but no model loaded yet
    ModelLoading,
    /// Health check failed
    Disconnected,
}

impl ServiceStatus {
    /// Get the display name for this status
    pub fn name(&self) -> &'static str {
        match self {
            ServiceStatus::Unknown => "Unknown",
            ServiceStatus::Connected => "Connected",
            ServiceStatus::ModelLoading => "Model Loading...",
            ServiceStatus::Disconnected => "Disconnected",
        }
    }
}
