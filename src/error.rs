//! Failure taxonomy for detection submissions
//!
//! Variants are handled at the pipeline boundary and end up as a single
//! error notification.

use thiserror::Error;

use crate::client::ClientError;
use crate::pipeline::Modality;

/// Why a single submission attempt produced no result
#[derive(Debug, Error)]
pub enum DetectionError {
    /// The file's declared type does not match the pipeline's modality
    #[error("{declared:?} is not an accepted {expected} type")]
    InvalidMediaType {
        expected: Modality,
        declared: String,
    },
    /// The service could not be reached, or its reply was unreadable
    #[error("transport failure: {0}")]
    TransportFailure(#[from] ClientError),
    /// The service answered with `success: false`
    #[error("service failure: {}", .0.as_deref().unwrap_or("no detail"))]
    ServiceFailure(Option<String>),
}

impl DetectionError {
    /// Text shown to the user for this failure
    pub fn user_message(&self, modality: Modality) -> String {
        match self {
            DetectionError::InvalidMediaType { .. } => {
                format!("Please select {} {} file", modality.article(), modality.noun())
            }
            DetectionError::TransportFailure(_) => format!("Error processing {}", modality.noun()),
            DetectionError::ServiceFailure(Some(text)) if !text.is_empty() => text.clone(),
            DetectionError::ServiceFailure(_) => format!("Failed to process {}", modality.noun()),
        }
    }
}
