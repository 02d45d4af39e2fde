//! Shared state and messaging between the UI surface and the orchestrator
//!
//! The orchestrator never renders anything itself: user actions arrive as
//! [`DashboardEvent`]s and everything the UI should show leaves as
//! [`UiUpdate`]s through a [`UiSink`].

pub mod state;
pub mod messages;

pub use state::{SessionConfig, ServiceStatus};
pub use messages::{DashboardEvent, UiSink, UiUpdate};
