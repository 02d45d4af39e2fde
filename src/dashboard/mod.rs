//! Dashboard
//!
//! Event routing between the UI surface and the detection components.

pub mod orchestrator;

pub use orchestrator::DashboardOrchestrator;
