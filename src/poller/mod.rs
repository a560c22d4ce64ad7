//! Periodic change detection over all stored watch entries.

pub mod controller;
pub mod detector;
pub mod loop_worker;

pub use controller::PollerController;
pub use detector::{Direction, Notification};
pub use loop_worker::{CycleReport, PollerConfig};
