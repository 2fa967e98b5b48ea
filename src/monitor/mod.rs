//! Monitor module
//!
//! Runs a session against live polling and exposes it to the presentation
//! layer through `MonitorHandle`

mod handle;
mod runner;

pub use handle::{MonitorCommand, MonitorHandle};
pub use runner::Monitor;
