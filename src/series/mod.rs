//! Chart series module
//!
//! Rolling, deduplicated price samples for the selected symbol

mod window;

pub use window::{Sample, SeriesConfig, SeriesWindow};
