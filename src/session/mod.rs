//! Monitor session module
//!
//! The state machine behind the dashboard: selected symbol, latest quote,
//! chart series, alert rule and error status, exposed as one immutable
//! snapshot per transition.

mod machine;
mod state;

pub use machine::MonitorSession;
pub use state::{AlertStatus, DetailTag, SessionPhase, SessionState, Trend};
