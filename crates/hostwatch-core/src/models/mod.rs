//! Data models for Hostwatch

mod alert;
mod host;
mod metrics;

pub use alert::*;
pub use host::*;
pub use metrics::*;
