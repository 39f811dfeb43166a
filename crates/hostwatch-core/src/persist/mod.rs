//! Background persistence for the recent-metrics cache
//!
//! Two independent timers: the batch scheduler drains the cache's latest
//! snapshot into the durable store, and the retention sweeper purges history
//! older than the configured window.

mod retention;
mod scheduler;

pub use retention::RetentionSweeper;
pub use scheduler::BatchScheduler;
