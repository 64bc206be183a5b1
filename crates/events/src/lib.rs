//! groundmark job progress events.
//!
//! - [`JobEvent`]: the progress events a batch job emits.
//! - [`JobLog`]: append-only per-job log that observers can attach to at
//!   any time without missing the terminal event.

pub mod event;
pub mod log;

pub use event::JobEvent;
pub use log::{JobLog, JobSubscription};
