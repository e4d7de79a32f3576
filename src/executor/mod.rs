//! Execution state module
//!
//! Manages the lifecycle of a single, possibly repeated, asynchronous
//! operation:
//! - Tracking pending / resolved / rejected state
//! - Superseding and aborting in-flight work
//! - Notifying observers only on visible changes

mod handle;
mod signal;
mod snapshot;
mod state;

pub use handle::*;
pub use signal::*;
pub use snapshot::*;
pub use state::*;
