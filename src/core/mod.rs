//! Core abstractions for the worker
//!
//! Host-facing traits, the crate error type, lifecycle state and the
//! extendable event wrapper shared by every other module.

pub mod container;
pub mod error;
pub mod event;
pub mod status;
pub mod traits;

// Re-export commonly used types
pub use container::HostContainer;
pub use error::{ErrorContext, WorkerError, WorkerResult};
pub use event::{EventKind, ExtendableEvent, SettleReport};
pub use status::{LifecycleStatus, WorkerState};
pub use traits::*;
