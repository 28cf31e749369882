//! The out-of-sync index.
//!
//! - [`SyncSet`]: resources plus ancestor rollup, transactional mutation
//! - [`SyncSetChangedEvent`]: net effect of one transaction
//! - [`SyncSetStatistics`]: per-kind counts

mod event;
mod listener;
mod set;
mod stats;

pub use event::SyncSetChangedEvent;
pub use listener::{ListenerId, SyncSetChangedListener};
pub use set::{InputBatch, SyncSet};
pub use stats::SyncSetStatistics;
