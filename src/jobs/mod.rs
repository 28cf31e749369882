//! Background work: cancellation, a worker pool for refreshes, and the
//! change-processing thread.

mod cancel;
mod pool;
mod processor;

pub use cancel::CancelToken;
pub use pool::{TaskHandle, WorkerPool};
pub use processor::{ChangeProcessor, ChangeSink};
