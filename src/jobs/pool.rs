//! Fixed-size worker pool with cancellable task handles.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::CancelToken;
use crate::error::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Worker threads consuming jobs from a shared channel.
///
/// Dropping the pool closes the channel; workers finish the queued jobs and
/// are joined.
pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Start `size` workers (at least one).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a thread cannot be spawned.
    pub fn new(size: usize) -> Result<Self> {
        let size = size.max(1);
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver: Receiver<Job> = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("syncview-worker-{index}"))
                .spawn(move || {
                    trace!(worker = index, "worker started");
                    for job in receiver {
                        job();
                    }
                    trace!(worker = index, "worker stopped");
                })?;
            workers.push(handle);
        }
        debug!(workers = size, "worker pool started");

        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue `task`. It receives a cancellation token shared with the
    /// returned handle; a task cancelled before it starts never runs.
    pub fn submit<T, F>(&self, task: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CancelToken) -> Result<T> + Send + 'static,
    {
        let id = format!("task_{}", &Uuid::new_v4().simple().to_string()[..12]);
        let cancel = CancelToken::new();
        let (result_sender, result_receiver) = crossbeam_channel::bounded(1);

        let token = cancel.clone();
        let task_id = id.clone();
        let job: Job = Box::new(move || {
            let result = if token.is_cancelled() {
                Err(Error::Cancelled)
            } else {
                trace!(task = %task_id, "task started");
                catch_unwind(AssertUnwindSafe(|| task(&token)))
                    .unwrap_or_else(|_| Err(Error::Other(format!("Task {task_id} panicked"))))
            };
            // The handle may already be gone.
            let _ = result_sender.send(result);
        });

        match &self.sender {
            Some(sender) if sender.send(job).is_ok() => {}
            _ => warn!(task = %id, "Worker pool is shut down; task dropped"),
        }

        TaskHandle {
            id,
            cancel,
            receiver: result_receiver,
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        drop(self.sender.take());
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Worker thread panicked");
            }
        }
    }
}

/// Handle to a submitted task.
pub struct TaskHandle<T> {
    id: String,
    cancel: CancelToken,
    receiver: Receiver<Result<T>>,
}

impl<T> TaskHandle<T> {
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Block until the task finishes.
    ///
    /// # Errors
    ///
    /// Returns the task's error, [`Error::Cancelled`] if it was cancelled
    /// before starting, or [`Error::Other`] if it never ran.
    pub fn wait(self) -> Result<T> {
        self.receiver
            .recv()
            .unwrap_or_else(|_| Err(Error::Other(format!("Task {} did not complete", self.id))))
    }

    /// The result if the task has finished, without blocking.
    pub fn try_result(&self) -> Option<Result<T>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(Error::Other(format!("Task {} did not complete", self.id))))
            }
        }
    }
}

impl<T> std::fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_submit_and_wait() {
        let pool = WorkerPool::new(2).unwrap();
        let handle = pool.submit(|_| Ok(21 * 2));
        assert!(handle.id().starts_with("task_"));
        assert_eq!(handle.wait().unwrap(), 42);
    }

    #[test]
    fn test_errors_propagate() {
        let pool = WorkerPool::new(1).unwrap();
        let handle = pool.submit::<(), _>(|_| Err(Error::NotConnected));
        assert_eq!(handle.wait().unwrap_err().error_code().as_str(), "NOT_CONNECTED");
    }

    #[test]
    fn test_cancel_before_start() {
        let pool = WorkerPool::new(1).unwrap();
        let (gate_tx, gate_rx) = crossbeam_channel::bounded::<()>(0);
        let blocker = pool.submit(move |_| {
            let _ = gate_rx.recv();
            Ok(())
        });
        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        let queued = pool.submit(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        queued.cancel();
        gate_tx.send(()).unwrap();
        blocker.wait().unwrap();

        assert!(queued.wait().unwrap_err().is_cancelled());
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cooperative_cancel() {
        let pool = WorkerPool::new(1).unwrap();
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
        let handle = pool.submit(move |cancel| {
            started_tx.send(()).unwrap();
            loop {
                cancel.check()?;
                thread::yield_now();
            }
        });
        started_rx.recv().unwrap();
        handle.cancel();
        let result: Result<()> = handle.wait();
        assert!(result.unwrap_err().is_cancelled());
    }

    #[test]
    fn test_panicking_task_reports_error() {
        let pool = WorkerPool::new(1).unwrap();
        let handle = pool.submit::<(), _>(|_| panic!("boom"));
        assert!(handle.wait().is_err());
        // The worker survives.
        assert_eq!(pool.submit(|_| Ok(1)).wait().unwrap(), 1);
    }

    #[test]
    fn test_drop_finishes_queued_jobs() {
        let ran = Arc::new(AtomicUsize::new(0));
        let handles: Vec<TaskHandle<()>> = {
            let pool = WorkerPool::new(2).unwrap();
            (0..8)
                .map(|_| {
                    let counter = Arc::clone(&ran);
                    pool.submit(move |_| {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                })
                .collect()
        };
        assert_eq!(ran.load(Ordering::SeqCst), 8);
        for handle in handles {
            assert!(handle.try_result().unwrap().is_ok());
        }
    }
}
