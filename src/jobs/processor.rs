//! Dedicated thread draining change notifications into an input stage.
//!
//! Producers (a file watcher, a source backend) push [`ResourceDelta`]s and
//! batches of [`SourceEvent`]s into channels; the processor applies them to
//! its stage one at a time, so the stage sees a single consumer.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, select};
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::input::{SubscriberInput, WorkingSetInput};
use crate::source::{ResourceDelta, SourceEvent};

/// Something that accepts change notifications.
pub trait ChangeSink: Send + Sync {
    fn resource_changed(&self, delta: &ResourceDelta);
    fn source_changed(&self, events: &[SourceEvent]);
}

impl ChangeSink for SubscriberInput {
    fn resource_changed(&self, delta: &ResourceDelta) {
        Self::resource_changed(self, delta);
    }

    fn source_changed(&self, events: &[SourceEvent]) {
        Self::source_changed(self, events);
    }
}

impl ChangeSink for WorkingSetInput {
    fn resource_changed(&self, delta: &ResourceDelta) {
        Self::resource_changed(self, delta);
    }

    fn source_changed(&self, events: &[SourceEvent]) {
        Self::source_changed(self, events);
    }
}

/// Owns the processing thread; dropping it shuts the thread down.
pub struct ChangeProcessor {
    deltas: Sender<ResourceDelta>,
    events: Sender<Vec<SourceEvent>>,
    flush: Sender<Sender<()>>,
    shutdown: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl ChangeProcessor {
    /// Spawn the processing thread for `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the thread cannot be spawned.
    pub fn start(sink: Arc<dyn ChangeSink>) -> Result<Self> {
        let (deltas, delta_receiver) = crossbeam_channel::unbounded();
        let (events, event_receiver) = crossbeam_channel::unbounded();
        let (flush, flush_receiver) = crossbeam_channel::unbounded();
        let (shutdown, shutdown_receiver) = crossbeam_channel::bounded(1);

        let thread = thread::Builder::new()
            .name("syncview-change-processor".to_owned())
            .spawn(move || {
                trace!("change processor started");
                let queues = Queues {
                    deltas: delta_receiver,
                    events: event_receiver,
                };
                Self::main_task(sink.as_ref(), &queues, &flush_receiver, &shutdown_receiver);
                trace!("change processor stopped");
            })?;

        Ok(Self {
            deltas,
            events,
            flush,
            shutdown,
            thread: Some(thread),
        })
    }

    fn main_task(
        sink: &dyn ChangeSink,
        queues: &Queues,
        flush: &Receiver<Sender<()>>,
        shutdown: &Receiver<()>,
    ) {
        loop {
            select! {
                recv(queues.deltas) -> delta => match delta {
                    Ok(delta) => {
                        trace!(resource = %delta.path, nodes = delta.node_count(), "resource delta");
                        sink.resource_changed(&delta);
                    }
                    Err(_) => break,
                },
                recv(queues.events) -> events => match events {
                    Ok(events) => sink.source_changed(&events),
                    Err(_) => break,
                },
                recv(flush) -> ack => {
                    queues.drain(sink);
                    if let Ok(ack) = ack {
                        let _ = ack.send(());
                    }
                },
                recv(shutdown) -> _ => {
                    trace!("change processor shutdown signal received");
                    break;
                },
            }
        }
    }

    /// Sender for resource deltas, for handing to producers.
    #[must_use]
    pub fn delta_sender(&self) -> Sender<ResourceDelta> {
        self.deltas.clone()
    }

    /// Queue a resource delta.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the processor has stopped.
    pub fn submit_delta(&self, delta: ResourceDelta) -> Result<()> {
        self.deltas
            .send(delta)
            .map_err(|_| Error::Other("Change processor has stopped".to_string()))
    }

    /// Queue a batch of source events, applied as one transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the processor has stopped.
    pub fn submit_events(&self, events: Vec<SourceEvent>) -> Result<()> {
        self.events
            .send(events)
            .map_err(|_| Error::Other("Change processor has stopped".to_string()))
    }

    /// Block until everything queued before this call has been applied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Other`] if the processor has stopped.
    pub fn flush(&self) -> Result<()> {
        let (ack, done) = crossbeam_channel::bounded(1);
        self.flush
            .send(ack)
            .map_err(|_| Error::Other("Change processor has stopped".to_string()))?;
        done.recv()
            .map_err(|_| Error::Other("Change processor has stopped".to_string()))
    }
}

struct Queues {
    deltas: Receiver<ResourceDelta>,
    events: Receiver<Vec<SourceEvent>>,
}

impl Queues {
    /// Apply everything currently queued.
    fn drain(&self, sink: &dyn ChangeSink) {
        loop {
            let mut idle = true;
            if let Ok(delta) = self.deltas.try_recv() {
                sink.resource_changed(&delta);
                idle = false;
            }
            if let Ok(events) = self.events.try_recv() {
                sink.source_changed(&events);
                idle = false;
            }
            if idle {
                break;
            }
        }
    }
}

impl Drop for ChangeProcessor {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Change processor thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AcceptAll;
    use crate::input::SyncSetInput;
    use crate::jobs::CancelToken;
    use crate::model::{ResourcePath, SyncInfo, SyncKind};
    use crate::source::{DeltaFlags, MemorySource, SyncSource};

    fn p(s: &str) -> ResourcePath {
        ResourcePath::parse(s).unwrap()
    }

    fn outgoing(path: &str) -> SyncInfo {
        SyncInfo::file(p(path), SyncKind::OUTGOING.with(SyncKind::CHANGE))
    }

    #[test]
    fn test_processes_both_queues() {
        let source = Arc::new(MemorySource::new("mem", "Memory"));
        source.add_root(p("/p"));
        source.set(outgoing("/p/a.txt"));

        let input = Arc::new(SubscriberInput::new(
            Arc::clone(&source) as Arc<dyn SyncSource>,
            Arc::new(AcceptAll),
        ));
        input.connect();
        input.reset(&CancelToken::new()).unwrap();

        let processor = ChangeProcessor::start(Arc::clone(&input) as Arc<dyn ChangeSink>).unwrap();

        source.set(outgoing("/p/dir/b.txt"));
        processor
            .submit_delta(
                ResourceDelta::changed(p("/p"), DeltaFlags::NONE)
                    .with_child(ResourceDelta::added(p("/p/dir"))),
            )
            .unwrap();
        source.delete(&p("/p/a.txt"));
        processor
            .submit_events(vec![SourceEvent::SyncChanged(p("/p/a.txt"))])
            .unwrap();
        processor.flush().unwrap();

        assert_eq!(input.sync_set().all_members(), vec![outgoing("/p/dir/b.txt")]);
    }

    #[test]
    fn test_drop_stops_thread() {
        let input = Arc::new(SubscriberInput::new(
            Arc::new(MemorySource::new("mem", "Memory")),
            Arc::new(AcceptAll),
        ));
        let processor = ChangeProcessor::start(input).unwrap();
        let sender = processor.delta_sender();
        drop(processor);
        assert!(sender.send(ResourceDelta::added(p("/p"))).is_err());
    }
}
