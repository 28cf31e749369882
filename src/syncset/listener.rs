//! Change listener registration.

use std::sync::Arc;

use uuid::Uuid;

use super::event::SyncSetChangedEvent;

/// Receives one event per completed transaction of a sync set.
///
/// Called synchronously on the thread that closed the transaction, after the
/// set's internal lock is released; implementations may query the set.
pub trait SyncSetChangedListener: Send + Sync {
    fn sync_set_changed(&self, event: &SyncSetChangedEvent);
}

impl<F> SyncSetChangedListener for F
where
    F: Fn(&SyncSetChangedEvent) + Send + Sync,
{
    fn sync_set_changed(&self, event: &SyncSetChangedEvent) {
        self(event);
    }
}

/// Handle returned on registration, used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl ListenerId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

pub(crate) type ListenerList = Vec<(ListenerId, Arc<dyn SyncSetChangedListener>)>;
