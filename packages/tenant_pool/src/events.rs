use std::fmt;
use std::sync::{Arc, RwLock};

use crate::TableIdentity;
use crate::constants::ERR_POISONED_LOCK;

/// Tag identifying the class of resource a registry pools.
///
/// Several registries can feed the same metrics collaborator; the tag tells their
/// event streams apart.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct SourceTag(&'static str);

impl SourceTag {
    /// Creates a tag from a static name, e.g. `SourceTag::new("wal_writer")`.
    #[inline]
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The name this tag was created with.
    #[inline]
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// A lifecycle transition of one pooled resource.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum PoolEventKind {
    /// A fresh instance was constructed and handed out.
    Created,

    /// An idle instance was reactivated and handed out for reuse.
    Acquired,

    /// An instance was returned healthy and now idles in its slot.
    Returned,

    /// An instance left the pool for good and its slot was freed.
    Expelled,

    /// An idle instance outlived the idle TTL and was torn down by a sweep.
    Reaped,
}

/// One lifecycle transition, as delivered to [`PoolListener`] subscribers.
#[derive(Clone, Debug)]
#[non_exhaustive]
pub struct PoolEvent {
    /// Which registry's resource class this event belongs to.
    pub source: SourceTag,

    /// What happened.
    pub kind: PoolEventKind,

    /// The table the resource serves.
    pub identity: TableIdentity,

    /// The position index of the slot involved.
    pub slot: usize,
}

/// Observer of pool lifecycle transitions.
///
/// Events are emitted synchronously from inside acquire and close paths on caller
/// threads, so implementations must be cheap and must never block. Aggregation
/// into gauges and counters belongs to the subscriber, not to the pool.
pub trait PoolListener: Send + Sync {
    /// Called once for every transition, in the order the emitting thread
    /// observed them. Transitions of unrelated slots may arrive interleaved.
    fn on_event(&self, event: &PoolEvent);
}

/// Fan-out of [`PoolEvent`]s to every subscribed [`PoolListener`].
pub(crate) struct ListenerHub {
    listeners: RwLock<Vec<Arc<dyn PoolListener>>>,
}

impl ListenerHub {
    pub(crate) fn new(listeners: Vec<Arc<dyn PoolListener>>) -> Self {
        Self {
            listeners: RwLock::new(listeners),
        }
    }

    pub(crate) fn subscribe(&self, listener: Arc<dyn PoolListener>) {
        self.listeners
            .write()
            .expect(ERR_POISONED_LOCK)
            .push(listener);
    }

    pub(crate) fn emit(&self, event: &PoolEvent) {
        let listeners = self.listeners.read().expect(ERR_POISONED_LOCK);

        for listener in listeners.iter() {
            listener.on_event(event);
        }
    }
}

impl fmt::Debug for ListenerHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.listeners.read().expect(ERR_POISONED_LOCK).len();

        f.debug_struct("ListenerHub")
            .field("listeners", &count)
            .finish()
    }
}
