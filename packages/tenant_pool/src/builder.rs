use std::fmt;
use std::num::NonZero;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{DEFAULT_IDLE_TTL, DEFAULT_MAX_SLOTS};
use crate::events::{PoolListener, SourceTag};
use crate::registry::Factory;
use crate::resource::PoolableResource;
use crate::{PoolConfiguration, PoolRegistry, TableIdentity};

/// Builder for configuring and constructing a [`PoolRegistry`].
///
/// The factory is the one mandatory piece: it is how the registry constructs a
/// fresh resource when no idle one exists for an identity. Everything else has
/// defaults.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
/// use std::time::Duration;
///
/// use new_zealand::nz;
/// use tenant_pool::{PoolRegistry, PoolableResource, SourceTag, TableIdentity};
///
/// struct JournalWriter;
///
/// impl PoolableResource for JournalWriter {
///     type Error = Infallible;
///
///     fn reactivate(&mut self) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     fn rollback(&mut self) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     fn close(&mut self) {}
/// }
///
/// let registry = PoolRegistry::builder()
///     .factory(|_identity: &TableIdentity, _slot| Ok(JournalWriter))
///     .max_slots_per_identity(nz!(2))
///     .idle_ttl(Duration::from_secs(30))
///     .source(SourceTag::new("journal_writer"))
///     .build();
///
/// assert_eq!(registry.configuration().max_slots_per_identity(), nz!(2));
/// ```
#[must_use]
pub struct PoolRegistryBuilder<R: PoolableResource> {
    factory: Option<Factory<R>>,
    max_slots_per_identity: NonZero<usize>,
    idle_ttl: Duration,
    source: SourceTag,
    listeners: Vec<Arc<dyn PoolListener>>,
}

impl<R: PoolableResource> PoolRegistryBuilder<R> {
    pub(crate) fn new() -> Self {
        Self {
            factory: None,
            max_slots_per_identity: DEFAULT_MAX_SLOTS,
            idle_ttl: DEFAULT_IDLE_TTL,
            source: SourceTag::new("pooled_resource"),
            listeners: Vec::new(),
        }
    }

    /// Sets the factory that constructs a fresh resource for an identity.
    ///
    /// The factory receives the identity and the position index of the slot the
    /// instance will be bound to. Whatever collaborator handles the resource
    /// needs (sequencers, placement policy, metrics sinks) belong in the
    /// closure's captures; the registry passes them through untouched.
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&TableIdentity, usize) -> Result<R, R::Error> + Send + Sync + 'static,
    {
        self.factory = Some(Box::new(factory));
        self
    }

    /// Caps how many instances - checked out and idle together - one identity
    /// may have at a time. Defaults to 4.
    pub fn max_slots_per_identity(mut self, max_slots: NonZero<usize>) -> Self {
        self.max_slots_per_identity = max_slots;
        self
    }

    /// Sets how long an instance may idle before a sweep tears it down.
    /// Defaults to 120 seconds; zero reaps on the first observed idleness.
    pub fn idle_ttl(mut self, idle_ttl: Duration) -> Self {
        self.idle_ttl = idle_ttl;
        self
    }

    /// Tags this registry's events with a resource-class name, so registries of
    /// different resource classes can share one metrics collaborator.
    pub fn source(mut self, source: SourceTag) -> Self {
        self.source = source;
        self
    }

    /// Subscribes a listener from the moment the registry exists, so not even
    /// the first construction event is missed.
    pub fn listener(mut self, listener: Arc<dyn PoolListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds the registry.
    ///
    /// # Panics
    ///
    /// Panics if no factory has been set with [`factory()`](Self::factory).
    #[must_use]
    pub fn build(self) -> PoolRegistry<R> {
        let factory = self
            .factory
            .expect("a factory must be set with .factory() before calling .build()");

        PoolRegistry::new_inner(
            factory,
            PoolConfiguration::new(self.max_slots_per_identity, self.idle_ttl),
            self.source,
            self.listeners,
        )
    }
}

impl<R: PoolableResource> fmt::Debug for PoolRegistryBuilder<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistryBuilder")
            .field("factory", &self.factory.is_some())
            .field("max_slots_per_identity", &self.max_slots_per_identity)
            .field("idle_ttl", &self.idle_ttl)
            .field("source", &self.source)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
