use std::collections::HashMap;
use std::fmt;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::builder::PoolRegistryBuilder;
use crate::constants::ERR_POISONED_LOCK;
use crate::entry::EntrySet;
use crate::error::AcquireError;
use crate::events::{ListenerHub, PoolEvent, PoolEventKind, PoolListener, SourceTag};
use crate::resource::PoolableResource;
use crate::tenant::Tenant;
use crate::{PoolConfiguration, TableIdentity};

/// Fixed shard count for the identity map. A power of two so the shard pick is a
/// mask of the identity hash. Identities spread across shards, so acquisitions
/// for unrelated tables do not serialize against each other.
const SHARD_COUNT: usize = 16;

/// Plumbing shared by the registry and every slot block it creates.
#[derive(Debug)]
pub(crate) struct PoolShared {
    pub(crate) config: PoolConfiguration,
    pub(crate) source: SourceTag,
    pub(crate) listeners: ListenerHub,
}

pub(crate) type Factory<R: PoolableResource> =
    Box<dyn Fn(&TableIdentity, usize) -> Result<R, R::Error> + Send + Sync>;

struct Shard<R: PoolableResource> {
    tables: RwLock<HashMap<TableIdentity, Arc<EntrySet<R>>, foldhash::fast::RandomState>>,
}

impl<R: PoolableResource> Shard<R> {
    fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::default()),
        }
    }
}

struct RegistryCore<R: PoolableResource> {
    shards: Box<[Shard<R>]>,
    factory: Factory<R>,
    shared: Arc<PoolShared>,
    shutting_down: AtomicBool,
    shard_hasher: foldhash::fast::RandomState,
}

/// Registry of reusable per-table resources.
///
/// Maps each [`TableIdentity`] to a bounded run of slots, hands out exclusive
/// ownership of one instance per [`acquire()`](Self::acquire) call, takes healthy
/// instances back for reuse when their [`Tenant`] is dropped, and constructs
/// fresh instances through the factory when no idle one exists.
///
/// The registry is a cheap cloneable handle over shared state; clones all
/// operate on the same pool. All registry operations are non-blocking
/// bookkeeping: slow resource work (construction, reactivation, teardown)
/// happens outside the slot claims, on the calling thread.
///
/// # Capacity
///
/// The configured maximum bounds checked-out and idle instances together. When
/// every slot for an identity is occupied, [`acquire()`](Self::acquire) fails
/// fast with [`AcquireError::Exhausted`] rather than queue the caller.
///
/// # Example
///
/// ```
/// use std::convert::Infallible;
///
/// use tenant_pool::{PoolRegistry, PoolableResource, TableIdentity};
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
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let registry = PoolRegistry::builder()
///     .factory(|_identity: &TableIdentity, _slot| Ok(JournalWriter))
///     .build();
///
/// let trades = TableIdentity::new("trades", 1);
///
/// let writer = registry.acquire(&trades)?;
/// drop(writer); // healthy close: the instance idles in its slot
///
/// assert_eq!(registry.idle_count(&trades), 1);
/// # Ok(())
/// # }
/// ```
pub struct PoolRegistry<R: PoolableResource> {
    core: Arc<RegistryCore<R>>,
}

impl<R: PoolableResource> PoolRegistry<R> {
    /// Creates a builder for configuring and constructing a [`PoolRegistry`].
    ///
    /// The factory is mandatory; everything else has defaults.
    #[inline]
    pub fn builder() -> PoolRegistryBuilder<R> {
        PoolRegistryBuilder::new()
    }

    pub(crate) fn new_inner(
        factory: Factory<R>,
        config: PoolConfiguration,
        source: SourceTag,
        listeners: Vec<Arc<dyn PoolListener>>,
    ) -> Self {
        Self {
            core: Arc::new(RegistryCore {
                shards: (0..SHARD_COUNT).map(|_| Shard::new()).collect(),
                factory,
                shared: Arc::new(PoolShared {
                    config,
                    source,
                    listeners: ListenerHub::new(listeners),
                }),
                shutting_down: AtomicBool::new(false),
                shard_hasher: foldhash::fast::RandomState::default(),
            }),
        }
    }

    /// The limits this registry was built with.
    #[must_use]
    pub fn configuration(&self) -> PoolConfiguration {
        self.core.shared.config
    }

    /// The tag identifying this registry's resource class in emitted events.
    #[must_use]
    pub fn source_tag(&self) -> SourceTag {
        self.core.shared.source
    }

    /// Subscribes a listener to every lifecycle event this registry emits from
    /// now on.
    pub fn subscribe(&self, listener: Arc<dyn PoolListener>) {
        self.core.shared.listeners.subscribe(listener);
    }

    fn shard(&self, identity: &TableIdentity) -> &Shard<R> {
        let hash = self.core.shard_hasher.hash_one(identity);

        #[expect(
            clippy::cast_possible_truncation,
            reason = "only the low bits select the shard"
        )]
        let index = (hash as usize) & (SHARD_COUNT - 1);

        self.core
            .shards
            .get(index)
            .expect("shard index is masked to the shard count")
    }

    /// Looks up the slot block for an identity, creating it on first use.
    fn entry_set_for(&self, identity: &TableIdentity) -> Arc<EntrySet<R>> {
        let shard = self.shard(identity);

        {
            let tables = shard.tables.read().expect(ERR_POISONED_LOCK);
            if let Some(set) = tables.get(identity) {
                return Arc::clone(set);
            }
        }

        let mut tables = shard.tables.write().expect(ERR_POISONED_LOCK);
        let set = tables.entry(identity.clone()).or_insert_with(|| {
            Arc::new(EntrySet::new(
                identity.clone(),
                Arc::clone(&self.core.shared),
            ))
        });

        Arc::clone(set)
    }

    fn emit(&self, set: &EntrySet<R>, kind: PoolEventKind, slot: usize) {
        self.core.shared.listeners.emit(&PoolEvent {
            source: self.core.shared.source,
            kind,
            identity: set.identity().clone(),
            slot,
        });
    }

    /// Acquires exclusive ownership of a resource for the given table.
    ///
    /// Reuses an idle instance when one exists (reactivating it first);
    /// otherwise constructs a fresh instance through the factory, provided the
    /// identity is below its slot ceiling. Never blocks and never waits for
    /// capacity.
    ///
    /// An instance that fails reactivation is expelled on the spot and the call
    /// falls through to the next idle slot or to fresh construction - a broken
    /// instance is never handed out, and its failure never outlives it.
    ///
    /// # Errors
    ///
    /// - [`AcquireError::Exhausted`] when every slot is occupied. Retry/backoff
    ///   is the caller's policy.
    /// - [`AcquireError::ShuttingDown`] when the registry is shutting down.
    /// - [`AcquireError::Construction`] when the factory fails.
    pub fn acquire(&self, identity: &TableIdentity) -> Result<Tenant<R>, AcquireError<R::Error>> {
        loop {
            if self.core.shutting_down.load(Ordering::Acquire) {
                return Err(AcquireError::ShuttingDown);
            }

            let set = self.entry_set_for(identity);
            if set.is_retired() {
                // Raced a close_all teardown; the block is already out of the
                // map, so the next lookup starts a fresh one.
                continue;
            }

            // Prefer reuse: reactivating an idle instance is cheap next to a
            // fresh construction.
            while let Some((slot, mut resource)) = set.try_claim_idle() {
                if let Some(error) = self.handed_out_during_teardown(&set, slot, &mut resource) {
                    match error {
                        TeardownRace::ShuttingDown => return Err(AcquireError::ShuttingDown),
                        TeardownRace::Retired => break,
                    }
                }

                match resource.reactivate() {
                    Ok(()) => {
                        self.emit(&set, PoolEventKind::Acquired, slot);
                        return Ok(Tenant::new(resource, set, slot));
                    }
                    Err(_refresh_failure) => {
                        // This instance only. Tear it down, free the slot, and
                        // keep going - the caller gets a fresh instance, not a
                        // broken one and not an error.
                        resource.close();
                        set.expel(slot);
                    }
                }
            }

            if set.is_retired() {
                continue;
            }

            let Some(slot) = set.try_claim_vacant() else {
                return Err(AcquireError::Exhausted {
                    identity: identity.clone(),
                    max_slots: self.core.shared.config.max_slots_per_identity().get(),
                });
            };

            match (self.core.factory)(identity, slot) {
                Ok(mut resource) => {
                    if let Some(error) = self.handed_out_during_teardown(&set, slot, &mut resource)
                    {
                        match error {
                            TeardownRace::ShuttingDown => return Err(AcquireError::ShuttingDown),
                            TeardownRace::Retired => continue,
                        }
                    }

                    self.emit(&set, PoolEventKind::Created, slot);
                    return Ok(Tenant::new(resource, set, slot));
                }
                Err(source) => {
                    set.release_vacant(slot);
                    return Err(AcquireError::Construction {
                        identity: identity.clone(),
                        source,
                    });
                }
            }
        }
    }

    /// Re-checks the teardown flags after a slot claim. A claim won just before
    /// shutdown or `close_all` would otherwise hand out a resource whose pool is
    /// being torn down underneath it; instead the instance is destroyed here and
    /// the acquisition reacts to whichever teardown raced it.
    fn handed_out_during_teardown(
        &self,
        set: &Arc<EntrySet<R>>,
        slot: usize,
        resource: &mut R,
    ) -> Option<TeardownRace> {
        let race = if self.core.shutting_down.load(Ordering::Acquire) {
            TeardownRace::ShuttingDown
        } else if set.is_retired() {
            TeardownRace::Retired
        } else {
            return None;
        };

        resource.close();
        set.expel(slot);

        Some(race)
    }

    /// Number of instances currently idling in slots for the identity.
    #[must_use]
    pub fn idle_count(&self, identity: &TableIdentity) -> usize {
        let shard = self.shard(identity);
        let tables = shard.tables.read().expect(ERR_POISONED_LOCK);

        tables.get(identity).map_or(0, |set| set.idle_count())
    }

    /// Number of live instances for the identity, checked out and idle together.
    #[must_use]
    pub fn live_count(&self, identity: &TableIdentity) -> usize {
        let shard = self.shard(identity);
        let tables = shard.tables.read().expect(ERR_POISONED_LOCK);

        tables.get(identity).map_or(0, |set| set.live_count())
    }

    /// Force-closes every instance pooled for one identity, e.g. because the
    /// table was dropped.
    ///
    /// Idle instances are torn down immediately. Checked-out instances stay with
    /// their owners; their eventual return is refused and they hard-close
    /// instead of re-entering rotation. A later [`acquire()`](Self::acquire) for
    /// the identity starts over with fresh constructions.
    pub fn close_all(&self, identity: &TableIdentity) {
        let removed = {
            let mut tables = self
                .shard(identity)
                .tables
                .write()
                .expect(ERR_POISONED_LOCK);
            tables.remove(identity)
        };

        if let Some(set) = removed {
            set.retire();
            // Teardown runs after the map lock is gone; closing resources is
            // slow work and must not stall unrelated acquisitions.
            set.close_idle();
        }
    }

    /// Shuts the registry down: every pooled identity is torn down as in
    /// [`close_all()`](Self::close_all), and every later or racing
    /// [`acquire()`](Self::acquire) fails with [`AcquireError::ShuttingDown`].
    pub fn shutdown(&self) {
        self.core.shutting_down.store(true, Ordering::Release);

        for shard in &self.core.shards {
            let drained: Vec<_> = {
                let mut tables = shard.tables.write().expect(ERR_POISONED_LOCK);
                tables.drain().map(|(_, set)| set).collect()
            };

            for set in drained {
                set.retire();
                set.close_idle();
            }
        }
    }

    /// One idle-TTL sweep over the whole registry, tearing down every instance
    /// that has idled longer than the configured TTL. Returns how many instances
    /// were reaped.
    ///
    /// [`Reaper::spawn()`][crate::Reaper::spawn] calls this on a timer; embedders
    /// that already run a maintenance cycle can piggyback by calling it directly.
    /// Contention with acquirers happens only at the granularity of the specific
    /// slot being inspected, through the same claim used by
    /// [`acquire()`](Self::acquire).
    #[cfg_attr(test, mutants::skip)] // Trivial layer, the sweep itself is tested via reap_idle_at.
    pub fn reap_idle(&self) -> usize {
        self.reap_idle_at(Instant::now())
    }

    /// The sweep behind [`reap_idle()`](Self::reap_idle), with the observation
    /// instant injected so tests can reap deterministically.
    pub(crate) fn reap_idle_at(&self, now: Instant) -> usize {
        let ttl = self.core.shared.config.idle_ttl();
        let mut reaped: usize = 0;

        for shard in &self.core.shards {
            let sets: Vec<_> = {
                let tables = shard.tables.read().expect(ERR_POISONED_LOCK);
                tables.values().map(Arc::clone).collect()
            };

            for set in sets {
                reaped = reaped.saturating_add(set.reap_expired(now, ttl));
            }
        }

        reaped
    }
}

enum TeardownRace {
    ShuttingDown,
    Retired,
}

impl<R: PoolableResource> Clone for PoolRegistry<R> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<R: PoolableResource> fmt::Debug for PoolRegistry<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("source", &self.core.shared.source)
            .field("config", &self.core.shared.config)
            .field(
                "shutting_down",
                &self.core.shutting_down.load(Ordering::Relaxed),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use new_zealand::nz;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(PoolRegistry<CountingResource>: Send, Sync, Clone, std::fmt::Debug);

    /// Test double tracking how often each lifecycle hook ran, with switches to
    /// make the fallible hooks fail.
    #[derive(Debug, Default)]
    struct Probe {
        constructed: AtomicUsize,
        reactivated: AtomicUsize,
        rolled_back: AtomicUsize,
        closed: AtomicUsize,
        fail_reactivate: AtomicBool,
        fail_rollback: AtomicBool,
    }

    #[derive(Debug, thiserror::Error)]
    #[error("probe was told to fail")]
    struct ProbeFailure;

    struct CountingResource {
        sequence: usize,
        probe: Arc<Probe>,
    }

    impl PoolableResource for CountingResource {
        type Error = ProbeFailure;

        fn reactivate(&mut self) -> Result<(), Self::Error> {
            self.probe.reactivated.fetch_add(1, Ordering::Relaxed);

            if self.probe.fail_reactivate.load(Ordering::Relaxed) {
                return Err(ProbeFailure);
            }

            Ok(())
        }

        fn rollback(&mut self) -> Result<(), Self::Error> {
            self.probe.rolled_back.fetch_add(1, Ordering::Relaxed);

            if self.probe.fail_rollback.load(Ordering::Relaxed) {
                return Err(ProbeFailure);
            }

            Ok(())
        }

        fn close(&mut self) {
            self.probe.closed.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn registry_with_probe(
        max_slots: usize,
        idle_ttl: Duration,
    ) -> (PoolRegistry<CountingResource>, Arc<Probe>) {
        let probe = Arc::new(Probe::default());
        let factory_probe = Arc::clone(&probe);

        let registry = PoolRegistry::builder()
            .factory(move |_identity: &TableIdentity, _slot| {
                let sequence = factory_probe.constructed.fetch_add(1, Ordering::Relaxed);
                Ok(CountingResource {
                    sequence,
                    probe: Arc::clone(&factory_probe),
                })
            })
            .max_slots_per_identity(max_slots.try_into().expect("test capacity must be non-zero"))
            .idle_ttl(idle_ttl)
            .build();

        (registry, probe)
    }

    fn trades() -> TableIdentity {
        TableIdentity::new("trades", 1)
    }

    #[test]
    fn acquire_constructs_then_reuses_the_same_instance() {
        let (registry, probe) = registry_with_probe(2, Duration::from_secs(60));

        let first = registry.acquire(&trades()).expect("capacity is free");
        let first_sequence = first.sequence;
        drop(first);

        assert_eq!(registry.idle_count(&trades()), 1);

        let second = registry.acquire(&trades()).expect("idle instance exists");
        assert_eq!(second.sequence, first_sequence);
        assert_eq!(probe.constructed.load(Ordering::Relaxed), 1);
        assert_eq!(probe.reactivated.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn exhausted_capacity_fails_fast() {
        let (registry, _probe) = registry_with_probe(1, Duration::from_secs(60));

        let held = registry.acquire(&trades()).expect("capacity is free");

        let error = registry
            .acquire(&trades())
            .expect_err("the only slot is checked out");
        assert!(matches!(
            error,
            AcquireError::Exhausted { max_slots: 1, .. }
        ));

        drop(held);
        assert!(registry.acquire(&trades()).is_ok());
    }

    #[test]
    fn identities_have_independent_capacity() {
        let (registry, _probe) = registry_with_probe(1, Duration::from_secs(60));

        let _trades = registry.acquire(&trades()).expect("capacity is free");
        let _orders = registry
            .acquire(&TableIdentity::new("orders", 2))
            .expect("a different identity has its own slots");
    }

    #[test]
    fn distressed_instance_is_torn_down_not_reused() {
        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));

        let mut tenant = registry.acquire(&trades()).expect("capacity is free");
        tenant.mark_distressed();
        drop(tenant);

        assert_eq!(registry.idle_count(&trades()), 0);
        assert_eq!(registry.live_count(&trades()), 0);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);

        let replacement = registry.acquire(&trades()).expect("slot was freed");
        assert_eq!(replacement.sequence, 1);
        assert_eq!(probe.constructed.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn rollback_failure_routes_to_teardown() {
        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));

        let tenant = registry.acquire(&trades()).expect("capacity is free");
        probe.fail_rollback.store(true, Ordering::Relaxed);
        drop(tenant);

        assert_eq!(registry.idle_count(&trades()), 0);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn reactivation_failure_expels_and_falls_through_to_fresh() {
        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));

        let first = registry.acquire(&trades()).expect("capacity is free");
        drop(first);

        probe.fail_reactivate.store(true, Ordering::Relaxed);
        let replacement = registry
            .acquire(&trades())
            .expect("a fresh instance replaces the broken one");

        assert_eq!(replacement.sequence, 1);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);
        assert_eq!(probe.constructed.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn construction_failure_surfaces_and_frees_the_slot() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let factory_attempts = Arc::clone(&attempts);

        let registry: PoolRegistry<CountingResource> = PoolRegistry::builder()
            .factory(move |_identity: &TableIdentity, _slot| {
                factory_attempts.fetch_add(1, Ordering::Relaxed);
                Err(ProbeFailure)
            })
            .max_slots_per_identity(nz!(1))
            .build();

        let error = registry
            .acquire(&trades())
            .expect_err("the factory always fails");
        assert!(matches!(error, AcquireError::Construction { .. }));

        // The slot is free again: the next acquire reaches the factory.
        let _ = registry.acquire(&trades());
        assert_eq!(attempts.load(Ordering::Relaxed), 2);
        assert_eq!(registry.live_count(&trades()), 0);
    }

    #[test]
    fn acquire_after_shutdown_is_refused() {
        let (registry, _probe) = registry_with_probe(1, Duration::from_secs(60));

        registry.shutdown();

        assert!(matches!(
            registry.acquire(&trades()),
            Err(AcquireError::ShuttingDown)
        ));
    }

    #[test]
    fn shutdown_tears_down_idle_instances() {
        let (registry, probe) = registry_with_probe(2, Duration::from_secs(60));

        drop(registry.acquire(&trades()).expect("capacity is free"));
        assert_eq!(registry.idle_count(&trades()), 1);

        registry.shutdown();

        assert_eq!(registry.idle_count(&trades()), 0);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn return_after_shutdown_hard_closes() {
        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));

        let tenant = registry.acquire(&trades()).expect("capacity is free");
        registry.shutdown();

        drop(tenant);

        assert_eq!(probe.rolled_back.load(Ordering::Relaxed), 1);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn close_all_drops_the_identity_and_later_acquires_start_over() {
        let (registry, probe) = registry_with_probe(2, Duration::from_secs(60));

        drop(registry.acquire(&trades()).expect("capacity is free"));
        registry.close_all(&trades());

        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);
        assert_eq!(registry.live_count(&trades()), 0);

        let fresh = registry.acquire(&trades()).expect("fresh block");
        assert_eq!(fresh.sequence, 1);
    }

    #[test]
    fn close_all_refuses_the_return_of_outstanding_tenants() {
        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));

        let tenant = registry.acquire(&trades()).expect("capacity is free");
        registry.close_all(&trades());

        drop(tenant);

        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);
        assert_eq!(registry.idle_count(&trades()), 0);
    }

    #[test]
    fn reap_idle_respects_the_ttl() {
        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));

        drop(registry.acquire(&trades()).expect("capacity is free"));

        assert_eq!(registry.reap_idle(), 0);

        let later = Instant::now() + Duration::from_secs(120);
        assert_eq!(registry.reap_idle_at(later), 1);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);

        let replacement = registry.acquire(&trades()).expect("slot was freed");
        assert_eq!(replacement.sequence, 1);
    }

    #[test]
    fn detach_frees_the_slot_and_yields_the_resource() {
        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));

        let tenant = registry.acquire(&trades()).expect("capacity is free");
        let resource = tenant.detach();

        assert_eq!(registry.live_count(&trades()), 0);
        // The pool no longer owns the resource; it was not closed.
        assert_eq!(probe.closed.load(Ordering::Relaxed), 0);
        drop(resource);

        let replacement = registry.acquire(&trades()).expect("slot was freed");
        assert_eq!(replacement.sequence, 1);
    }

    #[test]
    fn listener_sees_the_full_lifecycle() {
        struct Recorder(Mutex<Vec<PoolEventKind>>);

        impl PoolListener for Recorder {
            fn on_event(&self, event: &PoolEvent) {
                self.0.lock().expect("lock poisoned").push(event.kind);
            }
        }

        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));
        let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
        registry.subscribe(Arc::clone(&recorder) as Arc<dyn PoolListener>);

        drop(registry.acquire(&trades()).expect("capacity is free"));
        drop(registry.acquire(&trades()).expect("idle instance exists"));

        let mut distressed = registry.acquire(&trades()).expect("idle instance exists");
        distressed.mark_distressed();
        drop(distressed);

        assert_eq!(
            *recorder.0.lock().expect("lock poisoned"),
            vec![
                PoolEventKind::Created,
                PoolEventKind::Returned,
                PoolEventKind::Acquired,
                PoolEventKind::Returned,
                PoolEventKind::Acquired,
                PoolEventKind::Expelled,
            ]
        );

        // The distressed teardown closed the only instance ever constructed.
        assert_eq!(probe.constructed.load(Ordering::Relaxed), 1);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn source_tag_flows_into_events() {
        struct CaptureSource(Mutex<Option<SourceTag>>);

        impl PoolListener for CaptureSource {
            fn on_event(&self, event: &PoolEvent) {
                *self.0.lock().expect("lock poisoned") = Some(event.source);
            }
        }

        let capture = Arc::new(CaptureSource(Mutex::new(None)));

        let registry: PoolRegistry<CountingResource> = PoolRegistry::builder()
            .factory(|_identity: &TableIdentity, _slot| {
                Ok(CountingResource {
                    sequence: 0,
                    probe: Arc::new(Probe::default()),
                })
            })
            .source(SourceTag::new("wal_writer"))
            .listener(Arc::clone(&capture) as Arc<dyn PoolListener>)
            .build();

        assert_eq!(registry.source_tag(), SourceTag::new("wal_writer"));

        drop(registry.acquire(&trades()).expect("capacity is free"));

        assert_eq!(
            *capture.0.lock().expect("lock poisoned"),
            Some(SourceTag::new("wal_writer"))
        );
    }

    #[test]
    fn dropping_the_last_handle_closes_housed_resources() {
        let (registry, probe) = registry_with_probe(1, Duration::from_secs(60));

        drop(registry.acquire(&trades()).expect("capacity is free"));

        let clone = registry.clone();
        drop(registry);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 0);

        drop(clone);
        assert_eq!(probe.closed.load(Ordering::Relaxed), 1);
    }
}
