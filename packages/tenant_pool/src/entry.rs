use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::TableIdentity;
use crate::constants::ERR_POISONED_LOCK;
use crate::events::{PoolEvent, PoolEventKind};
use crate::registry::PoolShared;
use crate::resource::PoolableResource;

// Claim states of one slot. Every transition is a compare-and-swap or happens under
// an already-won claim, so a slot has exactly one owner at any instant:
//
//   Vacant  -> Claimed   acquire, before fresh construction
//   Idle    -> Claimed   acquire (reuse), a reap sweep, or a retire sweep
//   Claimed -> Idle      healthy return
//   Claimed -> Vacant    expel
const STATE_VACANT: u8 = 0;
const STATE_IDLE: u8 = 1;
const STATE_CLAIMED: u8 = 2;

const ERR_SLOT_OUT_OF_RANGE: &str = "slot index beyond the configured capacity of this identity";
const ERR_IDLE_WITHOUT_RESOURCE: &str =
    "claimed an idle slot that houses no resource - the claim discipline was violated";

/// One pool slot: the claim state plus the housed idle resource, if any.
///
/// The mutex is never contended in steady state - only the claim winner touches
/// the housed data - but it makes the handover points explicit and keeps the
/// release timestamp and the resource moving together.
struct Entry<R> {
    state: AtomicU8,
    housed: Mutex<Housed<R>>,
}

struct Housed<R> {
    resource: Option<R>,
    released_at: Option<Instant>,
}

impl<R> Entry<R> {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(STATE_VACANT),
            housed: Mutex::new(Housed {
                resource: None,
                released_at: None,
            }),
        }
    }
}

/// The slot block for one identity: a fixed run of entries plus the retire flag
/// that `close_all` and `shutdown` use to refuse further returns.
///
/// Claims are per slot. Nothing in here takes a block-wide lock, so callers
/// working on different slots never contend with each other.
pub(crate) struct EntrySet<R: PoolableResource> {
    identity: TableIdentity,
    entries: Box<[Entry<R>]>,
    retired: AtomicBool,
    shared: Arc<PoolShared>,
}

impl<R: PoolableResource> EntrySet<R> {
    pub(crate) fn new(identity: TableIdentity, shared: Arc<PoolShared>) -> Self {
        let capacity = shared.config.max_slots_per_identity().get();

        Self {
            identity,
            entries: (0..capacity).map(|_| Entry::new()).collect(),
            retired: AtomicBool::new(false),
            shared,
        }
    }

    pub(crate) fn identity(&self) -> &TableIdentity {
        &self.identity
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    /// Marks the block as no longer accepting returns. One-way.
    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }

    fn entry(&self, slot: usize) -> &Entry<R> {
        self.entries.get(slot).expect(ERR_SLOT_OUT_OF_RANGE)
    }

    fn emit(&self, kind: PoolEventKind, slot: usize) {
        self.shared.listeners.emit(&PoolEvent {
            source: self.shared.source,
            kind,
            identity: self.identity.clone(),
            slot,
        });
    }

    /// Claims an idle slot and takes its housed resource out.
    ///
    /// Losing every per-slot race returns `None`; the caller then either claims a
    /// vacant slot or reports exhaustion.
    pub(crate) fn try_claim_idle(&self) -> Option<(usize, R)> {
        for (slot, entry) in self.entries.iter().enumerate() {
            if entry
                .state
                .compare_exchange(STATE_IDLE, STATE_CLAIMED, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                continue;
            }

            let resource = {
                let mut housed = entry.housed.lock().expect(ERR_POISONED_LOCK);
                housed.released_at = None;
                housed.resource.take()
            }
            .expect(ERR_IDLE_WITHOUT_RESOURCE);

            return Some((slot, resource));
        }

        None
    }

    /// Claims a vacant slot for fresh construction.
    pub(crate) fn try_claim_vacant(&self) -> Option<usize> {
        self.entries.iter().enumerate().find_map(|(slot, entry)| {
            entry
                .state
                .compare_exchange(STATE_VACANT, STATE_CLAIMED, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
                .then_some(slot)
        })
    }

    /// Houses a resource back into its claimed slot and re-idles it.
    ///
    /// Refusal hands the resource back to the caller, which must hard-close it:
    /// either the block is retired, or a retire swept past while the slot was
    /// still claimed and we won the teardown claim ourselves.
    pub(crate) fn try_return(&self, slot: usize, resource: R) -> Result<(), R> {
        if self.is_retired() {
            return Err(resource);
        }

        let entry = self.entry(slot);
        {
            let mut housed = entry.housed.lock().expect(ERR_POISONED_LOCK);
            housed.resource = Some(resource);
            housed.released_at = Some(Instant::now());
        }
        let previous = entry.state.swap(STATE_IDLE, Ordering::AcqRel);
        debug_assert_eq!(previous, STATE_CLAIMED);

        // A retire sweep may have passed this slot while it was still claimed by
        // us. Whoever wins the claim now owns the teardown: if we win, the caller
        // hard-closes; if the sweeper wins, it closes.
        if self.is_retired()
            && entry
                .state
                .compare_exchange(STATE_IDLE, STATE_CLAIMED, Ordering::AcqRel, Ordering::Relaxed)
                .is_ok()
        {
            let resource = {
                let mut housed = entry.housed.lock().expect(ERR_POISONED_LOCK);
                housed.released_at = None;
                housed.resource.take()
            }
            .expect(ERR_IDLE_WITHOUT_RESOURCE);

            return Err(resource);
        }

        self.emit(PoolEventKind::Returned, slot);
        Ok(())
    }

    /// Frees a claimed slot for a future fresh construction.
    ///
    /// The caller must hold the claim, with the housed resource already taken out
    /// and torn down. Emits the expulsion event.
    pub(crate) fn expel(&self, slot: usize) {
        let entry = self.entry(slot);
        {
            let mut housed = entry.housed.lock().expect(ERR_POISONED_LOCK);
            debug_assert!(housed.resource.is_none());
            housed.released_at = None;
        }
        let previous = entry.state.swap(STATE_VACANT, Ordering::AcqRel);
        debug_assert_eq!(previous, STATE_CLAIMED);

        self.emit(PoolEventKind::Expelled, slot);
    }

    /// Releases a claimed-but-never-filled slot after a failed construction.
    ///
    /// No event: nothing was ever created in the slot.
    pub(crate) fn release_vacant(&self, slot: usize) {
        let previous = self.entry(slot).state.swap(STATE_VACANT, Ordering::AcqRel);
        debug_assert_eq!(previous, STATE_CLAIMED);
    }

    pub(crate) fn idle_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state.load(Ordering::Acquire) == STATE_IDLE)
            .count()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.state.load(Ordering::Acquire) != STATE_VACANT)
            .count()
    }

    /// One TTL sweep over this block. Returns how many instances were torn down.
    ///
    /// Contends with acquirers only through the identical per-slot claim, so at
    /// most one of {sweep, acquirer} ever acts on a given idle slot.
    pub(crate) fn reap_expired(&self, now: Instant, ttl: Duration) -> usize {
        let mut reaped: usize = 0;

        for (slot, entry) in self.entries.iter().enumerate() {
            // Cheap pre-check before contending on the claim.
            if entry.state.load(Ordering::Acquire) != STATE_IDLE {
                continue;
            }

            if entry
                .state
                .compare_exchange(STATE_IDLE, STATE_CLAIMED, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                // An acquirer got there first; its claim, its call.
                continue;
            }

            // The release timestamp may be fresher than whatever made us look at
            // this slot - a full claim/return cycle can have happened since the
            // pre-check. Decide under the claim, where the timestamp cannot move.
            let mut housed = entry.housed.lock().expect(ERR_POISONED_LOCK);
            let expired = housed
                .released_at
                .is_none_or(|released| now.saturating_duration_since(released) >= ttl);

            if !expired {
                drop(housed);
                let previous = entry.state.swap(STATE_IDLE, Ordering::AcqRel);
                debug_assert_eq!(previous, STATE_CLAIMED);
                continue;
            }

            let mut resource = housed.resource.take().expect(ERR_IDLE_WITHOUT_RESOURCE);
            housed.released_at = None;
            drop(housed);

            // Slow teardown stays outside the slot bookkeeping.
            resource.close();

            let previous = entry.state.swap(STATE_VACANT, Ordering::AcqRel);
            debug_assert_eq!(previous, STATE_CLAIMED);

            self.emit(PoolEventKind::Reaped, slot);
            reaped = reaped.saturating_add(1);
        }

        reaped
    }

    /// Claims and tears down every idle instance in the block.
    ///
    /// Used when the identity is dropped or the registry shuts down. Checked-out
    /// instances are left to their owners, whose returns this block now refuses.
    pub(crate) fn close_idle(&self) -> usize {
        let mut closed: usize = 0;

        for (slot, entry) in self.entries.iter().enumerate() {
            if entry
                .state
                .compare_exchange(STATE_IDLE, STATE_CLAIMED, Ordering::AcqRel, Ordering::Relaxed)
                .is_err()
            {
                continue;
            }

            let mut resource = {
                let mut housed = entry.housed.lock().expect(ERR_POISONED_LOCK);
                housed.released_at = None;
                housed.resource.take()
            }
            .expect(ERR_IDLE_WITHOUT_RESOURCE);

            resource.close();

            let previous = entry.state.swap(STATE_VACANT, Ordering::AcqRel);
            debug_assert_eq!(previous, STATE_CLAIMED);

            self.emit(PoolEventKind::Expelled, slot);
            closed = closed.saturating_add(1);
        }

        closed
    }
}

impl<R: PoolableResource> Drop for EntrySet<R> {
    fn drop(&mut self) {
        // A return can land in a block that a retire sweep already passed; the
        // resource then sits housed in an unreachable block. Nothing re-enters
        // rotation from here, so tear down whatever is still housed.
        for entry in &mut self.entries {
            let housed = entry.housed.get_mut().expect(ERR_POISONED_LOCK);
            if let Some(mut resource) = housed.resource.take() {
                resource.close();
            }
        }
    }
}
