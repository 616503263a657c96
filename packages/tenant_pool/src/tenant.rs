use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use crate::TableIdentity;
use crate::entry::EntrySet;
use crate::resource::PoolableResource;

const ERR_NO_RESOURCE: &str =
    "a live tenant must house its resource - it is only taken out on close or detach";

/// Exclusive handle to one pooled resource, owned by the caller until closed.
///
/// Obtained from [`PoolRegistry::acquire()`][crate::PoolRegistry::acquire]. The
/// wrapped resource is reached through [`Deref`]/[`DerefMut`]; the handle itself
/// only adds the pool lifecycle on top.
///
/// # Closing
///
/// Dropping the tenant is closing it. A healthy drop first rolls back any
/// uncommitted work, then returns the instance to its slot where it idles with
/// the underlying resource still open, ready for the next acquisition. The drop
/// degrades to a hard close - tear down and expel - when any of these hold:
///
/// - the tenant was [marked distressed](Self::mark_distressed),
/// - the rollback failed,
/// - the registry refuses the return (identity dropped or shutdown under way).
///
/// [`close()`](Self::close) is the same thing spelled as a method, for call
/// sites where a bare `drop` would read as an accident.
///
/// # Fault isolation
///
/// Distress is sticky: once set it cannot be cleared on this instance, and a
/// distressed instance never re-enters rotation. Only a freshly constructed
/// instance resumes service for the identity.
pub struct Tenant<R: PoolableResource> {
    resource: Option<R>,
    membership: Option<Arc<EntrySet<R>>>,
    identity: TableIdentity,
    slot: usize,
    distressed: bool,
}

impl<R: PoolableResource> Tenant<R> {
    pub(crate) fn new(resource: R, membership: Arc<EntrySet<R>>, slot: usize) -> Self {
        let identity = membership.identity().clone();

        Self {
            resource: Some(resource),
            membership: Some(membership),
            identity,
            slot,
            distressed: false,
        }
    }

    /// The table this resource serves.
    #[inline]
    #[must_use]
    pub fn identity(&self) -> &TableIdentity {
        &self.identity
    }

    /// The position index of the slot housing this instance.
    #[inline]
    #[must_use]
    pub fn slot_index(&self) -> usize {
        self.slot
    }

    /// Whether this instance has been marked unsafe to reuse.
    #[inline]
    #[must_use]
    pub fn is_distressed(&self) -> bool {
        self.distressed
    }

    /// Marks this instance as unsafe to ever reuse.
    ///
    /// One-way: there is no way to clear the flag. The next close bypasses the
    /// idle path and tears the instance down, freeing its slot for a fresh
    /// construction.
    pub fn mark_distressed(&mut self) {
        self.distressed = true;
    }

    /// Closes the tenant. Equivalent to dropping it; see the type docs for how a
    /// close routes between reuse and teardown.
    pub fn close(self) {
        // Drop does the routing.
    }

    /// Permanently removes the instance from pool management and hands the raw
    /// resource to the caller.
    ///
    /// The slot is freed for a future fresh construction and the expulsion event
    /// is emitted. From here on the pool is out of the picture entirely: the
    /// caller owns the resource's remaining lifecycle, and no later action can
    /// touch pool bookkeeping for this instance again.
    #[must_use]
    pub fn detach(mut self) -> R {
        let resource = self.resource.take().expect(ERR_NO_RESOURCE);

        if let Some(membership) = self.membership.take() {
            membership.expel(self.slot);
        }

        resource
    }
}

impl<R: PoolableResource> Deref for Tenant<R> {
    type Target = R;

    fn deref(&self) -> &Self::Target {
        self.resource.as_ref().expect(ERR_NO_RESOURCE)
    }
}

impl<R: PoolableResource> DerefMut for Tenant<R> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource.as_mut().expect(ERR_NO_RESOURCE)
    }
}

impl<R: PoolableResource> fmt::Debug for Tenant<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tenant")
            .field("identity", &self.identity)
            .field("slot", &self.slot)
            .field("distressed", &self.distressed)
            .finish_non_exhaustive()
    }
}

impl<R: PoolableResource> Drop for Tenant<R> {
    fn drop(&mut self) {
        let Some(mut resource) = self.resource.take() else {
            // Already detached; nothing of ours is left to clean up.
            return;
        };

        // Uncommitted work never survives a close. An instance that cannot even
        // roll back is no longer trustworthy for reuse.
        if resource.rollback().is_err() {
            self.distressed = true;
        }

        let Some(membership) = self.membership.take() else {
            resource.close();
            return;
        };

        if !self.distressed {
            match membership.try_return(self.slot, resource) {
                Ok(()) => return,
                Err(refused) => resource = refused,
            }
        }

        resource.close();
        membership.expel(self.slot);
    }
}
