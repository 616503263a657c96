use thiserror::Error;

use crate::TableIdentity;

/// Errors that can occur when acquiring a resource from a
/// [`PoolRegistry`][crate::PoolRegistry].
///
/// The generic parameter is the error type of the pooled resource, surfaced when
/// constructing a fresh instance fails.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AcquireError<E>
where
    E: std::error::Error + 'static,
{
    /// All slots for the identity are occupied, either checked out or idling.
    ///
    /// The registry never queues acquisitions behind capacity - waiting on a
    /// resource pool under backpressure risks deadlock - so exhaustion is always
    /// reported to the caller, who owns the retry/backoff policy.
    #[error("all {max_slots} slots for table '{identity}' are occupied")]
    Exhausted {
        /// The table whose capacity is exhausted.
        identity: TableIdentity,

        /// The configured slot ceiling for each identity.
        max_slots: usize,
    },

    /// The registry is shutting down and no longer hands out resources.
    #[error("the registry is shutting down and no longer hands out resources")]
    ShuttingDown,

    /// The factory failed to construct a fresh resource.
    #[error("constructing a fresh resource for table '{identity}' failed")]
    Construction {
        /// The table the resource was being constructed for.
        identity: TableIdentity,

        /// The factory's failure.
        #[source]
        source: E,
    },
}
