use std::num::NonZero;
use std::time::Duration;

use new_zealand::nz;

/// Capacity each identity gets unless the builder overrides it.
pub(crate) const DEFAULT_MAX_SLOTS: NonZero<usize> = nz!(4);

/// Idle lifetime before the reaper tears an instance down, unless overridden.
/// Matches the common default for inactive writers in the engines this serves.
pub(crate) const DEFAULT_IDLE_TTL: Duration = Duration::from_secs(120);

/// Limits governing a registry, fixed when the registry is built.
///
/// Obtained from [`PoolRegistry::configuration()`][crate::PoolRegistry::configuration];
/// set through [`PoolRegistry::builder()`][crate::PoolRegistry::builder].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PoolConfiguration {
    max_slots_per_identity: NonZero<usize>,
    idle_ttl: Duration,
}

impl PoolConfiguration {
    pub(crate) fn new(max_slots_per_identity: NonZero<usize>, idle_ttl: Duration) -> Self {
        Self {
            max_slots_per_identity,
            idle_ttl,
        }
    }

    /// The bound on slots per identity, counting checked-out and idle instances
    /// together.
    #[must_use]
    pub fn max_slots_per_identity(&self) -> NonZero<usize> {
        self.max_slots_per_identity
    }

    /// How long an instance may idle before a sweep tears it down.
    ///
    /// A zero duration reaps on the first observed idleness.
    #[must_use]
    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SLOTS, DEFAULT_IDLE_TTL)
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(PoolConfiguration: Send, Sync, Copy, std::fmt::Debug);

    #[test]
    fn default_matches_documented_values() {
        let configuration = PoolConfiguration::default();

        assert_eq!(configuration.max_slots_per_identity(), DEFAULT_MAX_SLOTS);
        assert_eq!(configuration.idle_ttl(), DEFAULT_IDLE_TTL);
    }

    #[test]
    fn accessors_return_constructor_inputs() {
        let configuration = PoolConfiguration::new(nz!(2), Duration::from_millis(100));

        assert_eq!(configuration.max_slots_per_identity(), nz!(2));
        assert_eq!(configuration.idle_ttl(), Duration::from_millis(100));
    }
}
