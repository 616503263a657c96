//! Reuse of expensive per-table stateful write resources instead of constructing
//! and tearing them down on every transaction.
//!
//! This crate provides [`PoolRegistry`], a registry that maps a table identity to
//! a bounded run of reusable resource slots, hands out atomic race-free exclusive
//! ownership of one instance at a time, reclaims idle capacity through a TTL
//! sweep, and keeps broken instances out of rotation for good.
//!
//! # Key features
//!
//! - **Exclusive ownership transfer**: an acquired [`Tenant<R>`] is owned by
//!   exactly one caller; no interleaving of concurrent acquisitions can hand the
//!   same live instance to two owners
//! - **Per-slot claims**: exclusivity is enforced with a per-slot atomic
//!   compare-and-swap, never a registry-wide lock, so unrelated tables never
//!   contend
//! - **Reuse over reconstruction**: a healthy close parks the instance in its
//!   slot with the underlying resource still open; the next acquisition
//!   reactivates it instead of paying the construction cost
//! - **Fail-fast capacity**: exhaustion is an immediate, reportable error -
//!   never a silent queue that can deadlock under backpressure
//! - **Sticky fault isolation**: a distressed instance is torn down on close and
//!   never reused; only a fresh construction resumes service for its table
//! - **Idle-TTL reaping**: a background [`Reaper`] (or a piggybacked
//!   [`PoolRegistry::reap_idle()`] call) tears down instances that idle too long
//! - **Typed lifecycle events**: every transition is emitted to [`PoolListener`]
//!   subscribers, tagged with a per-registry [`SourceTag`], for an external
//!   metrics collaborator to aggregate
//!
//! The resource itself stays opaque: anything implementing [`PoolableResource`]
//! can be pooled, and its transaction logic, collaborators and storage format
//! never leak into the pool.
//!
//! # Example
//!
//! ```rust
//! use std::convert::Infallible;
//!
//! use tenant_pool::{PoolRegistry, PoolableResource, TableIdentity};
//!
//! /// Stand-in for an expensive write resource, e.g. a write-ahead-log writer.
//! struct JournalWriter {
//!     table: TableIdentity,
//! }
//!
//! impl PoolableResource for JournalWriter {
//!     type Error = Infallible;
//!
//!     fn reactivate(&mut self) -> Result<(), Self::Error> {
//!         // Re-resolve identity metadata, reopen handles closed while idling.
//!         Ok(())
//!     }
//!
//!     fn rollback(&mut self) -> Result<(), Self::Error> {
//!         // Discard uncommitted work.
//!         Ok(())
//!     }
//!
//!     fn close(&mut self) {
//!         // Tear down the underlying resource.
//!     }
//! }
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = PoolRegistry::builder()
//!     .factory(|identity: &TableIdentity, _slot| {
//!         Ok(JournalWriter {
//!             table: identity.clone(),
//!         })
//!     })
//!     .build();
//!
//! let trades = TableIdentity::new("trades", 1);
//!
//! // First acquisition constructs; the drop parks the instance for reuse.
//! let writer = registry.acquire(&trades)?;
//! drop(writer);
//!
//! // Second acquisition reuses the idle instance instead of constructing.
//! let writer = registry.acquire(&trades)?;
//! assert_eq!(registry.live_count(&trades), 1);
//! drop(writer);
//!
//! registry.shutdown();
//! # Ok(())
//! # }
//! ```

mod builder;
mod config;
mod constants;
mod entry;
mod error;
mod events;
mod identity;
mod reaper;
mod registry;
mod resource;
mod tenant;

pub use builder::PoolRegistryBuilder;
pub use config::PoolConfiguration;
pub use error::AcquireError;
pub use events::{PoolEvent, PoolEventKind, PoolListener, SourceTag};
pub use identity::TableIdentity;
pub use reaper::Reaper;
pub use registry::PoolRegistry;
pub use resource::PoolableResource;
pub use tenant::Tenant;
