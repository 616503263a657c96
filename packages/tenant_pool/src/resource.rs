/// Contract between the pool and the expensive resource it keeps in rotation.
///
/// The pool never looks past these lifecycle hooks: transaction logic, sequencer
/// coordination and on-disk layout all stay on the resource's side of the seam.
/// Implementations are constructed by the factory closure given to
/// [`PoolRegistryBuilder::factory()`][crate::PoolRegistryBuilder::factory] and are
/// owned by the pool (or by the caller holding a [`Tenant`][crate::Tenant]) from
/// then on.
///
/// This is a composition seam, not an inheritance one: any type can participate in
/// pooling without embedding pool machinery.
pub trait PoolableResource: Send + 'static {
    /// Error produced by the fallible lifecycle hooks.
    type Error: std::error::Error + Send + 'static;

    /// Brings an idle instance back into service.
    ///
    /// The registry invokes this immediately before handing the instance out for
    /// reuse. This is also where current identity metadata gets re-resolved, so a
    /// table rename becomes visible here rather than being propagated eagerly to
    /// every pooled instance.
    ///
    /// A failure permanently removes this instance from the pool; the acquisition
    /// that triggered it falls through to constructing a fresh instance.
    fn reactivate(&mut self) -> Result<(), Self::Error>;

    /// Discards any uncommitted work.
    ///
    /// Runs on every close, before the instance is considered for reuse, so an
    /// idle instance never carries partial state into its next activation. A
    /// failure marks the instance distressed and it is torn down instead of
    /// returned to its slot.
    fn rollback(&mut self) -> Result<(), Self::Error>;

    /// Tears down the underlying resource.
    ///
    /// Called at most once, when the instance leaves the pool for good. There is
    /// no error channel: whatever cannot be released here is gone regardless.
    fn close(&mut self);
}
