//! Resource creation capability.

use crate::resource::Resource;

/// Source of new resources for a [`Pool`](crate::Pool).
///
/// Called whenever the pool has no idle resource to hand out. Creation is not serialized by the
/// pool, so several calls may run at the same time.
///
/// Any `Fn() -> Result<R, E>` closure is a factory. State shared between calls, like a
/// connection counter, should be captured by the closure.
pub trait Factory {
    /// Resource type produced by this factory.
    type Resource: Resource;
    /// Error type reported when a resource cannot be created.
    type Error;

    /// Create a new resource.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the resource could not be created. The pool reports it to the caller
    /// as [`Error::Factory`](crate::Error::Factory) without retrying.
    fn create(&self) -> Result<Self::Resource, Self::Error>;
}

impl<F, R, E> Factory for F
where
    F: Fn() -> Result<R, E>,
    R: Resource,
{
    type Resource = R;
    type Error = E;

    fn create(&self) -> Result<R, E> {
        self()
    }
}
