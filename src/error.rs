//! Error types and error support code.

/// Error type returned by pool operations.
///
/// `E` is the error type of the resource [`Factory`](crate::Factory), passed through unchanged.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error<E> {
    /// Pool was constructed with a capacity of less than one idle resource.
    #[error("invalid pool capacity {0}, must be at least 1")]
    InvalidCapacity(usize),
    /// Pool has been closed, no resources can be acquired from it.
    #[error("pool has been closed")]
    PoolClosed,
    /// Resource factory failed to create a new resource.
    #[error("resource factory error: {0}")]
    Factory(E),
}

impl<E> Error<E> {
    /// Check whether this error was caused by acquiring from a closed pool.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::PoolClosed)
    }

    /// Extract the factory error, if this is one.
    #[must_use]
    pub fn into_factory_error(self) -> Option<E> {
        match self {
            Self::Factory(err) => Some(err),
            _ => None,
        }
    }
}
