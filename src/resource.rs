//! Pooled resources and their lifetime.

use std::{
    fmt,
    ops::{Deref, DerefMut},
    time::Instant,
};

use crate::{factory::Factory, pool::Pool};

/// Resource which can be kept in a [`Pool`].
///
/// The pool never looks inside a resource. The only thing it needs is a way to close one that
/// won't be reused.
pub trait Resource {
    /// Error reported when closing fails.
    type Error: fmt::Display;

    /// Close the resource, releasing whatever it holds.
    ///
    /// Called at most once by the pool. The resource is dropped right after.
    ///
    /// # Errors
    ///
    /// Returns `Err` if cleanup failed. The pool logs the error and moves on.
    fn close(&mut self) -> Result<(), Self::Error>;
}

impl<R: Resource + ?Sized> Resource for Box<R> {
    type Error = R::Error;

    fn close(&mut self) -> Result<(), Self::Error> {
        (**self).close()
    }
}

/// Resource borrowed from a pool, returned to it when dropped.
pub struct Pooled<'p, F: Factory> {
    /// Originating pool.
    pool: &'p Pool<F>,
    /// Retrieval time.
    time: Instant,
    /// Original resource, `None` only after being detached.
    resource: Option<F::Resource>,
}

impl<'p, F: Factory> Pooled<'p, F> {
    /// Bundle resource with the pool it came from.
    pub(crate) fn new(pool: &'p Pool<F>, resource: F::Resource) -> Self {
        Self {
            pool,
            // This is different from time used in wait_time metric.
            time: Instant::now(),
            resource: Some(resource),
        }
    }

    /// Take the resource out of pool management.
    ///
    /// The resource won't be returned to the pool on drop, the caller becomes responsible for
    /// closing it.
    #[must_use]
    pub fn detach(mut self) -> F::Resource {
        self.record_use_time();
        self.resource
            .take()
            .expect("pooled resource is present until detached")
    }

    fn record_use_time(&self) {
        self.pool
            .metrics
            .use_time
            .record(self.time.elapsed().as_secs_f64(), &self.pool.label);
    }
}

impl<F: Factory> Deref for Pooled<'_, F> {
    type Target = F::Resource;

    fn deref(&self) -> &Self::Target {
        self.resource
            .as_ref()
            .expect("pooled resource is present until detached")
    }
}

impl<F: Factory> DerefMut for Pooled<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.resource
            .as_mut()
            .expect("pooled resource is present until detached")
    }
}

impl<F: Factory> AsRef<F::Resource> for Pooled<'_, F> {
    fn as_ref(&self) -> &F::Resource {
        self.deref()
    }
}

impl<F: Factory> AsMut<F::Resource> for Pooled<'_, F> {
    fn as_mut(&mut self) -> &mut F::Resource {
        self.deref_mut()
    }
}

impl<F> fmt::Debug for Pooled<'_, F>
where
    F: Factory,
    F::Resource: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pooled")
            .field("pool", &self.pool.name())
            .field("resource", &self.resource)
            .finish()
    }
}

impl<F: Factory> Drop for Pooled<'_, F> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            // Record time spent outside the pool.
            self.record_use_time();
            // Nobody else holds the resource anymore, so close it ourselves if the pool won't.
            if let Some(resource) = self.pool.release(resource) {
                self.pool.dispose(resource);
            }
        }
    }
}
