use std::{
    borrow::Cow,
    fmt,
    ops::Deref,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError};
use opentelemetry::KeyValue;
use parking_lot::Mutex;
use tracing::{debug, debug_span, warn};

use crate::{
    config::PoolConfig,
    error::Error,
    factory::Factory,
    metrics::{pool_kv, Metrics, PoolState, DEFAULT_POOL_NAME, POOL_METRICS},
    resource::{Pooled, Resource},
};

/// Bounded pool of reusable resources.
///
/// Resources are created on demand by a [`Factory`] and kept idle after use, up to the pool
/// capacity. Acquisition never waits: it either reuses an idle resource or creates a new one.
///
/// Idle resources live in a bounded channel. Acquiring only receives from it and takes no lock.
/// Releasing and closing share a single lock, so nothing can be sent into the idle store once
/// it starts being drained.
pub struct Pool<F: Factory> {
    /// Pool name.
    name: Cow<'static, str>,
    /// Pool label.
    pub(crate) label: [KeyValue; 1],
    /// Linked metrics storage.
    pub(crate) metrics: Arc<Metrics>,
    /// Maximum number of idle resources.
    capacity: usize,
    /// Receiving half of the idle store.
    idle: Receiver<F::Resource>,
    /// Sending half of the idle store, `None` once the pool is closed.
    returns: Mutex<Option<Sender<F::Resource>>>,
    /// Set under the `returns` lock, before the idle store is drained.
    closed: AtomicBool,
    /// Resource factory.
    factory: F,
}

impl<F: Factory> Pool<F> {
    /// Create a new pool keeping up to `capacity` idle resources.
    ///
    /// No resources are created up front.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn new(factory: F, capacity: usize) -> Result<Self, Error<F::Error>> {
        Self::build(factory, capacity, None)
    }

    /// Create a new pool from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if configured capacity is zero.
    pub fn from_config(factory: F, config: &PoolConfig) -> Result<Self, Error<F::Error>> {
        Self::build(
            factory,
            config.capacity,
            config.name.clone().map(Cow::Owned),
        )
    }

    fn build(
        factory: F,
        capacity: usize,
        name: Option<Cow<'static, str>>,
    ) -> Result<Self, Error<F::Error>> {
        if capacity < 1 {
            return Err(Error::InvalidCapacity(capacity));
        }
        let name = name.unwrap_or(Cow::Borrowed(DEFAULT_POOL_NAME));
        let (returns, idle) = crossbeam_channel::bounded(capacity);
        let pool = Self {
            label: pool_kv(name.clone()),
            name,
            metrics: POOL_METRICS.deref().clone(),
            capacity,
            idle,
            returns: Mutex::new(Some(returns)),
            closed: AtomicBool::new(false),
            factory,
        };
        pool.metrics.record_state(&pool.label, &pool.state());
        debug!(name = pool.name(), capacity, "pool created");
        Ok(pool)
    }

    /// Acquire a resource, reusing an idle one if there is any.
    ///
    /// Never blocks on the pool itself. When no resource is idle, a new one is created by the
    /// factory, which may take as long as it needs to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PoolClosed`] if the pool has been closed, and [`Error::Factory`] if a
    /// new resource could not be created.
    pub fn acquire(&self) -> Result<F::Resource, Error<F::Error>> {
        let now = Instant::now();
        let span = debug_span!("pool_acquire", name = self.name()).entered();
        let resource = match self.idle.try_recv() {
            Ok(resource) => {
                if self.closed.load(Ordering::Acquire) {
                    // Raced with a drain in progress, which now can't reach this resource.
                    debug!("acquired resource from a closing pool");
                    self.dispose(resource);
                    return Err(Error::PoolClosed);
                }
                debug!("reusing idle resource");
                self.metrics.reused.add(1, &self.label);
                self.record_idle();
                resource
            }
            Err(TryRecvError::Disconnected) => return Err(Error::PoolClosed),
            Err(TryRecvError::Empty) => {
                // Closed flag goes up before the drain, check it before creating anything.
                if self.closed.load(Ordering::Acquire) {
                    return Err(Error::PoolClosed);
                }
                debug!("creating new resource");
                let created_at = Instant::now();
                let resource = self.factory.create().map_err(Error::Factory)?;
                self.metrics
                    .create_time
                    .record(created_at.elapsed().as_secs_f64(), &self.label);
                self.metrics.created.add(1, &self.label);
                resource
            }
        };
        drop(span);
        self.metrics
            .wait_time
            .record(now.elapsed().as_secs_f64(), &self.label);
        Ok(resource)
    }

    /// Acquire a resource wrapped in a guard which releases it back to the pool when dropped.
    ///
    /// # Errors
    ///
    /// Same as [`Self::acquire`].
    pub fn get(&self) -> Result<Pooled<'_, F>, Error<F::Error>> {
        self.acquire().map(|resource| Pooled::new(self, resource))
    }

    /// Return a resource to the pool.
    ///
    /// The resource becomes idle if there is room for it, otherwise it is closed right away.
    ///
    /// If the pool is already closed, the resource is not touched and is handed back, leaving
    /// its disposal to the caller.
    #[must_use = "a resource handed back by a closed pool must be closed by the caller"]
    pub fn release(&self, resource: F::Resource) -> Option<F::Resource> {
        let returns = self.returns.lock();
        let Some(sender) = returns.as_ref() else {
            debug!(name = self.name(), "released resource into a closed pool");
            return Some(resource);
        };
        match sender.try_send(resource) {
            Ok(()) => {
                debug!(name = self.name(), "resource returned to idle store");
                self.record_idle();
                None
            }
            Err(TrySendError::Full(resource)) => {
                debug!(name = self.name(), "idle store is full, closing resource");
                self.dispose(resource);
                None
            }
            Err(TrySendError::Disconnected(resource)) => Some(resource),
        }
    }

    /// Close the pool, closing all idle resources.
    ///
    /// Subsequent acquisitions fail with [`Error::PoolClosed`]. Calling this more than once has
    /// no additional effect. Failure to close a resource doesn't stop the rest from being
    /// closed.
    pub fn close(&self) {
        let mut returns = self.returns.lock();
        let Some(sender) = returns.take() else {
            return;
        };
        self.closed.store(true, Ordering::Release);
        // Nothing can be sent while the lock is held, so the store only shrinks from here.
        let mut drained = 0_usize;
        for resource in self.idle.try_iter() {
            self.dispose(resource);
            drained += 1;
        }
        drop(sender);
        drop(returns);
        self.record_idle();
        debug!(name = self.name(), drained, "pool closed");
    }

    /// Close a resource which is not going back into the idle store.
    pub(crate) fn dispose(&self, mut resource: F::Resource) {
        self.metrics.closed.add(1, &self.label);
        if let Err(err) = resource.close() {
            warn!(name = self.name(), error = %err, "failed to close resource");
            self.metrics.close_errors.add(1, &self.label);
        }
    }

    /// Check whether the pool has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Maximum number of idle resources kept in the pool.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Current number of idle resources.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.idle.len()
    }

    /// Pool name, as used in logs and metrics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a snapshot of pool counts.
    #[must_use]
    pub fn state(&self) -> PoolState {
        PoolState {
            capacity: self.capacity,
            idle: self.idle(),
            closed: self.is_closed(),
        }
    }

    fn record_idle(&self) {
        self.metrics.record_state(&self.label, &self.state());
    }
}

impl<F: Factory> Drop for Pool<F> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<F: Factory> fmt::Debug for Pool<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name())
            .field("capacity", &self.capacity)
            .field("idle", &self.idle())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
