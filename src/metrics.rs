use std::{
    borrow::Cow,
    sync::{Arc, LazyLock},
};

use opentelemetry::{
    global,
    metrics::{Counter, Gauge, Histogram},
    Key, KeyValue, StringValue, Value,
};

/// Central metrics singleton for pool metrics.
pub(crate) static POOL_METRICS: LazyLock<Arc<Metrics>> = LazyLock::new(|| Arc::new(Metrics::new()));

const KEY_POOL_NAME: Key = Key::from_static_str("db.client.connection.pool.name");
const KEY_STATE: Key = Key::from_static_str("db.client.connection.state");

/// Name used for pools which weren't given one.
pub(crate) const DEFAULT_POOL_NAME: &str = "default";

/// Storage for pool metrics.
pub(crate) struct Metrics {
    /// The number of resources that are currently in state described by the state attribute.
    pub(crate) conn_count: Gauge<u64>,
    /// The maximum number of idle resources allowed.
    pub(crate) idle_max: Gauge<u64>,
    /// The time it took to obtain a resource from the pool.
    pub(crate) wait_time: Histogram<f64>,
    /// The time it took to create a new resource.
    pub(crate) create_time: Histogram<f64>,
    /// The time between borrowing a resource and returning it to the pool.
    pub(crate) use_time: Histogram<f64>,
    /// Number of resources created by the factory.
    pub(crate) created: Counter<u64>,
    /// Number of acquisitions served from the idle store.
    pub(crate) reused: Counter<u64>,
    /// Number of resources closed by the pool.
    pub(crate) closed: Counter<u64>,
    /// Number of resources whose close operation failed.
    pub(crate) close_errors: Counter<u64>,
}

impl Metrics {
    /// Create new storage for pool metrics.
    ///
    /// You probably don't need this, as all pools use a central metrics singleton for storage.
    pub(crate) fn new() -> Self {
        let meter = global::meter("closepool");
        // db.client.connection.pool.name (string)
        // db.client.connection.state (idle / used)
        let conn_count = meter
            .u64_gauge("db.client.connection.count")
            .with_description("The number of connections that are currently in state described by the state attribute.")
            .build();
        // db.client.connection.pool.name (string)
        let idle_max = meter
            .u64_gauge("db.client.connection.idle.max")
            .with_description("The maximum number of idle open connections allowed.")
            .build();
        // db.client.connection.pool.name (string)
        let wait_time = meter
            .f64_histogram("db.client.connection.wait_time")
            .with_unit("s")
            .with_description("The time it took to obtain an open connection from the pool.")
            .build();
        // db.client.connection.pool.name (string)
        let create_time = meter
            .f64_histogram("db.client.connection.create_time")
            .with_unit("s")
            .with_description("The time it took to create a new connection.")
            .build();
        // db.client.connection.pool.name (string)
        let use_time = meter
            .f64_histogram("db.client.connection.use_time")
            .with_unit("s")
            .with_description(
                "The time between borrowing a connection and returning it to the pool.",
            )
            .build();
        let created = meter
            .u64_counter("closepool.resource.created")
            .with_description("Number of resources created by pool factories.")
            .build();
        let reused = meter
            .u64_counter("closepool.resource.reused")
            .with_description("Number of acquisitions served from idle resources.")
            .build();
        let closed = meter
            .u64_counter("closepool.resource.closed")
            .with_description("Number of resources closed by pools.")
            .build();
        let close_errors = meter
            .u64_counter("closepool.resource.close_errors")
            .with_description("Number of resources which failed to close.")
            .build();
        Metrics {
            conn_count,
            idle_max,
            wait_time,
            create_time,
            use_time,
            created,
            reused,
            closed,
            close_errors,
        }
    }

    pub(crate) fn record_state(&self, label: &[KeyValue; 1], state: &PoolState) {
        self.idle_max.record(state.capacity as u64, label);
        let idle_label = status_kv(label[0].clone(), "idle");
        self.conn_count.record(state.idle as u64, &idle_label);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Metrics::new()
    }
}

pub(crate) fn pool_kv(name: Cow<'static, str>) -> [KeyValue; 1] {
    [KeyValue::new(KEY_POOL_NAME, name)]
}

pub(crate) fn status_kv(name: KeyValue, status: &'static str) -> [KeyValue; 2] {
    [
        name,
        KeyValue::new(KEY_STATE, Value::String(StringValue::from(status))),
    ]
}

/// Point-in-time state of a pool.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[non_exhaustive]
pub struct PoolState {
    /// Maximum number of idle resources kept in the pool.
    pub capacity: usize,
    /// Current number of idle (not acquired) resources.
    pub idle: usize,
    /// Whether the pool has been closed.
    pub closed: bool,
}
