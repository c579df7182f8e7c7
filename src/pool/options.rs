use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Sentinel ping query shipped as the default. Any real database will
/// reject it, so `ping_enabled` stays a no-op until a caller configures a
/// real probe statement.
const DEFAULT_PING_QUERY: &str = "NO PING QUERY SET";

/// Configuration for a [`PooledDataSource`](crate::PooledDataSource).
///
/// Mutating any field here through one of `PooledDataSource`'s setters
/// drains the pool (see
/// [`force_close_all`](crate::PooledDataSource::force_close_all)) before the
/// new configuration takes effect, so that no caller ever observes a
/// connection that was opened under a stale identity.
#[derive(Debug, Clone)]
pub struct PoolOptions {
    pub(crate) url: String,
    pub(crate) default_username: String,
    pub(crate) default_password: String,
    pub(crate) autocommit: bool,

    pub(crate) max_active_connections: u32,
    pub(crate) max_idle_connections: u32,
    pub(crate) max_checkout_time: Duration,
    pub(crate) time_to_wait: Duration,
    pub(crate) max_local_bad_connection_tolerance: u32,

    pub(crate) ping_query: String,
    pub(crate) ping_enabled: bool,
    /// Milliseconds; negative means "never probe", `0` means "always probe
    /// when enabled" (since an idle time of exactly zero is vanishingly
    /// rare).
    pub(crate) ping_connections_not_used_for_ms: i64,
}

impl PoolOptions {
    /// Starts building a configuration for the given connection URL, with
    /// every other field at its documented default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            default_username: String::new(),
            default_password: String::new(),
            autocommit: true,
            max_active_connections: 10,
            max_idle_connections: 5,
            max_checkout_time: Duration::from_millis(20_000),
            time_to_wait: Duration::from_millis(20_000),
            max_local_bad_connection_tolerance: 3,
            ping_query: DEFAULT_PING_QUERY.to_owned(),
            ping_enabled: false,
            ping_connections_not_used_for_ms: 0,
        }
    }

    /// Sets the default credentials new connections authenticate with
    /// unless overridden per-call via
    /// [`PooledDataSource::acquire_as`](crate::PooledDataSource::acquire_as).
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.default_username = username.into();
        self.default_password = password.into();
        self
    }

    /// Sets whether connections handed out by the pool run outside
    /// auto-commit mode. When `false`, the pool rolls back any open
    /// transaction on reclaim, release, and probe.
    pub fn with_autocommit(mut self, autocommit: bool) -> Self {
        self.autocommit = autocommit;
        self
    }

    /// Upper bound on simultaneous checkouts. Default 10.
    pub fn with_max_active_connections(mut self, max: u32) -> Self {
        self.max_active_connections = max;
        self
    }

    /// Upper bound on idle retention; excess returns are closed. Default 5.
    pub fn with_max_idle_connections(mut self, max: u32) -> Self {
        self.max_idle_connections = max;
        self
    }

    /// A checkout older than this becomes eligible for reclamation by a
    /// waiter. Default 20s.
    pub fn with_max_checkout_time(mut self, duration: Duration) -> Self {
        self.max_checkout_time = duration;
        self
    }

    /// Single wait slice inside `acquire`; a waiter that times out
    /// re-examines pool state rather than failing. Default 20s.
    pub fn with_time_to_wait(mut self, duration: Duration) -> Self {
        self.time_to_wait = duration;
        self
    }

    /// Bounds retries within a single `acquire` call before it gives up with
    /// [`Error::NoGoodConnection`](crate::Error::NoGoodConnection); the
    /// effective budget is `max_idle_connections + tolerance`. Default 3.
    pub fn with_max_local_bad_connection_tolerance(mut self, tolerance: u32) -> Self {
        self.max_local_bad_connection_tolerance = tolerance;
        self
    }

    /// The statement executed to probe liveness when `ping_enabled` is set.
    pub fn with_ping_query(mut self, query: impl Into<String>) -> Self {
        self.ping_query = query.into();
        self
    }

    /// Enables liveness probing beyond the cheap `is_closed` check.
    pub fn with_ping_enabled(mut self, enabled: bool) -> Self {
        self.ping_enabled = enabled;
        self
    }

    /// Only probe a candidate if it has been idle for longer than
    /// `threshold_ms`. A negative value disables probing entirely,
    /// regardless of [`with_ping_enabled`](Self::with_ping_enabled); `0`
    /// probes unconditionally whenever probing is enabled. Default 0.
    pub fn with_ping_connections_not_used_for(mut self, threshold_ms: i64) -> Self {
        self.ping_connections_not_used_for_ms = threshold_ms;
        self
    }

    pub(crate) fn connection_type_code(&self, username: &str, password: &str) -> u64 {
        connection_type_code(&self.url, username, password)
    }
}

/// Fingerprint of `(url, username, password)`, used to detect connections
/// left over from a previous configuration.
pub(crate) fn connection_type_code(url: &str, username: &str, password: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    username.hash(&mut hasher);
    password.hash(&mut hasher);
    hasher.finish()
}
