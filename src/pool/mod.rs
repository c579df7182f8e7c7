//! A synchronous, thread-safe pool of database connections.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::connection::ConnectionFactory;
use crate::error::Result;

mod handle;
mod options;
mod ping;
mod shared;
mod state;
mod wrapper;

pub use self::handle::PoolConnection;
pub use self::options::PoolOptions;
pub use self::state::PoolStatistics;

use self::shared::Shared;

/// A pool of database connections fronting a [`ConnectionFactory`].
///
/// Clone is cheap: every clone shares the same underlying monitor, idle
/// list and active list, since it's just an `Arc` around the same shared
/// internals.
pub struct PooledDataSource<F: ConnectionFactory> {
    shared: Arc<Shared<F>>,
}

impl<F: ConnectionFactory> PooledDataSource<F> {
    /// Creates a pool fronting `factory`, configured by `options`.
    pub fn new(factory: F, options: PoolOptions) -> Self {
        Self {
            shared: Arc::new(Shared::new(factory, options)),
        }
    }

    /// Acquires a connection using the pool's configured default
    /// credentials, blocking until one becomes available.
    ///
    /// Loops internally through idle reuse, growth, overdue reclamation and
    /// bounded waiting, until it either succeeds or exhausts the local
    /// bad-connection retry budget.
    pub fn acquire(&self) -> Result<PoolConnection<F>> {
        let (username, password) = self.shared.default_credentials();
        self.acquire_as(&username, &password)
    }

    /// Acquires a connection, authenticating as `username` / `password`
    /// instead of the pool's configured defaults for this one checkout.
    ///
    /// If these credentials don't match the pool's current identity
    /// fingerprint, the connection this mints will be discarded rather than
    /// idled when it is released.
    pub fn acquire_as(&self, username: &str, password: &str) -> Result<PoolConnection<F>> {
        let cell = self.shared.acquire_cell(username, password)?;
        Ok(PoolConnection::new(cell, Arc::clone(&self.shared)))
    }

    /// Drains the pool: for every idle and active connection, rolls it back
    /// (if non-autocommit) and closes it, swallowing per-connection errors,
    /// then recomputes the expected connection fingerprint.
    ///
    /// Called automatically by every identity-affecting configuration
    /// setter; callers may also invoke it directly to force every
    /// currently-idle connection closed without changing any configuration.
    pub fn force_close_all(&self) {
        self.shared.force_close_all();
    }

    /// Returns a snapshot of the pool's counters.
    pub fn get_pool_state(&self) -> PoolStatistics {
        self.shared.stats()
    }

    /// Returns a clone of the pool's current configuration.
    pub fn options(&self) -> PoolOptions {
        self.shared.options_snapshot()
    }

    /// Sets the default credentials new connections authenticate with, and
    /// drains the pool.
    pub fn set_credentials(&self, username: impl Into<String>, password: impl Into<String>) {
        let (username, password) = (username.into(), password.into());
        self.shared.reconfigure(|o| {
            o.default_username = username;
            o.default_password = password;
        });
    }

    /// Sets whether connections run outside auto-commit mode, and drains
    /// the pool.
    pub fn set_autocommit(&self, autocommit: bool) {
        self.shared.reconfigure(|o| o.autocommit = autocommit);
    }

    /// Sets the upper bound on simultaneous checkouts, and drains the pool.
    pub fn set_max_active_connections(&self, max: u32) {
        self.shared.reconfigure(|o| o.max_active_connections = max);
    }

    /// Sets the upper bound on idle retention, and drains the pool.
    pub fn set_max_idle_connections(&self, max: u32) {
        self.shared.reconfigure(|o| o.max_idle_connections = max);
    }

    /// Sets the checkout age past which a connection becomes eligible for
    /// reclamation, and drains the pool.
    pub fn set_max_checkout_time(&self, duration: Duration) {
        self.shared.reconfigure(|o| o.max_checkout_time = duration);
    }

    /// Sets the bounded wait slice used inside `acquire`, and drains the
    /// pool.
    pub fn set_time_to_wait(&self, duration: Duration) {
        self.shared.reconfigure(|o| o.time_to_wait = duration);
    }

    /// Sets the local bad-connection retry tolerance, and drains the pool.
    pub fn set_max_local_bad_connection_tolerance(&self, tolerance: u32) {
        self.shared
            .reconfigure(|o| o.max_local_bad_connection_tolerance = tolerance);
    }

    /// Sets the liveness-probe statement, and drains the pool.
    pub fn set_ping_query(&self, query: impl Into<String>) {
        let query = query.into();
        self.shared.reconfigure(|o| o.ping_query = query);
    }

    /// Enables or disables liveness probing, and drains the pool.
    pub fn set_ping_enabled(&self, enabled: bool) {
        self.shared.reconfigure(|o| o.ping_enabled = enabled);
    }

    /// Sets the idle threshold (in milliseconds) past which a candidate is
    /// probed, and drains the pool. Negative disables probing entirely.
    pub fn set_ping_connections_not_used_for(&self, threshold_ms: i64) {
        self.shared
            .reconfigure(|o| o.ping_connections_not_used_for_ms = threshold_ms);
    }
}

impl<F: ConnectionFactory> Clone for PooledDataSource<F> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<F: ConnectionFactory> fmt::Debug for PooledDataSource<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.get_pool_state();
        f.debug_struct("PooledDataSource")
            .field("active", &stats.active_count)
            .field("idle", &stats.idle_count)
            .field("options", &self.options())
            .finish()
    }
}
