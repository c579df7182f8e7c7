use std::collections::VecDeque;
use std::time::Duration;

use crate::connection::PhysicalConnection;
use crate::pool::options::PoolOptions;
use crate::pool::wrapper::{Cell, PooledConnection};

/// Everything guarded by the pool's single monitor: the idle and active
/// lists, the current configuration, the expected connection fingerprint,
/// and every counter the pool tracks.
///
/// Counters are monotonic non-decreasing for the lifetime of the pool;
/// nothing here ever resets them, including `force_close_all`.
pub(crate) struct State<C: PhysicalConnection> {
    pub(crate) options: PoolOptions,
    pub(crate) expected_type_code: u64,

    /// Removed from the head on reuse; pushed to the back on release.
    pub(crate) idle: VecDeque<PooledConnection<C>>,
    /// Ordered by checkout time, oldest at the front (FIFO), so the oldest
    /// active entry is always a cheap `front()` away for reclamation. Shared
    /// with whatever `PoolConnection` handle the caller is holding, so that
    /// reclaiming a connection can steal it out from under that handle.
    pub(crate) active: VecDeque<Cell<C>>,

    pub(crate) request_count: u64,
    pub(crate) accumulated_request_time: Duration,
    pub(crate) accumulated_checkout_time: Duration,
    pub(crate) claimed_overdue_connection_count: u64,
    pub(crate) accumulated_checkout_time_of_overdue_connections: Duration,
    pub(crate) had_to_wait_count: u64,
    pub(crate) accumulated_wait_time: Duration,
    pub(crate) bad_connection_count: u64,
}

impl<C: PhysicalConnection> State<C> {
    pub(crate) fn new(options: PoolOptions) -> Self {
        let expected_type_code =
            options.connection_type_code(&options.default_username, &options.default_password);
        Self {
            options,
            expected_type_code,
            idle: VecDeque::new(),
            active: VecDeque::new(),
            request_count: 0,
            accumulated_request_time: Duration::ZERO,
            accumulated_checkout_time: Duration::ZERO,
            claimed_overdue_connection_count: 0,
            accumulated_checkout_time_of_overdue_connections: Duration::ZERO,
            had_to_wait_count: 0,
            accumulated_wait_time: Duration::ZERO,
            bad_connection_count: 0,
        }
    }

    pub(crate) fn recompute_expected_type_code(&mut self) {
        self.expected_type_code = self
            .options
            .connection_type_code(&self.options.default_username, &self.options.default_password);
    }
}

/// A point-in-time snapshot of a pool's counters, returned by
/// [`PooledDataSource::get_pool_state`](crate::PooledDataSource::get_pool_state).
///
/// Taking this snapshot briefly holds the pool's monitor but performs no
/// I/O, so it is safe to call from any thread without blocking other
/// callers for long.
#[derive(Debug, Clone, Copy)]
pub struct PoolStatistics {
    pub active_count: usize,
    pub idle_count: usize,
    pub request_count: u64,
    pub accumulated_request_time: Duration,
    pub accumulated_checkout_time: Duration,
    pub claimed_overdue_connection_count: u64,
    pub accumulated_checkout_time_of_overdue_connections: Duration,
    pub had_to_wait_count: u64,
    pub accumulated_wait_time: Duration,
    pub bad_connection_count: u64,
}

impl<C: PhysicalConnection> From<&State<C>> for PoolStatistics {
    fn from(state: &State<C>) -> Self {
        Self {
            active_count: state.active.len(),
            idle_count: state.idle.len(),
            request_count: state.request_count,
            accumulated_request_time: state.accumulated_request_time,
            accumulated_checkout_time: state.accumulated_checkout_time,
            claimed_overdue_connection_count: state.claimed_overdue_connection_count,
            accumulated_checkout_time_of_overdue_connections: state
                .accumulated_checkout_time_of_overdue_connections,
            had_to_wait_count: state.had_to_wait_count,
            accumulated_wait_time: state.accumulated_wait_time,
            bad_connection_count: state.bad_connection_count,
        }
    }
}
