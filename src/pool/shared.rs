use std::sync::{Arc, Condvar, Mutex};
use std::time::Instant;

use crate::connection::{ConnectionFactory, PhysicalConnection};
use crate::error::{Error, Result};
use crate::pool::options::PoolOptions;
use crate::pool::ping::ping_connection;
use crate::pool::state::{PoolStatistics, State};
use crate::pool::wrapper::{Cell, PooledConnection};

/// The pool's single monitor plus its (immutable after construction)
/// connection factory.
pub(crate) struct Shared<F: ConnectionFactory> {
    factory: F,
    state: Mutex<State<F::Connection>>,
    condvar: Condvar,
}

fn record_bad_candidate<C: PhysicalConnection>(
    state: &mut State<C>,
    local_bad_connection_count: &mut u32,
) -> Option<Error> {
    *local_bad_connection_count += 1;
    state.bad_connection_count += 1;

    let budget = state.options.max_idle_connections + state.options.max_local_bad_connection_tolerance;
    if *local_bad_connection_count > budget {
        Some(Error::NoGoodConnection {
            attempts: *local_bad_connection_count,
        })
    } else {
        None
    }
}

fn close_wrapper<C: PhysicalConnection>(wrapper: &mut PooledConnection<C>, autocommit: bool) {
    if let Some(raw) = wrapper.raw.as_mut() {
        if !autocommit {
            if let Err(e) = raw.rollback() {
                log::warn!("rollback during force_close_all failed, closing anyway: {}", e);
            }
        }
        if let Err(e) = raw.close() {
            log::warn!("error closing connection during force_close_all: {}", e);
        }
    }
    wrapper.invalidate();
}

impl<F: ConnectionFactory> Shared<F> {
    pub(crate) fn new(factory: F, options: PoolOptions) -> Self {
        Self {
            factory,
            state: Mutex::new(State::new(options)),
            condvar: Condvar::new(),
        }
    }

    pub(crate) fn options_snapshot(&self) -> PoolOptions {
        self.state.lock().expect("pool monitor poisoned").options.clone()
    }

    pub(crate) fn default_credentials(&self) -> (String, String) {
        let state = self.state.lock().expect("pool monitor poisoned");
        (
            state.options.default_username.clone(),
            state.options.default_password.clone(),
        )
    }

    pub(crate) fn stats(&self) -> PoolStatistics {
        PoolStatistics::from(&*self.state.lock().expect("pool monitor poisoned"))
    }

    /// Mutates the pool's configuration under the monitor, then drains the
    /// pool. Any mutation of connection-identity configuration must do
    /// this.
    pub(crate) fn reconfigure(&self, f: impl FnOnce(&mut PoolOptions)) {
        {
            let mut state = self.state.lock().expect("pool monitor poisoned");
            f(&mut state.options);
        }
        self.force_close_all();
    }

    pub(crate) fn force_close_all(&self) {
        let mut state = self.state.lock().expect("pool monitor poisoned");

        while let Some(mut idle) = state.idle.pop_front() {
            let autocommit = state.options.autocommit;
            close_wrapper(&mut idle, autocommit);
        }

        while let Some(cell) = state.active.pop_front() {
            let autocommit = state.options.autocommit;
            let mut guard = cell.lock().expect("connection cell poisoned");
            if guard.valid {
                close_wrapper(&mut guard, autocommit);
            }
        }

        state.recompute_expected_type_code();
        self.condvar.notify_all();
    }

    /// Implements the acquire algorithm: idle reuse, growth, overdue
    /// reclamation, then a bounded wait, looping until one succeeds or the
    /// local bad-connection budget is exhausted. Returns the shared cell for
    /// a validated, checked-out connection.
    pub(crate) fn acquire_cell(&self, username: &str, password: &str) -> Result<Cell<F::Connection>> {
        let start = Instant::now();
        let mut state = self.state.lock().expect("pool monitor poisoned");
        let requested_type_code = state.options.connection_type_code(username, password);

        let mut local_bad_connection_count: u32 = 0;
        let mut has_waited_this_call = false;

        loop {
            // 1. Idle available.
            if let Some(candidate) = state.idle.pop_front() {
                match self.validate_and_activate(&mut state, candidate, start) {
                    Ok(cell) => return Ok(cell),
                    Err(()) => {
                        if let Some(e) = record_bad_candidate(&mut state, &mut local_bad_connection_count) {
                            return Err(e);
                        }
                        continue;
                    }
                }
            }

            // 2. Room to grow.
            if (state.active.len() as u32) < state.options.max_active_connections {
                match self.factory.connect(username, password) {
                    Ok(raw) => {
                        let candidate = PooledConnection::new(raw, requested_type_code);
                        match self.validate_and_activate(&mut state, candidate, start) {
                            Ok(cell) => return Ok(cell),
                            Err(()) => {
                                if let Some(e) =
                                    record_bad_candidate(&mut state, &mut local_bad_connection_count)
                                {
                                    return Err(e);
                                }
                                continue;
                            }
                        }
                    }
                    Err(e) => {
                        log::warn!("error establishing a connection: {}", e);
                        if let Some(e) = record_bad_candidate(&mut state, &mut local_bad_connection_count) {
                            return Err(e);
                        }
                        continue;
                    }
                }
            }

            // 3. Examine the oldest active checkout.
            let overdue_age = state
                .active
                .front()
                .map(|oldest| oldest.lock().expect("connection cell poisoned").checkout_at.elapsed());

            if let Some(age) = overdue_age {
                if age > state.options.max_checkout_time {
                    let cell = state.active.pop_front().expect("checked Some above");
                    let rewrapped = {
                        let mut guard = cell.lock().expect("connection cell poisoned");
                        if !state.options.autocommit {
                            if let Err(e) = guard
                                .raw
                                .as_mut()
                                .expect("active connection always has a physical connection")
                                .rollback()
                            {
                                log::warn!(
                                    "rollback on reclaimed overdue connection failed, proceeding anyway: {}",
                                    e
                                );
                            }
                        }
                        guard.rewrap()
                    };

                    state.claimed_overdue_connection_count += 1;
                    state.accumulated_checkout_time_of_overdue_connections += age;
                    state.accumulated_checkout_time += age;

                    match self.validate_and_activate(&mut state, rewrapped, start) {
                        Ok(cell) => return Ok(cell),
                        Err(()) => {
                            if let Some(e) = record_bad_candidate(&mut state, &mut local_bad_connection_count)
                            {
                                return Err(e);
                            }
                            continue;
                        }
                    }
                }
            }

            // 4. Wait for a bounded slice, then re-examine pool state.
            if !has_waited_this_call {
                state.had_to_wait_count += 1;
                has_waited_this_call = true;
            }
            let wait_start = Instant::now();
            let time_to_wait = state.options.time_to_wait;
            let (guard, _timed_out) = self
                .condvar
                .wait_timeout(state, time_to_wait)
                .expect("pool monitor poisoned");
            state = guard;
            state.accumulated_wait_time += wait_start.elapsed();
        }
    }

    /// Pings `candidate`, rolls it back if applicable, and on success stamps
    /// its checkout metadata, records the acquire-side counters, and moves
    /// it into the active list. Returns the rejected candidate's identity
    /// as `Err(())` on failure; by that point its physical connection has
    /// already been closed.
    fn validate_and_activate(
        &self,
        state: &mut State<F::Connection>,
        mut candidate: PooledConnection<F::Connection>,
        acquire_start: Instant,
    ) -> std::result::Result<Cell<F::Connection>, ()> {
        if !ping_connection(&mut candidate, &state.options) {
            return Err(());
        }

        if !state.options.autocommit {
            if let Err(e) = candidate
                .raw
                .as_mut()
                .expect("valid candidate always has a physical connection")
                .rollback()
            {
                log::warn!("rollback before handing out a connection failed, discarding it: {}", e);
                if let Some(raw) = candidate.raw.as_mut() {
                    let _ = raw.close();
                }
                return Err(());
            }
        }

        let now = Instant::now();
        candidate.checkout_at = now;
        candidate.last_used_at = now;

        state.request_count += 1;
        state.accumulated_request_time += acquire_start.elapsed();

        let cell = Arc::new(Mutex::new(candidate));
        state.active.push_back(Arc::clone(&cell));
        Ok(cell)
    }

    /// Returns a connection to the pool, either idling or discarding it.
    pub(crate) fn release(&self, cell: Cell<F::Connection>) -> Result<()> {
        let mut state = self.state.lock().expect("pool monitor poisoned");

        if let Some(pos) = state.active.iter().position(|c| Arc::ptr_eq(c, &cell)) {
            state.active.remove(pos);
        }

        let mut guard = cell.lock().expect("connection cell poisoned");

        if !guard.valid {
            state.bad_connection_count += 1;
            return Ok(());
        }

        state.accumulated_checkout_time += guard.checkout_at.elapsed();

        let rollback_result = if !state.options.autocommit {
            guard
                .raw
                .as_mut()
                .expect("valid connection always has a physical connection")
                .rollback()
                .map_err(|e| Error::Rollback(Box::new(e)))
        } else {
            Ok(())
        };

        if (state.idle.len() as u32) < state.options.max_idle_connections
            && guard.connection_type_code == state.expected_type_code
        {
            let idle_conn = guard.rewrap();
            drop(guard);
            state.idle.push_back(idle_conn);
        } else {
            if let Some(raw) = guard.raw.as_mut() {
                if let Err(e) = raw.close() {
                    log::warn!("error closing released connection: {}", e);
                }
            }
            guard.invalidate();
            drop(guard);
        }

        self.condvar.notify_all();
        rollback_result
    }
}
