//! Integration tests covering the pool's core acquire/release scenarios.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pooled_ds::{ConnectionFactory, Error, PhysicalConnection, PoolOptions, PooledDataSource};

#[derive(Debug)]
struct MockError;

impl fmt::Display for MockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("mock connection error")
    }
}

impl std::error::Error for MockError {}

struct MockConnection {
    closed: bool,
    opens_closed: bool,
    close_counter: Arc<AtomicUsize>,
    failing_probes_remaining: Arc<AtomicUsize>,
}

impl PhysicalConnection for MockConnection {
    type Error = MockError;

    fn is_closed(&mut self) -> bool {
        self.closed || self.opens_closed
    }

    fn close(&mut self) -> Result<(), MockError> {
        if !self.closed {
            self.closed = true;
            self.close_counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), MockError> {
        Ok(())
    }

    fn execute(&mut self, _sql: &str) -> Result<(), MockError> {
        let remaining = self.failing_probes_remaining.load(Ordering::SeqCst);
        if remaining > 0
            && self
                .failing_probes_remaining
                .compare_exchange(remaining, remaining - 1, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        {
            Err(MockError)
        } else {
            Ok(())
        }
    }
}

struct MockFactory {
    open_counter: Arc<AtomicUsize>,
    close_counter: Arc<AtomicUsize>,
    failing_probes_remaining: Arc<AtomicUsize>,
    opens_closed: bool,
}

impl MockFactory {
    /// A factory whose connections behave normally.
    fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let open_counter = Arc::new(AtomicUsize::new(0));
        let close_counter = Arc::new(AtomicUsize::new(0));
        (
            Self {
                open_counter: open_counter.clone(),
                close_counter: close_counter.clone(),
                failing_probes_remaining: Arc::new(AtomicUsize::new(0)),
                opens_closed: false,
            },
            open_counter,
            close_counter,
        )
    }

    /// A factory whose connections report `is_closed() == true` from the
    /// moment they're opened, for the bad-candidate budget scenario.
    fn new_always_closed() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let open_counter = Arc::new(AtomicUsize::new(0));
        let close_counter = Arc::new(AtomicUsize::new(0));
        (
            Self {
                open_counter: open_counter.clone(),
                close_counter: close_counter.clone(),
                failing_probes_remaining: Arc::new(AtomicUsize::new(0)),
                opens_closed: true,
            },
            open_counter,
            close_counter,
        )
    }

    /// A factory whose connections behave normally but share a counter the
    /// test can set to make exactly that many subsequent probes fail.
    fn new_with_probe_switch() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let open_counter = Arc::new(AtomicUsize::new(0));
        let close_counter = Arc::new(AtomicUsize::new(0));
        let failing_probes_remaining = Arc::new(AtomicUsize::new(0));
        (
            Self {
                open_counter: open_counter.clone(),
                close_counter: close_counter.clone(),
                failing_probes_remaining: failing_probes_remaining.clone(),
                opens_closed: false,
            },
            open_counter,
            close_counter,
            failing_probes_remaining,
        )
    }
}

impl ConnectionFactory for MockFactory {
    type Connection = MockConnection;

    fn connect(&self, _username: &str, _password: &str) -> Result<MockConnection, MockError> {
        self.open_counter.fetch_add(1, Ordering::SeqCst);
        Ok(MockConnection {
            closed: false,
            opens_closed: self.opens_closed,
            close_counter: self.close_counter.clone(),
            failing_probes_remaining: self.failing_probes_remaining.clone(),
        })
    }
}

/// Scenario 1: simple reuse.
#[test]
fn simple_reuse_opens_exactly_one_physical_connection() {
    let (factory, opened, _closed) = MockFactory::new();
    let pool = PooledDataSource::new(
        factory,
        PoolOptions::new("mem://reuse")
            .with_max_active_connections(2)
            .with_max_idle_connections(2),
    );

    let a = pool.acquire().expect("acquire A");
    drop(a);
    let b = pool.acquire().expect("acquire B");

    assert_eq!(opened.load(Ordering::SeqCst), 1, "only one physical connection should ever be opened");
    assert_eq!(pool.get_pool_state().request_count, 2);
    assert_eq!(pool.get_pool_state().idle_count, 0);
    assert_eq!(pool.get_pool_state().active_count, 1);

    drop(b);
}

/// Scenario 2: saturation, a waiter, then a release that wakes it.
#[test]
fn waiter_wakes_on_release_under_saturation() {
    let _ = env_logger::try_init();

    let (factory, opened, _closed) = MockFactory::new();
    let pool = Arc::new(PooledDataSource::new(
        factory,
        PoolOptions::new("mem://wait")
            .with_max_active_connections(1)
            .with_time_to_wait(Duration::from_millis(500)),
    ));

    let conn1 = pool.acquire().expect("acquire first connection");

    let releaser = {
        let _pool = Arc::clone(&pool);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            drop(conn1);
        })
    };

    thread::sleep(Duration::from_millis(10));
    let start = Instant::now();
    let conn2 = pool.acquire().expect("second acquire should succeed after waiting");
    let elapsed = start.elapsed();

    releaser.join().unwrap();

    let stats = pool.get_pool_state();
    assert!(stats.had_to_wait_count >= 1, "the second acquire should have had to wait");
    assert!(
        stats.accumulated_wait_time >= Duration::from_millis(80),
        "accumulated wait time should reflect the ~90ms wait, got {:?}",
        stats.accumulated_wait_time
    );
    assert!(elapsed >= Duration::from_millis(80));
    assert_eq!(opened.load(Ordering::SeqCst), 1, "the connection should have been reused, not reopened");

    drop(conn2);
}

/// Scenario 3: overdue reclamation.
#[test]
fn overdue_checkout_is_reclaimed_without_waiting_for_release() {
    let _ = env_logger::try_init();

    let (factory, opened, _closed) = MockFactory::new();
    let pool = PooledDataSource::new(
        factory,
        PoolOptions::new("mem://reclaim")
            .with_max_active_connections(1)
            .with_max_checkout_time(Duration::from_millis(30)),
    );

    let mut conn1 = pool.acquire().expect("acquire first connection");
    thread::sleep(Duration::from_millis(60));

    let conn2 = pool.acquire().expect("second acquire should reclaim the overdue checkout");

    assert_eq!(pool.get_pool_state().claimed_overdue_connection_count, 1);
    assert_eq!(opened.load(Ordering::SeqCst), 1, "reclaim reuses the physical connection, it does not open a new one");

    let err = conn1.execute("select 1").expect_err("operating on a reclaimed handle must fail");
    assert!(matches!(err, Error::ConnectionInvalid));

    drop(conn2);
}

/// Scenario 4: idle overflow discards the excess.
#[test]
fn idle_overflow_closes_the_excess() {
    let (factory, opened, closed) = MockFactory::new();
    let pool = PooledDataSource::new(
        factory,
        PoolOptions::new("mem://idle-overflow")
            .with_max_active_connections(3)
            .with_max_idle_connections(1),
    );

    let a = pool.acquire().expect("acquire A");
    let b = pool.acquire().expect("acquire B");
    let c = pool.acquire().expect("acquire C");
    assert_eq!(opened.load(Ordering::SeqCst), 3);

    drop(a);
    drop(b);
    drop(c);

    let stats = pool.get_pool_state();
    assert_eq!(stats.idle_count, 1);
    assert_eq!(closed.load(Ordering::SeqCst), 2, "exactly two of the three connections should have been closed");
}

/// Scenario 5: changing identity-affecting configuration drains the pool.
#[test]
fn changing_credentials_drains_the_pool() {
    let (factory, opened, closed) = MockFactory::new();
    let pool = PooledDataSource::new(factory, PoolOptions::new("mem://fingerprint"));

    let conn_a = pool.acquire().expect("acquire A");
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    pool.set_credentials("new-user", "new-pass");

    assert_eq!(closed.load(Ordering::SeqCst), 1, "force_close_all should have closed the outstanding connection");
    assert_eq!(pool.get_pool_state().active_count, 0);
    assert_eq!(pool.get_pool_state().idle_count, 0);

    // `conn_a`'s wrapper is invalid now; dropping it is a defensive no-op.
    drop(conn_a);

    let _conn_b = pool.acquire().expect("next acquire should mint a fresh connection");
    assert_eq!(opened.load(Ordering::SeqCst), 2);
}

/// Scenario 6: the local bad-connection retry budget is enforced exactly.
#[test]
fn bad_candidate_budget_fails_after_exactly_the_documented_attempt_count() {
    let (factory, _opened, _closed) = MockFactory::new_always_closed();
    let pool = PooledDataSource::new(
        factory,
        PoolOptions::new("mem://bad-candidate")
            .with_max_idle_connections(0)
            .with_max_local_bad_connection_tolerance(3),
    );

    let err = pool.acquire().expect_err("every candidate reports closed, acquire must fail");
    match err {
        Error::NoGoodConnection { attempts } => assert_eq!(attempts, 4, "budget is 0 + 3 + 1 = 4"),
        other => panic!("expected NoGoodConnection, got {other:?}"),
    }
    assert_eq!(pool.get_pool_state().bad_connection_count, 4);
}

/// A failed liveness probe discards the idle candidate and mints a fresh
/// physical connection instead of handing out a dead one.
#[test]
fn failed_liveness_probe_discards_the_candidate() {
    let _ = env_logger::try_init();

    let (factory, opened, closed, failing_probes_remaining) = MockFactory::new_with_probe_switch();
    let pool = PooledDataSource::new(
        factory,
        PoolOptions::new("mem://ping")
            .with_ping_enabled(true)
            .with_ping_connections_not_used_for(0),
    );

    let conn = pool.acquire().expect("acquire first connection");
    drop(conn);
    assert_eq!(pool.get_pool_state().idle_count, 1);
    assert_eq!(opened.load(Ordering::SeqCst), 1);

    // Fail exactly the next probe: the idle candidate's, not the
    // replacement's.
    failing_probes_remaining.store(1, Ordering::SeqCst);

    let conn2 = pool.acquire().expect("acquire should discard the dead idle candidate and open a new one");

    assert_eq!(closed.load(Ordering::SeqCst), 1, "the probe-failed connection should have been closed");
    assert_eq!(opened.load(Ordering::SeqCst), 2, "a fresh physical connection should have been opened");

    drop(conn2);
}

/// Invariant: `active + idle` never exceeds the configured caps, and no
/// wrapper is ever double-counted, across a schedule with real thread
/// contention.
#[test]
fn pool_size_invariants_hold_under_contention() {
    let _ = env_logger::try_init();

    let (factory, _opened, _closed) = MockFactory::new();
    let pool = Arc::new(PooledDataSource::new(
        factory,
        PoolOptions::new("mem://contention")
            .with_max_active_connections(4)
            .with_max_idle_connections(4)
            .with_time_to_wait(Duration::from_millis(200)),
    ));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                for _ in 0..20 {
                    if let Ok(conn) = pool.acquire() {
                        thread::sleep(Duration::from_millis(1));
                        drop(conn);
                    }
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let stats = pool.get_pool_state();
    assert!(stats.active_count <= 4);
    assert!(stats.idle_count <= 4);
    assert!(stats.active_count + stats.idle_count <= 8);
}
