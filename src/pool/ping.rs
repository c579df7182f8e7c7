use std::time::Duration;

use crate::connection::PhysicalConnection;
use crate::pool::options::PoolOptions;
use crate::pool::wrapper::PooledConnection;

/// Probes a candidate connection's liveness before it is handed out.
///
/// Called while the pool's monitor is held, after a candidate has been
/// chosen but before it is handed out, so the probe's network I/O runs
/// under the lock.
pub(crate) fn ping_connection<C: PhysicalConnection>(
    candidate: &mut PooledConnection<C>,
    options: &PoolOptions,
) -> bool {
    let Some(raw) = candidate.raw.as_mut() else {
        return false;
    };

    if raw.is_closed() {
        return false;
    }

    if !options.ping_enabled {
        return true;
    }

    if options.ping_connections_not_used_for_ms < 0 {
        return true;
    }

    let threshold = Duration::from_millis(options.ping_connections_not_used_for_ms as u64);
    if candidate.last_used_at.elapsed() <= threshold {
        return true;
    }

    match raw.execute(&options.ping_query) {
        Ok(()) => {
            if !options.autocommit {
                if let Err(e) = raw.rollback() {
                    log::warn!("rollback after successful ping failed: {}", e);
                }
            }
            true
        }
        Err(e) => {
            log::info!("ping on idle connection returned error, discarding it: {}", e);
            if let Err(close_err) = raw.close() {
                log::warn!("failed to close connection that failed its ping: {}", close_err);
            }
            false
        }
    }
}
