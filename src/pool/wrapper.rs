use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::connection::PhysicalConnection;

/// A checked-out connection's record, shared between the pool's active list
/// (for reclamation) and the [`PoolConnection`](crate::PoolConnection)
/// handle held by the caller.
///
/// Both the active-list entry and the caller's handle hold a clone of the
/// same `Arc<Mutex<_>>`, so reclaiming a connection means locking this cell
/// out from under the caller just long enough to steal its physical
/// connection and mark it invalid.
pub(crate) type Cell<C> = Arc<Mutex<PooledConnection<C>>>;

/// The pool's internal record tying a physical connection to its lifecycle
/// metadata and validity flag.
///
/// A `PooledConnection` appears in at most one of `{idle, active}` at any
/// instant, and in neither once `valid` is `false`. `raw` is `None` only in
/// the brief window between a reclaim or release taking ownership of the
/// physical connection out of the old wrapper and the new wrapper being
/// constructed around it; a `PooledConnection` is never observed by a
/// caller in that state.
pub(crate) struct PooledConnection<C: PhysicalConnection> {
    pub(crate) raw: Option<C>,
    pub(crate) connection_type_code: u64,
    pub(crate) created_at: Instant,
    pub(crate) last_used_at: Instant,
    pub(crate) checkout_at: Instant,
    pub(crate) valid: bool,
}

impl<C: PhysicalConnection> PooledConnection<C> {
    /// Wraps a brand-new physical connection.
    pub(crate) fn new(raw: C, connection_type_code: u64) -> Self {
        let now = Instant::now();
        Self {
            raw: Some(raw),
            connection_type_code,
            created_at: now,
            last_used_at: now,
            checkout_at: now,
            valid: true,
        }
    }

    /// Consumes this wrapper, taking its physical connection and minting a
    /// fresh wrapper around it that inherits `created_at`/`last_used_at`.
    /// `self` is left invalid and connection-less; any lingering reference
    /// to it can no longer interact with the physical connection.
    ///
    /// Used both by overdue reclamation and by release's idle re-wrap, which
    /// is what makes "one handle owns one wrapper" hold even across a
    /// release-and-reacquire of the same physical connection.
    pub(crate) fn rewrap(&mut self) -> Self {
        let raw = self.raw.take().expect("rewrap of an already-rewrapped PooledConnection");
        self.valid = false;
        Self {
            raw: Some(raw),
            connection_type_code: self.connection_type_code,
            created_at: self.created_at,
            last_used_at: self.last_used_at,
            checkout_at: Instant::now(),
            valid: true,
        }
    }

    pub(crate) fn invalidate(&mut self) {
        self.valid = false;
    }
}
