use std::sync::Arc;

use crate::connection::ConnectionFactory;
use crate::error::{Error, Result};
use crate::pool::shared::Shared;
use crate::pool::wrapper::Cell;

const DOUBLE_RELEASE: &str = "(bug) PoolConnection released twice";

/// A connection checked out from a [`PooledDataSource`](crate::PooledDataSource).
///
/// Every operation on the underlying physical connection is forwarded
/// through an inherent method that first checks validity, except `close`,
/// which is intercepted and routed into the pool's `release`. There is no
/// reflective proxy here; Rust's trait system gives us the forwarding for
/// free, so the handle just delegates by composition.
///
/// Dropping a `PoolConnection` without calling [`close`](Self::close)
/// releases it automatically; a rollback failure on that implicit path is
/// logged rather than propagated, since `Drop` cannot return a `Result`.
/// Call `close` explicitly to observe that failure.
pub struct PoolConnection<F: ConnectionFactory> {
    cell: Option<Cell<F::Connection>>,
    shared: Arc<Shared<F>>,
}

impl<F: ConnectionFactory> PoolConnection<F> {
    pub(crate) fn new(cell: Cell<F::Connection>, shared: Arc<Shared<F>>) -> Self {
        Self {
            cell: Some(cell),
            shared,
        }
    }

    /// Forwards to
    /// [`PhysicalConnection::is_closed`](crate::PhysicalConnection::is_closed),
    /// failing with [`Error::ConnectionInvalid`] if this handle's wrapper
    /// has already been invalidated (for example, reclaimed as overdue).
    pub fn is_closed(&mut self) -> Result<bool> {
        let cell = self.cell.as_ref().expect(DOUBLE_RELEASE);
        let mut guard = cell.lock().expect("connection cell poisoned");
        if !guard.valid {
            return Err(Error::ConnectionInvalid);
        }
        Ok(guard
            .raw
            .as_mut()
            .expect("valid connection always has a physical connection")
            .is_closed())
    }

    /// Forwards to [`PhysicalConnection::rollback`](crate::PhysicalConnection::rollback).
    pub fn rollback(&mut self) -> Result<()> {
        let cell = self.cell.as_ref().expect(DOUBLE_RELEASE);
        let mut guard = cell.lock().expect("connection cell poisoned");
        if !guard.valid {
            return Err(Error::ConnectionInvalid);
        }
        guard
            .raw
            .as_mut()
            .expect("valid connection always has a physical connection")
            .rollback()
            .map_err(|e| Error::Rollback(Box::new(e)))
    }

    /// Forwards to [`PhysicalConnection::execute`](crate::PhysicalConnection::execute).
    pub fn execute(&mut self, sql: &str) -> Result<()> {
        let cell = self.cell.as_ref().expect(DOUBLE_RELEASE);
        let mut guard = cell.lock().expect("connection cell poisoned");
        if !guard.valid {
            return Err(Error::ConnectionInvalid);
        }
        guard
            .raw
            .as_mut()
            .expect("valid connection always has a physical connection")
            .execute(sql)
            .map_err(|e| Error::Connection(Box::new(e)))
    }

    /// Runs `f` with a reference to the underlying physical connection,
    /// bypassing the validity check, for diagnostic use.
    pub fn unwrap_connection<R>(&self, f: impl FnOnce(&F::Connection) -> R) -> R {
        let cell = self.cell.as_ref().expect(DOUBLE_RELEASE);
        let guard = cell.lock().expect("connection cell poisoned");
        f(guard
            .raw
            .as_ref()
            .expect("checked-out connection always has a physical connection"))
    }

    /// Explicitly disposes of this handle, routing into `release`
    /// immediately and returning any rollback failure encountered along the
    /// way, unlike the implicit `Drop` path below, which can only log it.
    pub fn close(mut self) -> Result<()> {
        let cell = self.cell.take().expect(DOUBLE_RELEASE);
        self.shared.release(cell)
    }
}

impl<F: ConnectionFactory> Drop for PoolConnection<F> {
    fn drop(&mut self) {
        if let Some(cell) = self.cell.take() {
            if let Err(e) = self.shared.release(cell) {
                log::warn!("error while implicitly releasing a connection on drop: {}", e);
            }
        }
    }
}
