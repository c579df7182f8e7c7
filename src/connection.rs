//! The capability set the pool expects from a physical connection, and the
//! factory that opens one on demand.

use std::error::Error as StdError;

/// An opaque handle to a single physical database session.
///
/// This is the capability set a [`PoolConnection`](crate::PoolConnection)
/// forwards to, delegating by composition instead of by reflective proxying
/// (see the crate-level docs for why). Implement this for the raw,
/// un-pooled connection type a driver already has.
pub trait PhysicalConnection: Send + 'static {
    /// The error type this connection's fallible operations return.
    type Error: StdError + Send + Sync + 'static;

    /// Returns `true` if the connection is known to be closed, without
    /// performing any I/O. Used as the cheap first check during liveness
    /// probing before falling back to an actual probe query.
    fn is_closed(&mut self) -> bool;

    /// Closes the physical connection. Called at most once per connection,
    /// on release-discard, on
    /// [`force_close_all`](crate::PooledDataSource::force_close_all), or
    /// after a failed liveness probe.
    fn close(&mut self) -> Result<(), Self::Error>;

    /// Rolls back any open transaction. Only called when the pool's
    /// `autocommit` option is `false`.
    fn rollback(&mut self) -> Result<(), Self::Error>;

    /// Executes a trivial statement and discards its result, used to
    /// implement the configurable liveness-probe query.
    fn execute(&mut self, sql: &str) -> Result<(), Self::Error>;
}

/// Opens fresh, un-pooled connections on demand.
///
/// This is the pool's only collaborator: it knows how to reach the
/// database (URL, driver, network timeout, driver properties) but nothing
/// about pooling. A single `ConnectionFactory` is expected to be safe to
/// call concurrently from arbitrary threads; in practice the pool only ever
/// calls it while holding its own internal monitor, so no additional
/// synchronization is required of implementors.
pub trait ConnectionFactory: Send + Sync + 'static {
    /// The physical connection type this factory produces.
    type Connection: PhysicalConnection;

    /// Opens one new physical connection, authenticating as `username` /
    /// `password`.
    fn connect(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Self::Connection, <Self::Connection as PhysicalConnection>::Error>;
}
