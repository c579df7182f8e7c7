//! Error and Result types.

use std::error::Error as StdError;

/// A type-erased error from a [`ConnectionFactory`](crate::ConnectionFactory)
/// or [`PhysicalConnection`](crate::PhysicalConnection) implementation.
pub type BoxDynError = Box<dyn StdError + Send + Sync + 'static>;

/// A specialized `Result` type for `pooled-ds`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors returned by [`PooledDataSource`](crate::PooledDataSource) and
/// [`PoolConnection`](crate::PoolConnection).
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// `acquire` exhausted its local bad-connection retry budget (idle
    /// capacity plus the configured tolerance) without obtaining a usable
    /// connection.
    #[error("no good connection could be obtained after {attempts} attempt(s)")]
    NoGoodConnection {
        /// Number of candidates (idle, freshly opened, or reclaimed) that were
        /// tried and rejected during this call.
        attempts: u32,
    },

    /// A non-`close` operation was dispatched through a [`PoolConnection`]
    /// whose underlying wrapper has already been invalidated (typically
    /// because it was reclaimed as overdue, or released and re-wrapped).
    #[error("operation attempted through an invalidated connection handle")]
    ConnectionInvalid,

    /// Rolling back the previous transaction failed while releasing a
    /// connection back to the pool via the explicit
    /// [`PoolConnection::close`](crate::PoolConnection::close) path.
    #[error("rollback failed while releasing the connection: {0}")]
    Rollback(#[source] BoxDynError),

    /// A [`PoolConnection`] method forwarded to the underlying physical
    /// connection and it returned an error.
    #[error("connection operation failed: {0}")]
    Connection(#[source] BoxDynError),
}
