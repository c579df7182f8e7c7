//! `pooled-ds` is a synchronous, thread-safe connection pool that fronts a
//! non-pooled connection factory.
//!
//! It bounds the number of live physical connections, reuses idle ones,
//! reclaims leaked checkouts after a configurable timeout, and probes
//! liveness before handing a connection out. It does not parse SQL, bind
//! mappers, or manage transactions/sessions, which belong to whatever is
//! layered on top; this crate only implements the "give me a connection" /
//! "I am done with this connection" contract.
//!
//! # Example
//!
//! ```
//! use pooled_ds::{ConnectionFactory, PhysicalConnection, PoolOptions, PooledDataSource};
//!
//! struct EchoConnection { closed: bool }
//!
//! impl PhysicalConnection for EchoConnection {
//!     type Error = std::convert::Infallible;
//!
//!     fn is_closed(&mut self) -> bool { self.closed }
//!     fn close(&mut self) -> Result<(), Self::Error> { self.closed = true; Ok(()) }
//!     fn rollback(&mut self) -> Result<(), Self::Error> { Ok(()) }
//!     fn execute(&mut self, _sql: &str) -> Result<(), Self::Error> { Ok(()) }
//! }
//!
//! struct EchoFactory;
//!
//! impl ConnectionFactory for EchoFactory {
//!     type Connection = EchoConnection;
//!
//!     fn connect(&self, _user: &str, _pass: &str) -> Result<Self::Connection, std::convert::Infallible> {
//!         Ok(EchoConnection { closed: false })
//!     }
//! }
//!
//! let pool = PooledDataSource::new(EchoFactory, PoolOptions::new("mem://echo"));
//! let conn = pool.acquire().unwrap();
//! drop(conn); // returns to the idle list
//! assert_eq!(pool.get_pool_state().idle_count, 1);
//! ```

mod connection;
mod error;
pub mod pool;

pub use crate::connection::{ConnectionFactory, PhysicalConnection};
pub use crate::error::{BoxDynError, Error, Result};
pub use crate::pool::{PoolConnection, PoolOptions, PoolStatistics, PooledDataSource};
