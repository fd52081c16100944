//! Keep-alive connection reuse.
//!
//! Requests to the same origin share HTTP/1.1 connections: after a response
//! body has been read completely, its connection is returned to the pool and
//! handed to the next request for the same `(scheme, host, port)`.
//!
//! # Architecture
//!
//! - [`Origin`]: the key connections are pooled by
//! - [`ConnectionPool`]: the cheaply cloneable, shared pool of per-origin buckets
//! - [`PoolConfig`]: limits for idle connections
//! - [`PoolStats`]: statistics tracking for each origin
//! - [`ConnectionPolicy`]: per-request choice between reusing and closing

mod bucket;
mod config;
mod connection_pool;
mod key;
mod stats;

pub(crate) use bucket::{Lease, OriginBucket, Sender};
pub use config::PoolConfig;
pub use connection_pool::ConnectionPool;
pub use key::{Origin, Scheme};
pub use stats::PoolStats;

/// Whether a request may use and return pooled connections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionPolicy {
    /// Use an idle connection if there is one, and return the connection to
    /// the pool once the response body has been read.
    #[default]
    Reuse,
    /// Always open a fresh connection, send `Connection: close` and close
    /// the connection after the response.
    NoReuse,
}

impl ConnectionPolicy {
    /// Returns `true` if the request may take part in connection reuse.
    #[must_use]
    pub const fn is_reuse(self) -> bool {
        matches!(self, Self::Reuse)
    }
}
