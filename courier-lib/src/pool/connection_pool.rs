use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;

use super::bucket::OriginBucket;
use super::{Origin, PoolConfig, PoolStats};

static SHARED: LazyLock<ConnectionPool> = LazyLock::new(ConnectionPool::default);

/// Keeps idle HTTP/1.1 connections around for reuse, keyed by [`Origin`].
///
/// The pool is cheap to clone; clones share the same connections.
///
/// # Architecture
///
/// - Each origin gets its own bucket of idle connections, created on first use
/// - Buckets are stored in a `DashMap`, so looking up a bucket never blocks
///   requests to other origins
/// - A connection is checked out for exactly one exchange and only returned
///   once its response body has been read to the end
///
/// # Examples
///
/// ```
/// use courier_lib::pool::{ConnectionPool, PoolConfig};
/// use std::time::Duration;
///
/// let pool = ConnectionPool::new(PoolConfig {
///     max_idle_per_origin: 4,
///     idle_timeout: Duration::from_secs(30),
/// });
/// assert_eq!(pool.origin_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct ConnectionPool {
    buckets: Arc<DashMap<Origin, Arc<OriginBucket>>>,
    config: PoolConfig,
}

impl ConnectionPool {
    /// Create an empty pool.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            config,
        }
    }

    /// The process-wide pool used by clients that are not given their own.
    #[must_use]
    pub fn shared() -> Self {
        SHARED.clone()
    }

    /// The configuration this pool was created with
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Get the bucket of an origin, creating it if this is the first request
    pub(crate) fn bucket(&self, origin: &Origin) -> Arc<OriginBucket> {
        if let Some(bucket) = self.buckets.get(origin) {
            return bucket.clone();
        }

        let bucket = Arc::new(OriginBucket::new(origin.clone(), self.config));

        // Another task may have created the bucket in the meantime
        match self.buckets.entry(origin.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => entry.get().clone(),
            dashmap::mapref::entry::Entry::Vacant(entry) => entry.insert(bucket).clone(),
        }
    }

    /// Connection statistics for an origin.
    ///
    /// Returns empty stats for origins that have not been contacted yet.
    #[must_use]
    pub fn stats(&self, origin: &Origin) -> PoolStats {
        self.buckets
            .get(origin)
            .map(|bucket| bucket.stats())
            .unwrap_or_default()
    }

    /// Connection statistics of every origin in the pool
    #[must_use]
    pub fn all_stats(&self) -> HashMap<Origin, PoolStats> {
        self.buckets
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stats()))
            .collect()
    }

    /// Number of idle connections currently kept for an origin
    #[must_use]
    pub fn idle_count(&self, origin: &Origin) -> usize {
        self.buckets
            .get(origin)
            .map_or(0, |bucket| bucket.idle_count())
    }

    /// Number of connections to an origin currently in use by a request
    #[must_use]
    pub fn in_flight(&self, origin: &Origin) -> usize {
        self.buckets
            .get(origin)
            .map_or(0, |bucket| bucket.in_flight())
    }

    /// Number of origins the pool has seen
    #[must_use]
    pub fn origin_count(&self) -> usize {
        self.buckets.len()
    }

    /// Close all idle connections of an origin and forget its statistics.
    ///
    /// Connections that are in use at the time are closed once their
    /// exchange completes. Returns `true` if the origin was known.
    pub fn close_origin(&self, origin: &Origin) -> bool {
        let removed = self.buckets.remove(origin).is_some();
        if removed {
            log::debug!("Closed connection pool bucket for {origin}");
        }
        removed
    }

    /// Close all idle connections of all origins.
    pub fn clear(&self) {
        self.buckets.clear();
    }

    /// Close idle connections that have exceeded the idle timeout.
    ///
    /// Expired connections are also dropped lazily on checkout, so calling
    /// this is only needed to release sockets early.
    pub fn evict_expired(&self) {
        for bucket in self.buckets.iter() {
            bucket.evict_expired();
        }
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::new(PoolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hyper_util::rt::TokioIo;

    use super::*;
    use crate::pool::Scheme;
    use crate::pool::bucket::Sender;

    async fn sender() -> (Sender, tokio::io::DuplexStream) {
        let (client, server) = tokio::io::duplex(1024);
        let (sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(client))
            .await
            .unwrap();
        tokio::spawn(conn);
        (sender, server)
    }

    fn origin(host: &str) -> Origin {
        Origin::new(Scheme::Http, host, 80)
    }

    #[test]
    fn test_pool_creation() {
        let pool = ConnectionPool::default();
        assert_eq!(pool.origin_count(), 0);
        assert_eq!(pool.stats(&origin("example.com")), PoolStats::default());
        assert_eq!(pool.idle_count(&origin("example.com")), 0);
    }

    #[test]
    fn test_bucket_is_created_once() {
        let pool = ConnectionPool::default();
        let first = pool.bucket(&origin("example.com"));
        let second = pool.bucket(&origin("EXAMPLE.com"));

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(pool.origin_count(), 1);

        pool.bucket(&origin("example.org"));
        assert_eq!(pool.origin_count(), 2);
    }

    #[test]
    fn test_clones_share_buckets() {
        let pool = ConnectionPool::default();
        let clone = pool.clone();
        clone.bucket(&origin("example.com"));
        assert_eq!(pool.origin_count(), 1);
    }

    #[tokio::test]
    async fn test_origins_are_isolated() {
        let pool = ConnectionPool::default();
        let (sender, _server) = sender().await;

        let mut lease = pool.bucket(&origin("example.com")).lease_fresh(sender);
        lease.mark_drained();
        drop(lease);

        assert_eq!(pool.idle_count(&origin("example.com")), 1);
        assert_eq!(pool.idle_count(&origin("example.org")), 0);
        assert!(
            pool.bucket(&origin("example.org"))
                .checkout_idle()
                .await
                .is_none()
        );

        let stats = pool.all_stats();
        assert_eq!(stats[&origin("example.com")].opened, 1);
        assert_eq!(stats[&origin("example.org")].opened, 0);
    }

    #[tokio::test]
    async fn test_close_origin() {
        let pool = ConnectionPool::default();
        let (sender, _server) = sender().await;

        let mut lease = pool.bucket(&origin("example.com")).lease_fresh(sender);
        lease.mark_drained();
        drop(lease);

        assert!(pool.close_origin(&origin("example.com")));
        assert!(!pool.close_origin(&origin("example.com")));
        assert_eq!(pool.idle_count(&origin("example.com")), 0);
        assert_eq!(pool.origin_count(), 0);
    }

    #[tokio::test]
    async fn test_evict_expired() {
        let pool = ConnectionPool::new(PoolConfig {
            max_idle_per_origin: 8,
            idle_timeout: Duration::from_millis(10),
        });
        let (sender, _server) = sender().await;

        let mut lease = pool.bucket(&origin("example.com")).lease_fresh(sender);
        lease.mark_drained();
        drop(lease);

        tokio::time::sleep(Duration::from_millis(20)).await;
        pool.evict_expired();
        assert_eq!(pool.idle_count(&origin("example.com")), 0);
        assert_eq!(pool.stats(&origin("example.com")).closed, 1);
    }
}
