use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use hyper::client::conn::http1::SendRequest;

use super::{Origin, PoolConfig, PoolStats};
use crate::types::OutgoingBody;

/// The sending half of an HTTP/1.1 client connection.
pub(crate) type Sender = SendRequest<OutgoingBody>;

#[derive(Debug)]
struct IdleConnection {
    sender: Sender,
    idle_since: Instant,
}

/// The connections of a single origin.
///
/// Each bucket has its own lock, so requests to different origins never
/// contend. The lock is never held across an await point.
#[derive(Debug)]
pub(crate) struct OriginBucket {
    origin: Origin,
    config: PoolConfig,
    idle: Mutex<Vec<IdleConnection>>,
    in_flight: AtomicUsize,
    stats: Mutex<PoolStats>,
}

impl OriginBucket {
    pub(crate) fn new(origin: Origin, config: PoolConfig) -> Self {
        Self {
            origin,
            config,
            idle: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            stats: Mutex::new(PoolStats::default()),
        }
    }

    pub(crate) const fn origin(&self) -> &Origin {
        &self.origin
    }

    fn idle(&self) -> MutexGuard<'_, Vec<IdleConnection>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stats_mut(&self) -> MutexGuard<'_, PoolStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn stats(&self) -> PoolStats {
        *self.stats_mut()
    }

    pub(crate) fn idle_count(&self) -> usize {
        self.idle().len()
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Take the most recently returned idle connection that is still usable.
    ///
    /// Expired and closed connections are discarded on the way.
    pub(crate) async fn checkout_idle(self: &Arc<Self>) -> Option<Lease> {
        self.evict_expired();
        loop {
            let idle = self.idle().pop()?;
            let mut sender = idle.sender;
            if sender.is_closed() || sender.ready().await.is_err() {
                log::debug!("Discarding closed idle connection to {}", self.origin);
                self.stats_mut().record_closed();
                continue;
            }
            log::debug!("Reusing idle connection to {}", self.origin);
            return Some(Lease::new(Arc::clone(self), sender, true));
        }
    }

    /// Register a freshly established connection.
    pub(crate) fn lease_fresh(self: &Arc<Self>, sender: Sender) -> Lease {
        log::debug!("Opened new connection to {}", self.origin);
        self.stats_mut().record_opened();
        Lease::new(Arc::clone(self), sender, false)
    }

    /// Drop idle connections older than the configured idle timeout.
    pub(crate) fn evict_expired(&self) {
        let timeout = self.config.idle_timeout;
        let mut idle = self.idle();
        let before = idle.len();
        idle.retain(|conn| conn.idle_since.elapsed() < timeout);
        let evicted = before - idle.len();
        drop(idle);

        if evicted > 0 {
            log::debug!("Evicted {evicted} expired connection(s) to {}", self.origin);
            let mut stats = self.stats_mut();
            for _ in 0..evicted {
                stats.record_closed();
            }
        }
    }

    fn release(&self, sender: Sender) {
        if sender.is_closed() {
            self.stats_mut().record_closed();
            return;
        }

        let mut idle = self.idle();
        if idle.len() >= self.config.max_idle_per_origin {
            drop(idle);
            log::debug!("Idle limit reached, closing connection to {}", self.origin);
            self.stats_mut().record_closed();
            return;
        }
        idle.push(IdleConnection {
            sender,
            idle_since: Instant::now(),
        });
    }
}

/// Exclusive use of one connection for the duration of one exchange.
///
/// When the lease is dropped the connection goes back to its bucket, but
/// only if the response body was read to the end and the connection may be
/// kept alive. Anything else (a timeout, an error, an abandoned body, a
/// `Connection: close` response) closes the connection.
#[derive(Debug)]
pub(crate) struct Lease {
    bucket: Arc<OriginBucket>,
    sender: Option<Sender>,
    /// Checked out of the idle list rather than freshly opened
    pooled: bool,
    reusable: bool,
    drained: bool,
}

impl Lease {
    fn new(bucket: Arc<OriginBucket>, sender: Sender, pooled: bool) -> Self {
        bucket.in_flight.fetch_add(1, Ordering::AcqRel);
        Self {
            bucket,
            sender: Some(sender),
            pooled,
            reusable: true,
            drained: false,
        }
    }

    /// A response arrived over this connection, count the request.
    pub(crate) fn record_sent(&self) {
        self.bucket.stats_mut().record_sent(self.pooled);
    }

    pub(crate) fn sender(&mut self) -> &mut Sender {
        self.sender
            .as_mut()
            // only ever taken in `Drop`
            .expect("connection lease without a sender")
    }

    /// Never return this connection to the pool.
    pub(crate) const fn close_after_use(&mut self) {
        self.reusable = false;
    }

    /// The exchange completed, the connection is free for the next request.
    pub(crate) const fn mark_drained(&mut self) {
        self.drained = true;
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.bucket.in_flight.fetch_sub(1, Ordering::AcqRel);
        let Some(sender) = self.sender.take() else {
            return;
        };

        if self.reusable && self.drained {
            self.bucket.release(sender);
        } else {
            log::debug!("Closing connection to {}", self.bucket.origin);
            self.bucket.stats_mut().record_closed();
        }
    }
}
