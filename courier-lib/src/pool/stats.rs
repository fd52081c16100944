/// Record and report connection statistics for one origin
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections established to this origin
    pub opened: u64,
    /// Requests that were sent over an idle, pooled connection
    pub reused: u64,
    /// Connections that were closed instead of being returned to the pool
    pub closed: u64,
    /// Total number of requests sent to this origin
    pub requests: u64,
}

impl PoolStats {
    pub(crate) const fn record_opened(&mut self) {
        self.opened += 1;
    }

    /// Count a request that got a response, `reused` if it went over a
    /// pooled connection.
    pub(crate) const fn record_sent(&mut self, reused: bool) {
        self.requests += 1;
        if reused {
            self.reused += 1;
        }
    }

    pub(crate) const fn record_closed(&mut self) {
        self.closed += 1;
    }

    /// Share of requests that did not need a new connection (0.0 to 1.0)
    #[must_use]
    pub fn reuse_rate(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let rate = self.reused as f64 / self.requests as f64;
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reuse_rate() {
        let mut stats = PoolStats::default();
        assert!(stats.reuse_rate().abs() < f64::EPSILON);

        stats.record_opened();
        stats.record_sent(false);
        stats.record_sent(true);
        stats.record_sent(true);
        stats.record_sent(true);
        assert_eq!(stats.opened, 1);
        assert_eq!(stats.requests, 4);
        assert!((stats.reuse_rate() - 0.75).abs() < f64::EPSILON);
    }
}
