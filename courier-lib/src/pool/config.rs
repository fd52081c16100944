use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default number of idle connections kept per origin
const DEFAULT_MAX_IDLE_PER_ORIGIN: usize = 8;

/// Default time an idle connection is kept before it gets evicted
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

/// Configuration of a [`crate::pool::ConnectionPool`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of idle connections kept per origin.
    /// Connections returned beyond this limit are closed.
    #[serde(default = "default_max_idle_per_origin")]
    pub max_idle_per_origin: usize,

    /// Idle connections older than this are evicted
    #[serde(default = "default_idle_timeout", with = "humantime_serde")]
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_per_origin: default_max_idle_per_origin(),
            idle_timeout: default_idle_timeout(),
        }
    }
}

const fn default_max_idle_per_origin() -> usize {
    DEFAULT_MAX_IDLE_PER_ORIGIN
}

const fn default_idle_timeout() -> Duration {
    DEFAULT_IDLE_TIMEOUT
}
