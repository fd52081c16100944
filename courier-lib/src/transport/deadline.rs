use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::{ErrorKind, Result};

/// The point in time a whole request, redirects and body included, must
/// be finished by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Deadline {
    at: Instant,
    timeout: Duration,
}

impl Deadline {
    /// A deadline `timeout` from now
    pub(crate) fn after(timeout: Duration) -> Self {
        Self {
            at: Instant::now() + timeout,
            timeout,
        }
    }

    /// The timeout this deadline was created from, reported in errors
    pub(crate) const fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Run `fut` to completion, unless the deadline passes first.
///
/// Dropping the future on timeout drops any connection it holds, so a
/// connection that timed out is never returned to the pool.
pub(crate) async fn within<T, F>(deadline: Option<Deadline>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(deadline) = deadline else {
        return fut.await;
    };
    match tokio::time::timeout_at(deadline.at, fut).await {
        Ok(result) => result,
        Err(_) => {
            log::debug!("Request timed out after {:?}", deadline.timeout());
            Err(ErrorKind::Timeout(deadline.timeout()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_deadline() {
        let value = within(None, async { Ok(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_deadline_not_reached() {
        let deadline = Deadline::after(Duration::from_secs(5));
        let value = within(Some(deadline), async { Ok("done") }).await.unwrap();
        assert_eq!(value, "done");
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let deadline = Deadline::after(Duration::from_millis(10));
        let err = within(Some(deadline), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await
        .unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(deadline.timeout(), Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_deadline_spans_multiple_calls() {
        let deadline = Some(Deadline::after(Duration::from_millis(50)));
        within(deadline, async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(())
        })
        .await
        .unwrap();

        let err = within(deadline, async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(err.is_timeout());
    }
}
