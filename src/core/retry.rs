//! 限流重试：指数退避
//!
//! 第 k 次失败后等待 `base_delay * 2^(k-1)`，不超过 `max_delay`；总尝试次数（含首次）不超过 `max_attempts`。

use std::future::Future;
use std::time::Duration;

use crate::core::{AgentError, SearchError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 含首次调用在内的最大尝试次数
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// 第 `attempt` 次（从 1 开始）失败后、下一次尝试前的等待时间；随 attempt 单调不减
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(31);
        let factor = 1u32 << exp;
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// 执行 `op`，遇到 `SearchError::RateLimited` 时退避重试；其它错误立即返回
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, AgentError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, SearchError>>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(SearchError::Failed(msg)) => return Err(AgentError::SearchFailed(msg)),
                Err(SearchError::RateLimited) if attempt >= self.max_attempts => {
                    tracing::warn!(attempts = attempt, "search rate limit retries exhausted");
                    return Err(AgentError::SearchRateLimited { attempts: attempt });
                }
                Err(SearchError::RateLimited) => {
                    let delay = self.delay_for(attempt);
                    tracing::info!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "search rate limited, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4))
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(6, Duration::from_millis(100), Duration::from_millis(500));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(4), Duration::from_millis(500));
        assert_eq!(policy.delay_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_delay_non_decreasing() {
        let policy = RetryPolicy::default();
        let delays: Vec<Duration> = (1..=10).map(|k| policy.delay_for(k)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_succeeds_after_rate_limits_below_cap() {
        let calls = AtomicU32::new(0);
        let result = fast_policy(5)
            .run(|_| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 4 {
                        Err(SearchError::RateLimited)
                    } else {
                        Ok("hits")
                    }
                }
            })
            .await;
        assert_eq!(result, Ok("hits"));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_surfaces_rate_limit_at_cap() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SearchError::RateLimited) }
            })
            .await;
        assert_eq!(result, Err(AgentError::SearchRateLimited { attempts: 5 }));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy(5)
            .run(|_| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(SearchError::Failed("bad gateway".into())) }
            })
            .await;
        assert_eq!(result, Err(AgentError::SearchFailed("bad gateway".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
