use crate::error::PipelineError;
use crate::logi;
use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

/// Bounded fixed-interval polling budget for a remote render job.
/// attempts x interval is the wall-clock ceiling; no backoff, no jitter,
/// matching the cadence the render service expects.
#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

/// Drive `check` until it yields a result reference or the budget runs
/// out. Exactly `max_attempts` status checks are made, each preceded by
/// one interval sleep. A check error aborts immediately; a check that
/// returns `None` means "not ready yet".
pub async fn poll_until_ready<F, Fut>(policy: &PollPolicy, mut check: F) -> Result<String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<String>>>,
{
    for attempt in 1..=policy.max_attempts {
        sleep(policy.interval).await;
        if let Some(result_url) = check().await? {
            return Ok(result_url);
        }
        logi(format!(
            "Waiting for video to be ready... ({}/{})",
            attempt, policy.max_attempts
        ));
    }

    Err(PipelineError::Timeout {
        attempts: policy.max_attempts,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy::new(max_attempts, Duration::from_secs(0))
    }

    #[tokio::test]
    async fn returns_as_soon_as_a_result_appears() {
        let checks = AtomicU32::new(0);
        let url = poll_until_ready(&instant_policy(5), || {
            let n = checks.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n == 3 {
                    Ok(Some("https://example/out.mp4".to_string()))
                } else {
                    Ok(None)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(url, "https://example/out.mp4");
        assert_eq!(checks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn never_ready_job_times_out_after_exactly_max_attempts_checks() {
        let checks = AtomicU32::new(0);
        let err = poll_until_ready(&instant_policy(3), || {
            checks.fetch_add(1, Ordering::SeqCst);
            async { Ok(None) }
        })
        .await
        .unwrap_err();

        assert_eq!(checks.load(Ordering::SeqCst), 3);
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Timeout { attempts: 3 })
        ));
    }

    #[tokio::test]
    async fn check_error_aborts_without_further_attempts() {
        let checks = AtomicU32::new(0);
        let err = poll_until_ready(&instant_policy(4), || {
            checks.fetch_add(1, Ordering::SeqCst);
            async { Err(anyhow::anyhow!("status endpoint unreachable")) }
        })
        .await
        .unwrap_err();

        assert_eq!(checks.load(Ordering::SeqCst), 1);
        assert!(err.to_string().contains("unreachable"));
    }
}
