//! Retry logic with fixed or capped-exponential backoff and jitter.

use std::time::{Duration, Instant};

use crate::error::SyncError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};

/// Backoff strategy for retrying failed requests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed {
        /// Delay between retries.
        delay: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
    /// Uses an exponential delay between retries.
    ///
    /// The delay is calculated as `base * (factor ^ attempt)`.
    Exponential {
        /// The initial backoff duration.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// The maximum duration to wait between retries.
        max: Duration,
        /// Whether to apply random jitter (+/- 50%) to the delay.
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Fixed {
            delay: Duration::from_secs(1),
            jitter: true,
        }
    }
}

impl Backoff {
    /// Calculate the delay for a given retry attempt.
    ///
    /// # Arguments
    ///
    /// * `attempt` - The retry attempt number (0-based)
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay, jitter } => apply_jitter(delay, jitter),
            Self::Exponential {
                base,
                factor,
                max,
                jitter,
            } => {
                let scale = factor.powi(attempt.min(i32::MAX as u32) as i32);
                let seconds = base.as_secs_f64() * scale;
                let capped_seconds = seconds.min(max.as_secs_f64());

                apply_jitter(Duration::from_secs_f64(capped_seconds), jitter)
            }
        }
    }
}

fn apply_jitter(delay: Duration, jitter: bool) -> Duration {
    if !jitter {
        return delay;
    }

    // +/- 50% of the delay
    let jitter_ms = (delay.as_millis() as f64 * 0.5) as u64;
    let random_offset = fastrand::u64(0..=(jitter_ms * 2));
    let total_ms = delay.as_millis() as i64 + (random_offset as i64 - jitter_ms as i64);
    Duration::from_millis(total_ms.max(0) as u64)
}

/// Retry policy for one send-and-validate operation.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// The backoff strategy to use between attempts.
    pub backoff: Backoff,
    /// HTTP status codes that are retried. Bitso answers 400 when throttling.
    pub retry_on_status: Vec<u16>,
    /// Wall-clock budget across all attempts and waits.
    pub max_elapsed: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            backoff: Backoff::default(),
            retry_on_status: vec![400, 429, 500, 502, 503, 504],
            max_elapsed: Some(Duration::from_secs(600)),
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with exponential backoff.
    pub fn exponential(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Exponential {
                base: Duration::from_millis(200),
                factor: 2.0,
                max: Duration::from_secs(30),
                jitter: true,
            },
            ..Self::default()
        }
    }

    /// Create a retry configuration with fixed backoff and no jitter.
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::Fixed {
                delay,
                jitter: false,
            },
            ..Self::default()
        }
    }

    /// A single attempt, no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn with_max_elapsed(mut self, max_elapsed: Option<Duration>) -> Self {
        self.max_elapsed = max_elapsed;
        self
    }

    pub fn with_retry_on_status(mut self, statuses: Vec<u16>) -> Self {
        self.retry_on_status = statuses;
        self
    }

    /// Check if a given HTTP status code should trigger a retry.
    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status.contains(&status)
    }

    /// Calculate the delay for a given retry attempt.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Send the request produced by `build_request` until it succeeds, fails
    /// fatally, or the attempt or time budget runs out.
    ///
    /// `build_request` runs once per attempt so every attempt is signed with
    /// its own nonce.
    pub async fn execute<F>(
        &self,
        client: &dyn HttpClient,
        mut build_request: F,
    ) -> Result<HttpResponse, SyncError>
    where
        F: FnMut() -> HttpRequest,
    {
        let started = Instant::now();
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0_u32;

        loop {
            attempt += 1;
            let request = build_request();
            let url = request.url.clone();

            let error = match client.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response),
                Ok(response) if self.should_retry_status(response.status) => {
                    SyncError::retriable_status(response.status, response.reason(), &response.body)
                }
                Ok(response) => {
                    return Err(SyncError::fatal_api(response.status, &response.body)
                        .with_attempts(attempt));
                }
                Err(error) if error.retryable() => SyncError::retriable_transport(error.message()),
                Err(error) => {
                    return Err(SyncError::transport(error.message()).with_attempts(attempt));
                }
            };

            if attempt >= max_attempts {
                tracing::warn!(%url, attempt, status = ?error.status(), "retry attempts exhausted");
                return Err(error.with_attempts(attempt));
            }

            let wait = self.delay_for_attempt(attempt - 1);
            if let Some(budget) = self.max_elapsed {
                if started.elapsed() + wait > budget {
                    tracing::warn!(
                        %url,
                        attempt,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "retry time budget exhausted"
                    );
                    return Err(error.with_attempts(attempt));
                }
            }

            tracing::info!(
                %url,
                attempt,
                max_attempts,
                status = ?error.status(),
                wait_ms = wait.as_millis() as u64,
                reason = error.message(),
                "retrying request"
            );
            tokio::time::sleep(wait).await;
        }
    }
}
