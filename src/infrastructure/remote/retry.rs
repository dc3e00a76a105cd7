use crate::shared::config::RemoteConfig;
use rand::Rng;
use reqwest::StatusCode;
use std::time::Duration;

const BACKOFF_MULTIPLIER: u32 = 2;
const JITTER_FACTOR: f64 = 0.5;

/// Whether a request may safely be sent more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Reads. Any transport failure, 429 or 5xx is retried.
    Idempotent,
    /// Upserts that may create remote records. Retried only when the request
    /// provably never reached the server, or the server asked us to come back.
    Create,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &RemoteConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }

    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Exponential delay before retry number `attempt` (1-based), capped,
    /// plus up to 50% random jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self
            .base_delay
            .saturating_mul(BACKOFF_MULTIPLIER.saturating_pow(exponent))
            .min(self.max_delay);

        let jitter_range = (backoff.as_millis() as f64 * JITTER_FACTOR) as u64;
        let jitter = if jitter_range == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_range)
        };
        backoff + Duration::from_millis(jitter)
    }

    pub fn should_retry_status(&self, kind: RequestKind, status: StatusCode) -> bool {
        match kind {
            RequestKind::Idempotent => {
                status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            RequestKind::Create => {
                status == StatusCode::TOO_MANY_REQUESTS
                    || status == StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    pub fn should_retry_transport(&self, kind: RequestKind, err: &reqwest::Error) -> bool {
        match kind {
            RequestKind::Idempotent => err.is_connect() || err.is_timeout() || err.is_request(),
            RequestKind::Create => err.is_connect(),
        }
    }
}
