//! Per-source request pacing.

use std::time::Duration;

use tokio::time::Instant;

use crate::models::SourceType;

/// Consecutive successes before the adaptive interval decays one step.
const DECAY_AFTER: u32 = 5;

/// Adaptive ceiling as a multiple of the baseline interval.
const MAX_BACKOFF_FACTOR: u32 = 16;

/// Token-bucket rate limiter with adaptive backoff.
///
/// Each crawler owns exactly one limiter, so pacing state is scoped to a
/// single source and never contended: a PubMed crawl cannot throttle a
/// concurrent arXiv crawl. Capacity `burst` allows short bursts; refill
/// rate is one token per `current` interval. On a server overload signal
/// the interval doubles up to a ceiling and decays back toward the
/// configured baseline after a run of successful requests.
#[derive(Debug)]
pub struct RateLimiter {
    baseline: Duration,
    ceiling: Duration,
    current: Duration,
    burst: f64,
    tokens: f64,
    last_refill: Instant,
    successes: u32,
}

impl RateLimiter {
    pub fn new(baseline: Duration, burst: u32) -> Self {
        Self {
            baseline,
            ceiling: baseline * MAX_BACKOFF_FACTOR,
            current: baseline,
            burst: f64::from(burst.max(1)),
            tokens: f64::from(burst.max(1)),
            last_refill: Instant::now(),
            successes: 0,
        }
    }

    /// Limiter with the documented baseline for a source.
    ///
    /// PubMed allows 3 req/s without an API key and 10 req/s with one;
    /// arXiv asks for one request every 3 seconds; the bioRxiv/medRxiv
    /// API tolerates about 2 req/s.
    pub fn for_source(source: SourceType, has_api_key: bool) -> Self {
        let baseline = match source {
            SourceType::Pubmed if has_api_key => Duration::from_millis(100),
            SourceType::Pubmed => Duration::from_millis(334),
            SourceType::Arxiv => Duration::from_secs(3),
            SourceType::Biorxiv | SourceType::Medrxiv => Duration::from_millis(500),
        };
        Self::new(baseline, 2)
    }

    /// Suspend until it is safe to issue the next request.
    pub async fn acquire(&mut self) {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            return;
        }

        let rate = 1.0 / self.current.as_secs_f64();
        let wait = Duration::from_secs_f64((1.0 - self.tokens) / rate);
        tracing::debug!(wait_ms = wait.as_millis() as u64, "rate limited");
        tokio::time::sleep(wait).await;

        self.tokens = 0.0;
        self.last_refill = Instant::now();
    }

    /// Widen the pacing interval after a server overload signal
    /// (429/503). Honours a larger server-provided Retry-After.
    pub fn report_overload(&mut self, retry_after: Option<Duration>) {
        let mut next = (self.current * 2).min(self.ceiling);
        if let Some(hint) = retry_after {
            next = next.max(hint.min(self.ceiling));
        }
        tracing::info!(
            interval_ms = next.as_millis() as u64,
            "widening request interval after overload signal"
        );
        self.current = next;
        self.tokens = 0.0;
        self.successes = 0;
    }

    /// Record a successful request; after a streak the interval decays
    /// one step toward the baseline.
    pub fn report_success(&mut self) {
        if self.current <= self.baseline {
            return;
        }
        self.successes += 1;
        if self.successes >= DECAY_AFTER {
            self.current = (self.current / 2).max(self.baseline);
            self.successes = 0;
        }
    }

    /// The interval currently enforced between requests.
    pub fn current_interval(&self) -> Duration {
        self.current
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill);
        let rate = 1.0 / self.current.as_secs_f64();
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(self.burst);
        self.last_refill = now;
    }
}
