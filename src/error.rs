//! Error taxonomy for the crawl engine.
//!
//! Errors local to one page (transient network failures, a malformed
//! body) are handled inside the crawler; only terminal, per-source
//! conditions reach the caller. [`CrawlError::is_transient`] is the
//! single retryable-condition predicate consulted by the retry loop.

use std::time::Duration;

use crate::models::SourceType;

/// What made a fetch failure transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// Per-attempt timeout elapsed.
    Timeout,
    /// Connection failed or was reset mid-response.
    Network,
    /// Server error (5xx other than 503).
    ServerError,
    /// Server-signaled overload (429 or 503); also widens the rate
    /// limiter's pacing interval.
    Overload,
}

impl std::fmt::Display for TransientKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            TransientKind::Timeout => "timeout",
            TransientKind::Network => "network",
            TransientKind::ServerError => "server error",
            TransientKind::Overload => "overload",
        };
        f.write_str(label)
    }
}

/// Everything that can go wrong between `crawl()` and the last record.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// Filter validation failed; raised before any network activity.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// The factory was asked for a source it does not know.
    #[error("unknown source {0:?}")]
    UnknownSource(String),

    /// A fetch failure expected to succeed on retry.
    #[error("transient {kind} failure from {source}: {message}")]
    Transient {
        source: SourceType,
        kind: TransientKind,
        /// Server-provided Retry-After, in seconds.
        retry_after_secs: Option<u64>,
        message: String,
    },

    /// Non-transient rejection by the source (4xx other than 429, bad
    /// request URL); never retried.
    #[error("{source} API error: {message}")]
    Api { source: SourceType, message: String },

    /// A page body that could not be parsed. The page is dropped and
    /// counted; the crawl continues unless malformed pages recur.
    #[error("malformed {source} page: {message}")]
    MalformedPage { source: SourceType, message: String },

    /// Terminal per-source condition: the stream ended early. Records
    /// yielded before this error are valid partial results.
    #[error("{source} stream ended after {yielded} records: {reason}")]
    SourceFailed {
        source: SourceType,
        yielded: usize,
        reason: String,
    },
}

impl CrawlError {
    /// Whether retrying the same request may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, CrawlError::Transient { .. })
    }

    /// Whether the server signaled overload (429/503), which should widen
    /// the rate limiter's interval in addition to any retry.
    pub fn is_overload(&self) -> bool {
        matches!(
            self,
            CrawlError::Transient {
                kind: TransientKind::Overload,
                ..
            }
        )
    }

    /// Server-provided Retry-After hint, when one accompanied the error.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            CrawlError::Transient {
                retry_after_secs: Some(secs),
                ..
            } => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Classify a reqwest failure: timeouts and connection problems are
    /// transient, anything else reqwest reports without a status (TLS,
    /// redirect loops, builder misuse) is not.
    pub(crate) fn from_reqwest(source: SourceType, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CrawlError::Transient {
                source,
                kind: TransientKind::Timeout,
                retry_after_secs: None,
                message: err.to_string(),
            }
        } else if err.is_connect() || err.is_body() || err.is_decode() {
            CrawlError::Transient {
                source,
                kind: TransientKind::Network,
                retry_after_secs: None,
                message: err.to_string(),
            }
        } else {
            CrawlError::Api {
                source,
                message: err.to_string(),
            }
        }
    }

    /// Classify a non-success HTTP status. 429 and 503 are overload, other
    /// 5xx are transient server errors, the rest are permanent rejections.
    pub(crate) fn from_status(
        source: SourceType,
        status: reqwest::StatusCode,
        retry_after_secs: Option<u64>,
    ) -> Self {
        use reqwest::StatusCode;

        let kind = match status {
            StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE => {
                TransientKind::Overload
            }
            s if s.is_server_error() => TransientKind::ServerError,
            _ => {
                return CrawlError::Api {
                    source,
                    message: format!("HTTP {status}"),
                }
            }
        };
        CrawlError::Transient {
            source,
            kind,
            retry_after_secs,
            message: format!("HTTP {status}"),
        }
    }
}
