//! Supporting utilities: HTTP session, request pacing, retry policy.

mod http;
mod rate_limit;
mod retry;

pub use http::HttpClient;
pub use rate_limit::RateLimiter;
pub use retry::RetryConfig;
