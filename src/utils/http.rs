//! HTTP session wrapper.

use std::time::Duration;

use reqwest::Client;

use crate::config::CrawlerConfig;

/// HTTP client owned by a single crawler.
///
/// Wraps a `reqwest::Client` (connection pool) so the session lifecycle is
/// tied to the crawler: dropping the crawl stream drops the pool. The
/// user agent carries the configured contact email, which NCBI asks polite
/// clients to send.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &CrawlerConfig) -> Self {
        let user_agent = match &config.contact_email {
            Some(email) => format!(
                "{}/{} ({})",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                email
            ),
            None => format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
        };

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Start a GET request.
    pub fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.client.get(url)
    }
}
