//! Crawler configuration.
//!
//! Loading configuration files is the embedding application's job; this
//! module only defines the settings a crawler consumes and picks up the
//! usual environment variables as defaults.

use serde::{Deserialize, Serialize};

use crate::utils::RetryConfig;

/// Settings shared by every crawler built from one factory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// NCBI API key; raises the PubMed rate limit from 3 to 10 req/s.
    #[serde(default)]
    pub pubmed_api_key: Option<String>,

    /// Contact email sent in the user agent and in E-utilities requests,
    /// as NCBI asks of polite clients.
    #[serde(default)]
    pub contact_email: Option<String>,

    /// Ceiling applied to `FilterParams::max_results`; protects the remote
    /// services from runaway requests.
    #[serde(default = "default_max_results_ceiling")]
    pub max_results_ceiling: usize,

    /// Per-attempt request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Retry policy applied around every page fetch.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            pubmed_api_key: std::env::var("PUBMED_API_KEY").ok(),
            contact_email: std::env::var("PAPERSTREAM_CONTACT_EMAIL").ok(),
            max_results_ceiling: default_max_results_ceiling(),
            request_timeout_secs: default_request_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            retry: RetryConfig::default(),
        }
    }
}

fn default_max_results_ceiling() -> usize {
    10_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}
