//! Factory resolving source names to crawlers.

use crate::config::CrawlerConfig;
use crate::crawler::Crawler;
use crate::error::CrawlError;
use crate::sources::{ArxivAdapter, BiorxivAdapter, PubMedAdapter, Server, SourceAdapter};

/// Stateless registry of crawlable sources.
///
/// Every `get` builds a brand-new crawler with its own HTTP session, rate
/// limiter, and progress counters; crawlers are never pooled or shared, so
/// concurrent crawls cannot contend on pacing state.
#[derive(Debug, Clone, Default)]
pub struct CrawlerFactory {
    config: CrawlerConfig,
}

impl CrawlerFactory {
    pub fn new(config: CrawlerConfig) -> Self {
        Self { config }
    }

    /// Resolve a source name to a fresh crawler.
    pub fn get(&self, source: &str) -> Result<Crawler, CrawlError> {
        let adapter: Box<dyn SourceAdapter> = match source {
            "pubmed" => Box::new(PubMedAdapter::new(&self.config)),
            "arxiv" => Box::new(ArxivAdapter::new()),
            "biorxiv" => Box::new(BiorxivAdapter::new(Server::Biorxiv)),
            "medrxiv" => Box::new(BiorxivAdapter::new(Server::Medrxiv)),
            other => return Err(CrawlError::UnknownSource(other.to_string())),
        };
        Ok(Crawler::with_adapter(adapter, &self.config))
    }

    /// Names `get` accepts.
    pub fn sources(&self) -> &'static [&'static str] {
        &["pubmed", "arxiv", "biorxiv", "medrxiv"]
    }
}
