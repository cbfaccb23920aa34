//! # paperstream
//!
//! Streaming crawler for academic paper APIs. One call to
//! [`Crawler::crawl`] turns a search query plus filters into a lazy,
//! rate-limited, size-bounded stream of normalized [`Paper`] records,
//! pulled page by page from PubMed, arXiv, bioRxiv, or medRxiv.
//!
//! ## Architecture
//!
//! - [`models`]: canonical [`Paper`] shape, [`FilterParams`], raw records
//! - [`sources`]: one adapter per API, behind the
//!   [`SourceAdapter`](sources::SourceAdapter) trait
//! - [`crawler`]: orchestration, pagination state machine, factory,
//!   progress counters
//! - [`normalize`]: field mapping, paper-type classification, country
//!   inference
//! - [`utils`]: HTTP session, token-bucket rate limiter, retry policy
//! - [`config`]: settings consumed by crawlers (API key, contact email,
//!   timeouts, retry)
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use paperstream::{CrawlerFactory, FilterParams};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), paperstream::CrawlError> {
//! let factory = CrawlerFactory::default();
//! let crawler = factory.get("arxiv")?;
//! let progress = crawler.progress();
//!
//! let filters = FilterParams::new(50).year_range(Some(2023), None);
//! let mut papers = crawler.crawl("cancer biomarkers", filters)?;
//!
//! while let Some(item) = papers.next().await {
//!     match item {
//!         Ok(paper) => println!("{}: {}", paper.source, paper.title),
//!         Err(err) => eprintln!("source gave up: {err}"),
//!     }
//! }
//! println!("{:.0}% of cap", progress.percent());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod crawler;
pub mod error;
pub mod models;
pub mod normalize;
pub mod sources;
pub mod utils;

pub use config::CrawlerConfig;
pub use crawler::{CrawlProgress, Crawler, CrawlerFactory, PaperStream};
pub use error::CrawlError;
pub use models::{FilterParams, Paper, PaperType, SourceType};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
