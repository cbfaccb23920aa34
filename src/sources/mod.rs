//! Source adapters: one per external paper API.
//!
//! Each adapter knows the wire shape of exactly one API: how to build a
//! page request, how to parse a page body into raw records, and what its
//! continuation state looks like. Orchestration depends only on the
//! [`SourceAdapter`] trait, never on an adapter's internals.

mod arxiv;
mod biorxiv;
mod pubmed;

pub mod mock;

pub use arxiv::ArxivAdapter;
pub use biorxiv::{BiorxivAdapter, Server};
pub use pubmed::PubMedAdapter;

use chrono::NaiveDate;

use crate::error::CrawlError;
use crate::models::{FilterParams, PaperType, RawRecord, SourceType};
use crate::utils::HttpClient;

/// A query plus its filters, as seen by an adapter for one crawl.
#[derive(Debug, Clone)]
pub struct CrawlRequest {
    pub query: String,
    pub filters: FilterParams,
}

/// Continuation state for one source's pagination.
///
/// Minted and interpreted only by the adapter that owns it; handing a
/// cursor to a different adapter is rejected with an error.
#[derive(Debug, Clone, PartialEq)]
pub enum PageCursor {
    /// Before the first request.
    Start,
    /// Numeric offset into the result list (arXiv).
    Offset { start: usize },
    /// NCBI history-server session: fetch fixed-size batches until `total`
    /// records have been pulled (PubMed).
    Token {
        web_env: String,
        query_key: String,
        retstart: usize,
        total: usize,
    },
    /// Date interval with a numeric offset inside it (bioRxiv/medRxiv).
    Window {
        from: NaiveDate,
        until: NaiveDate,
        offset: usize,
    },
}

/// One parsed page: its records, the continuation, and how many records
/// inside the page were individually malformed and dropped.
#[derive(Debug, Default)]
pub struct ParsedPage {
    pub records: Vec<RawRecord>,
    /// `None` means the source is exhausted for this query.
    pub next: Option<PageCursor>,
    pub dropped: usize,
}

bitflags::bitflags! {
    /// Filters an adapter can push into the request server-side. Everything
    /// else is applied client-side after normalization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ServerFilters: u8 {
        const YEAR_RANGE = 1 << 0;
        const LANGUAGE = 1 << 1;
        const PAPER_TYPE = 1 << 2;
    }
}

/// Capability set implemented by every source adapter.
///
/// Adapters are pure protocol logic: they never perform I/O themselves.
/// The crawler owns the HTTP session, pacing, and retries, and calls the
/// adapter to build each request and interpret each response.
pub trait SourceAdapter: Send + Sync + std::fmt::Debug {
    /// Which source this adapter speaks for.
    fn source(&self) -> SourceType;

    /// Records requested per page.
    fn page_size(&self) -> usize;

    /// Filters this adapter pushes into the request.
    fn server_filters(&self) -> ServerFilters;

    /// Cursor for the first page of a crawl.
    fn initial_cursor(&self, request: &CrawlRequest) -> PageCursor;

    /// Build the HTTP request for one page.
    fn build_request(
        &self,
        client: &HttpClient,
        request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<reqwest::RequestBuilder, CrawlError>;

    /// Parse a page body into records plus the continuation state.
    ///
    /// A single malformed record within an otherwise valid page is dropped
    /// and counted in [`ParsedPage::dropped`]; only an unparseable body is
    /// an error.
    fn parse_page(
        &self,
        body: &str,
        request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<ParsedPage, CrawlError>;

    /// Cursor for the page after `cursor`, computed without a response
    /// body. Used to skip past a malformed page; `None` when the position
    /// cannot be advanced blindly (e.g. the PubMed search step).
    fn advance_past(&self, cursor: &PageCursor) -> Option<PageCursor>;

    /// Source-specific classification signal for a record, consumed by the
    /// normalizer (e.g. preprint servers only hold preprints).
    fn classify_hint(&self, record: &RawRecord) -> Option<PaperType>;
}

/// Error for a cursor that was minted by a different adapter.
pub(crate) fn foreign_cursor(source: SourceType, cursor: &PageCursor) -> CrawlError {
    CrawlError::Api {
        source,
        message: format!("cursor {cursor:?} was not minted by the {source} adapter"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_filters_compose() {
        let filters = ServerFilters::YEAR_RANGE | ServerFilters::LANGUAGE;
        assert!(filters.contains(ServerFilters::YEAR_RANGE));
        assert!(!filters.contains(ServerFilters::PAPER_TYPE));
    }
}
