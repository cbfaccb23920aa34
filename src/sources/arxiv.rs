//! arXiv source adapter using the Atom query API.
//!
//! Pagination is a plain numeric offset: each page asks for `page_size`
//! entries starting at `start`, and the source is exhausted once a page
//! comes back with fewer entries than requested.

use chrono::Datelike;
use url::Url;

use crate::error::CrawlError;
use crate::models::{FilterParams, PaperType, RawAuthor, RawRecord, SourceType};
use crate::sources::{
    foreign_cursor, CrawlRequest, PageCursor, ParsedPage, ServerFilters, SourceAdapter,
};
use crate::utils::HttpClient;

const ARXIV_API_URL: &str = "https://export.arxiv.org/api/query";
const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ArxivAdapter {
    base_url: String,
    page_size: usize,
}

impl Default for ArxivAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArxivAdapter {
    pub fn new() -> Self {
        Self {
            base_url: ARXIV_API_URL.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Point the adapter at a different endpoint (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Build the `search_query` expression, pushing the year range in as a
    /// `submitted_date` window.
    fn build_search_query(query: &str, filters: &FilterParams) -> String {
        let mut parts = vec![format!("all:{query}")];

        match (filters.year_start, filters.year_end) {
            (Some(start), Some(end)) => {
                parts.push(format!("submitted_date:[{start}0101 TO {end}1231]"))
            }
            (Some(start), None) => parts.push(format!("submitted_date:[{start}0101 TO *]")),
            (None, Some(end)) => parts.push(format!("submitted_date:[* TO {end}1231]")),
            (None, None) => {}
        }

        parts.join(" AND ")
    }

    fn entry_to_record(entry: &feed_rs::model::Entry) -> Option<RawRecord> {
        // Entry ids look like http://arxiv.org/abs/2401.12345v2.
        let arxiv_id = entry
            .id
            .rsplit("/abs/")
            .next()
            .filter(|id| !id.is_empty() && !id.contains('/'))
            .map(|id| id.split('v').next().unwrap_or(id).to_string())?;

        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.replace('\n', " ").trim().to_string())
            .filter(|t| !t.is_empty())?;

        let mut record = RawRecord::new(SourceType::Arxiv, arxiv_id, title);
        record.url = Some(entry.id.clone());

        record.abstract_text = entry
            .summary
            .as_ref()
            .map(|s| s.content.trim().to_string())
            .filter(|s| !s.is_empty());

        record.authors = entry
            .authors
            .iter()
            .filter(|person| !person.name.trim().is_empty())
            .map(|person| RawAuthor::named(person.name.trim()))
            .collect();

        if let Some(published) = entry.published {
            record.date = Some(published.date_naive());
            record.year = Some(published.year());
        }

        record.doi = entry
            .links
            .iter()
            .find(|link| link.title.as_deref() == Some("doi"))
            .and_then(|link| link.href.rsplit("doi.org/").next().map(str::to_string));

        // arXiv submissions are English.
        record.language = Some("en".to_string());

        Some(record)
    }
}

impl SourceAdapter for ArxivAdapter {
    fn source(&self) -> SourceType {
        SourceType::Arxiv
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn server_filters(&self) -> ServerFilters {
        ServerFilters::YEAR_RANGE
    }

    fn initial_cursor(&self, _request: &CrawlRequest) -> PageCursor {
        PageCursor::Offset { start: 0 }
    }

    fn build_request(
        &self,
        client: &HttpClient,
        request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<reqwest::RequestBuilder, CrawlError> {
        let PageCursor::Offset { start } = cursor else {
            return Err(foreign_cursor(SourceType::Arxiv, cursor));
        };

        let search_query = Self::build_search_query(&request.query, &request.filters);
        let url = Url::parse_with_params(
            &self.base_url,
            [
                ("search_query", search_query.as_str()),
                ("start", &start.to_string()),
                ("max_results", &self.page_size.to_string()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ],
        )
        .map_err(|e| CrawlError::Api {
            source: SourceType::Arxiv,
            message: format!("invalid request URL: {e}"),
        })?;

        Ok(client
            .get(url.as_str())
            .header("Accept", "application/atom+xml"))
    }

    fn parse_page(
        &self,
        body: &str,
        _request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<ParsedPage, CrawlError> {
        let PageCursor::Offset { start } = cursor else {
            return Err(foreign_cursor(SourceType::Arxiv, cursor));
        };

        let feed = feed_rs::parser::parse(body.as_bytes()).map_err(|e| {
            CrawlError::MalformedPage {
                source: SourceType::Arxiv,
                message: format!("Atom feed: {e}"),
            }
        })?;

        let entry_count = feed.entries.len();
        let mut records = Vec::new();
        let mut dropped = 0usize;

        for entry in &feed.entries {
            match Self::entry_to_record(entry) {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }

        // A short page means the result list ran out.
        let next = if entry_count < self.page_size {
            None
        } else {
            Some(PageCursor::Offset {
                start: start + self.page_size,
            })
        };

        Ok(ParsedPage {
            records,
            next,
            dropped,
        })
    }

    fn advance_past(&self, cursor: &PageCursor) -> Option<PageCursor> {
        match cursor {
            PageCursor::Offset { start } => Some(PageCursor::Offset {
                start: start + self.page_size,
            }),
            _ => None,
        }
    }

    fn classify_hint(&self, _record: &RawRecord) -> Option<PaperType> {
        Some(PaperType::Preprint)
    }
}
