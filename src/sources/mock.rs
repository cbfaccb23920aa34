//! Scripted source adapter for exercising the crawler without a real API.
//!
//! Pages are pre-scripted by index; the HTTP request still goes out (point
//! `base_url` at a local test server), but the response body is ignored
//! and the scripted page is returned instead. This keeps the crawler's
//! fetch/retry path honest while making page content deterministic.

use std::collections::HashMap;

use crate::error::CrawlError;
use crate::models::{PaperType, RawRecord, SourceType};
use crate::sources::{
    foreign_cursor, CrawlRequest, PageCursor, ParsedPage, ServerFilters, SourceAdapter,
};
use crate::utils::HttpClient;

/// One scripted page.
#[derive(Debug, Clone)]
pub enum ScriptedPage {
    /// Records to return; `last` marks source exhaustion.
    Page { records: Vec<RawRecord>, last: bool },
    /// A page whose body fails to parse.
    Malformed,
}

#[derive(Debug)]
pub struct MockAdapter {
    base_url: String,
    pages: HashMap<usize, ScriptedPage>,
    page_size: usize,
    hint: Option<PaperType>,
}

impl MockAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            pages: HashMap::new(),
            page_size: 10,
            hint: None,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_hint(mut self, hint: PaperType) -> Self {
        self.hint = Some(hint);
        self
    }

    /// Script the page at `index` (0-based).
    pub fn page(mut self, index: usize, page: ScriptedPage) -> Self {
        self.pages.insert(index, page);
        self
    }
}

/// Build a minimal raw record for tests.
pub fn make_record(id: &str, title: &str) -> RawRecord {
    let mut record = RawRecord::new(SourceType::Pubmed, id, title);
    record.year = Some(2023);
    record.language = Some("en".into());
    record
}

impl SourceAdapter for MockAdapter {
    fn source(&self) -> SourceType {
        SourceType::Pubmed
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn server_filters(&self) -> ServerFilters {
        ServerFilters::empty()
    }

    fn initial_cursor(&self, _request: &CrawlRequest) -> PageCursor {
        PageCursor::Offset { start: 0 }
    }

    fn build_request(
        &self,
        client: &HttpClient,
        _request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<reqwest::RequestBuilder, CrawlError> {
        let PageCursor::Offset { start } = cursor else {
            return Err(foreign_cursor(self.source(), cursor));
        };
        let index = start / self.page_size;
        Ok(client.get(&format!("{}/mock?page={}", self.base_url, index)))
    }

    fn parse_page(
        &self,
        _body: &str,
        _request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<ParsedPage, CrawlError> {
        let PageCursor::Offset { start } = cursor else {
            return Err(foreign_cursor(self.source(), cursor));
        };
        let index = start / self.page_size;

        match self.pages.get(&index) {
            Some(ScriptedPage::Page { records, last }) => Ok(ParsedPage {
                records: records.clone(),
                next: (!last).then(|| PageCursor::Offset {
                    start: start + self.page_size,
                }),
                dropped: 0,
            }),
            Some(ScriptedPage::Malformed) => Err(CrawlError::MalformedPage {
                source: self.source(),
                message: format!("scripted malformed page {index}"),
            }),
            None => Ok(ParsedPage::default()),
        }
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
        self.hint
    }
}
