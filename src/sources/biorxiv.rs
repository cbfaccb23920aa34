//! bioRxiv/medRxiv source adapter.
//!
//! Both servers share one JSON API, differing only in the server segment
//! of the path. The API has no free-text search: crawls walk a date
//! interval page by page and match the query against title/abstract
//! client-side. The cursor is the interval plus a numeric offset inside
//! it; each response reports the interval's total so exhaustion is
//! detectable.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::CrawlError;
use crate::models::{PaperType, RawAuthor, RawRecord, SourceType};
use crate::sources::{
    foreign_cursor, CrawlRequest, PageCursor, ParsedPage, ServerFilters, SourceAdapter,
};
use crate::utils::HttpClient;

const BIORXIV_API_URL: &str = "https://api.biorxiv.org";
const DEFAULT_PAGE_SIZE: usize = 100;

/// Earliest interval start when no year filter is given; bioRxiv went
/// live in late 2013.
const WINDOW_START: (i32, u32, u32) = (2013, 1, 1);
const WINDOW_END: (i32, u32, u32) = (2099, 12, 31);

/// Which preprint server to crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Server {
    Biorxiv,
    Medrxiv,
}

impl Server {
    fn path(&self) -> &'static str {
        match self {
            Server::Biorxiv => "biorxiv",
            Server::Medrxiv => "medrxiv",
        }
    }

    fn source_type(&self) -> SourceType {
        match self {
            Server::Biorxiv => SourceType::Biorxiv,
            Server::Medrxiv => SourceType::Medrxiv,
        }
    }

    fn content_url(&self, doi: &str, version: Option<&str>) -> String {
        let host = self.path();
        match version {
            Some(v) => format!("https://www.{host}.org/content/{doi}v{v}"),
            None => format!("https://www.{host}.org/content/{doi}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BiorxivAdapter {
    base_url: String,
    server: Server,
    page_size: usize,
}

impl BiorxivAdapter {
    pub fn new(server: Server) -> Self {
        Self {
            base_url: BIORXIV_API_URL.to_string(),
            server,
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

    fn source_type(&self) -> SourceType {
        self.server.source_type()
    }

    fn preprint_to_record(&self, preprint: &Preprint) -> Option<RawRecord> {
        let doi = preprint.doi.as_deref().filter(|d| !d.is_empty())?;
        let title = preprint
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())?;

        let mut record = RawRecord::new(self.source_type(), doi, title);
        record.doi = Some(doi.to_string());
        record.url = Some(self.server.content_url(doi, preprint.version.as_deref()));

        record.abstract_text = preprint
            .abstract_text
            .as_deref()
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string);

        // Authors come as one semicolon-separated string.
        if let Some(authors) = &preprint.authors {
            record.authors = authors
                .split(';')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(RawAuthor::named)
                .collect();
        }
        // The corresponding institution is the only affiliation signal the
        // API exposes; attach it to the first author for country inference.
        if let (Some(first), Some(institution)) = (
            record.authors.first_mut(),
            preprint
                .corresponding_institution
                .as_deref()
                .filter(|i| !i.is_empty() && *i != "NA"),
        ) {
            first.affiliation = Some(institution.to_string());
        }

        if let Some(date) = &preprint.date {
            record.date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok();
            record.year = record.date.map(|d| chrono::Datelike::year(&d));
        }

        // Journal title appears once the preprint is published elsewhere.
        record.journal = preprint
            .published_journal
            .as_deref()
            .filter(|j| !j.is_empty() && *j != "NA")
            .map(str::to_string);

        record.language = Some("en".to_string());
        Some(record)
    }

    fn matches_query(preprint: &Preprint, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        let needle = query.to_lowercase();
        let in_title = preprint
            .title
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains(&needle));
        let in_abstract = preprint
            .abstract_text
            .as_deref()
            .is_some_and(|a| a.to_lowercase().contains(&needle));
        in_title || in_abstract
    }
}

impl SourceAdapter for BiorxivAdapter {
    fn source(&self) -> SourceType {
        self.source_type()
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn server_filters(&self) -> ServerFilters {
        ServerFilters::YEAR_RANGE
    }

    fn initial_cursor(&self, request: &CrawlRequest) -> PageCursor {
        let default_from = NaiveDate::from_ymd_opt(WINDOW_START.0, WINDOW_START.1, WINDOW_START.2)
            .expect("static date");
        let default_until =
            NaiveDate::from_ymd_opt(WINDOW_END.0, WINDOW_END.1, WINDOW_END.2).expect("static date");

        let from = request
            .filters
            .year_start
            .and_then(|y| NaiveDate::from_ymd_opt(y, 1, 1))
            .unwrap_or(default_from);
        let until = request
            .filters
            .year_end
            .and_then(|y| NaiveDate::from_ymd_opt(y, 12, 31))
            .unwrap_or(default_until);

        PageCursor::Window {
            from,
            until,
            offset: 0,
        }
    }

    fn build_request(
        &self,
        client: &HttpClient,
        _request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<reqwest::RequestBuilder, CrawlError> {
        let PageCursor::Window {
            from,
            until,
            offset,
        } = cursor
        else {
            return Err(foreign_cursor(self.source_type(), cursor));
        };

        let url = format!(
            "{}/details/{}/{}/{}/{}",
            self.base_url,
            self.server.path(),
            from.format("%Y-%m-%d"),
            until.format("%Y-%m-%d"),
            offset
        );
        Ok(client.get(&url))
    }

    fn parse_page(
        &self,
        body: &str,
        request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<ParsedPage, CrawlError> {
        let PageCursor::Window {
            from,
            until,
            offset,
        } = cursor
        else {
            return Err(foreign_cursor(self.source_type(), cursor));
        };

        let response: ApiResponse =
            serde_json::from_str(body).map_err(|e| CrawlError::MalformedPage {
                source: self.source_type(),
                message: format!("details JSON: {e}"),
            })?;

        let preprints = response.collection;
        let received = preprints.len();

        let mut records = Vec::new();
        let mut dropped = 0usize;
        for preprint in &preprints {
            if !Self::matches_query(preprint, &request.query) {
                continue;
            }
            match self.preprint_to_record(preprint) {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }

        let total = response
            .messages
            .iter()
            .find_map(|m| m.total_as_usize());
        let new_offset = offset + received;
        let exhausted = received == 0 || total.is_some_and(|t| new_offset >= t);

        Ok(ParsedPage {
            records,
            next: (!exhausted).then(|| PageCursor::Window {
                from: *from,
                until: *until,
                offset: new_offset,
            }),
            dropped,
        })
    }

    fn advance_past(&self, cursor: &PageCursor) -> Option<PageCursor> {
        match cursor {
            PageCursor::Window {
                from,
                until,
                offset,
            } => Some(PageCursor::Window {
                from: *from,
                until: *until,
                offset: offset + self.page_size,
            }),
            _ => None,
        }
    }

    fn classify_hint(&self, _record: &RawRecord) -> Option<PaperType> {
        Some(PaperType::Preprint)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    collection: Vec<Preprint>,
    #[serde(default)]
    messages: Vec<ApiMessage>,
}

#[derive(Debug, Deserialize)]
struct Preprint {
    doi: Option<String>,
    title: Option<String>,
    authors: Option<String>,
    #[serde(rename = "author_corresponding_institution")]
    corresponding_institution: Option<String>,
    date: Option<String>,
    version: Option<String>,
    #[serde(rename = "abstract")]
    abstract_text: Option<String>,
    #[serde(rename = "published_journal")]
    published_journal: Option<String>,
}

/// Status block; `total` arrives as a number or a string depending on the
/// server, so it is coerced after the fact.
#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    total: Option<serde_json::Value>,
}

impl ApiMessage {
    fn total_as_usize(&self) -> Option<usize> {
        match self.total.as_ref()? {
            serde_json::Value::Number(n) => n.as_u64().map(|n| n as usize),
            serde_json::Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}
