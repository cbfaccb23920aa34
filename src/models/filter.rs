//! Validated, immutable filter specification for a crawl.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CrawlError;
use crate::models::{Paper, PaperType};

/// Filters applied to crawled records.
///
/// Constructed once, validated before the first request, and read-only for
/// the lifetime of the crawl. Empty sets mean "no filter". Adapters push
/// whatever the source supports into the request (year range, language);
/// everything is re-checked client-side so the output invariants hold no
/// matter what the server returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterParams {
    /// Earliest publication year, inclusive.
    pub year_start: Option<i32>,

    /// Latest publication year, inclusive.
    pub year_end: Option<i32>,

    /// ISO 3166-1 alpha-3 country codes.
    pub countries: HashSet<String>,

    /// Paper type whitelist.
    pub paper_types: HashSet<PaperType>,

    /// ISO 639-1 language codes.
    pub languages: HashSet<String>,

    /// Hard cap on yielded records. Required and positive.
    pub max_results: usize,
}

impl FilterParams {
    /// Create filters with the required result cap; everything else open.
    pub fn new(max_results: usize) -> Self {
        Self {
            year_start: None,
            year_end: None,
            countries: HashSet::new(),
            paper_types: HashSet::new(),
            languages: HashSet::new(),
            max_results,
        }
    }

    /// Restrict to an inclusive year range. Either bound may be `None`.
    pub fn year_range(mut self, start: Option<i32>, end: Option<i32>) -> Self {
        self.year_start = start;
        self.year_end = end;
        self
    }

    /// Add a country code to the whitelist.
    pub fn country(mut self, code: impl Into<String>) -> Self {
        self.countries.insert(code.into().to_uppercase());
        self
    }

    /// Add a paper type to the whitelist.
    pub fn paper_type(mut self, paper_type: PaperType) -> Self {
        self.paper_types.insert(paper_type);
        self
    }

    /// Add a language code to the whitelist.
    pub fn language(mut self, code: impl Into<String>) -> Self {
        self.languages.insert(code.into().to_lowercase());
        self
    }

    /// Validate the filter set. Runs synchronously before any network
    /// activity; failures are always recoverable by correcting the input.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.max_results == 0 {
            return Err(CrawlError::InvalidFilter(
                "max_results must be positive".into(),
            ));
        }
        if let (Some(start), Some(end)) = (self.year_start, self.year_end) {
            if start > end {
                return Err(CrawlError::InvalidFilter(format!(
                    "year_start {start} is after year_end {end}"
                )));
            }
        }
        for year in [self.year_start, self.year_end].into_iter().flatten() {
            if !(1800..=2100).contains(&year) {
                return Err(CrawlError::InvalidFilter(format!(
                    "year {year} is outside the supported range 1800..=2100"
                )));
            }
        }
        Ok(())
    }

    /// Whether a normalized paper survives this filter set.
    ///
    /// A paper whose field is unknown fails the corresponding non-empty
    /// filter: a year-bounded crawl never yields a paper without a year.
    pub fn matches(&self, paper: &Paper) -> bool {
        if self.year_start.is_some() || self.year_end.is_some() {
            let Some(year) = paper.year else {
                return false;
            };
            if self.year_start.is_some_and(|start| year < start) {
                return false;
            }
            if self.year_end.is_some_and(|end| year > end) {
                return false;
            }
        }

        if !self.countries.is_empty() {
            match &paper.country {
                Some(code) if self.countries.contains(code) => {}
                _ => return false,
            }
        }

        if !self.paper_types.is_empty() && !self.paper_types.contains(&paper.paper_type) {
            return false;
        }

        if !self.languages.is_empty() {
            match &paper.language {
                Some(code) if self.languages.contains(code) => {}
                _ => return false,
            }
        }

        true
    }
}
