//! Raw per-source records, the half-way point between a page body and a
//! canonical [`Paper`](crate::models::Paper).

use chrono::NaiveDate;

use crate::models::{PaperType, SourceType};

/// An author as reported by the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawAuthor {
    pub name: String,
    /// Free-text affiliation, when the source provides one.
    pub affiliation: Option<String>,
}

impl RawAuthor {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
        }
    }
}

/// One record parsed out of a page, before normalization.
///
/// Adapters fill whatever their payload carries and leave the rest `None`;
/// a record missing required fields (id, title) is dropped by the adapter
/// and counted, never yielded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub source: SourceType,
    pub id: String,
    pub title: String,
    pub abstract_text: Option<String>,
    pub authors: Vec<RawAuthor>,
    pub journal: Option<String>,
    pub date: Option<NaiveDate>,
    pub year: Option<i32>,
    pub doi: Option<String>,
    pub url: Option<String>,
    /// Language as reported by the source (e.g. PubMed's "eng").
    pub language: Option<String>,
    /// Type metadata reported by the source itself; takes precedence over
    /// every classification heuristic.
    pub explicit_type: Option<PaperType>,
}

impl RawRecord {
    /// A minimal record; adapters extend it field by field.
    pub fn new(source: SourceType, id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source,
            id: id.into(),
            title: title.into(),
            abstract_text: None,
            authors: Vec::new(),
            journal: None,
            date: None,
            year: None,
            doi: None,
            url: None,
            language: None,
            explicit_type: None,
        }
    }
}
