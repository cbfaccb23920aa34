//! Canonical paper record produced by the crawl engine.

use serde::{Deserialize, Serialize};

/// The source API a paper was crawled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Pubmed,
    Arxiv,
    Biorxiv,
    Medrxiv,
}

impl SourceType {
    /// Identifier used by the factory and in log fields.
    pub fn id(&self) -> &'static str {
        match self {
            SourceType::Pubmed => "pubmed",
            SourceType::Arxiv => "arxiv",
            SourceType::Biorxiv => "biorxiv",
            SourceType::Medrxiv => "medrxiv",
        }
    }

    /// Human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            SourceType::Pubmed => "PubMed",
            SourceType::Arxiv => "arXiv",
            SourceType::Biorxiv => "bioRxiv",
            SourceType::Medrxiv => "medRxiv",
        }
    }

    /// Whether records from this source are un-peer-reviewed by definition.
    pub fn is_preprint_server(&self) -> bool {
        matches!(
            self,
            SourceType::Arxiv | SourceType::Biorxiv | SourceType::Medrxiv
        )
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

// `CrawlError` variants carry a `source: SourceType` field, which thiserror
// (2.0) unconditionally treats as the error's `std::error::Error` source when
// a field is named `source`. Implementing the (empty) Error trait satisfies
// that bound without altering any behavior.
impl std::error::Error for SourceType {}

/// Classification of research paper types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaperType {
    ResearchArticle,
    Review,
    SystematicReview,
    MetaAnalysis,
    CaseReport,
    CaseSeries,
    ClinicalTrial,
    RandomizedControlledTrial,
    ObservationalStudy,
    CohortStudy,
    Editorial,
    Letter,
    Commentary,
    Preprint,
}

impl PaperType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaperType::ResearchArticle => "research_article",
            PaperType::Review => "review",
            PaperType::SystematicReview => "systematic_review",
            PaperType::MetaAnalysis => "meta_analysis",
            PaperType::CaseReport => "case_report",
            PaperType::CaseSeries => "case_series",
            PaperType::ClinicalTrial => "clinical_trial",
            PaperType::RandomizedControlledTrial => "randomized_controlled_trial",
            PaperType::ObservationalStudy => "observational_study",
            PaperType::CohortStudy => "cohort_study",
            PaperType::Editorial => "editorial",
            PaperType::Letter => "letter",
            PaperType::Commentary => "commentary",
            PaperType::Preprint => "preprint",
        }
    }
}

impl std::fmt::Display for PaperType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A normalized research paper, uniform across all sources.
///
/// Constructed once by the normalizer and immutable afterwards; the engine
/// never touches a record after yielding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Source-native identifier (PMID, arXiv id, DOI).
    pub id: String,

    /// Paper title; never empty.
    pub title: String,

    /// Authors in source order; may be empty when the source omits them.
    pub authors: Vec<String>,

    /// Abstract text.
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    /// Publication year.
    pub year: Option<i32>,

    /// Journal or venue, when the source reports one.
    pub journal: Option<String>,

    /// Digital Object Identifier; dedup key when present.
    pub doi: Option<String>,

    /// Link to the source record.
    pub url: Option<String>,

    /// Where the paper was crawled from.
    pub source: SourceType,

    /// ISO 3166-1 alpha-3 country code inferred from affiliations;
    /// `None` when unknown.
    pub country: Option<String>,

    /// ISO 639-1 language code, when known.
    pub language: Option<String>,

    /// Classified paper type.
    pub paper_type: PaperType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_ids_round_trip_through_serde() {
        for source in [
            SourceType::Pubmed,
            SourceType::Arxiv,
            SourceType::Biorxiv,
            SourceType::Medrxiv,
        ] {
            let json = serde_json::to_string(&source).unwrap();
            assert_eq!(json, format!("\"{}\"", source.id()));
            let back: SourceType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, source);
        }
    }

    #[test]
    fn paper_type_serializes_snake_case() {
        let json = serde_json::to_string(&PaperType::RandomizedControlledTrial).unwrap();
        assert_eq!(json, "\"randomized_controlled_trial\"");
        assert_eq!(
            PaperType::RandomizedControlledTrial.to_string(),
            "randomized_controlled_trial"
        );
    }

    #[test]
    fn preprint_servers() {
        assert!(SourceType::Arxiv.is_preprint_server());
        assert!(SourceType::Medrxiv.is_preprint_server());
        assert!(!SourceType::Pubmed.is_preprint_server());
    }
}
