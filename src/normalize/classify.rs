//! Keyword-based paper type classification.
//!
//! Applied only when the source reported no explicit type and the adapter
//! offered no hint. Rules run from most to least specific: a meta-analysis
//! is also a review, so the meta-analysis rule must fire first.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::PaperType;

const META_ANALYSIS: &[&str] = &[
    "meta-analysis",
    "meta analysis",
    "pooled analysis",
    "quantitative synthesis",
];

const REVIEW: &[&str] = &[
    "literature review",
    "narrative review",
    "scoping review",
    "umbrella review",
    "comprehensive review",
    "critical review",
    "state of the art review",
];

const RCT: &[&str] = &["randomized controlled trial", "randomised controlled trial"];

const CLINICAL_TRIAL: &[&str] = &[
    "clinical trial",
    "phase i ",
    "phase ii ",
    "phase iii ",
    "phase iv ",
    "double-blind",
    "placebo-controlled",
];

const CASE_SERIES: &[&str] = &["case series", "consecutive patients", "consecutive cases"];

const CASE_REPORT: &[&str] = &["case report", "case presentation", "a case of"];

const OBSERVATIONAL: &[&str] = &[
    "cross-sectional",
    "case-control",
    "retrospective study",
    "prospective study",
    "observational study",
    "population-based study",
];

const EDITORIAL: &[&str] = &["editorial", "editor's note", "from the editor"];

const LETTER: &[&str] = &[
    "letter to the editor",
    "correspondence",
    "reply to",
    "response to",
];

const COMMENTARY: &[&str] = &["commentary", "perspective", "viewpoint"];

fn rct_abbreviation() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Word-bounded so "rct" does not fire inside e.g. "infarction".
    RE.get_or_init(|| Regex::new(r"\brct\b").expect("static regex"))
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}

/// Classify from title and abstract. Returns `None` when no rule fires.
pub fn from_text(title: &str, abstract_text: Option<&str>) -> Option<PaperType> {
    let text = format!("{} {}", title, abstract_text.unwrap_or("")).to_lowercase();

    if contains_any(&text, META_ANALYSIS) {
        return Some(PaperType::MetaAnalysis);
    }
    if text.contains("systematic review") {
        return Some(PaperType::SystematicReview);
    }
    if contains_any(&text, REVIEW) {
        return Some(PaperType::Review);
    }
    if contains_any(&text, RCT) || rct_abbreviation().is_match(&text) {
        return Some(PaperType::RandomizedControlledTrial);
    }
    if contains_any(&text, CLINICAL_TRIAL) {
        return Some(PaperType::ClinicalTrial);
    }
    if contains_any(&text, CASE_SERIES) {
        return Some(PaperType::CaseSeries);
    }
    if contains_any(&text, CASE_REPORT) {
        return Some(PaperType::CaseReport);
    }
    if contains_any(&text, OBSERVATIONAL) {
        return Some(PaperType::ObservationalStudy);
    }
    if text.contains("cohort") && (text.contains("study") || text.contains("analysis")) {
        return Some(PaperType::CohortStudy);
    }
    if contains_any(&text, EDITORIAL) {
        return Some(PaperType::Editorial);
    }
    if contains_any(&text, LETTER) {
        return Some(PaperType::Letter);
    }
    if contains_any(&text, COMMENTARY) {
        return Some(PaperType::Commentary);
    }

    None
}
