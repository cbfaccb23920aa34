//! Normalization of raw per-source records into canonical papers.

pub mod classify;
pub mod country;

use chrono::Datelike;

use crate::models::{Paper, PaperType, RawRecord};

/// Resolver from a free-text affiliation to an alpha-3 country code.
pub type CountryResolver = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Maps raw records into the canonical [`Paper`] shape and settles the
/// paper type.
///
/// Classification precedence is fixed: explicit source metadata, then the
/// adapter's hint, then keyword rules over title/abstract, then
/// `research_article`. Normalization is deterministic; the same raw record
/// always produces the same paper.
pub struct Normalizer {
    country: CountryResolver,
}

impl std::fmt::Debug for Normalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Normalizer").finish_non_exhaustive()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            country: Box::new(|affiliation| country::from_affiliation(affiliation)),
        }
    }
}

impl Normalizer {
    /// Normalizer with a custom country resolver.
    pub fn with_country_resolver(country: CountryResolver) -> Self {
        Self { country }
    }

    /// Build the canonical paper for a raw record.
    pub fn normalize(&self, raw: RawRecord, hint: Option<PaperType>) -> Paper {
        let paper_type = raw
            .explicit_type
            .or(hint)
            .or_else(|| classify::from_text(&raw.title, raw.abstract_text.as_deref()))
            .unwrap_or(PaperType::ResearchArticle);

        let country = raw
            .authors
            .iter()
            .filter_map(|author| author.affiliation.as_deref())
            .find_map(|affiliation| (self.country)(affiliation));

        let year = raw.year.or_else(|| raw.date.map(|d| d.year()));

        Paper {
            id: raw.id,
            title: raw.title,
            authors: raw.authors.into_iter().map(|a| a.name).collect(),
            abstract_text: raw.abstract_text,
            year,
            journal: raw.journal,
            doi: raw.doi,
            url: raw.url,
            source: raw.source,
            country,
            language: raw.language.as_deref().map(normalize_language),
            paper_type,
        }
    }
}

/// Collapse the language spellings the sources use onto ISO 639-1 codes.
/// PubMed reports ISO 639-2 ("eng"); unknown values pass through
/// lower-cased.
fn normalize_language(code: &str) -> String {
    match code.to_lowercase().as_str() {
        "eng" | "english" => "en".into(),
        "fre" | "fra" | "french" => "fr".into(),
        "ger" | "deu" | "german" => "de".into(),
        "spa" | "spanish" => "es".into(),
        "ita" | "italian" => "it".into(),
        "por" | "portuguese" => "pt".into(),
        "chi" | "zho" | "chinese" => "zh".into(),
        "jpn" | "japanese" => "ja".into(),
        "kor" | "korean" => "ko".into(),
        "rus" | "russian" => "ru".into(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawAuthor, SourceType};
    use chrono::NaiveDate;

    fn raw() -> RawRecord {
        let mut record = RawRecord::new(SourceType::Pubmed, "100", "A plain study of things");
        record.authors = vec![RawAuthor {
            name: "J. Doe".into(),
            affiliation: Some("University Hospital, Lund, Sweden".into()),
        }];
        record.language = Some("eng".into());
        record.date = NaiveDate::from_ymd_opt(2022, 3, 14);
        record
    }

    #[test]
    fn explicit_type_wins_over_hint_and_keywords() {
        let mut record = raw();
        record.title = "A meta-analysis of everything".into();
        record.explicit_type = Some(PaperType::Editorial);

        let paper = Normalizer::default().normalize(record, Some(PaperType::Preprint));
        assert_eq!(paper.paper_type, PaperType::Editorial);
    }

    #[test]
    fn hint_wins_over_keywords() {
        let mut record = raw();
        record.title = "A meta-analysis of everything".into();

        let paper = Normalizer::default().normalize(record, Some(PaperType::Preprint));
        assert_eq!(paper.paper_type, PaperType::Preprint);
    }

    #[test]
    fn keywords_win_over_default() {
        let mut record = raw();
        record.title = "A systematic review of things".into();

        let paper = Normalizer::default().normalize(record, None);
        assert_eq!(paper.paper_type, PaperType::SystematicReview);
    }

    #[test]
    fn default_is_research_article() {
        let paper = Normalizer::default().normalize(raw(), None);
        assert_eq!(paper.paper_type, PaperType::ResearchArticle);
    }

    #[test]
    fn year_falls_back_to_date() {
        let paper = Normalizer::default().normalize(raw(), None);
        assert_eq!(paper.year, Some(2022));

        let mut record = raw();
        record.year = Some(2019);
        let paper = Normalizer::default().normalize(record, None);
        assert_eq!(paper.year, Some(2019));
    }

    #[test]
    fn country_comes_from_first_resolvable_affiliation() {
        let paper = Normalizer::default().normalize(raw(), None);
        assert_eq!(paper.country.as_deref(), Some("SWE"));
    }

    #[test]
    fn language_codes_are_collapsed() {
        let paper = Normalizer::default().normalize(raw(), None);
        assert_eq!(paper.language.as_deref(), Some("en"));
    }

    #[test]
    fn normalization_is_deterministic() {
        let normalizer = Normalizer::default();
        let a = normalizer.normalize(raw(), None);
        let b = normalizer.normalize(raw(), None);
        assert_eq!(a, b);
    }

    #[test]
    fn custom_country_resolver_is_used() {
        let normalizer =
            Normalizer::with_country_resolver(Box::new(|_| Some("ZZZ".to_string())));
        let paper = normalizer.normalize(raw(), None);
        assert_eq!(paper.country.as_deref(), Some("ZZZ"));
    }
}
