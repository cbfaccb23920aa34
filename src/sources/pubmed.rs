//! PubMed source adapter using the NCBI E-utilities API.
//!
//! Pagination runs through the history server: the first request is an
//! ESearch with `usehistory=y` and `retmax=0`, which yields a WebEnv/
//! QueryKey session plus the total hit count and no records. Subsequent
//! requests are EFetch calls pulling fixed-size XML batches against that
//! session until the total is reached.

use quick_xml::de::from_str;
use serde::Deserialize;
use url::Url;

use crate::config::CrawlerConfig;
use crate::error::CrawlError;
use crate::models::{FilterParams, PaperType, RawAuthor, RawRecord, SourceType};
use crate::sources::{
    foreign_cursor, CrawlRequest, PageCursor, ParsedPage, ServerFilters, SourceAdapter,
};
use crate::utils::HttpClient;

const PUBMED_EUTILS_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct PubMedAdapter {
    base_url: String,
    api_key: Option<String>,
    contact_email: Option<String>,
    page_size: usize,
}

impl PubMedAdapter {
    pub fn new(config: &CrawlerConfig) -> Self {
        Self {
            base_url: PUBMED_EUTILS_URL.to_string(),
            api_key: config.pubmed_api_key.clone(),
            contact_email: config.contact_email.clone(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Point the adapter at a different E-utilities endpoint (for tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the EFetch batch size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Parameters common to every E-utilities request.
    fn base_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("tool", env!("CARGO_PKG_NAME").to_string()),
        ];
        if let Some(email) = &self.contact_email {
            params.push(("email", email.clone()));
        }
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params
    }

    /// Build the ESearch term with the filters PubMed understands.
    fn build_term(query: &str, filters: &FilterParams) -> String {
        let mut parts = vec![query.to_string()];

        match (filters.year_start, filters.year_end) {
            (Some(start), Some(end)) => parts.push(format!("({start}:{end}[pdat])")),
            (Some(start), None) => parts.push(format!("({start}:3000[pdat])")),
            (None, Some(end)) => parts.push(format!("(1800:{end}[pdat])")),
            (None, None) => {}
        }

        if !filters.languages.is_empty() {
            let mut languages: Vec<_> = filters
                .languages
                .iter()
                .map(|code| format!("{}[la]", pubmed_language(code)))
                .collect();
            languages.sort();
            parts.push(format!("({})", languages.join(" OR ")));
        }

        let mut types: Vec<_> = filters
            .paper_types
            .iter()
            .filter_map(|t| pubmed_publication_type(*t))
            .map(|t| format!("{t}[pt]"))
            .collect();
        if !types.is_empty() {
            types.sort();
            parts.push(format!("({})", types.join(" OR ")));
        }

        parts.join(" AND ")
    }

    fn parse_search(&self, body: &str) -> Result<ParsedPage, CrawlError> {
        let envelope: ESearchEnvelope = serde_json::from_str(body).map_err(|e| {
            CrawlError::MalformedPage {
                source: SourceType::Pubmed,
                message: format!("ESearch JSON: {e}"),
            }
        })?;

        let result = envelope
            .esearchresult
            .ok_or_else(|| CrawlError::MalformedPage {
                source: SourceType::Pubmed,
                message: "ESearch response missing esearchresult".into(),
            })?;

        let total: usize = result
            .count
            .as_deref()
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| CrawlError::MalformedPage {
                source: SourceType::Pubmed,
                message: "ESearch response missing count".into(),
            })?;

        if total == 0 {
            return Ok(ParsedPage::default());
        }

        let (web_env, query_key) = match (result.webenv, result.querykey) {
            (Some(w), Some(k)) => (w, k),
            _ => {
                return Err(CrawlError::MalformedPage {
                    source: SourceType::Pubmed,
                    message: "ESearch response missing history session".into(),
                })
            }
        };

        Ok(ParsedPage {
            records: Vec::new(),
            next: Some(PageCursor::Token {
                web_env,
                query_key,
                retstart: 0,
                total,
            }),
            dropped: 0,
        })
    }

    fn parse_fetch(
        &self,
        body: &str,
        retstart: usize,
        total: usize,
        cursor: &PageCursor,
    ) -> Result<ParsedPage, CrawlError> {
        let set: PubmedArticleSet = from_str(body).map_err(|e| CrawlError::MalformedPage {
            source: SourceType::Pubmed,
            message: format!("EFetch XML: {e}"),
        })?;

        let mut records = Vec::new();
        let mut dropped = 0usize;
        let article_count = set.articles.len();

        for article in set.articles {
            match article_to_record(article) {
                Some(record) => records.push(record),
                None => dropped += 1,
            }
        }

        let next_start = retstart + self.page_size;
        let next = if article_count == 0 || next_start >= total {
            None
        } else if let PageCursor::Token {
            web_env, query_key, ..
        } = cursor
        {
            Some(PageCursor::Token {
                web_env: web_env.clone(),
                query_key: query_key.clone(),
                retstart: next_start,
                total,
            })
        } else {
            None
        };

        Ok(ParsedPage {
            records,
            next,
            dropped,
        })
    }
}

impl SourceAdapter for PubMedAdapter {
    fn source(&self) -> SourceType {
        SourceType::Pubmed
    }

    fn page_size(&self) -> usize {
        self.page_size
    }

    fn server_filters(&self) -> ServerFilters {
        ServerFilters::YEAR_RANGE | ServerFilters::LANGUAGE | ServerFilters::PAPER_TYPE
    }

    fn initial_cursor(&self, _request: &CrawlRequest) -> PageCursor {
        PageCursor::Start
    }

    fn build_request(
        &self,
        client: &HttpClient,
        request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<reqwest::RequestBuilder, CrawlError> {
        let url = match cursor {
            PageCursor::Start => {
                let mut params = self.base_params();
                params.push(("term", Self::build_term(&request.query, &request.filters)));
                params.push(("retmax", "0".to_string()));
                params.push(("usehistory", "y".to_string()));
                params.push(("retmode", "json".to_string()));
                build_url(&format!("{}/esearch.fcgi", self.base_url), &params)?
            }
            PageCursor::Token {
                web_env,
                query_key,
                retstart,
                ..
            } => {
                let mut params = self.base_params();
                params.push(("query_key", query_key.clone()));
                params.push(("WebEnv", web_env.clone()));
                params.push(("retstart", retstart.to_string()));
                params.push(("retmax", self.page_size.to_string()));
                params.push(("retmode", "xml".to_string()));
                build_url(&format!("{}/efetch.fcgi", self.base_url), &params)?
            }
            other => return Err(foreign_cursor(SourceType::Pubmed, other)),
        };

        Ok(client.get(url.as_str()))
    }

    fn parse_page(
        &self,
        body: &str,
        _request: &CrawlRequest,
        cursor: &PageCursor,
    ) -> Result<ParsedPage, CrawlError> {
        match cursor {
            PageCursor::Start => self.parse_search(body),
            PageCursor::Token {
                retstart, total, ..
            } => self.parse_fetch(body, *retstart, *total, cursor),
            other => Err(foreign_cursor(SourceType::Pubmed, other)),
        }
    }

    fn advance_past(&self, cursor: &PageCursor) -> Option<PageCursor> {
        match cursor {
            PageCursor::Token {
                web_env,
                query_key,
                retstart,
                total,
            } => Some(PageCursor::Token {
                web_env: web_env.clone(),
                query_key: query_key.clone(),
                retstart: retstart + self.page_size,
                total: *total,
            }),
            // The search step has no position to skip past.
            _ => None,
        }
    }

    fn classify_hint(&self, _record: &RawRecord) -> Option<PaperType> {
        None
    }
}

fn build_url(endpoint: &str, params: &[(&'static str, String)]) -> Result<Url, CrawlError> {
    Url::parse_with_params(endpoint, params.iter().map(|(k, v)| (*k, v.as_str()))).map_err(|e| {
        CrawlError::Api {
            source: SourceType::Pubmed,
            message: format!("invalid request URL: {e}"),
        }
    })
}

/// PubMed spells languages out in `[la]` qualifiers.
fn pubmed_language(code: &str) -> &str {
    match code {
        "en" => "english",
        "fr" => "french",
        "de" => "german",
        "es" => "spanish",
        "it" => "italian",
        "pt" => "portuguese",
        "zh" => "chinese",
        "ja" => "japanese",
        "ru" => "russian",
        other => other,
    }
}

fn pubmed_publication_type(paper_type: PaperType) -> Option<&'static str> {
    match paper_type {
        PaperType::Review => Some("review"),
        PaperType::SystematicReview => Some("systematic review"),
        PaperType::MetaAnalysis => Some("meta-analysis"),
        PaperType::ClinicalTrial => Some("clinical trial"),
        PaperType::RandomizedControlledTrial => Some("randomized controlled trial"),
        PaperType::CaseReport => Some("case reports"),
        _ => None,
    }
}

fn explicit_type(values: &[String]) -> Option<PaperType> {
    for value in values {
        let mapped = match value.as_str() {
            "Review" => Some(PaperType::Review),
            "Systematic Review" => Some(PaperType::SystematicReview),
            "Meta-Analysis" => Some(PaperType::MetaAnalysis),
            "Clinical Trial" => Some(PaperType::ClinicalTrial),
            "Randomized Controlled Trial" => Some(PaperType::RandomizedControlledTrial),
            "Observational Study" => Some(PaperType::ObservationalStudy),
            "Case Reports" => Some(PaperType::CaseReport),
            "Editorial" => Some(PaperType::Editorial),
            "Letter" => Some(PaperType::Letter),
            "Comment" => Some(PaperType::Commentary),
            _ => None,
        };
        if mapped.is_some() {
            return mapped;
        }
    }
    // "Journal Article" only decides when nothing more specific matched.
    values
        .iter()
        .any(|v| v == "Journal Article")
        .then_some(PaperType::ResearchArticle)
}

fn article_to_record(article: PubmedArticle) -> Option<RawRecord> {
    let citation = article.citation?;
    let pmid = citation.pmid?.value?;
    let detail = citation.article?;

    let title = detail
        .title
        .as_ref()
        .and_then(|t| t.value.as_deref())
        .map(str::trim)
        .filter(|t| !t.is_empty())?
        .to_string();

    let mut record = RawRecord::new(SourceType::Pubmed, pmid.clone(), title);
    record.url = Some(format!("https://pubmed.ncbi.nlm.nih.gov/{pmid}/"));

    record.abstract_text = detail.abstract_section.as_ref().map(|section| {
        section
            .texts
            .iter()
            .filter_map(|t| {
                let content = t.value.as_deref()?.trim();
                if content.is_empty() {
                    return None;
                }
                Some(match t.label.as_deref() {
                    Some(label) => format!("{label}: {content}"),
                    None => content.to_string(),
                })
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    });
    if record.abstract_text.as_deref() == Some("") {
        record.abstract_text = None;
    }

    if let Some(list) = &detail.authors {
        for author in &list.authors {
            let name = match (&author.collective_name, &author.last_name) {
                (Some(collective), _) => collective.trim().to_string(),
                (None, Some(last)) => match &author.fore_name {
                    Some(fore) => format!("{} {}", fore.trim(), last.trim()),
                    None => last.trim().to_string(),
                },
                (None, None) => continue,
            };
            let affiliation = author
                .affiliations
                .iter()
                .find_map(|info| info.affiliation.clone());
            record.authors.push(RawAuthor { name, affiliation });
        }
    }

    record.journal = detail
        .journal
        .as_ref()
        .and_then(|j| j.title.clone())
        .filter(|t| !t.is_empty());

    record.year = detail
        .article_date
        .as_ref()
        .and_then(|d| d.year.as_deref())
        .or_else(|| {
            detail
                .journal
                .as_ref()
                .and_then(|j| j.issue.as_ref())
                .and_then(|i| i.pub_date.as_ref())
                .and_then(|d| d.year.as_deref().or(d.medline_date.as_deref()))
        })
        .and_then(|y| y.get(..4))
        .and_then(|y| y.parse().ok());

    record.language = detail.languages.first().cloned();

    record.explicit_type = detail
        .publication_types
        .as_ref()
        .map(|list| {
            list.types
                .iter()
                .filter_map(|t| t.value.clone())
                .collect::<Vec<_>>()
        })
        .and_then(|values| explicit_type(&values));

    record.doi = article
        .pubmed_data
        .as_ref()
        .and_then(|d| d.article_ids.as_ref())
        .and_then(|list| {
            list.ids
                .iter()
                .find(|id| id.id_type.as_deref() == Some("doi"))
        })
        .and_then(|id| id.value.clone());

    Some(record)
}

// Serde mirror of the EFetch XML, kept to the fields the normalizer needs.

#[derive(Debug, Deserialize)]
struct ESearchEnvelope {
    esearchresult: Option<ESearchResult>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    count: Option<String>,
    webenv: Option<String>,
    querykey: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticle {
    #[serde(rename = "MedlineCitation")]
    citation: Option<MedlineCitation>,
    #[serde(rename = "PubmedData")]
    pubmed_data: Option<PubmedData>,
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Option<TextValue>,
    #[serde(rename = "Article")]
    article: Option<ArticleDetail>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleDetail {
    #[serde(rename = "Journal")]
    journal: Option<Journal>,
    #[serde(rename = "ArticleTitle")]
    title: Option<TextValue>,
    #[serde(rename = "Abstract")]
    abstract_section: Option<AbstractSection>,
    #[serde(rename = "AuthorList")]
    authors: Option<AuthorList>,
    #[serde(rename = "Language", default)]
    languages: Vec<String>,
    #[serde(rename = "PublicationTypeList")]
    publication_types: Option<PublicationTypeList>,
    #[serde(rename = "ArticleDate")]
    article_date: Option<ArticleDate>,
}

#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "JournalIssue")]
    issue: Option<JournalIssue>,
}

#[derive(Debug, Deserialize)]
struct JournalIssue {
    #[serde(rename = "PubDate")]
    pub_date: Option<PubDate>,
}

#[derive(Debug, Deserialize)]
struct PubDate {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "MedlineDate")]
    medline_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArticleDate {
    #[serde(rename = "Year")]
    year: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AbstractSection {
    #[serde(rename = "AbstractText", default)]
    texts: Vec<AbstractText>,
}

#[derive(Debug, Deserialize)]
struct AbstractText {
    #[serde(rename = "@Label")]
    label: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(rename = "LastName")]
    last_name: Option<String>,
    #[serde(rename = "ForeName")]
    fore_name: Option<String>,
    #[serde(rename = "CollectiveName")]
    collective_name: Option<String>,
    #[serde(rename = "AffiliationInfo", default)]
    affiliations: Vec<AffiliationInfo>,
}

#[derive(Debug, Deserialize)]
struct AffiliationInfo {
    #[serde(rename = "Affiliation")]
    affiliation: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PublicationTypeList {
    #[serde(rename = "PublicationType", default)]
    types: Vec<TextValue>,
}

#[derive(Debug, Deserialize)]
struct PubmedData {
    #[serde(rename = "ArticleIdList")]
    article_ids: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    #[serde(rename = "@IdType")]
    id_type: Option<String>,
    #[serde(rename = "$text")]
    value: Option<String>,
}
