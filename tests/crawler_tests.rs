//! End-to-end crawls against mocked source APIs.
//!
//! These tests run the real adapters through the full crawl pipeline
//! (pacing, fetch, retry, parse, normalize, filter) with mockito standing
//! in for the remote services.

use std::time::Duration;

use futures_util::StreamExt;
use mockito::Matcher;

use paperstream::crawler::Crawler;
use paperstream::models::{FilterParams, Paper, PaperType, SourceType};
use paperstream::sources::{ArxivAdapter, BiorxivAdapter, PubMedAdapter, Server};
use paperstream::utils::{RateLimiter, RetryConfig};
use paperstream::{CrawlError, CrawlerConfig, CrawlerFactory, PaperStream};

/// Opt into crawl logs with RUST_LOG=paperstream=debug.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn test_config() -> CrawlerConfig {
    CrawlerConfig {
        pubmed_api_key: None,
        contact_email: Some("tests@example.org".into()),
        retry: RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 2,
            jitter: false,
        },
        ..CrawlerConfig::default()
    }
}

fn fast_limiter() -> RateLimiter {
    RateLimiter::new(Duration::from_millis(1), 2)
}

async fn collect(mut stream: PaperStream) -> (Vec<Paper>, Option<CrawlError>) {
    let mut papers = Vec::new();
    let mut error = None;
    while let Some(item) = stream.next().await {
        match item {
            Ok(paper) => papers.push(paper),
            Err(err) => {
                error = Some(err);
                break;
            }
        }
    }
    (papers, error)
}

/// ESearch body opening a history-server session over `total` hits.
fn esearch_body(total: usize) -> String {
    format!(
        r#"{{"esearchresult": {{"count": "{total}", "retmax": "0", "retstart": "0",
            "querykey": "1", "webenv": "MCID_TEST", "idlist": []}}}}"#
    )
}

/// EFetch body holding one article per PMID.
fn efetch_body(pmids: std::ops::Range<usize>) -> String {
    let articles: String = pmids
        .map(|pmid| {
            format!(
                r#"<PubmedArticle>
  <MedlineCitation>
    <PMID Version="1">{pmid}</PMID>
    <Article>
      <Journal>
        <Title>Journal of Tests</Title>
        <JournalIssue><PubDate><Year>2023</Year></PubDate></JournalIssue>
      </Journal>
      <ArticleTitle>Paper {pmid}</ArticleTitle>
      <Abstract><AbstractText>Abstract {pmid}</AbstractText></Abstract>
      <AuthorList>
        <Author>
          <LastName>Tester</LastName><ForeName>T.</ForeName>
          <AffiliationInfo><Affiliation>Uppsala University, Uppsala, Sweden</Affiliation></AffiliationInfo>
        </Author>
      </AuthorList>
      <Language>eng</Language>
      <PublicationTypeList>
        <PublicationType UI="D016428">Journal Article</PublicationType>
      </PublicationTypeList>
    </Article>
  </MedlineCitation>
</PubmedArticle>"#
            )
        })
        .collect();
    format!("<?xml version=\"1.0\"?><PubmedArticleSet>{articles}</PubmedArticleSet>")
}

#[tokio::test]
async fn pubmed_crawl_survives_one_malformed_page() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;

    let _search = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(esearch_body(20))
        .create_async()
        .await;

    // Ten EFetch batches of two records; the fifth (retstart=8) is garbage.
    let mut fetch_mocks = Vec::new();
    for page in 0..10 {
        let retstart = page * 2;
        let mock = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded(
                "retstart".into(),
                retstart.to_string(),
            ));
        let mock = if retstart == 8 {
            mock.with_body("<<< not xml >>>")
        } else {
            mock.with_body(efetch_body(retstart + 1..retstart + 3))
        };
        fetch_mocks.push(mock.create_async().await);
    }

    let adapter = PubMedAdapter::new(&test_config())
        .with_base_url(server.url())
        .with_page_size(2);
    let crawler =
        Crawler::with_adapter(Box::new(adapter), &test_config()).with_rate_limiter(fast_limiter());
    let progress = crawler.progress();

    let stream = crawler.crawl("cancer", FilterParams::new(100)).unwrap();
    let (papers, error) = collect(stream).await;

    assert!(error.is_none(), "one bad page must not end the stream");
    // Pages 1-4 and 6-10 survive: records 1..=8 and 11..=20, in order.
    let expected: Vec<String> = (1..=8).chain(11..=20).map(|n| n.to_string()).collect();
    let got: Vec<&str> = papers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(got, expected);

    assert_eq!(progress.malformed_pages(), 1);
    // One search step plus ten batches, malformed one included.
    assert_eq!(progress.pages_fetched(), 11);
    assert!(papers.iter().all(|p| p.source == SourceType::Pubmed));
}

#[tokio::test]
async fn pubmed_reaches_natural_exhaustion_below_the_cap() {
    let mut server = mockito::Server::new_async().await;

    let _search = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(esearch_body(12))
        .create_async()
        .await;

    let mut fetch_mocks = Vec::new();
    for (retstart, range) in [(0, 1..6), (5, 6..11), (10, 11..13)] {
        let mock = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::UrlEncoded(
                "retstart".into(),
                retstart.to_string(),
            ))
            .with_body(efetch_body(range))
            .create_async()
            .await;
        fetch_mocks.push(mock);
    }

    let adapter = PubMedAdapter::new(&test_config())
        .with_base_url(server.url())
        .with_page_size(5);
    let crawler =
        Crawler::with_adapter(Box::new(adapter), &test_config()).with_rate_limiter(fast_limiter());

    let filters = FilterParams::new(50).year_range(Some(2023), Some(2023));
    let stream = crawler.crawl("anything", filters).unwrap();
    let (papers, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(papers.len(), 12, "all matching records, no more requests");
    assert!(papers.iter().all(|p| p.year == Some(2023)));
    assert!(papers.iter().all(|p| p.country.as_deref() == Some("SWE")));
}

#[tokio::test]
async fn pubmed_zero_hits_is_a_clean_empty_stream() {
    let mut server = mockito::Server::new_async().await;
    let _search = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(esearch_body(0))
        .create_async()
        .await;

    let adapter = PubMedAdapter::new(&test_config()).with_base_url(server.url());
    let crawler =
        Crawler::with_adapter(Box::new(adapter), &test_config()).with_rate_limiter(fast_limiter());

    let stream = crawler.crawl("zxqv", FilterParams::new(10)).unwrap();
    let (papers, error) = collect(stream).await;
    assert!(papers.is_empty());
    assert!(error.is_none());
}

fn arxiv_feed(count: usize) -> String {
    let entries: String = (0..count)
        .map(|i| {
            format!(
                r#"<entry>
  <id>http://arxiv.org/abs/2402.{i:05}v1</id>
  <title>Biomarker discovery {i}</title>
  <summary>Cancer biomarkers, entry {i}.</summary>
  <published>2024-02-0{day}T09:00:00Z</published>
  <author><name>A. Researcher</name></author>
</entry>"#,
                day = (i % 9) + 1
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query Results</title>
  <id>http://arxiv.org/api/test</id>
  <updated>2024-02-10T00:00:00Z</updated>
  {entries}
</feed>"#
    )
}

#[tokio::test]
async fn arxiv_crawl_honours_the_result_cap() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/api/query")
        .match_query(Matcher::Any)
        .with_body(arxiv_feed(8))
        .create_async()
        .await;

    let adapter = ArxivAdapter::new().with_base_url(format!("{}/api/query", server.url()));
    let crawler =
        Crawler::with_adapter(Box::new(adapter), &test_config()).with_rate_limiter(fast_limiter());

    let stream = crawler
        .crawl("cancer biomarkers", FilterParams::new(5))
        .unwrap();
    let (papers, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(papers.len(), 5, "the cap is hard, not a target");
    assert!(papers.iter().all(|p| p.source == SourceType::Arxiv));
    assert!(papers.iter().all(|p| p.paper_type == PaperType::Preprint));
    // Source page order is preserved.
    let ids: Vec<&str> = papers.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(
        ids,
        ["2402.00000", "2402.00001", "2402.00002", "2402.00003", "2402.00004"]
    );
}

#[tokio::test]
async fn arxiv_offset_pagination_walks_pages_until_short_page() {
    let mut server = mockito::Server::new_async().await;
    let _page0 = server
        .mock("GET", "/api/query")
        .match_query(Matcher::UrlEncoded("start".into(), "0".into()))
        .with_body(arxiv_feed(3))
        .create_async()
        .await;
    let _page1 = server
        .mock("GET", "/api/query")
        .match_query(Matcher::UrlEncoded("start".into(), "3".into()))
        .with_body(arxiv_feed(1))
        .create_async()
        .await;

    let adapter = ArxivAdapter::new()
        .with_base_url(format!("{}/api/query", server.url()))
        .with_page_size(3);
    let crawler =
        Crawler::with_adapter(Box::new(adapter), &test_config()).with_rate_limiter(fast_limiter());

    let stream = crawler.crawl("biomarker", FilterParams::new(50)).unwrap();
    let (papers, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(papers.len(), 4);
}

fn biorxiv_page(total: usize, entries: &[(&str, &str)]) -> String {
    let collection: Vec<String> = entries
        .iter()
        .map(|(doi, title)| {
            format!(
                r#"{{"doi": "{doi}", "title": "{title}",
                    "authors": "Preprint, A.",
                    "author_corresponding_institution": "University of Tokyo, Tokyo, Japan",
                    "date": "2023-05-20", "version": "1",
                    "abstract": "Methods and results are described."}}"#
            )
        })
        .collect();
    format!(
        r#"{{"messages": [{{"status": "ok", "total": {total}}}], "collection": [{}]}}"#,
        collection.join(",")
    )
}

#[tokio::test]
async fn biorxiv_walks_the_date_window_and_filters_client_side() {
    init_tracing();
    let mut server = mockito::Server::new_async().await;

    let _page0 = server
        .mock("GET", "/details/biorxiv/2023-01-01/2023-12-31/0")
        .with_body(biorxiv_page(
            4,
            &[
                ("10.1101/2023.05.0001", "Cancer biomarker panel validation"),
                ("10.1101/2023.05.0002", "Yeast cell cycle notes"),
            ],
        ))
        .create_async()
        .await;
    let _page1 = server
        .mock("GET", "/details/biorxiv/2023-01-01/2023-12-31/2")
        .with_body(biorxiv_page(
            4,
            &[
                ("10.1101/2023.05.0003", "Another cancer biomarker screen"),
                ("10.1101/2023.05.0004", "Plant signalling"),
            ],
        ))
        .create_async()
        .await;

    let adapter = BiorxivAdapter::new(Server::Biorxiv)
        .with_base_url(server.url())
        .with_page_size(2);
    let crawler =
        Crawler::with_adapter(Box::new(adapter), &test_config()).with_rate_limiter(fast_limiter());

    let filters = FilterParams::new(50).year_range(Some(2023), Some(2023));
    let stream = crawler.crawl("cancer biomarker", filters).unwrap();
    let (papers, error) = collect(stream).await;

    assert!(error.is_none());
    assert_eq!(papers.len(), 2, "non-matching preprints are filtered out");
    assert!(papers.iter().all(|p| p.source == SourceType::Biorxiv));
    assert!(papers.iter().all(|p| p.paper_type == PaperType::Preprint));
    assert!(papers.iter().all(|p| p.doi.is_some()));
    assert_eq!(papers[0].country.as_deref(), Some("JPN"));
}

#[tokio::test]
async fn factory_rejects_unknown_sources_before_any_network() {
    let factory = CrawlerFactory::new(test_config());
    assert!(matches!(
        factory.get("semantic-scholar"),
        Err(CrawlError::UnknownSource(_))
    ));
}

#[tokio::test]
async fn country_filter_holds_over_a_mixed_stream() {
    let mut server = mockito::Server::new_async().await;

    let _search = server
        .mock("GET", "/esearch.fcgi")
        .match_query(Matcher::Any)
        .with_body(esearch_body(2))
        .create_async()
        .await;
    // Two records from Sweden (fixture affiliation); filter on Japan.
    let _fetch = server
        .mock("GET", "/efetch.fcgi")
        .match_query(Matcher::Any)
        .with_body(efetch_body(1..3))
        .create_async()
        .await;

    let adapter = PubMedAdapter::new(&test_config())
        .with_base_url(server.url())
        .with_page_size(5);
    let crawler =
        Crawler::with_adapter(Box::new(adapter), &test_config()).with_rate_limiter(fast_limiter());

    let filters = FilterParams::new(10).country("JPN");
    let stream = crawler.crawl("cancer", filters).unwrap();
    let (papers, error) = collect(stream).await;

    assert!(error.is_none());
    assert!(papers.is_empty());
}
