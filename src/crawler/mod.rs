//! Crawl orchestration.
//!
//! A [`Crawler`] wires one source adapter to the HTTP session, rate
//! limiter, retry policy, and normalizer, and exposes the result as a
//! lazy, pull-driven stream of canonical papers. One crawler serves one
//! crawl: `crawl` consumes it, so re-running a query means building a
//! fresh crawler from the factory.

pub mod factory;
mod paginator;
mod progress;

pub use factory::CrawlerFactory;
pub use progress::CrawlProgress;

use std::pin::Pin;

use async_stream::stream;
use futures_util::Stream;

use crate::config::CrawlerConfig;
use crate::error::CrawlError;
use crate::models::{FilterParams, Paper, SourceType};
use crate::normalize::Normalizer;
use crate::sources::{CrawlRequest, PageCursor, ServerFilters, SourceAdapter};
use crate::utils::{HttpClient, RateLimiter, RetryConfig};

use paginator::{Paginator, MAX_CONSECUTIVE_MALFORMED_PAGES};

/// Lazy, finite sequence of crawled papers.
///
/// Items are yielded in source page order. The stream ends after the
/// result cap, on source exhaustion, or with one final `Err` when the
/// source had to be given up on; records yielded before that error are
/// valid partial results. Dropping the stream cancels the crawl and
/// releases the HTTP session.
pub type PaperStream = Pin<Box<dyn Stream<Item = Result<Paper, CrawlError>> + Send>>;

/// One crawl's engine: adapter + session + pacing + normalization.
#[derive(Debug)]
pub struct Crawler {
    adapter: Box<dyn SourceAdapter>,
    client: HttpClient,
    limiter: RateLimiter,
    retry: RetryConfig,
    normalizer: Normalizer,
    progress: CrawlProgress,
    max_results_ceiling: usize,
}

impl Crawler {
    /// Build a crawler around an adapter. Used by the factory and by
    /// tests supplying scripted adapters.
    pub fn with_adapter(adapter: Box<dyn SourceAdapter>, config: &CrawlerConfig) -> Self {
        let limiter = RateLimiter::for_source(adapter.source(), config.pubmed_api_key.is_some());
        Self {
            client: HttpClient::new(config),
            limiter,
            retry: config.retry,
            normalizer: Normalizer::default(),
            progress: CrawlProgress::default(),
            max_results_ceiling: config.max_results_ceiling,
            adapter,
        }
    }

    /// Replace the rate limiter (tests use a fast one).
    pub fn with_rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replace the normalizer, e.g. to plug in a custom country resolver.
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// The source this crawler speaks to.
    pub fn source(&self) -> SourceType {
        self.adapter.source()
    }

    /// Progress handle; grab it before starting the crawl.
    pub fn progress(&self) -> CrawlProgress {
        self.progress.clone()
    }

    /// Start the crawl.
    ///
    /// Validates filters synchronously, then returns the lazy stream; no
    /// network traffic happens until the first item is pulled. Each pull
    /// drives: rate-limiter wait, page fetch with retry, parse,
    /// normalize, filter, yield; the paginator advances as pages drain,
    /// until the result cap or source exhaustion.
    pub fn crawl(
        self,
        query: impl Into<String>,
        filters: FilterParams,
    ) -> Result<PaperStream, CrawlError> {
        filters.validate()?;

        let mut filters = filters;
        if filters.max_results > self.max_results_ceiling {
            tracing::warn!(
                requested = filters.max_results,
                ceiling = self.max_results_ceiling,
                "capping max_results at the configured ceiling"
            );
            filters.max_results = self.max_results_ceiling;
        }

        let Crawler {
            adapter,
            client,
            mut limiter,
            retry,
            normalizer,
            progress,
            ..
        } = self;

        let request = CrawlRequest {
            query: query.into(),
            filters,
        };
        let source = adapter.source();
        progress.set_max_results(request.filters.max_results);

        let deferred = requested_filters(&request.filters) - adapter.server_filters();
        if !deferred.is_empty() {
            tracing::debug!(source = %source, ?deferred, "filters applied client-side only");
        }

        let stream = stream! {
            tracing::info!(
                source = %source,
                query = %request.query,
                max_results = request.filters.max_results,
                page_size = adapter.page_size(),
                "starting crawl"
            );

            let mut paginator = Paginator::new(adapter.initial_cursor(&request));
            let mut yielded = 0usize;

            'pages: while yielded < request.filters.max_results {
                let Some(cursor) = paginator.begin() else { break };

                let body = match fetch_page(
                    &client,
                    adapter.as_ref(),
                    &request,
                    &cursor,
                    &mut limiter,
                    &retry,
                )
                .await
                {
                    Ok(body) => body,
                    Err(err) => {
                        paginator.fail();
                        tracing::warn!(source = %source, error = %err, "giving up on source");
                        yield Err(CrawlError::SourceFailed {
                            source,
                            yielded,
                            reason: err.to_string(),
                        });
                        return;
                    }
                };
                progress.page_fetched();

                let page = match adapter.parse_page(&body, &request, &cursor) {
                    Ok(page) => page,
                    Err(err) => {
                        tracing::warn!(source = %source, error = %err, "dropping malformed page");
                        progress.malformed_page();
                        let skip = adapter.advance_past(&cursor);
                        let unskippable = skip.is_none();
                        if paginator.record_malformed(skip) {
                            let reason = if unskippable {
                                format!("malformed page with no skippable continuation: {err}")
                            } else {
                                format!(
                                    "{MAX_CONSECUTIVE_MALFORMED_PAGES} consecutive malformed pages: {err}"
                                )
                            };
                            yield Err(CrawlError::SourceFailed { source, yielded, reason });
                            return;
                        }
                        continue 'pages;
                    }
                };
                progress.records_dropped(page.dropped);
                paginator.advance(page.next);

                for raw in page.records {
                    let hint = adapter.classify_hint(&raw);
                    let paper = normalizer.normalize(raw, hint);
                    if !request.filters.matches(&paper) {
                        continue;
                    }
                    yielded += 1;
                    progress.record_yielded();
                    yield Ok(paper);
                    if yielded >= request.filters.max_results {
                        break 'pages;
                    }
                }
            }

            tracing::info!(source = %source, yielded, "crawl finished");
        };

        Ok(Box::pin(stream))
    }
}

/// Filters present in the request, expressed as pushdown capabilities.
fn requested_filters(filters: &FilterParams) -> ServerFilters {
    let mut set = ServerFilters::empty();
    if filters.year_start.is_some() || filters.year_end.is_some() {
        set |= ServerFilters::YEAR_RANGE;
    }
    if !filters.languages.is_empty() {
        set |= ServerFilters::LANGUAGE;
    }
    if !filters.paper_types.is_empty() {
        set |= ServerFilters::PAPER_TYPE;
    }
    set
}

/// Fetch one page, retrying transient failures with exponential backoff.
/// Every attempt is paced by the rate limiter; overload signals widen its
/// interval whether or not the retry eventually succeeds.
async fn fetch_page(
    client: &HttpClient,
    adapter: &dyn SourceAdapter,
    request: &CrawlRequest,
    cursor: &PageCursor,
    limiter: &mut RateLimiter,
    retry: &RetryConfig,
) -> Result<String, CrawlError> {
    let source = adapter.source();
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        limiter.acquire().await;
        match send_once(client, adapter, request, cursor).await {
            Ok(body) => {
                limiter.report_success();
                return Ok(body);
            }
            Err(err) if err.is_transient() && attempt < retry.max_attempts => {
                if err.is_overload() {
                    limiter.report_overload(err.retry_after());
                }
                let delay = retry.delay_for(attempt);
                tracing::debug!(
                    source = %source,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient fetch failure, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                if err.is_overload() {
                    limiter.report_overload(err.retry_after());
                }
                return Err(err);
            }
        }
    }
}

async fn send_once(
    client: &HttpClient,
    adapter: &dyn SourceAdapter,
    request: &CrawlRequest,
    cursor: &PageCursor,
) -> Result<String, CrawlError> {
    let source = adapter.source();
    let response = adapter
        .build_request(client, request, cursor)?
        .send()
        .await
        .map_err(|e| CrawlError::from_reqwest(source, e))?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok());
        return Err(CrawlError::from_status(source, status, retry_after));
    }

    response
        .text()
        .await
        .map_err(|e| CrawlError::from_reqwest(source, e))
}
