//! Enhanced signal aggregator.
//!
//! Fans out provider calls per competitor with per-call deadlines and
//! partial-failure tolerance. The "traditional" track (news/funding/social/
//! product heuristics) and the "enhanced" track (review + forum sentiment)
//! run concurrently and never block each other. Partial results are emitted
//! through a ProgressSink as each competitor settles, before the overall
//! call resolves.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::info;

use rivalscope_common::{
    CompetitorIdentity, CompetitorSignalBundle, EnhancedCompetitorData, PlanMode, SignalKind,
    SourceToggles, StreamEvent,
};

use crate::providers::{serper, ForumSearcher, NewsSearcher, ReviewFetcher};
use crate::settle::{guard, DEFAULT_PROVIDER_TIMEOUT};

/// Max in-flight news-search calls across the traditional track.
const TRADITIONAL_CONCURRENCY: usize = 8;

/// Max competitors with enhanced lookups in flight at once.
const ENHANCED_CONCURRENCY: usize = 4;

const NEWS_RESULTS: usize = 8;
const HEURISTIC_RESULTS: usize = 5;

/// Sink for partial-result events emitted while an aggregation runs.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: StreamEvent);
}

/// Sink for runs nobody is watching.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: StreamEvent) {}
}

#[derive(Debug, Clone)]
pub struct AggregateRequest {
    /// Already canonicalized and deduplicated.
    pub competitors: Vec<CompetitorIdentity>,
    pub toggles: SourceToggles,
    pub mode: PlanMode,
    pub compute_sentiment: bool,
}

#[derive(Debug)]
pub struct AggregateOutcome {
    pub traditional: Vec<CompetitorSignalBundle>,
    pub enhanced: Vec<EnhancedCompetitorData>,
}

/// Counters for one aggregation run.
#[derive(Debug, Default)]
pub struct AggregateStats {
    pub bundles: u32,
    pub items: u32,
    pub competitors_with_reviews: u32,
    pub competitors_with_forum: u32,
}

impl AggregateStats {
    fn from_outcome(outcome: &AggregateOutcome) -> Self {
        Self {
            bundles: outcome.traditional.len() as u32,
            items: outcome
                .traditional
                .iter()
                .map(|b| b.items.len() as u32)
                .sum(),
            competitors_with_reviews: outcome
                .enhanced
                .iter()
                .filter(|e| e.reviews.is_some())
                .count() as u32,
            competitors_with_forum: outcome
                .enhanced
                .iter()
                .filter(|e| e.forum.is_some())
                .count() as u32,
        }
    }
}

impl std::fmt::Display for AggregateStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "bundles={} items={} reviews={} forum={}",
            self.bundles, self.items, self.competitors_with_reviews, self.competitors_with_forum
        )
    }
}

pub struct EnhancedSignalAggregator {
    news: Arc<dyn NewsSearcher>,
    reviews: Arc<dyn ReviewFetcher>,
    forums: Arc<dyn ForumSearcher>,
    provider_timeout: Duration,
}

impl EnhancedSignalAggregator {
    pub fn new(
        news: Arc<dyn NewsSearcher>,
        reviews: Arc<dyn ReviewFetcher>,
        forums: Arc<dyn ForumSearcher>,
    ) -> Self {
        Self {
            news,
            reviews,
            forums,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    /// Run both tracks for the request. Provider failures degrade their one
    /// field and are logged; the call itself only fails on a programming
    /// error, never on provider trouble.
    pub async fn aggregate(
        &self,
        request: &AggregateRequest,
        progress: &dyn ProgressSink,
    ) -> Result<AggregateOutcome> {
        info!(
            competitors = request.competitors.len(),
            mode = %request.mode,
            "Starting signal aggregation"
        );

        let enhanced_set: Vec<CompetitorIdentity> = if request.compute_sentiment {
            request.competitors.clone()
        } else {
            Vec::new()
        };

        let (traditional, enhanced) = tokio::join!(
            self.collect_traditional(request),
            self.collect_enhanced(&enhanced_set, request.mode, progress),
        );

        let outcome = AggregateOutcome {
            traditional,
            enhanced,
        };
        let stats = AggregateStats::from_outcome(&outcome);
        info!(%stats, "Signal aggregation complete");
        Ok(outcome)
    }

    /// News/funding/social/product heuristics, one bundle per enabled
    /// (source, competitor) pair. A failed search yields a clearly-empty
    /// bundle rather than dropping the pair.
    async fn collect_traditional(
        &self,
        request: &AggregateRequest,
    ) -> Vec<CompetitorSignalBundle> {
        let mut searches: Vec<(String, String, String, SignalKind, usize)> = Vec::new();
        for identity in &request.competitors {
            let name = identity.display_name.clone();
            if request.toggles.news {
                searches.push((
                    "news".to_string(),
                    name.clone(),
                    serper::news_query(&name),
                    SignalKind::News,
                    NEWS_RESULTS,
                ));
            }
            if request.toggles.funding {
                searches.push((
                    "funding".to_string(),
                    name.clone(),
                    serper::funding_query(&name),
                    SignalKind::Funding,
                    HEURISTIC_RESULTS,
                ));
            }
            if request.toggles.social {
                searches.push((
                    "social".to_string(),
                    name.clone(),
                    serper::social_query(&name),
                    SignalKind::Social,
                    HEURISTIC_RESULTS,
                ));
            }
            if request.toggles.products {
                searches.push((
                    "products".to_string(),
                    name.clone(),
                    serper::product_query(&name),
                    SignalKind::Product,
                    HEURISTIC_RESULTS,
                ));
            }
        }

        let mut settled: Vec<(usize, CompetitorSignalBundle)> =
            stream::iter(searches.into_iter().enumerate().map(
                |(index, search)| {
                    let (source, competitor, query, kind, max_results) = search;
                    let news = Arc::clone(&self.news);
                    let timeout = self.provider_timeout;
                    async move {
                        let label = format!("{source}:{competitor}");
                        let items = guard(&label, timeout, news.search(&query, max_results))
                            .await
                            .unwrap_or_default();
                        let items: Vec<_> = items
                            .into_iter()
                            .filter(|item| source != "funding" || serper::is_funding_signal(item))
                            .map(|mut item| {
                                item.kind = kind;
                                item
                            })
                            .collect();
                        (
                            index,
                            CompetitorSignalBundle {
                                source: source.to_string(),
                                competitor,
                                items,
                            },
                        )
                    }
                },
            ))
            .buffer_unordered(TRADITIONAL_CONCURRENCY)
            .collect()
            .await;

        // Completion order is arbitrary; restore input order for determinism
        settled.sort_by_key(|(index, _)| *index);
        settled.into_iter().map(|(_, bundle)| bundle).collect()
    }

    /// Review + forum sentiment per competitor. Within one competitor both
    /// provider calls settle before its partial event fires; across
    /// competitors events fire first-finished-first.
    pub(crate) async fn collect_enhanced(
        &self,
        competitors: &[CompetitorIdentity],
        mode: PlanMode,
        progress: &dyn ProgressSink,
    ) -> Vec<EnhancedCompetitorData> {
        let mut settled: Vec<(usize, EnhancedCompetitorData)> =
            stream::iter(competitors.iter().cloned().enumerate().map(|(index, identity)| {
                let review_fetcher = Arc::clone(&self.reviews);
                let forum_searcher = Arc::clone(&self.forums);
                let timeout = self.provider_timeout;
                async move {
                    let review_fut = async {
                        // Review platforms key on domain; premium-only
                        if mode == PlanMode::Premium {
                            if let Some(domain) = identity.domain.as_deref() {
                                let label = format!("reviews:{}", identity.canonical_key);
                                return guard(&label, timeout, review_fetcher.fetch(domain))
                                    .await
                                    .flatten();
                            }
                        }
                        None
                    };
                    let forum_fut = async {
                        let label = format!("forum:{}", identity.canonical_key);
                        guard(&label, timeout, forum_searcher.search(&identity.display_name))
                            .await
                            .flatten()
                    };

                    let (reviews, forum) = tokio::join!(review_fut, forum_fut);

                    let data = EnhancedCompetitorData {
                        competitor: identity.display_name.clone(),
                        domain: identity.domain.clone(),
                        reviews,
                        forum,
                    };
                    progress.emit(StreamEvent::CompetitorCompleted {
                        competitor: data.competitor.clone(),
                        has_reviews: data.reviews.is_some(),
                        has_forum: data.forum.is_some(),
                    });
                    (index, data)
                }
            }))
            .buffer_unordered(ENHANCED_CONCURRENCY)
            .collect()
            .await;

        settled.sort_by_key(|(index, _)| *index);
        settled.into_iter().map(|(_, data)| data).collect()
    }
}
