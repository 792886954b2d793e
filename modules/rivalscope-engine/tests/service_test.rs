//! End-to-end pipeline tests: identity dedup, cache hits and bypasses, TTL
//! expiry, summarizer fallback, and stream event ordering.

use std::sync::Arc;
use std::time::Duration;

use rivalscope_common::{
    AnalyzeRequest, PlanMode, RivalScopeError, SourceToggles, StreamEvent, Summary,
};
use rivalscope_engine::fixtures::{
    sample_forum_data, sample_review_data, MockForumSearcher, MockNewsSearcher, MockReviewFetcher,
    MockSummarizer,
};
use rivalscope_engine::{
    EnhancedSignalAggregator, InMemoryReportStore, ReportService, StreamSessionRegistry,
};

const STRUCTURED_RESPONSE: &str = r#"{"executive_summary":"tight race","sections":[]}"#;

struct Harness {
    service: ReportService,
    news: Arc<MockNewsSearcher>,
    reviews: Arc<MockReviewFetcher>,
    forums: Arc<MockForumSearcher>,
    summarizer: Arc<MockSummarizer>,
    registry: Arc<StreamSessionRegistry>,
}

fn harness_with(summarizer: MockSummarizer) -> Harness {
    let news = Arc::new(MockNewsSearcher::returning(2));
    let reviews = Arc::new(MockReviewFetcher::returning(sample_review_data("trustpilot")));
    let forums = Arc::new(MockForumSearcher::returning(sample_forum_data()));
    let summarizer = Arc::new(summarizer);
    let registry = Arc::new(StreamSessionRegistry::new());

    let aggregator = Arc::new(EnhancedSignalAggregator::new(
        Arc::clone(&news) as _,
        Arc::clone(&reviews) as _,
        Arc::clone(&forums) as _,
    ));
    let service = ReportService::new(
        aggregator,
        Arc::clone(&summarizer) as _,
        Arc::new(InMemoryReportStore::new()),
        Arc::clone(&registry),
    );

    Harness {
        service,
        news,
        reviews,
        forums,
        summarizer,
        registry,
    }
}

fn harness() -> Harness {
    harness_with(MockSummarizer::returning(STRUCTURED_RESPONSE))
}

fn news_only_request(competitors: &str, mode: PlanMode) -> AnalyzeRequest {
    AnalyzeRequest {
        competitors: competitors.to_string(),
        urls: String::new(),
        sources: SourceToggles {
            news: true,
            funding: false,
            social: false,
            products: false,
        },
        mode,
        no_cache: false,
    }
}

#[tokio::test]
async fn duplicate_competitors_collapse_to_one() {
    let h = harness();
    let request = news_only_request("OpenAI\nopenai.com", PlanMode::Free);

    let record = h.service.run_report(&request, "u1", None).await.unwrap();

    assert_eq!(record.competitors.len(), 1);
    assert_eq!(record.competitors[0].display_name, "OpenAI");
    assert_eq!(record.signals.len(), 1);
    assert_eq!(record.signals[0].competitor, "OpenAI");
    // One news search for the one canonical competitor
    assert_eq!(h.news.call_count(), 1);
}

#[tokio::test]
async fn warm_cache_skips_providers_and_summarizer() {
    let h = harness();
    let request = news_only_request("Acme", PlanMode::Free);

    h.service.run_report(&request, "u1", None).await.unwrap();
    let news_calls = h.news.call_count();
    let forum_calls = h.forums.call_count();

    let second = h.service.run_report(&request, "u1", None).await.unwrap();

    assert_eq!(h.news.call_count(), news_calls);
    assert_eq!(h.forums.call_count(), forum_calls);
    assert_eq!(h.reviews.call_count(), 0);
    assert_eq!(h.summarizer.total_calls(), 1);
    assert!(matches!(second.summary, Summary::Structured(_)));
}

#[tokio::test]
async fn no_cache_flag_forces_fresh_run() {
    let h = harness();
    let request = news_only_request("Acme", PlanMode::Free);

    h.service.run_report(&request, "u1", None).await.unwrap();

    let mut fresh = request.clone();
    fresh.no_cache = true;
    h.service.run_report(&fresh, "u1", None).await.unwrap();

    assert_eq!(h.news.call_count(), 2);
    assert_eq!(h.summarizer.total_calls(), 2);
}

#[tokio::test]
async fn premium_with_domain_always_fetches_fresh() {
    let h = harness();
    let request = news_only_request("Acme, acme.com", PlanMode::Premium);

    h.service.run_report(&request, "u1", None).await.unwrap();
    h.service.run_report(&request, "u1", None).await.unwrap();

    // The bypass policy treats both runs as cache misses
    assert_eq!(h.news.call_count(), 2);
    assert_eq!(h.reviews.call_count(), 2);
    assert_eq!(h.summarizer.total_calls(), 2);
}

#[tokio::test]
async fn expired_entry_is_recomputed() {
    let h = harness();
    let service = h.service.with_analysis_ttl(Duration::from_millis(1));
    let request = news_only_request("Acme", PlanMode::Free);

    service.run_report(&request, "u1", None).await.unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    service.run_report(&request, "u1", None).await.unwrap();

    assert_eq!(h.news.call_count(), 2);
    assert_eq!(h.summarizer.total_calls(), 2);
}

#[tokio::test]
async fn summarizer_falls_back_to_low_effort() {
    let h = harness_with(MockSummarizer::failing_high_effort(STRUCTURED_RESPONSE));
    let request = news_only_request("Acme", PlanMode::Free);

    let record = h.service.run_report(&request, "u1", None).await.unwrap();

    assert_eq!(
        h.summarizer
            .high_effort_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert_eq!(
        h.summarizer
            .low_effort_calls
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
    assert!(matches!(record.summary, Summary::Structured(_)));
}

#[tokio::test]
async fn summarizer_total_failure_fails_the_request() {
    let h = harness_with(MockSummarizer::failing_entirely());
    let request = news_only_request("Acme", PlanMode::Free);

    let err = h.service.run_report(&request, "u1", None).await.unwrap_err();
    assert!(matches!(err, RivalScopeError::Summarizer(_)));
}

#[tokio::test]
async fn punctuation_only_competitors_are_a_clear_failure() {
    let h = harness();
    let request = news_only_request("***\n- , -", PlanMode::Free);

    let err = h.service.run_report(&request, "u1", None).await.unwrap_err();
    assert!(matches!(err, RivalScopeError::EmptyCompetitorSet));
    assert_eq!(h.news.call_count(), 0);
}

#[tokio::test]
async fn markdown_summary_resolves_to_newsletter() {
    let h = harness_with(MockSummarizer::returning("## Weekly rundown\n\nAcme won."));
    let request = news_only_request("Acme", PlanMode::Free);

    let record = h.service.run_report(&request, "u1", None).await.unwrap();
    assert!(matches!(record.summary, Summary::Newsletter(_)));
}

#[tokio::test]
async fn stream_events_bracket_the_run() {
    let h = harness();
    let mut rx = h.registry.open("conn_1");
    let request = news_only_request("Acme\nRivalCo", PlanMode::Free);

    let record = h
        .service
        .run_report(&request, "u1", Some("conn_1"))
        .await
        .unwrap();

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(StreamEvent::Started { .. })));
    assert!(matches!(
        events.last(),
        Some(StreamEvent::Completed { report_id }) if *report_id == record.id
    ));
    let competitor_events = events
        .iter()
        .filter(|e| matches!(e, StreamEvent::CompetitorCompleted { .. }))
        .count();
    assert_eq!(competitor_events, 2);
    assert!(events
        .iter()
        .any(|e| matches!(e, StreamEvent::SignalsCollected { bundles: 2, .. })));
}

#[tokio::test]
async fn failed_run_emits_failed_event() {
    let h = harness_with(MockSummarizer::failing_entirely());
    let mut rx = h.registry.open("conn_1");
    let request = news_only_request("Acme", PlanMode::Free);

    let _ = h.service.run_report(&request, "u1", Some("conn_1")).await;

    let mut saw_failed = false;
    while let Ok(event) = rx.try_recv() {
        if matches!(event, StreamEvent::Failed { .. }) {
            saw_failed = true;
        }
    }
    assert!(saw_failed);
}
