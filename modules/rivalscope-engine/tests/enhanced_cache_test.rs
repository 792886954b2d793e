//! Stale-while-revalidate behavior of the per-report enhanced cache:
//! cold-start seeding, single deduplicated background refresh, and
//! subscriber pushes.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use rivalscope_common::{
    canonicalize, CompetitorIdentity, ReportRecord, RivalScopeError, Summary,
};
use rivalscope_engine::fixtures::{
    sample_forum_data, sample_review_data, MockForumSearcher, MockNewsSearcher, MockReviewFetcher,
};
use rivalscope_engine::{EnhancedCacheService, EnhancedSignalAggregator, InMemoryReportStore};

struct Harness {
    cache: Arc<EnhancedCacheService>,
    store: Arc<InMemoryReportStore>,
    reviews: Arc<MockReviewFetcher>,
    forums: Arc<MockForumSearcher>,
}

fn harness(review_delay: Option<Duration>) -> Harness {
    let news = Arc::new(MockNewsSearcher::returning(0));
    let reviews = Arc::new(match review_delay {
        Some(delay) => MockReviewFetcher::slow(sample_review_data("trustpilot"), delay),
        None => MockReviewFetcher::returning(sample_review_data("trustpilot")),
    });
    let forums = Arc::new(MockForumSearcher::returning(sample_forum_data()));
    let store = Arc::new(InMemoryReportStore::new());

    let aggregator = Arc::new(EnhancedSignalAggregator::new(
        news,
        Arc::clone(&reviews) as _,
        Arc::clone(&forums) as _,
    ));
    let cache = Arc::new(EnhancedCacheService::new(
        aggregator,
        Arc::clone(&store) as _,
    ));

    Harness {
        cache,
        store,
        reviews,
        forums,
    }
}

fn report_aged(minutes_old: i64) -> ReportRecord {
    let created_at = Utc::now() - chrono::Duration::minutes(minutes_old);
    ReportRecord {
        id: Uuid::new_v4(),
        user_id: "u1".to_string(),
        competitors: vec![CompetitorIdentity {
            display_name: "Acme".to_string(),
            domain: Some("acme.com".to_string()),
            canonical_key: canonicalize("Acme"),
        }],
        summary: Summary::Newsletter("seed".to_string()),
        signals: vec![],
        enhanced: vec![rivalscope_common::EnhancedCompetitorData {
            competitor: "Acme".to_string(),
            domain: Some("acme.com".to_string()),
            reviews: None,
            forum: Some(sample_forum_data()),
        }],
        created_at,
    }
}

#[tokio::test]
async fn cold_start_within_ttl_serves_seed_without_refresh() {
    let h = harness(None);
    let report = report_aged(1);
    h.store.insert(report.clone()).await;

    let read = h.cache.get_enhanced(report.id).await.unwrap();

    assert!(!read.stale);
    assert_eq!(read.payload.len(), 1);
    assert!(read.payload[0].forum.is_some());
    assert_eq!(read.last_updated, report.created_at);

    // No background refresh for a fresh seed
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.forums.call_count(), 0);
    assert_eq!(h.reviews.call_count(), 0);
}

#[tokio::test]
async fn stale_seed_returns_immediately_and_refreshes_once() {
    let h = harness(Some(Duration::from_millis(100)));
    let report = report_aged(60);
    h.store.insert(report.clone()).await;

    let read = h.cache.get_enhanced(report.id).await.unwrap();
    assert!(read.stale);
    // Served the stale seed, not a fresh fetch
    assert_eq!(read.last_updated, report.created_at);

    // A racing second stale read must not start a second refresh
    let second = h.cache.get_enhanced(report.id).await.unwrap();
    assert!(second.stale);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(h.reviews.call_count(), 1);
    assert_eq!(h.forums.call_count(), 1);

    // The refresh overwrote the entry in place
    let third = h.cache.get_enhanced(report.id).await.unwrap();
    assert!(!third.stale);
    assert!(third.last_updated > report.created_at);
    assert!(third.payload[0].reviews.is_some());
}

#[tokio::test]
async fn refresh_pushes_to_subscribers() {
    let h = harness(None);
    let report = report_aged(60);
    h.store.insert(report.clone()).await;

    let mut rx = h.cache.subscribe(report.id).await;
    h.cache.get_enhanced(report.id).await.unwrap();

    let update = tokio::time::timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("refresh should push within the timeout")
        .expect("subscriber channel closed unexpectedly");

    assert_eq!(update.report_id, report.id);
    assert!(update.payload[0].reviews.is_some());
}

#[tokio::test]
async fn dropped_subscribers_are_pruned_on_push() {
    let h = harness(None);
    let report = report_aged(60);
    h.store.insert(report.clone()).await;

    let rx = h.cache.subscribe(report.id).await;
    drop(rx);
    assert_eq!(h.cache.subscriber_count(report.id).await, 1);

    h.cache.get_enhanced(report.id).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(h.cache.subscriber_count(report.id).await, 0);
}

#[tokio::test]
async fn unknown_report_is_an_error() {
    let h = harness(None);
    let err = h.cache.get_enhanced(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, RivalScopeError::ReportNotFound(_)));
}
