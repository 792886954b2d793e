//! Mock providers, summarizer, and progress sink for tests.
//!
//! Every mock counts its calls so tests can assert that cached paths skip
//! provider work entirely.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;

use rivalscope_common::{
    sentiment_score, CompetitorSignalBundle, Quote, ReviewSentimentData, Sentiment, SignalItem,
    SignalKind, StreamEvent,
};

use crate::aggregator::ProgressSink;
use crate::providers::{ForumSearcher, NewsSearcher, ReviewFetcher};
use crate::summarizer::Summarizer;

pub fn sample_signal_item(title: &str) -> SignalItem {
    SignalItem {
        title: title.to_string(),
        content: format!("{title} body"),
        url: Some("https://example.com/article".to_string()),
        published_at: None,
        kind: SignalKind::News,
        source_kind: Some("example-wire".to_string()),
    }
}

pub fn sample_review_data(platform: &str) -> ReviewSentimentData {
    ReviewSentimentData {
        platform: platform.to_string(),
        average_rating: Some(4.2),
        total_reviews: Some(310),
        total_mentions: None,
        sentiment: Sentiment::Positive,
        sentiment_score: sentiment_score(Some(4.2), Sentiment::Positive),
        top_quotes: vec![Quote {
            text: "Does what it says".to_string(),
            source: None,
        }],
        summary: "4.2 stars across 310 reviews".to_string(),
    }
}

pub fn sample_forum_data() -> ReviewSentimentData {
    ReviewSentimentData {
        platform: "hackernews".to_string(),
        average_rating: None,
        total_reviews: None,
        total_mentions: Some(12),
        sentiment: Sentiment::Neutral,
        sentiment_score: sentiment_score(None, Sentiment::Neutral),
        top_quotes: vec![],
        summary: "12 recent mentions, 3 positive / 3 negative opinion signals".to_string(),
    }
}

// --- Mock news searcher ---

#[derive(Default)]
pub struct MockNewsSearcher {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub items_per_query: usize,
}

impl MockNewsSearcher {
    pub fn returning(items_per_query: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: false,
            items_per_query,
        }
    }

    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
            items_per_query: 0,
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NewsSearcher for MockNewsSearcher {
    async fn search(&self, query: &str, _max_results: usize) -> Result<Vec<SignalItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("mock news searcher down");
        }
        Ok((0..self.items_per_query)
            .map(|i| sample_signal_item(&format!("{query} hit {i}")))
            .collect())
    }

    fn name(&self) -> &str {
        "mock-news"
    }
}

// --- Mock review fetcher ---

#[derive(Default)]
pub struct MockReviewFetcher {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub data: Option<ReviewSentimentData>,
}

impl MockReviewFetcher {
    pub fn returning(data: ReviewSentimentData) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn slow(data: ReviewSentimentData, delay: Duration) -> Self {
        Self {
            data: Some(data),
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReviewFetcher for MockReviewFetcher {
    async fn fetch(&self, _domain: &str) -> Result<Option<ReviewSentimentData>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            anyhow::bail!("mock review fetcher down");
        }
        Ok(self.data.clone())
    }
}

// --- Mock forum searcher ---

#[derive(Default)]
pub struct MockForumSearcher {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub data: Option<ReviewSentimentData>,
}

impl MockForumSearcher {
    pub fn returning(data: ReviewSentimentData) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ForumSearcher for MockForumSearcher {
    async fn search(&self, _competitor: &str) -> Result<Option<ReviewSentimentData>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("mock forum searcher down");
        }
        Ok(self.data.clone())
    }
}

// --- Mock summarizer ---

pub struct MockSummarizer {
    pub high_effort_calls: AtomicUsize,
    pub low_effort_calls: AtomicUsize,
    pub fail_high_effort: bool,
    pub fail_low_effort: bool,
    pub response: String,
}

impl MockSummarizer {
    pub fn returning(response: &str) -> Self {
        Self {
            high_effort_calls: AtomicUsize::new(0),
            low_effort_calls: AtomicUsize::new(0),
            fail_high_effort: false,
            fail_low_effort: false,
            response: response.to_string(),
        }
    }

    pub fn failing_high_effort(response: &str) -> Self {
        Self {
            fail_high_effort: true,
            ..Self::returning(response)
        }
    }

    pub fn failing_entirely() -> Self {
        Self {
            fail_high_effort: true,
            fail_low_effort: true,
            ..Self::returning("")
        }
    }

    pub fn total_calls(&self) -> usize {
        self.high_effort_calls.load(Ordering::SeqCst) + self.low_effort_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for MockSummarizer {
    async fn summarize(
        &self,
        _bundles: &[CompetitorSignalBundle],
        _competitor_names: &[String],
        high_effort: bool,
    ) -> Result<String> {
        if high_effort {
            self.high_effort_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_high_effort {
                anyhow::bail!("mock summarizer: high effort failed");
            }
        } else {
            self.low_effort_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_low_effort {
                anyhow::bail!("mock summarizer: low effort failed");
            }
        }
        Ok(self.response.clone())
    }
}

// --- Recording progress sink ---

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<StreamEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StreamEvent> {
        self.events.lock().expect("events lock poisoned").clone()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(&self, event: StreamEvent) {
        self.events
            .lock()
            .expect("events lock poisoned")
            .push(event);
    }
}
