//! Signal provider adapters.
//!
//! Each adapter is an independent fetcher behind a trait so the aggregator
//! and tests can swap implementations. Adapters return raw typed payloads
//! and may fail; deadlines and failure isolation belong to the call site,
//! never to the adapter itself.

pub mod forums;
pub mod reviews;
pub mod serper;

use anyhow::Result;
use async_trait::async_trait;

use rivalscope_common::{ReviewSentimentData, SignalItem};

pub use forums::HnForumSearcher;
pub use reviews::TrustpilotReviewFetcher;
pub use serper::SerperNewsSearcher;

/// Recent-news search over a web search API.
#[async_trait]
pub trait NewsSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SignalItem>>;
    fn name(&self) -> &str;
}

/// Review-platform sentiment. Requires a known domain; returns None when
/// the platform has no listing for it.
#[async_trait]
pub trait ReviewFetcher: Send + Sync {
    async fn fetch(&self, domain: &str) -> Result<Option<ReviewSentimentData>>;
}

/// Technical-forum sentiment over recent discussion threads. Returns None
/// when there are no opinion-bearing mentions.
#[async_trait]
pub trait ForumSearcher: Send + Sync {
    async fn search(&self, competitor: &str) -> Result<Option<ReviewSentimentData>>;
}
