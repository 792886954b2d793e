//! Serper (Google News search) adapter plus the query/filter heuristics
//! for the traditional signal sources that ride on news search.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use rivalscope_common::{SignalItem, SignalKind};

use super::NewsSearcher;

pub struct SerperNewsSearcher {
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, serde::Deserialize)]
struct SerperNewsResponse {
    #[serde(default)]
    news: Vec<SerperNewsResult>,
}

#[derive(Debug, serde::Deserialize)]
struct SerperNewsResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    source: Option<String>,
}

impl SerperNewsSearcher {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
        }
    }
}

#[async_trait]
impl NewsSearcher for SerperNewsSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SignalItem>> {
        info!(query, max_results, "Serper news search");

        let body = serde_json::json!({
            "q": query,
            "num": max_results,
        });

        let resp = self
            .client
            .post("https://google.serper.dev/news")
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?;

        let data: SerperNewsResponse = resp
            .json()
            .await
            .context("Failed to parse Serper response")?;

        let items: Vec<SignalItem> = data
            .news
            .into_iter()
            .map(|r| SignalItem {
                title: r.title,
                content: r.snippet,
                url: if r.link.is_empty() { None } else { Some(r.link) },
                published_at: r.date.as_deref().and_then(parse_published_at),
                kind: SignalKind::News,
                source_kind: r.source,
            })
            .collect();

        info!(query, count = items.len(), "Serper news search complete");
        Ok(items)
    }

    fn name(&self) -> &str {
        "serper"
    }
}

/// Serper dates are usually relative ("2 hours ago"); only absolute
/// RFC 3339 timestamps survive parsing.
fn parse_published_at(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Query builders + heuristic filters for the traditional sources
// ---------------------------------------------------------------------------

const FUNDING_VOCABULARY: &[&str] = &[
    "raised",
    "funding",
    "series a",
    "series b",
    "series c",
    "seed round",
    "valuation",
    "acquisition",
    "acquired",
    "acquires",
    "merger",
    "ipo",
    "investment",
    "investors",
];

pub fn news_query(competitor: &str) -> String {
    format!("\"{competitor}\" news")
}

pub fn funding_query(competitor: &str) -> String {
    format!("\"{competitor}\" funding OR raised OR acquisition")
}

pub fn social_query(competitor: &str) -> String {
    format!("\"{competitor}\" reviews OR reddit OR community")
}

pub fn product_query(competitor: &str) -> String {
    format!("\"{competitor}\" launches OR announces OR release")
}

/// A funding signal is a news item whose title or snippet carries funding
/// vocabulary. The funding query casts a wide net; this filter narrows it.
pub fn is_funding_signal(item: &SignalItem) -> bool {
    let haystack = format!("{} {}", item.title, item.content).to_lowercase();
    FUNDING_VOCABULARY.iter().any(|term| haystack.contains(term))
}
