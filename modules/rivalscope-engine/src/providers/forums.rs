//! Hacker News (Algolia search API) forum-sentiment adapter.
//!
//! Searches recent stories and comments for the competitor name, keeps only
//! opinion-bearing mentions, and scores sentiment from positive/negative
//! keyword hits. No numeric rating exists here, so the score always comes
//! from the fixed per-sentiment mapping.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use rivalscope_common::{sentiment_score, Quote, ReviewSentimentData, Sentiment};

use super::ForumSearcher;

const HN_API_URL: &str = "https://hn.algolia.com/api/v1";

/// How many search hits to pull per competitor.
const HN_HITS: usize = 30;

/// Max length of a quote excerpt.
const QUOTE_CHARS: usize = 200;

const POSITIVE_MARKERS: &[&str] = &[
    "love",
    "great",
    "impressed",
    "recommend",
    "solid",
    "switched to",
    "better than",
    "excellent",
    "fantastic",
];

const NEGATIVE_MARKERS: &[&str] = &[
    "hate",
    "terrible",
    "awful",
    "switched away",
    "worse than",
    "disappointed",
    "buggy",
    "overpriced",
    "avoid",
];

pub struct HnForumSearcher {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, serde::Deserialize)]
struct HnSearchResponse {
    #[serde(default)]
    hits: Vec<HnHit>,
}

#[derive(Debug, serde::Deserialize)]
struct HnHit {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    comment_text: Option<String>,
    #[serde(default)]
    story_text: Option<String>,
    #[serde(rename = "objectID", default)]
    object_id: String,
}

impl HnHit {
    /// The opinion-bearing text of a hit: comment body, story body, or title.
    fn text(&self) -> Option<&str> {
        self.comment_text
            .as_deref()
            .or(self.story_text.as_deref())
            .or(self.title.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

impl HnForumSearcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: HN_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

impl Default for HnForumSearcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ForumSearcher for HnForumSearcher {
    async fn search(&self, competitor: &str) -> Result<Option<ReviewSentimentData>> {
        info!(competitor, "Hacker News sentiment search");

        let url = format!("{}/search_by_date", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[
                ("query", competitor),
                ("tags", "(story,comment)"),
                ("hitsPerPage", &HN_HITS.to_string()),
            ])
            .send()
            .await
            .context("Hacker News API request failed")?;

        if !resp.status().is_success() {
            anyhow::bail!("Hacker News API error: {}", resp.status());
        }

        let data: HnSearchResponse = resp
            .json()
            .await
            .context("Failed to parse Hacker News response")?;

        let result = score_mentions(competitor, &data.hits);
        info!(
            competitor,
            hits = data.hits.len(),
            has_sentiment = result.is_some(),
            "Hacker News sentiment search complete"
        );
        Ok(result)
    }
}

/// Keep hits that mention the competitor and carry an opinion marker, then
/// tally marker polarity into an overall sentiment. Returns None when no
/// opinion-bearing mention exists.
fn score_mentions(competitor: &str, hits: &[HnHit]) -> Option<ReviewSentimentData> {
    let needle = competitor.to_lowercase();

    let mut positive = 0u32;
    let mut negative = 0u32;
    let mut mentions = 0u32;
    let mut quotes: Vec<Quote> = Vec::new();

    for hit in hits {
        let Some(text) = hit.text() else {
            continue;
        };
        let lower = text.to_lowercase();
        if !lower.contains(&needle) {
            continue;
        }
        mentions += 1;

        let pos_hits = POSITIVE_MARKERS.iter().filter(|m| lower.contains(*m)).count() as u32;
        let neg_hits = NEGATIVE_MARKERS.iter().filter(|m| lower.contains(*m)).count() as u32;
        if pos_hits == 0 && neg_hits == 0 {
            continue;
        }
        positive += pos_hits;
        negative += neg_hits;

        if quotes.len() < 3 {
            quotes.push(Quote {
                text: excerpt(text),
                source: Some(format!("https://news.ycombinator.com/item?id={}", hit.object_id)),
            });
        }
    }

    if positive == 0 && negative == 0 {
        return None;
    }

    let sentiment = if positive > negative {
        Sentiment::Positive
    } else if negative > positive {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    };

    Some(ReviewSentimentData {
        platform: "hackernews".to_string(),
        average_rating: None,
        total_reviews: None,
        total_mentions: Some(mentions),
        sentiment,
        sentiment_score: sentiment_score(None, sentiment),
        top_quotes: quotes,
        summary: format!(
            "{mentions} recent mentions, {positive} positive / {negative} negative opinion signals"
        ),
    })
}

fn excerpt(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= QUOTE_CHARS {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(QUOTE_CHARS).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(text: &str) -> HnHit {
        HnHit {
            title: None,
            comment_text: Some(text.to_string()),
            story_text: None,
            object_id: "1".to_string(),
        }
    }

    #[test]
    fn score_mentions_tallies_polarity() {
        let hits = vec![
            comment("I love Acme, switched to it last year"),
            comment("Acme is terrible lately, so buggy"),
            comment("Acme released a new version"),
        ];
        let data = score_mentions("Acme", &hits).unwrap();
        assert_eq!(data.total_mentions, Some(3));
        assert_eq!(data.sentiment, Sentiment::Positive);
        assert_eq!(data.sentiment_score, 75);
    }

    #[test]
    fn score_mentions_negative_majority() {
        let hits = vec![
            comment("Acme is awful and overpriced"),
            comment("I love Acme"),
        ];
        let data = score_mentions("Acme", &hits).unwrap();
        assert_eq!(data.sentiment, Sentiment::Negative);
        assert_eq!(data.sentiment_score, 25);
    }

    #[test]
    fn score_mentions_none_without_opinions() {
        let hits = vec![comment("Acme published their quarterly changelog")];
        assert!(score_mentions("Acme", &hits).is_none());
    }

    #[test]
    fn score_mentions_ignores_other_companies() {
        let hits = vec![comment("I love RivalCo so much")];
        assert!(score_mentions("Acme", &hits).is_none());
    }

    #[test]
    fn excerpt_truncates_long_text() {
        let long = "x".repeat(500);
        assert!(excerpt(&long).chars().count() <= QUOTE_CHARS + 1);
    }
}
