//! Trustpilot review-platform adapter.
//!
//! One call per competitor domain against the business-units API. The wire
//! payload is normalized into `ReviewSentimentData` in exactly one place
//! (`normalize_business_unit`) so field-shape questions are answered once.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::info;

use rivalscope_common::{sentiment_score, Quote, ReviewSentimentData, Sentiment};

use super::ReviewFetcher;

const TRUSTPILOT_API_URL: &str = "https://api.trustpilot.com/v1";

pub struct TrustpilotReviewFetcher {
    api_key: String,
    client: reqwest::Client,
    base_url: String,
}

// --- Wire types ---
//
// Input contract: `score.stars` is a 0-5 star average, `numberOfReviews.total`
// is the lifetime review count, `reviews` (optional) carries recent review
// excerpts. Everything else in the payload is ignored.

#[derive(Debug, serde::Deserialize)]
struct BusinessUnitWire {
    #[serde(default)]
    score: Option<ScoreWire>,
    #[serde(rename = "numberOfReviews", default)]
    number_of_reviews: Option<ReviewCountWire>,
    #[serde(default)]
    reviews: Vec<ReviewWire>,
}

#[derive(Debug, serde::Deserialize)]
struct ScoreWire {
    #[serde(default)]
    stars: Option<f64>,
}

#[derive(Debug, serde::Deserialize)]
struct ReviewCountWire {
    #[serde(default)]
    total: Option<u32>,
}

#[derive(Debug, serde::Deserialize)]
struct ReviewWire {
    #[serde(default)]
    text: String,
    #[serde(rename = "consumerName", default)]
    consumer_name: Option<String>,
}

impl TrustpilotReviewFetcher {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            base_url: TRUSTPILOT_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.to_string();
        self
    }
}

#[async_trait]
impl ReviewFetcher for TrustpilotReviewFetcher {
    async fn fetch(&self, domain: &str) -> Result<Option<ReviewSentimentData>> {
        info!(domain, "Trustpilot business unit lookup");

        let url = format!("{}/business-units/find", self.base_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("name", domain)])
            .header("apikey", &self.api_key)
            .send()
            .await
            .context("Trustpilot API request failed")?;

        if resp.status() == StatusCode::NOT_FOUND {
            info!(domain, "No Trustpilot listing for domain");
            return Ok(None);
        }
        if !resp.status().is_success() {
            anyhow::bail!("Trustpilot API error: {}", resp.status());
        }

        let wire: BusinessUnitWire = resp
            .json()
            .await
            .context("Failed to parse Trustpilot response")?;

        Ok(Some(normalize_business_unit(domain, wire)))
    }
}

/// Normalize the business-unit payload. Sentiment tiers from the star
/// average: >= 4.0 positive, >= 3.0 neutral, below negative; missing score
/// is neutral.
fn normalize_business_unit(domain: &str, wire: BusinessUnitWire) -> ReviewSentimentData {
    let average_rating = wire.score.and_then(|s| s.stars);
    let total_reviews = wire.number_of_reviews.and_then(|n| n.total);

    let sentiment = match average_rating {
        Some(stars) if stars >= 4.0 => Sentiment::Positive,
        Some(stars) if stars >= 3.0 => Sentiment::Neutral,
        Some(_) => Sentiment::Negative,
        None => Sentiment::Neutral,
    };

    let top_quotes: Vec<Quote> = wire
        .reviews
        .into_iter()
        .filter(|r| !r.text.trim().is_empty())
        .take(3)
        .map(|r| Quote {
            text: r.text,
            source: r.consumer_name,
        })
        .collect();

    let summary = match (average_rating, total_reviews) {
        (Some(stars), Some(total)) => {
            format!("{stars:.1} stars across {total} Trustpilot reviews")
        }
        (Some(stars), None) => format!("{stars:.1} stars on Trustpilot"),
        _ => format!("Trustpilot listing for {domain} with no score yet"),
    };

    ReviewSentimentData {
        platform: "trustpilot".to_string(),
        average_rating,
        total_reviews,
        total_mentions: None,
        sentiment,
        sentiment_score: sentiment_score(average_rating, sentiment),
        top_quotes,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_high_rating_is_positive() {
        let wire = BusinessUnitWire {
            score: Some(ScoreWire { stars: Some(4.6) }),
            number_of_reviews: Some(ReviewCountWire { total: Some(1280) }),
            reviews: vec![],
        };
        let data = normalize_business_unit("acme.com", wire);
        assert_eq!(data.sentiment, Sentiment::Positive);
        assert_eq!(data.sentiment_score, 92);
        assert_eq!(data.total_reviews, Some(1280));
    }

    #[test]
    fn normalize_low_rating_is_negative() {
        let wire = BusinessUnitWire {
            score: Some(ScoreWire { stars: Some(1.5) }),
            number_of_reviews: None,
            reviews: vec![],
        };
        let data = normalize_business_unit("acme.com", wire);
        assert_eq!(data.sentiment, Sentiment::Negative);
        assert_eq!(data.sentiment_score, 30);
    }

    #[test]
    fn normalize_missing_score_uses_neutral_mapping() {
        let wire = BusinessUnitWire {
            score: None,
            number_of_reviews: None,
            reviews: vec![],
        };
        let data = normalize_business_unit("acme.com", wire);
        assert_eq!(data.sentiment, Sentiment::Neutral);
        assert_eq!(data.sentiment_score, 50);
    }

    #[test]
    fn normalize_caps_quotes_at_three() {
        let wire = BusinessUnitWire {
            score: Some(ScoreWire { stars: Some(4.0) }),
            number_of_reviews: None,
            reviews: (0..5)
                .map(|i| ReviewWire {
                    text: format!("review {i}"),
                    consumer_name: None,
                })
                .collect(),
        };
        let data = normalize_business_unit("acme.com", wire);
        assert_eq!(data.top_quotes.len(), 3);
    }
}
