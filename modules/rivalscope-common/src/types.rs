use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    News,
    Funding,
    Social,
    Product,
    Review,
    Sentiment,
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::News => write!(f, "news"),
            SignalKind::Funding => write!(f, "funding"),
            SignalKind::Social => write!(f, "social"),
            SignalKind::Product => write!(f, "product"),
            SignalKind::Review => write!(f, "review"),
            SignalKind::Sentiment => write!(f, "sentiment"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanMode {
    Free,
    Premium,
}

impl std::fmt::Display for PlanMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanMode::Free => write!(f, "free"),
            PlanMode::Premium => write!(f, "premium"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl Sentiment {
    /// Fixed score used when no numeric rating is available.
    pub fn base_score(&self) -> u8 {
        match self {
            Sentiment::Positive => 75,
            Sentiment::Neutral => 50,
            Sentiment::Negative => 25,
        }
    }
}

/// Derive a 0-100 sentiment score. A numeric rating (out of 5) wins;
/// otherwise the fixed per-sentiment mapping applies.
pub fn sentiment_score(average_rating: Option<f64>, sentiment: Sentiment) -> u8 {
    match average_rating {
        Some(rating) => (rating / 5.0 * 100.0).round().clamp(0.0, 100.0) as u8,
        None => sentiment.base_score(),
    }
}

// --- Identity ---

/// A competitor after canonicalization. Two identities with the same
/// `canonical_key` are the same competitor and must be merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetitorIdentity {
    pub display_name: String,
    pub domain: Option<String>,
    pub canonical_key: String,
}

// --- Signals ---

/// A single timestamped item about a competitor. Immutable once produced
/// by a provider adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalItem {
    pub title: String,
    pub content: String,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub kind: SignalKind,
    pub source_kind: Option<String>,
}

/// One bundle per (provider, competitor) pair. The "traditional" aggregate
/// is a list of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompetitorSignalBundle {
    pub source: String,
    pub competitor: String,
    pub items: Vec<SignalItem>,
}

// --- Enhanced (review/sentiment) data ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub text: String,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewSentimentData {
    pub platform: String,
    pub average_rating: Option<f64>,
    pub total_reviews: Option<u32>,
    pub total_mentions: Option<u32>,
    pub sentiment: Sentiment,
    pub sentiment_score: u8,
    pub top_quotes: Vec<Quote>,
    pub summary: String,
}

/// Review/forum sentiment for one competitor from one enhanced run.
/// Either side is None when that provider failed, timed out, or was
/// skipped (reviews require a known domain).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedCompetitorData {
    pub competitor: String,
    pub domain: Option<String>,
    pub reviews: Option<ReviewSentimentData>,
    pub forum: Option<ReviewSentimentData>,
}

// --- Structured summary ---

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CompetitorSection {
    pub competitor: String,
    pub overview: String,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recent_moves: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReportData {
    pub executive_summary: String,
    pub sections: Vec<CompetitorSection>,
}

/// A report summary is either a structured report or newsletter-style
/// markdown. Resolved once where a summarizer response or stored report is
/// read, never re-sniffed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "format", content = "content", rename_all = "snake_case")]
pub enum Summary {
    Structured(ReportData),
    Newsletter(String),
}

impl Summary {
    /// Resolve a serialized summarizer response: valid ReportData JSON is
    /// structured, anything else is treated as markdown.
    pub fn resolve(raw: &str) -> Summary {
        match serde_json::from_str::<ReportData>(raw.trim()) {
            Ok(data) => Summary::Structured(data),
            Err(_) => Summary::Newsletter(raw.to_string()),
        }
    }
}

// --- Analysis cache payload ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub signals: Vec<CompetitorSignalBundle>,
    pub enhanced: Vec<EnhancedCompetitorData>,
    pub summary: Summary,
    pub has_review_data: bool,
    pub has_sentiment_data: bool,
}

// --- Reports ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: Uuid,
    pub user_id: String,
    pub competitors: Vec<CompetitorIdentity>,
    pub summary: Summary,
    pub signals: Vec<CompetitorSignalBundle>,
    pub enhanced: Vec<EnhancedCompetitorData>,
    pub created_at: DateTime<Utc>,
}

/// What the pipeline hands to the Report Store for persistence.
#[derive(Debug, Clone)]
pub struct ReportDraft {
    pub user_id: String,
    pub competitors: Vec<CompetitorIdentity>,
    pub summary: Summary,
    pub signals: Vec<CompetitorSignalBundle>,
    pub enhanced: Vec<EnhancedCompetitorData>,
}

// --- Requests ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceToggles {
    pub news: bool,
    pub funding: bool,
    pub social: bool,
    pub products: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            news: true,
            funding: true,
            social: true,
            products: true,
        }
    }
}

/// Inbound analysis request. `competitors` and `urls` are newline-separated;
/// a competitor line may be a bare name, a bare domain, or "Name, domain".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub competitors: String,
    #[serde(default)]
    pub urls: String,
    #[serde(default)]
    pub sources: SourceToggles,
    pub mode: PlanMode,
    #[serde(default)]
    pub no_cache: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentiment_score_from_rating() {
        assert_eq!(sentiment_score(Some(4.5), Sentiment::Negative), 90);
        assert_eq!(sentiment_score(Some(5.0), Sentiment::Neutral), 100);
        assert_eq!(sentiment_score(Some(0.0), Sentiment::Positive), 0);
    }

    #[test]
    fn sentiment_score_fixed_mapping() {
        assert_eq!(sentiment_score(None, Sentiment::Positive), 75);
        assert_eq!(sentiment_score(None, Sentiment::Neutral), 50);
        assert_eq!(sentiment_score(None, Sentiment::Negative), 25);
    }

    #[test]
    fn summary_resolves_structured_json() {
        let raw = r#"{"executive_summary":"short","sections":[]}"#;
        match Summary::resolve(raw) {
            Summary::Structured(data) => assert_eq!(data.executive_summary, "short"),
            Summary::Newsletter(_) => panic!("expected structured summary"),
        }
    }

    #[test]
    fn summary_falls_back_to_newsletter() {
        let raw = "## Weekly Rundown\n\nAcme shipped a thing.";
        match Summary::resolve(raw) {
            Summary::Newsletter(text) => assert!(text.contains("Weekly Rundown")),
            Summary::Structured(_) => panic!("expected newsletter summary"),
        }
    }
}
