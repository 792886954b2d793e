//! Summarizer collaborator: signal bundles in, string-serialized structured
//! report out. The call is opaque, possibly slow, possibly failing; a
//! high-effort failure falls back to a low-effort call with identical
//! inputs before the request is allowed to fail.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::warn;

use ai_client::Claude;
use rivalscope_common::{CompetitorSignalBundle, ReportData};

/// Characters of signal content forwarded per item.
const ITEM_CONTENT_CHARS: usize = 400;

#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        bundles: &[CompetitorSignalBundle],
        competitor_names: &[String],
        high_effort: bool,
    ) -> Result<String>;
}

/// High-effort first, identical inputs on the low-effort retry. Both
/// failing is a request-level failure for the caller.
pub async fn summarize_with_fallback(
    summarizer: &dyn Summarizer,
    bundles: &[CompetitorSignalBundle],
    competitor_names: &[String],
) -> Result<String> {
    match summarizer.summarize(bundles, competitor_names, true).await {
        Ok(raw) => Ok(raw),
        Err(e) => {
            warn!(error = %e, "High-effort summarization failed, falling back");
            summarizer
                .summarize(bundles, competitor_names, false)
                .await
                .context("Fallback summarization failed")
        }
    }
}

/// Claude-backed summarizer. High effort selects the primary model, low
/// effort the smaller fallback model.
pub struct ClaudeSummarizer {
    primary: Claude,
    fallback: Claude,
}

impl ClaudeSummarizer {
    pub fn new(primary: Claude, fallback: Claude) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl Summarizer for ClaudeSummarizer {
    async fn summarize(
        &self,
        bundles: &[CompetitorSignalBundle],
        competitor_names: &[String],
        high_effort: bool,
    ) -> Result<String> {
        let model = if high_effort {
            &self.primary
        } else {
            &self.fallback
        };

        let system = "You are a competitive-intelligence analyst. Summarize the \
                      collected signals into a structured report with one section \
                      per competitor.";
        let user = format!(
            "Competitors: {}\n\nSignals:\n{}",
            competitor_names.join(", "),
            render_digest(bundles),
        );

        let report: ReportData = model.extract(system, user).await?;
        Ok(serde_json::to_string(&report)?)
    }
}

/// Flatten bundles into the prompt digest. Empty bundles still appear so
/// the model knows a source produced nothing.
fn render_digest(bundles: &[CompetitorSignalBundle]) -> String {
    let mut out = String::new();
    for bundle in bundles {
        out.push_str(&format!(
            "## {} — {} ({} items)\n",
            bundle.competitor,
            bundle.source,
            bundle.items.len()
        ));
        for item in &bundle.items {
            let content: String = item.content.chars().take(ITEM_CONTENT_CHARS).collect();
            out.push_str(&format!("- [{}] {}: {}\n", item.kind, item.title, content));
        }
        out.push('\n');
    }
    out
}
