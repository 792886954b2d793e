//! Events pushed to clients over open stream channels.
//!
//! Every variant is a fact about an in-flight or finished aggregation run.
//! The `type` tag is what clients switch on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::EnhancedCompetitorData;

/// Progress facts for a single aggregation run, delivered in-order per
/// session. Cross-competitor ordering follows completion, not input order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Started {
        session_id: String,
        competitors: Vec<String>,
    },

    /// Both enhanced provider calls for this competitor have settled.
    CompetitorCompleted {
        competitor: String,
        has_reviews: bool,
        has_forum: bool,
    },

    SignalsCollected {
        bundles: u32,
        items: u32,
    },

    Summarizing {
        high_effort: bool,
    },

    Completed {
        report_id: Uuid,
    },

    Failed {
        message: String,
    },

    /// Sent on a fixed interval to keep idle transports open.
    Keepalive,
}

/// Pushed to every subscriber of a report when its background enhanced
/// refresh completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedUpdate {
    pub report_id: Uuid,
    pub payload: Vec<EnhancedCompetitorData>,
    pub last_updated: DateTime<Utc>,
}
