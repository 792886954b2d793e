//! Report Store collaborator.
//!
//! Persistence lives outside the engine; this trait is the whole contract.
//! The in-memory implementation backs tests and single-process deployments.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use rivalscope_common::{ReportDraft, ReportRecord};

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn create(&self, draft: ReportDraft) -> Result<ReportRecord>;
    async fn get_by_id(&self, id: Uuid) -> Result<Option<ReportRecord>>;
    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<ReportRecord>>;
}

pub struct InMemoryReportStore {
    reports: RwLock<Vec<ReportRecord>>,
}

impl InMemoryReportStore {
    pub fn new() -> Self {
        Self {
            reports: RwLock::new(Vec::new()),
        }
    }

    /// Insert a pre-built record, keeping its id and timestamps. Used to
    /// seed state that predates this process (and by tests).
    pub async fn insert(&self, record: ReportRecord) {
        self.reports.write().await.push(record);
    }
}

impl Default for InMemoryReportStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportStore for InMemoryReportStore {
    async fn create(&self, draft: ReportDraft) -> Result<ReportRecord> {
        let record = ReportRecord {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            competitors: draft.competitors,
            summary: draft.summary,
            signals: draft.signals,
            enhanced: draft.enhanced,
            created_at: Utc::now(),
        };
        self.reports.write().await.push(record.clone());
        Ok(record)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<ReportRecord>> {
        let reports = self.reports.read().await;
        Ok(reports.iter().find(|r| r.id == id).cloned())
    }

    async fn list_for_user(&self, user_id: &str, limit: usize) -> Result<Vec<ReportRecord>> {
        let reports = self.reports.read().await;
        Ok(reports
            .iter()
            .rev()
            .filter(|r| r.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
