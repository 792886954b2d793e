//! Stale-while-revalidate cache for per-report enhanced data, plus the
//! subscriber registry that pushes refreshed payloads to clients viewing a
//! report.
//!
//! Reads always return the current payload immediately. A stale read
//! triggers one background refresh; the in-flight guard collapses racing
//! stale reads into a single upstream run. A failed refresh keeps the
//! stale data.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, error, info};
use uuid::Uuid;

use rivalscope_common::{EnhancedCompetitorData, EnhancedUpdate, PlanMode, RivalScopeError};

use crate::aggregator::{EnhancedSignalAggregator, NoopProgress};
use crate::report_store::ReportStore;

/// Freshness window for enhanced data.
pub const ENHANCED_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct EnhancedCacheItem {
    payload: Vec<EnhancedCompetitorData>,
    last_updated: DateTime<Utc>,
    expires: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EnhancedRead {
    pub payload: Vec<EnhancedCompetitorData>,
    pub stale: bool,
    pub last_updated: DateTime<Utc>,
}

pub struct EnhancedCacheService {
    aggregator: Arc<EnhancedSignalAggregator>,
    store: Arc<dyn ReportStore>,
    entries: RwLock<HashMap<Uuid, EnhancedCacheItem>>,
    subscribers: RwLock<HashMap<Uuid, Vec<mpsc::UnboundedSender<EnhancedUpdate>>>>,
    refreshing: Mutex<HashSet<Uuid>>,
    ttl: Duration,
}

impl EnhancedCacheService {
    pub fn new(aggregator: Arc<EnhancedSignalAggregator>, store: Arc<dyn ReportStore>) -> Self {
        Self {
            aggregator,
            store,
            entries: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(HashMap::new()),
            refreshing: Mutex::new(HashSet::new()),
            ttl: ENHANCED_CACHE_TTL,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Serve the current enhanced payload for a report. Cold start seeds
    /// the entry from the persisted report's stored metadata (its age is
    /// the report's age); a stale read returns immediately and refreshes in
    /// the background.
    pub async fn get_enhanced(
        self: &Arc<Self>,
        report_id: Uuid,
    ) -> Result<EnhancedRead, RivalScopeError> {
        let now = Utc::now();
        let existing = self.entries.read().await.get(&report_id).cloned();

        let item = match existing {
            Some(item) => item,
            None => {
                let report = self
                    .store
                    .get_by_id(report_id)
                    .await?
                    .ok_or(RivalScopeError::ReportNotFound(report_id))?;
                let seeded = EnhancedCacheItem {
                    payload: report.enhanced,
                    last_updated: report.created_at,
                    expires: report.created_at + self.chrono_ttl(),
                };
                debug!(%report_id, "Seeded enhanced cache from persisted report");
                self.entries.write().await.insert(report_id, seeded.clone());
                seeded
            }
        };

        let stale = item.expires <= now;
        if stale {
            self.spawn_refresh(report_id);
        }

        Ok(EnhancedRead {
            payload: item.payload,
            stale,
            last_updated: item.last_updated,
        })
    }

    /// Register interest in a report's refreshes. Dropping the receiver
    /// unsubscribes: the next push prunes closed channels.
    pub async fn subscribe(&self, report_id: Uuid) -> mpsc::UnboundedReceiver<EnhancedUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .write()
            .await
            .entry(report_id)
            .or_default()
            .push(tx);
        rx
    }

    pub async fn subscriber_count(&self, report_id: Uuid) -> usize {
        self.subscribers
            .read()
            .await
            .get(&report_id)
            .map(|s| s.len())
            .unwrap_or(0)
    }

    /// Start one background refresh unless one is already pending for this
    /// report.
    fn spawn_refresh(self: &Arc<Self>, report_id: Uuid) {
        {
            let mut refreshing = self.refreshing.lock().expect("refresh guard poisoned");
            if !refreshing.insert(report_id) {
                debug!(%report_id, "Enhanced refresh already in flight, skipping");
                return;
            }
        }

        let service = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = service.refresh(report_id).await {
                error!(%report_id, error = %e, "Enhanced refresh failed, keeping stale data");
            }
            service
                .refreshing
                .lock()
                .expect("refresh guard poisoned")
                .remove(&report_id);
        });
    }

    /// Re-run the enhanced track for the report's competitor set, overwrite
    /// the entry in place, and push the fresh payload to subscribers.
    async fn refresh(&self, report_id: Uuid) -> Result<()> {
        let Some(report) = self.store.get_by_id(report_id).await? else {
            anyhow::bail!("report {report_id} disappeared before refresh");
        };

        let payload = self
            .aggregator
            .collect_enhanced(&report.competitors, PlanMode::Premium, &NoopProgress)
            .await;

        let now = Utc::now();
        let item = EnhancedCacheItem {
            payload: payload.clone(),
            last_updated: now,
            expires: now + self.chrono_ttl(),
        };
        self.entries.write().await.insert(report_id, item);
        info!(%report_id, competitors = payload.len(), "Enhanced cache refreshed");

        self.push_update(EnhancedUpdate {
            report_id,
            payload,
            last_updated: now,
        })
        .await;
        Ok(())
    }

    async fn push_update(&self, update: EnhancedUpdate) {
        let mut subscribers = self.subscribers.write().await;
        if let Some(senders) = subscribers.get_mut(&update.report_id) {
            senders.retain(|tx| tx.send(update.clone()).is_ok());
            if senders.is_empty() {
                subscribers.remove(&update.report_id);
            }
        }
    }

    fn chrono_ttl(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.ttl).unwrap_or_else(|_| chrono::Duration::minutes(10))
    }
}
