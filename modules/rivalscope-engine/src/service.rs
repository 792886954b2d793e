//! Report pipeline service.
//!
//! Owns the process-wide caches and the streaming registry with an explicit
//! lifecycle: constructed once at startup, injected into request handlers.
//! `run_report` is the full request path: canonicalize → cache policy →
//! aggregate → summarize with fallback → cache → persist.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use uuid::Uuid;

use rivalscope_common::{
    attach_domains, dedup_competitors, AnalysisPayload, AnalyzeRequest, CompetitorIdentity,
    ReportDraft, ReportRecord, RivalScopeError, StreamEvent, Summary,
};

use crate::aggregator::{
    AggregateRequest, EnhancedSignalAggregator, NoopProgress, ProgressSink,
};
use crate::analysis_cache::{AnalysisCache, CachePolicy, ANALYSIS_CACHE_TTL};
use crate::enhanced_cache::{EnhancedCacheService, EnhancedRead};
use crate::report_store::ReportStore;
use crate::streaming::{SessionSink, StreamSessionRegistry};
use crate::summarizer::{summarize_with_fallback, Summarizer};

pub struct ReportService {
    aggregator: Arc<EnhancedSignalAggregator>,
    summarizer: Arc<dyn Summarizer>,
    store: Arc<dyn ReportStore>,
    streaming: Arc<StreamSessionRegistry>,
    enhanced: Arc<EnhancedCacheService>,
    analysis_cache: AnalysisCache,
    cache_policy: CachePolicy,
    analysis_ttl: Duration,
}

impl ReportService {
    pub fn new(
        aggregator: Arc<EnhancedSignalAggregator>,
        summarizer: Arc<dyn Summarizer>,
        store: Arc<dyn ReportStore>,
        streaming: Arc<StreamSessionRegistry>,
    ) -> Self {
        let enhanced = Arc::new(EnhancedCacheService::new(
            Arc::clone(&aggregator),
            Arc::clone(&store),
        ));
        Self {
            aggregator,
            summarizer,
            store,
            streaming,
            enhanced,
            analysis_cache: AnalysisCache::new(),
            cache_policy: CachePolicy::default(),
            analysis_ttl: ANALYSIS_CACHE_TTL,
        }
    }

    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    pub fn with_analysis_ttl(mut self, ttl: Duration) -> Self {
        self.analysis_ttl = ttl;
        self
    }

    pub fn streaming(&self) -> &Arc<StreamSessionRegistry> {
        &self.streaming
    }

    pub fn enhanced(&self) -> &Arc<EnhancedCacheService> {
        &self.enhanced
    }

    /// Run the full pipeline for one request. Returns a best-effort report
    /// (degraded sections clearly empty) or a single clear failure, never
    /// a silently half-populated report.
    pub async fn run_report(
        &self,
        request: &AnalyzeRequest,
        user_id: &str,
        session_id: Option<&str>,
    ) -> Result<ReportRecord, RivalScopeError> {
        let mut identities = dedup_competitors(&request.competitors);
        attach_domains(&mut identities, &request.urls);
        if identities.is_empty() {
            return Err(RivalScopeError::EmptyCompetitorSet);
        }

        let sink: Box<dyn ProgressSink> = match session_id {
            Some(id) => Box::new(SessionSink::new(Arc::clone(&self.streaming), id)),
            None => Box::new(NoopProgress),
        };

        sink.emit(StreamEvent::Started {
            session_id: session_id.unwrap_or_default().to_string(),
            competitors: identities.iter().map(|c| c.display_name.clone()).collect(),
        });

        let result = self
            .run_report_inner(request, user_id, &identities, sink.as_ref())
            .await;

        match &result {
            Ok(record) => sink.emit(StreamEvent::Completed {
                report_id: record.id,
            }),
            Err(e) => sink.emit(StreamEvent::Failed {
                message: e.to_string(),
            }),
        }
        result
    }

    async fn run_report_inner(
        &self,
        request: &AnalyzeRequest,
        user_id: &str,
        identities: &[CompetitorIdentity],
        sink: &dyn ProgressSink,
    ) -> Result<ReportRecord, RivalScopeError> {
        let names: Vec<String> = identities.iter().map(|c| c.display_name.clone()).collect();
        let keys: Vec<String> = identities.iter().map(|c| c.canonical_key.clone()).collect();
        let domains: Vec<String> = identities.iter().filter_map(|c| c.domain.clone()).collect();
        let urls: Vec<String> = request
            .urls
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();

        let key = AnalysisCache::make_key(&keys, &domains, &urls, request.sources, request.mode);

        let bypass = self
            .cache_policy
            .should_bypass(request.no_cache, request.mode, identities);
        if !bypass {
            if let Some(payload) = self.analysis_cache.get(&key).await {
                info!(key = %key, "Analysis cache hit, skipping aggregation and summarization");
                let record = self
                    .store
                    .create(ReportDraft {
                        user_id: user_id.to_string(),
                        competitors: identities.to_vec(),
                        summary: payload.summary,
                        signals: payload.signals,
                        enhanced: payload.enhanced,
                    })
                    .await?;
                return Ok(record);
            }
        }

        let aggregate_request = AggregateRequest {
            competitors: identities.to_vec(),
            toggles: request.sources,
            mode: request.mode,
            compute_sentiment: true,
        };
        let outcome = self.aggregator.aggregate(&aggregate_request, sink).await?;

        sink.emit(StreamEvent::SignalsCollected {
            bundles: outcome.traditional.len() as u32,
            items: outcome
                .traditional
                .iter()
                .map(|b| b.items.len() as u32)
                .sum(),
        });
        sink.emit(StreamEvent::Summarizing { high_effort: true });

        let raw = summarize_with_fallback(self.summarizer.as_ref(), &outcome.traditional, &names)
            .await
            .map_err(|e| RivalScopeError::Summarizer(e.to_string()))?;
        let summary = Summary::resolve(&raw);

        let has_review_data = outcome.enhanced.iter().any(|e| e.reviews.is_some());
        let has_sentiment_data = outcome.enhanced.iter().any(|e| e.forum.is_some());
        let payload = AnalysisPayload {
            signals: outcome.traditional,
            enhanced: outcome.enhanced,
            summary,
            has_review_data,
            has_sentiment_data,
        };

        self.analysis_cache
            .put(&key, payload.clone(), self.analysis_ttl)
            .await;

        let record = self
            .store
            .create(ReportDraft {
                user_id: user_id.to_string(),
                competitors: identities.to_vec(),
                summary: payload.summary,
                signals: payload.signals,
                enhanced: payload.enhanced,
            })
            .await?;

        Ok(record)
    }

    /// Stale-while-revalidate read of a report's enhanced data.
    pub async fn get_enhanced(&self, report_id: Uuid) -> Result<EnhancedRead, RivalScopeError> {
        self.enhanced.get_enhanced(report_id).await
    }

    pub async fn get_report(
        &self,
        report_id: Uuid,
    ) -> Result<Option<ReportRecord>, RivalScopeError> {
        Ok(self.store.get_by_id(report_id).await?)
    }

    pub async fn list_reports(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ReportRecord>, RivalScopeError> {
        Ok(self.store.list_for_user(user_id, limit).await?)
    }
}
