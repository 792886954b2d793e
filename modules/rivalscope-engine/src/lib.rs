pub mod aggregator;
pub mod analysis_cache;
pub mod enhanced_cache;
pub mod providers;
pub mod report_store;
pub mod service;
pub mod settle;
pub mod streaming;
pub mod summarizer;

#[cfg(any(test, feature = "test-support"))]
pub mod fixtures;

pub use aggregator::{
    AggregateOutcome, AggregateRequest, AggregateStats, EnhancedSignalAggregator, NoopProgress,
    ProgressSink,
};
pub use analysis_cache::{AnalysisCache, CachePolicy, ANALYSIS_CACHE_TTL};
pub use enhanced_cache::{EnhancedCacheService, EnhancedRead, ENHANCED_CACHE_TTL};
pub use report_store::{InMemoryReportStore, ReportStore};
pub use service::ReportService;
pub use streaming::{SessionSink, StreamSessionRegistry, KEEPALIVE_INTERVAL};
pub use summarizer::{summarize_with_fallback, ClaudeSummarizer, Summarizer};
