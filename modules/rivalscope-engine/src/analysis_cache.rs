//! Time-bounded cache for full analysis results.
//!
//! Keyed by a pure function of the canonicalized request. No sweeper:
//! entries past expiry are ignored by reads and overwritten by the next
//! write for the same key.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use rivalscope_common::{AnalysisPayload, CompetitorIdentity, PlanMode, SourceToggles};

/// Fixed per-deployment lifetime of an analysis result.
pub const ANALYSIS_CACHE_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: AnalysisPayload,
    expires: DateTime<Utc>,
}

pub struct AnalysisCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Pure, order-independent key: every input list is lowercased and
    /// sorted before joining, so permuted requests collide by design.
    pub fn make_key(
        competitors: &[String],
        domains: &[String],
        urls: &[String],
        toggles: SourceToggles,
        mode: PlanMode,
    ) -> String {
        let mut competitors: Vec<String> =
            competitors.iter().map(|c| c.to_lowercase()).collect();
        competitors.sort();
        let mut domains: Vec<String> = domains.iter().map(|d| d.to_lowercase()).collect();
        domains.sort();
        let mut urls: Vec<String> = urls.iter().map(|u| u.to_lowercase()).collect();
        urls.sort();

        format!(
            "{}|{}|{}|n{}f{}s{}p{}|{}",
            competitors.join(","),
            domains.join(","),
            urls.join(","),
            toggles.news as u8,
            toggles.funding as u8,
            toggles.social as u8,
            toggles.products as u8,
            mode,
        )
    }

    /// Returns the payload only while `expires > now`.
    pub async fn get(&self, key: &str) -> Option<AnalysisPayload> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires <= Utc::now() {
            debug!(key, "Analysis cache entry expired");
            return None;
        }
        Some(entry.payload.clone())
    }

    pub async fn put(&self, key: &str, payload: AnalysisPayload, ttl: Duration) {
        let expires = Utc::now()
            + chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::minutes(15));
        self.entries
            .write()
            .await
            .insert(key.to_string(), CacheEntry { payload, expires });
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new()
    }
}

/// When to treat a cache hit as a miss. The premium rule exists because
/// per-domain review data must stay fresh for paying users; it is an input
/// here rather than a branch buried in the aggregator.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub bypass_premium_with_domain: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            bypass_premium_with_domain: true,
        }
    }
}

impl CachePolicy {
    pub fn should_bypass(
        &self,
        no_cache: bool,
        mode: PlanMode,
        identities: &[CompetitorIdentity],
    ) -> bool {
        if no_cache {
            return true;
        }
        self.bypass_premium_with_domain
            && mode == PlanMode::Premium
            && identities.iter().any(|c| c.domain.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivalscope_common::Summary;

    fn toggles() -> SourceToggles {
        SourceToggles {
            news: true,
            funding: false,
            social: false,
            products: false,
        }
    }

    fn payload() -> AnalysisPayload {
        AnalysisPayload {
            signals: vec![],
            enhanced: vec![],
            summary: Summary::Newsletter("hi".to_string()),
            has_review_data: false,
            has_sentiment_data: false,
        }
    }

    #[test]
    fn make_key_is_order_independent() {
        let a = AnalysisCache::make_key(
            &["B".to_string(), "A".to_string()],
            &[],
            &[],
            toggles(),
            PlanMode::Free,
        );
        let b = AnalysisCache::make_key(
            &["A".to_string(), "B".to_string()],
            &[],
            &[],
            toggles(),
            PlanMode::Free,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn make_key_distinguishes_toggles_and_mode() {
        let base = AnalysisCache::make_key(&["a".to_string()], &[], &[], toggles(), PlanMode::Free);
        let premium =
            AnalysisCache::make_key(&["a".to_string()], &[], &[], toggles(), PlanMode::Premium);
        let all = AnalysisCache::make_key(
            &["a".to_string()],
            &[],
            &[],
            SourceToggles::default(),
            PlanMode::Free,
        );
        assert_ne!(base, premium);
        assert_ne!(base, all);
    }

    #[tokio::test]
    async fn get_put_round_trip() {
        let cache = AnalysisCache::new();
        cache.put("k", payload(), Duration::from_secs(60)).await;
        assert!(cache.get("k").await.is_some());
        assert!(cache.get("other").await.is_none());
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss_and_overwritable() {
        let cache = AnalysisCache::new();
        cache.put("k", payload(), Duration::from_millis(1)).await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.get("k").await.is_none());

        cache.put("k", payload(), Duration::from_secs(60)).await;
        assert!(cache.get("k").await.is_some());
    }

    #[test]
    fn policy_bypasses_on_no_cache() {
        let policy = CachePolicy::default();
        assert!(policy.should_bypass(true, PlanMode::Free, &[]));
    }

    #[test]
    fn policy_bypasses_premium_with_domain() {
        let policy = CachePolicy::default();
        let with_domain = vec![CompetitorIdentity {
            display_name: "Acme".to_string(),
            domain: Some("acme.com".to_string()),
            canonical_key: "acme".to_string(),
        }];
        let without_domain = vec![CompetitorIdentity {
            display_name: "Acme".to_string(),
            domain: None,
            canonical_key: "acme".to_string(),
        }];
        assert!(policy.should_bypass(false, PlanMode::Premium, &with_domain));
        assert!(!policy.should_bypass(false, PlanMode::Premium, &without_domain));
        assert!(!policy.should_bypass(false, PlanMode::Free, &with_domain));
    }

    #[test]
    fn policy_rule_is_configurable() {
        let policy = CachePolicy {
            bypass_premium_with_domain: false,
        };
        let with_domain = vec![CompetitorIdentity {
            display_name: "Acme".to_string(),
            domain: Some("acme.com".to_string()),
            canonical_key: "acme".to_string(),
        }];
        assert!(!policy.should_bypass(false, PlanMode::Premium, &with_domain));
    }
}
