use crate::api::DashboardApi;
use crate::cache::{CacheEvent, KeyPattern, QueryCache, QueryFamily, QueryKey};
use crate::domain::merge::merge_preferences_with_params;
use crate::domain::params::RecommendationQueryParams;
use crate::domain::preferences::UserPreferences;
use crate::domain::recommendation::Recommendation;
use crate::query::preferences::fetch_preferences;
use crate::query::{QueryOptions, QueryState};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;

/// Recommendation list for a set of explicit filters, with saved preferences
/// filling in whatever the filters leave open.
///
/// Preferences are always resolved before the list key is built, so the key
/// identifies exactly the request that produced the data.
pub struct RecommendationsQuery {
    api: Arc<dyn DashboardApi>,
    cache: QueryCache,
    options: QueryOptions,
    params: Option<RecommendationQueryParams>,
    preferences: Option<UserPreferences>,
    effective: Option<RecommendationQueryParams>,
    key: Option<QueryKey>,
    loaded_at: Option<Instant>,
    state: QueryState<Vec<Recommendation>>,
    events: broadcast::Receiver<CacheEvent>,
    // Invalidation this query issued itself; its echo is not a change.
    own_invalidation: Option<QueryKey>,
}

enum Wake {
    Tick,
    Event(Result<CacheEvent, RecvError>),
}

impl RecommendationsQuery {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        cache: QueryCache,
        options: QueryOptions,
        params: Option<RecommendationQueryParams>,
    ) -> Self {
        let events = cache.subscribe();
        Self {
            api,
            cache,
            options,
            params,
            preferences: None,
            effective: None,
            key: None,
            loaded_at: None,
            state: QueryState::loading(),
            events,
            own_invalidation: None,
        }
    }

    pub fn state(&self) -> &QueryState<Vec<Recommendation>> {
        &self.state
    }

    pub fn params(&self) -> Option<&RecommendationQueryParams> {
        self.params.as_ref()
    }

    /// The params actually sent on the last load.
    pub fn effective_params(&self) -> Option<&RecommendationQueryParams> {
        self.effective.as_ref()
    }

    pub fn current_key(&self) -> Option<&QueryKey> {
        self.key.as_ref()
    }

    /// Replaces the explicit filters. Takes effect on the next load.
    pub fn set_params(&mut self, params: Option<RecommendationQueryParams>) {
        self.params = params;
    }

    pub async fn load(&mut self) -> &QueryState<Vec<Recommendation>> {
        let preferences =
            match fetch_preferences(&self.api, &self.cache, self.options.preferences_stale).await {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(error = %err, "preferences unavailable; using explicit filters only");
                    None
                }
            };

        let effective = merge_preferences_with_params(preferences.as_ref(), self.params.as_ref());
        let key = QueryKey::recommendations(effective.as_ref());
        tracing::debug!(%key, "loading recommendations");

        let api = self.api.clone();
        let result = self
            .cache
            .fetch(key.clone(), self.options.recommendations_stale, move || {
                let api = api.clone();
                async move { api.list_recommendations(effective.as_ref()).await }
            })
            .await;

        if let Err(err) = &result {
            tracing::warn!(%key, error = %err, "recommendations fetch failed");
        }

        self.preferences = preferences;
        self.effective = effective;
        self.key = Some(key);
        self.loaded_at = Some(Instant::now());
        self.state = QueryState::from_result(result.map(|r| (*r).clone()));
        &self.state
    }

    pub async fn refetch(&mut self) -> &QueryState<Vec<Recommendation>> {
        self.invalidate_own_key();
        self.load().await
    }

    fn invalidate_own_key(&mut self) {
        if let Some(key) = self.key.clone() {
            // No entry means no event to swallow.
            if self.cache.snapshot(&key).is_some() {
                self.own_invalidation = Some(key.clone());
            }
            self.cache.invalidate(KeyPattern::Exact(key));
        }
    }

    /// Waits until something this query depends on changes (its entry or the
    /// saved preferences are invalidated or rewritten) or the periodic refresh
    /// interval elapses, then reloads. A periodic refresh always goes to the
    /// backend, even when the entry is still inside its stale window, and
    /// drops cache entries older than `cache_max_age`.
    pub async fn next_change(&mut self) -> &QueryState<Vec<Recommendation>> {
        let deadline = self.loaded_at.unwrap_or_else(Instant::now) + self.options.refetch_interval;

        loop {
            let wake = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => Wake::Tick,
                ev = self.events.recv() => Wake::Event(ev),
            };

            match wake {
                Wake::Tick => {
                    let pruned = self.cache.prune(self.options.cache_max_age);
                    tracing::debug!(pruned, "periodic recommendations refresh");
                    self.invalidate_own_key();
                    break;
                }
                Wake::Event(Ok(ev)) => {
                    if self.is_relevant(&ev) {
                        tracing::debug!(key = %ev.key(), "recommendations dependency changed");
                        break;
                    }
                }
                // Missed events; assume the worst.
                Wake::Event(Err(RecvError::Lagged(_))) => {
                    self.own_invalidation = None;
                    break;
                }
                Wake::Event(Err(RecvError::Closed)) => {
                    tokio::time::sleep_until(deadline).await;
                    break;
                }
            }
        }

        self.load().await
    }

    fn is_relevant(&mut self, ev: &CacheEvent) -> bool {
        match ev {
            CacheEvent::Invalidated(k) if self.own_invalidation.as_ref() == Some(k) => {
                self.own_invalidation = None;
                false
            }
            CacheEvent::Invalidated(k) => {
                k.family() == QueryFamily::Preferences || Some(k) == self.key.as_ref()
            }
            CacheEvent::Updated(k) if k.family() == QueryFamily::Preferences => {
                let cached = self
                    .cache
                    .get_query_data::<Option<UserPreferences>>(k)
                    .map(|p| *p);
                matches!(cached, Some(p) if p != self.preferences)
            }
            CacheEvent::Updated(k) if Some(k) == self.key.as_ref() => {
                let cached = self.cache.get_query_data::<Vec<Recommendation>>(k);
                matches!(cached, Some(data) if *data != self.state.data)
            }
            CacheEvent::Updated(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::cache::RetryPolicy;
    use crate::domain::preferences::{HoldingPeriod, PreferencesUpdate, RiskLevel};
    use crate::query::mutations::Mutations;
    use crate::query::View;
    use crate::testing::{sample_recommendation, FakeApi};
    use std::time::Duration;

    fn params(hp: Option<HoldingPeriod>, risk: Option<RiskLevel>) -> RecommendationQueryParams {
        RecommendationQueryParams {
            holding_period: hp,
            risk_level: risk,
            ..Default::default()
        }
    }

    fn setup(fake: &Arc<FakeApi>) -> (Arc<dyn DashboardApi>, QueryCache) {
        let api: Arc<dyn DashboardApi> = fake.clone();
        (api, QueryCache::new(RetryPolicy::none()))
    }

    #[tokio::test]
    async fn no_preferences_and_no_filters_sends_no_params() {
        let fake = Arc::new(FakeApi::default());
        fake.set_recommendations(vec![sample_recommendation("AAPL", RiskLevel::Low)]);
        let (api, cache) = setup(&fake);

        let mut query = RecommendationsQuery::new(api, cache, QueryOptions::default(), None);
        let state = query.load().await;

        assert_eq!(state.data.len(), 1);
        assert_eq!(fake.list_calls(), vec![None]);
        assert_eq!(query.effective_params(), None);
    }

    #[tokio::test]
    async fn saved_preferences_become_default_filters() {
        let fake = Arc::new(FakeApi::with_preferences(HoldingPeriod::Weekly, RiskLevel::High));
        let (api, cache) = setup(&fake);

        let mut query = RecommendationsQuery::new(api, cache, QueryOptions::default(), None);
        query.load().await;

        assert_eq!(
            fake.list_calls(),
            vec![Some(params(Some(HoldingPeriod::Weekly), Some(RiskLevel::High)))]
        );
    }

    #[tokio::test]
    async fn preference_update_in_cache_changes_key_and_request() {
        let fake = Arc::new(FakeApi::with_preferences(HoldingPeriod::Daily, RiskLevel::Low));
        let (api, cache) = setup(&fake);
        let mut query = RecommendationsQuery::new(api, cache.clone(), QueryOptions::default(), None);

        query.load().await;
        let first_key = query.current_key().cloned().unwrap();

        cache.set_query_data(
            QueryKey::preferences(),
            Some(UserPreferences {
                holding_period: HoldingPeriod::Weekly,
                risk_tolerance: RiskLevel::Medium,
            }),
            Duration::from_secs(300),
        );
        query.load().await;

        assert_ne!(query.current_key().unwrap(), &first_key);
        assert_eq!(
            fake.list_calls(),
            vec![
                Some(params(Some(HoldingPeriod::Daily), Some(RiskLevel::Low))),
                Some(params(Some(HoldingPeriod::Weekly), Some(RiskLevel::Medium))),
            ]
        );
    }

    #[tokio::test]
    async fn changing_explicit_risk_overrides_preference() {
        let fake = Arc::new(FakeApi::with_preferences(HoldingPeriod::Daily, RiskLevel::Medium));
        let (api, cache) = setup(&fake);
        let mut query = RecommendationsQuery::new(api, cache, QueryOptions::default(), None);

        query.load().await;
        let first_key = query.current_key().cloned().unwrap();

        query.set_params(Some(params(None, Some(RiskLevel::High))));
        query.load().await;

        assert_eq!(
            query.effective_params(),
            Some(&params(Some(HoldingPeriod::Daily), Some(RiskLevel::High)))
        );
        assert_ne!(query.current_key().unwrap(), &first_key);
        assert_eq!(fake.list_calls().len(), 2);
    }

    #[tokio::test]
    async fn identical_params_reuse_the_cached_entry() {
        let fake = Arc::new(FakeApi::default());
        let (api, cache) = setup(&fake);
        let p = params(Some(HoldingPeriod::Monthly), None);

        let mut a = RecommendationsQuery::new(api.clone(), cache.clone(), QueryOptions::default(), Some(p));
        let mut b = RecommendationsQuery::new(api, cache, QueryOptions::default(), Some(p));
        a.load().await;
        b.load().await;

        assert_eq!(fake.list_calls().len(), 1);
        assert_eq!(a.current_key(), b.current_key());
    }

    #[tokio::test]
    async fn fetch_failure_surfaces_as_error_with_empty_data() {
        let fake = Arc::new(FakeApi::default());
        fake.fail_recommendations(ApiError::Network("connection refused".into()));
        let (api, cache) = setup(&fake);

        let mut query = RecommendationsQuery::new(api, cache, QueryOptions::default(), None);
        let state = query.load().await;

        assert!(state.is_error);
        assert!(state.data.is_empty());
        assert!(matches!(state.view(), View::Error(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn preference_failure_falls_back_to_explicit_filters() {
        let fake = Arc::new(FakeApi::default());
        fake.fail_preferences(ApiError::Http {
            status: 500,
            detail: None,
        });
        let (api, cache) = setup(&fake);
        let explicit = params(None, Some(RiskLevel::Low));

        let mut query = RecommendationsQuery::new(api, cache, QueryOptions::default(), Some(explicit));
        let state = query.load().await;

        assert!(!state.is_error);
        assert_eq!(fake.list_calls(), vec![Some(explicit)]);
    }

    #[tokio::test]
    async fn saving_preferences_triggers_refetch_with_new_defaults() {
        let fake = Arc::new(FakeApi::with_preferences(HoldingPeriod::Daily, RiskLevel::Low));
        let (api, cache) = setup(&fake);
        let options = QueryOptions::default();

        let mut query = RecommendationsQuery::new(api.clone(), cache.clone(), options, None);
        query.load().await;

        let mutations = Mutations::new(api, cache, options);
        mutations
            .save_preferences(PreferencesUpdate {
                holding_period: Some(HoldingPeriod::Weekly),
                risk_tolerance: Some(RiskLevel::Medium),
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), query.next_change())
            .await
            .expect("query should react to the preference save");

        assert_eq!(
            fake.list_calls().last().cloned(),
            Some(Some(params(Some(HoldingPeriod::Weekly), Some(RiskLevel::Medium))))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_refetches_after_interval() {
        let fake = Arc::new(FakeApi::default());
        let (api, cache) = setup(&fake);
        let options = QueryOptions {
            refetch_interval: Duration::from_secs(300),
            ..QueryOptions::default()
        };

        let mut query = RecommendationsQuery::new(api, cache, options, None);
        query.load().await;
        query.next_change().await;

        assert_eq!(fake.list_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_bypasses_a_still_fresh_entry() {
        let fake = Arc::new(FakeApi::default());
        let (api, cache) = setup(&fake);
        let options = QueryOptions {
            refetch_interval: Duration::from_secs(30),
            recommendations_stale: Duration::from_secs(60),
            ..QueryOptions::default()
        };

        let mut query = RecommendationsQuery::new(api, cache, options, None);
        query.load().await;
        query.next_change().await;
        assert_eq!(fake.list_calls().len(), 2);

        // The refresh's own invalidation must not wake the query again early.
        let early = tokio::time::timeout(Duration::from_secs(10), query.next_change()).await;
        assert!(early.is_err());
        assert_eq!(fake.list_calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn periodic_refresh_prunes_entries_past_max_age() {
        let fake = Arc::new(FakeApi::default());
        let (api, cache) = setup(&fake);
        let options = QueryOptions {
            refetch_interval: Duration::from_secs(300),
            cache_max_age: Duration::from_secs(500),
            ..QueryOptions::default()
        };
        let old_search = QueryKey::stock_search("tsla");
        cache.set_query_data(old_search.clone(), Vec::<u32>::new(), Duration::from_secs(30));

        let mut query = RecommendationsQuery::new(api, cache.clone(), options, None);
        query.load().await;

        query.next_change().await;
        assert!(cache.snapshot(&old_search).is_some());

        query.next_change().await;
        assert!(cache.snapshot(&old_search).is_none());
        assert!(cache.snapshot(query.current_key().unwrap()).is_some());
    }
}
