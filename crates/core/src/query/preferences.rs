use crate::api::{ApiError, DashboardApi};
use crate::cache::{QueryCache, QueryKey};
use crate::domain::preferences::UserPreferences;
use crate::query::{QueryOptions, QueryState};
use std::sync::Arc;
use std::time::Duration;

/// Cached read of the saved preferences. The cache stores
/// `Option<UserPreferences>` under [`QueryKey::preferences`].
pub async fn fetch_preferences(
    api: &Arc<dyn DashboardApi>,
    cache: &QueryCache,
    stale_after: Duration,
) -> Result<Option<UserPreferences>, ApiError> {
    let api = api.clone();
    let prefs = cache
        .fetch(QueryKey::preferences(), stale_after, move || {
            let api = api.clone();
            async move { api.get_preferences().await }
        })
        .await?;
    Ok(*prefs)
}

pub struct PreferencesQuery {
    api: Arc<dyn DashboardApi>,
    cache: QueryCache,
    options: QueryOptions,
    state: QueryState<Option<UserPreferences>>,
}

impl PreferencesQuery {
    pub fn new(api: Arc<dyn DashboardApi>, cache: QueryCache, options: QueryOptions) -> Self {
        Self {
            api,
            cache,
            options,
            state: QueryState::loading(),
        }
    }

    pub fn state(&self) -> &QueryState<Option<UserPreferences>> {
        &self.state
    }

    pub async fn load(&mut self) -> &QueryState<Option<UserPreferences>> {
        let result =
            fetch_preferences(&self.api, &self.cache, self.options.preferences_stale).await;
        self.state = QueryState::from_result(result);
        &self.state
    }

    pub async fn refetch(&mut self) -> &QueryState<Option<UserPreferences>> {
        self.cache
            .invalidate(crate::cache::KeyPattern::Exact(QueryKey::preferences()));
        self.load().await
    }
}
