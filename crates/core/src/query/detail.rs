use crate::api::{ApiError, DashboardApi};
use crate::cache::{KeyPattern, QueryCache, QueryKey};
use crate::domain::recommendation::{Recommendation, StockSearch};
use crate::query::{QueryOptions, QueryState};
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

/// Single-resource query keyed by id. A 404 surfaces as an error whose
/// [`ApiError::is_not_found`] is true, so views can show "not found" rather
/// than a generic failure.
pub struct DetailQuery<T> {
    cache: QueryCache,
    key: QueryKey,
    stale_after: Duration,
    fetcher: Fetcher<T>,
    state: QueryState<Option<T>>,
}

impl DetailQuery<Recommendation> {
    pub fn recommendation(
        api: Arc<dyn DashboardApi>,
        cache: QueryCache,
        options: QueryOptions,
        id: Uuid,
    ) -> Self {
        let fetcher: Fetcher<Recommendation> = Arc::new(move || {
            let api = api.clone();
            async move { api.get_recommendation(id).await }.boxed()
        });
        Self::new(cache, QueryKey::recommendation(id), options.detail_stale, fetcher)
    }
}

impl DetailQuery<StockSearch> {
    pub fn stock(
        api: Arc<dyn DashboardApi>,
        cache: QueryCache,
        options: QueryOptions,
        id: Uuid,
    ) -> Self {
        let fetcher: Fetcher<StockSearch> = Arc::new(move || {
            let api = api.clone();
            async move { api.get_stock(id).await }.boxed()
        });
        Self::new(cache, QueryKey::stock(id), options.detail_stale, fetcher)
    }
}

impl<T: Clone + Send + Sync + 'static> DetailQuery<T> {
    fn new(cache: QueryCache, key: QueryKey, stale_after: Duration, fetcher: Fetcher<T>) -> Self {
        Self {
            cache,
            key,
            stale_after,
            fetcher,
            state: QueryState::loading(),
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn state(&self) -> &QueryState<Option<T>> {
        &self.state
    }

    pub async fn load(&mut self) -> &QueryState<Option<T>> {
        let fetcher = self.fetcher.clone();
        let result = self
            .cache
            .fetch(self.key.clone(), self.stale_after, move || fetcher())
            .await;

        if let Err(err) = &result {
            tracing::debug!(key = %self.key, error = %err, "detail fetch failed");
        }
        self.state = QueryState::from_result(result.map(|v| Some((*v).clone())));
        &self.state
    }

    pub async fn refetch(&mut self) -> &QueryState<Option<T>> {
        self.cache.invalidate(KeyPattern::Exact(self.key.clone()));
        self.load().await
    }
}
