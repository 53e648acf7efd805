//! View-facing queries. Each one resolves to a [`QueryState`] that a view can
//! branch on without knowing how the data was fetched.

use crate::api::{ApiError, DashboardApi};
use crate::cache::QueryCache;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub mod debounce;
pub mod detail;
pub mod mutations;
pub mod preferences;
pub mod recommendations;
pub mod search;
pub mod tier;

use crate::domain::params::RecommendationQueryParams;
use detail::DetailQuery;
use mutations::Mutations;
use preferences::PreferencesQuery;
use recommendations::RecommendationsQuery;
use search::SearchQuery;
use tier::TierStatusQuery;

/// The uniform result every query exposes. `data` always holds a value (empty
/// list, `None`) even while loading or after a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: T,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<ApiError>,
}

impl<T: Default> QueryState<T> {
    pub fn loading() -> Self {
        Self {
            data: T::default(),
            is_loading: true,
            is_error: false,
            error: None,
        }
    }

    /// Nothing requested yet, nothing pending.
    pub fn idle() -> Self {
        Self {
            data: T::default(),
            is_loading: false,
            is_error: false,
            error: None,
        }
    }

    pub fn success(data: T) -> Self {
        Self {
            data,
            is_loading: false,
            is_error: false,
            error: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            data: T::default(),
            is_loading: false,
            is_error: true,
            error: Some(error),
        }
    }

    pub(crate) fn from_result(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(err),
        }
    }
}

/// What a view should render. A failed fetch and a successful empty fetch
/// are always distinguishable.
#[derive(Debug, PartialEq)]
pub enum View<'a, D: ?Sized> {
    Loading,
    Error(&'a ApiError),
    Empty,
    Populated(&'a D),
}

impl<T> QueryState<Vec<T>> {
    pub fn view(&self) -> View<'_, [T]> {
        if let Some(err) = &self.error {
            return View::Error(err);
        }
        if self.data.is_empty() {
            return if self.is_loading {
                View::Loading
            } else {
                View::Empty
            };
        }
        View::Populated(&self.data)
    }
}

impl<T> QueryState<Option<T>> {
    pub fn view(&self) -> View<'_, T> {
        if let Some(err) = &self.error {
            return View::Error(err);
        }
        match &self.data {
            Some(d) => View::Populated(d),
            None if self.is_loading => View::Loading,
            None => View::Empty,
        }
    }
}

/// Freshness windows and timing knobs shared by all queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
    pub preferences_stale: Duration,
    pub recommendations_stale: Duration,
    pub detail_stale: Duration,
    pub search_stale: Duration,
    pub tier_stale: Duration,
    pub refetch_interval: Duration,
    /// Entries not refreshed within this window are dropped on each
    /// periodic refresh.
    pub cache_max_age: Duration,
    pub search_debounce: Duration,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            preferences_stale: Duration::from_secs(300),
            recommendations_stale: Duration::from_secs(60),
            detail_stale: Duration::from_secs(60),
            search_stale: Duration::from_secs(30),
            tier_stale: Duration::from_secs(30),
            refetch_interval: Duration::from_secs(300),
            cache_max_age: Duration::from_secs(1800),
            search_debounce: search::DEFAULT_DEBOUNCE,
        }
    }
}

impl QueryOptions {
    pub fn from_env() -> Self {
        let mut out = Self::default();

        if let Some(ms) = std::env::var("RECODASH_SEARCH_DEBOUNCE_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            out.search_debounce = Duration::from_millis(ms);
        }

        if let Some(secs) = std::env::var("RECODASH_REFETCH_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
        {
            out.refetch_interval = Duration::from_secs(secs);
        }

        if let Some(secs) = std::env::var("RECODASH_CACHE_MAX_AGE_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|n| *n > 0)
        {
            out.cache_max_age = Duration::from_secs(secs);
        }

        out
    }
}

/// Entry point that wires the API and the shared cache into every query.
#[derive(Clone)]
pub struct QueryClient {
    api: Arc<dyn DashboardApi>,
    cache: QueryCache,
    options: QueryOptions,
}

impl QueryClient {
    pub fn new(api: Arc<dyn DashboardApi>, cache: QueryCache, options: QueryOptions) -> Self {
        Self {
            api,
            cache,
            options,
        }
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn recommendations(&self, params: Option<RecommendationQueryParams>) -> RecommendationsQuery {
        RecommendationsQuery::new(self.api.clone(), self.cache.clone(), self.options, params)
    }

    pub fn recommendation(&self, id: Uuid) -> DetailQuery<crate::domain::recommendation::Recommendation> {
        DetailQuery::recommendation(self.api.clone(), self.cache.clone(), self.options, id)
    }

    pub fn stock(&self, id: Uuid) -> DetailQuery<crate::domain::recommendation::StockSearch> {
        DetailQuery::stock(self.api.clone(), self.cache.clone(), self.options, id)
    }

    pub fn search(&self) -> SearchQuery {
        SearchQuery::new(self.api.clone(), self.cache.clone(), self.options)
    }

    pub fn tier_status(&self) -> TierStatusQuery {
        TierStatusQuery::new(self.api.clone(), self.cache.clone(), self.options)
    }

    pub fn preferences(&self) -> PreferencesQuery {
        PreferencesQuery::new(self.api.clone(), self.cache.clone(), self.options)
    }

    pub fn mutations(&self) -> Mutations {
        Mutations::new(self.api.clone(), self.cache.clone(), self.options)
    }
}
