use crate::api::DashboardApi;
use crate::cache::{KeyPattern, QueryCache, QueryKey};
use crate::domain::recommendation::StockSearch;
use crate::query::debounce::Debouncer;
use crate::query::{QueryOptions, QueryState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub const MIN_QUERY_LEN: usize = 2;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);

/// Debounced stock search. Keystrokes go through [`SearchQuery::set_query`];
/// [`SearchQuery::settle`] waits out the quiet period and fetches at most
/// once for the final value.
pub struct SearchQuery {
    api: Arc<dyn DashboardApi>,
    cache: QueryCache,
    stale_after: Duration,
    debouncer: Debouncer,
    raw: String,
    fetched_for: Option<String>,
    state: QueryState<Vec<StockSearch>>,
}

impl SearchQuery {
    pub fn new(api: Arc<dyn DashboardApi>, cache: QueryCache, options: QueryOptions) -> Self {
        Self {
            api,
            cache,
            stale_after: options.search_stale,
            debouncer: Debouncer::new(options.search_debounce),
            raw: String::new(),
            fetched_for: None,
            state: QueryState::idle(),
        }
    }

    pub fn state(&self) -> &QueryState<Vec<StockSearch>> {
        &self.state
    }

    pub fn raw_query(&self) -> &str {
        &self.raw
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.deadline().is_some()
    }

    /// Records a keystroke. Input below the minimum length clears results at
    /// once and cancels any pending search.
    pub fn set_query(&mut self, raw: &str) {
        self.raw = raw.to_string();
        let trimmed = raw.trim();

        if trimmed.chars().count() < MIN_QUERY_LEN {
            self.debouncer.reset();
            self.fetched_for = None;
            self.state = QueryState::idle();
            return;
        }

        self.debouncer.input(trimmed, Instant::now());
    }

    pub async fn settle(&mut self) -> &QueryState<Vec<StockSearch>> {
        while let Some(deadline) = self.debouncer.deadline() {
            tokio::time::sleep_until(deadline).await;
            if let Some(query) = self.debouncer.poll(Instant::now()) {
                self.run(query).await;
            }
        }
        &self.state
    }

    pub async fn refetch(&mut self) -> &QueryState<Vec<StockSearch>> {
        if let Some(query) = self.fetched_for.clone() {
            self.cache
                .invalidate(KeyPattern::Exact(QueryKey::stock_search(&query)));
            self.run(query).await;
        }
        &self.state
    }

    async fn run(&mut self, query: String) {
        tracing::debug!(%query, "stock search");

        let api = self.api.clone();
        let q = query.clone();
        let result = self
            .cache
            .fetch(QueryKey::stock_search(&query), self.stale_after, move || {
                let api = api.clone();
                let q = q.clone();
                async move { api.search_stocks(&q).await }
            })
            .await;

        self.fetched_for = Some(query);
        self.state = QueryState::from_result(result.map(|r| (*r).clone()));
    }
}
