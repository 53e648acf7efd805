use crate::api::DashboardApi;
use crate::cache::{KeyPattern, QueryCache, QueryKey};
use crate::domain::tier::{Tier, TierStatus};
use crate::query::{QueryOptions, QueryState};
use std::sync::Arc;

/// Flattened tier status for views. Until the status is known (loading or
/// failed) it reads as a free account with no count and no limit that is
/// not limit-reached; the tracking gate only closes on a confirmed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierView {
    pub tier: Tier,
    pub stock_count: u32,
    pub stock_limit: Option<u32>,
    pub can_add_more: bool,
    pub is_premium: bool,
    pub is_limit_reached: bool,
}

impl Default for TierView {
    fn default() -> Self {
        Self {
            tier: Tier::Free,
            stock_count: 0,
            stock_limit: None,
            can_add_more: false,
            is_premium: false,
            is_limit_reached: false,
        }
    }
}

impl TierView {
    pub fn from_status(status: Option<&TierStatus>) -> Self {
        match status {
            Some(s) => Self {
                tier: s.tier,
                stock_count: s.stock_count,
                stock_limit: s.stock_limit,
                can_add_more: s.can_add_more,
                is_premium: s.is_premium(),
                is_limit_reached: s.is_limit_reached(),
            },
            None => Self::default(),
        }
    }
}

pub struct TierStatusQuery {
    api: Arc<dyn DashboardApi>,
    cache: QueryCache,
    options: QueryOptions,
    state: QueryState<Option<TierStatus>>,
}

impl TierStatusQuery {
    pub fn new(api: Arc<dyn DashboardApi>, cache: QueryCache, options: QueryOptions) -> Self {
        Self {
            api,
            cache,
            options,
            state: QueryState::loading(),
        }
    }

    pub fn state(&self) -> &QueryState<Option<TierStatus>> {
        &self.state
    }

    pub fn view(&self) -> TierView {
        TierView::from_status(self.state.data.as_ref())
    }

    pub async fn load(&mut self) -> TierView {
        let api = self.api.clone();
        let result = self
            .cache
            .fetch(QueryKey::tier_status(), self.options.tier_stale, move || {
                let api = api.clone();
                async move { api.get_tier_status().await }
            })
            .await;

        if let Err(err) = &result {
            tracing::warn!(error = %err, "tier status unavailable");
        }
        self.state = QueryState::from_result(result.map(|s| Some(*s)));
        self.view()
    }

    pub async fn refetch(&mut self) -> TierView {
        self.cache
            .invalidate(KeyPattern::Exact(QueryKey::tier_status()));
        self.load().await
    }
}
