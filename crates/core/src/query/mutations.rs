use crate::api::{ApiError, DashboardApi};
use crate::cache::{KeyPattern, QueryCache, QueryFamily, QueryKey};
use crate::domain::preferences::{PreferencesUpdate, UserPreferences};
use crate::domain::recommendation::TrackingResponse;
use crate::query::QueryOptions;
use std::sync::Arc;
use uuid::Uuid;

/// Everything that tracking a stock can change on the backend. Free accounts
/// only see recommendation detail for tracked stocks, so detail goes too.
const TRACKING_FAMILIES: [QueryFamily; 5] = [
    QueryFamily::TierStatus,
    QueryFamily::Recommendations,
    QueryFamily::RecommendationDetail,
    QueryFamily::StockSearch,
    QueryFamily::StockDetail,
];

/// Writes that keep the cache consistent with the backend. A failed write
/// leaves the cache as it was.
pub struct Mutations {
    api: Arc<dyn DashboardApi>,
    cache: QueryCache,
    options: QueryOptions,
}

impl Mutations {
    pub fn new(api: Arc<dyn DashboardApi>, cache: QueryCache, options: QueryOptions) -> Self {
        Self {
            api,
            cache,
            options,
        }
    }

    pub async fn save_preferences(
        &self,
        update: PreferencesUpdate,
    ) -> Result<UserPreferences, ApiError> {
        let saved = self.api.update_preferences(&update).await?;

        self.cache.set_and_invalidate(
            QueryKey::preferences(),
            Some(saved),
            self.options.preferences_stale,
            &[KeyPattern::Family(QueryFamily::Recommendations)],
        );
        tracing::info!(
            holding_period = %saved.holding_period,
            risk_tolerance = %saved.risk_tolerance,
            "preferences saved"
        );
        Ok(saved)
    }

    pub async fn track_stock(&self, id: Uuid) -> Result<TrackingResponse, ApiError> {
        let resp = self.api.track_stock(id).await?;
        self.invalidate_tracking();
        tracing::info!(stock_id = %id, "stock tracked");
        Ok(resp)
    }

    pub async fn untrack_stock(&self, id: Uuid) -> Result<TrackingResponse, ApiError> {
        let resp = self.api.untrack_stock(id).await?;
        self.invalidate_tracking();
        tracing::info!(stock_id = %id, "stock untracked");
        Ok(resp)
    }

    fn invalidate_tracking(&self) {
        let patterns = TRACKING_FAMILIES.map(KeyPattern::Family);
        self.cache.invalidate_many(&patterns);
    }
}
