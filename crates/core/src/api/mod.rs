use crate::domain::params::RecommendationQueryParams;
use crate::domain::preferences::{PreferencesUpdate, UserPreferences};
use crate::domain::recommendation::{Recommendation, StockSearch, TrackingResponse};
use crate::domain::tier::TierStatus;
use uuid::Uuid;

pub mod error;
pub mod http;

pub use error::{ApiError, ErrorContext};

/// Backend operations the dashboard consumes. `HttpDashboardApi` talks to the
/// REST service; tests substitute an in-memory fake.
#[async_trait::async_trait]
pub trait DashboardApi: Send + Sync {
    async fn list_recommendations(
        &self,
        params: Option<&RecommendationQueryParams>,
    ) -> Result<Vec<Recommendation>, ApiError>;

    async fn get_recommendation(&self, id: Uuid) -> Result<Recommendation, ApiError>;

    async fn search_stocks(&self, query: &str) -> Result<Vec<StockSearch>, ApiError>;

    async fn get_stock(&self, id: Uuid) -> Result<StockSearch, ApiError>;

    async fn track_stock(&self, id: Uuid) -> Result<TrackingResponse, ApiError>;

    async fn untrack_stock(&self, id: Uuid) -> Result<TrackingResponse, ApiError>;

    /// `Ok(None)` when the user has never saved preferences.
    async fn get_preferences(&self) -> Result<Option<UserPreferences>, ApiError>;

    async fn update_preferences(
        &self,
        update: &PreferencesUpdate,
    ) -> Result<UserPreferences, ApiError>;

    async fn get_tier_status(&self) -> Result<TierStatus, ApiError>;
}
