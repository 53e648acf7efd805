//! In-memory backend used by the query and mutation tests.

use crate::api::{ApiError, DashboardApi};
use crate::domain::params::RecommendationQueryParams;
use crate::domain::preferences::{HoldingPeriod, PreferencesUpdate, RiskLevel, UserPreferences};
use crate::domain::recommendation::{Recommendation, Signal, Stock, StockSearch, TrackingResponse};
use crate::domain::tier::{Tier, TierStatus};
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListRecommendations(Option<RecommendationQueryParams>),
    GetRecommendation(Uuid),
    Search(String),
    GetStock(Uuid),
    Track(Uuid),
    Untrack(Uuid),
    GetPreferences,
    UpdatePreferences(PreferencesUpdate),
    GetTierStatus,
}

struct Inner {
    calls: Vec<Call>,
    preferences: Option<UserPreferences>,
    recommendations: Vec<Recommendation>,
    stocks: Vec<StockSearch>,
    tier: TierStatus,
    tracked: Vec<Uuid>,
    fail_recommendations: Option<ApiError>,
    fail_search: Option<ApiError>,
    fail_preferences: Option<ApiError>,
    fail_tier: Option<ApiError>,
}

pub struct FakeApi {
    inner: Mutex<Inner>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                calls: Vec::new(),
                preferences: None,
                recommendations: Vec::new(),
                stocks: Vec::new(),
                tier: TierStatus {
                    tier: Tier::Free,
                    stock_count: 0,
                    stock_limit: Some(5),
                    can_add_more: true,
                },
                tracked: Vec::new(),
                fail_recommendations: None,
                fail_search: None,
                fail_preferences: None,
                fail_tier: None,
            }),
        }
    }
}

impl FakeApi {
    pub fn with_preferences(holding_period: HoldingPeriod, risk_tolerance: RiskLevel) -> Self {
        let fake = Self::default();
        fake.inner.lock().preferences = Some(UserPreferences {
            holding_period,
            risk_tolerance,
        });
        fake
    }

    pub fn set_recommendations(&self, recs: Vec<Recommendation>) {
        self.inner.lock().recommendations = recs;
    }

    pub fn set_stocks(&self, stocks: Vec<StockSearch>) {
        self.inner.lock().stocks = stocks;
    }

    pub fn set_tier(&self, tier: TierStatus) {
        self.inner.lock().tier = tier;
    }

    pub fn fail_recommendations(&self, err: ApiError) {
        self.inner.lock().fail_recommendations = Some(err);
    }

    pub fn fail_search(&self, err: ApiError) {
        self.inner.lock().fail_search = Some(err);
    }

    pub fn fail_preferences(&self, err: ApiError) {
        self.inner.lock().fail_preferences = Some(err);
    }

    pub fn fail_tier(&self, err: ApiError) {
        self.inner.lock().fail_tier = Some(err);
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.inner.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn search_calls(&self) -> Vec<String> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Search(q) => Some(q.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn list_calls(&self) -> Vec<Option<RecommendationQueryParams>> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::ListRecommendations(p) => Some(*p),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.inner.lock().calls.push(call);
    }

    fn find_stock(&self, id: Uuid) -> Option<StockSearch> {
        self.inner.lock().stocks.iter().find(|s| s.id == id).cloned()
    }
}

fn not_found() -> ApiError {
    ApiError::Http {
        status: 404,
        detail: Some("Not found".into()),
    }
}

#[async_trait::async_trait]
impl DashboardApi for FakeApi {
    async fn list_recommendations(
        &self,
        params: Option<&RecommendationQueryParams>,
    ) -> Result<Vec<Recommendation>, ApiError> {
        self.record(Call::ListRecommendations(params.copied()));
        let inner = self.inner.lock();
        match &inner.fail_recommendations {
            Some(err) => Err(err.clone()),
            None => Ok(inner.recommendations.clone()),
        }
    }

    async fn get_recommendation(&self, id: Uuid) -> Result<Recommendation, ApiError> {
        self.record(Call::GetRecommendation(id));
        let inner = self.inner.lock();
        if let Some(err) = &inner.fail_recommendations {
            return Err(err.clone());
        }
        inner
            .recommendations
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(not_found)
    }

    async fn search_stocks(&self, query: &str) -> Result<Vec<StockSearch>, ApiError> {
        self.record(Call::Search(query.to_string()));
        let inner = self.inner.lock();
        match &inner.fail_search {
            Some(err) => Err(err.clone()),
            None => Ok(inner.stocks.clone()),
        }
    }

    async fn get_stock(&self, id: Uuid) -> Result<StockSearch, ApiError> {
        self.record(Call::GetStock(id));
        self.find_stock(id).ok_or_else(not_found)
    }

    async fn track_stock(&self, id: Uuid) -> Result<TrackingResponse, ApiError> {
        self.record(Call::Track(id));
        let mut inner = self.inner.lock();
        if inner.tracked.contains(&id) {
            return Err(ApiError::Http {
                status: 400,
                detail: Some("Stock is already being tracked".into()),
            });
        }
        inner.tracked.push(id);
        inner.tier.stock_count += 1;
        if let Some(limit) = inner.tier.stock_limit {
            inner.tier.can_add_more = inner.tier.stock_count < limit;
        }
        Ok(TrackingResponse {
            message: "Stock tracked successfully".into(),
            tracked: true,
        })
    }

    async fn untrack_stock(&self, id: Uuid) -> Result<TrackingResponse, ApiError> {
        self.record(Call::Untrack(id));
        let mut inner = self.inner.lock();
        let before = inner.tracked.len();
        inner.tracked.retain(|t| *t != id);
        if inner.tracked.len() == before {
            return Err(not_found());
        }
        inner.tier.stock_count = inner.tier.stock_count.saturating_sub(1);
        inner.tier.can_add_more = true;
        Ok(TrackingResponse {
            message: "Stock untracked successfully".into(),
            tracked: false,
        })
    }

    async fn get_preferences(&self) -> Result<Option<UserPreferences>, ApiError> {
        self.record(Call::GetPreferences);
        let inner = self.inner.lock();
        match &inner.fail_preferences {
            Some(err) => Err(err.clone()),
            None => Ok(inner.preferences),
        }
    }

    async fn update_preferences(
        &self,
        update: &PreferencesUpdate,
    ) -> Result<UserPreferences, ApiError> {
        self.record(Call::UpdatePreferences(*update));
        let mut inner = self.inner.lock();
        if let Some(err) = &inner.fail_preferences {
            return Err(err.clone());
        }
        let base = inner.preferences.unwrap_or(UserPreferences {
            holding_period: HoldingPeriod::Daily,
            risk_tolerance: RiskLevel::Medium,
        });
        let saved = UserPreferences {
            holding_period: update.holding_period.unwrap_or(base.holding_period),
            risk_tolerance: update.risk_tolerance.unwrap_or(base.risk_tolerance),
        };
        inner.preferences = Some(saved);
        Ok(saved)
    }

    async fn get_tier_status(&self) -> Result<TierStatus, ApiError> {
        self.record(Call::GetTierStatus);
        let inner = self.inner.lock();
        match &inner.fail_tier {
            Some(err) => Err(err.clone()),
            None => Ok(inner.tier),
        }
    }
}

pub fn sample_stock(symbol: &str, company_name: &str) -> StockSearch {
    StockSearch {
        id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        company_name: company_name.to_string(),
        sector: Some("Technology".into()),
        fortune_500_rank: None,
        has_recommendation: false,
        is_tracked: false,
    }
}

pub fn sample_recommendation(symbol: &str, risk_level: RiskLevel) -> Recommendation {
    let stock_id = Uuid::new_v4();
    Recommendation {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        stock_id,
        signal: Signal::Buy,
        confidence_score: 0.8,
        sentiment_score: Some(0.4),
        risk_level,
        explanation: Some(format!("Positive outlook for {symbol}")),
        created_at: Utc::now(),
        stock: Stock {
            id: stock_id,
            symbol: symbol.to_string(),
            company_name: format!("{symbol} Corp"),
            sector: None,
            fortune_500_rank: None,
        },
    }
}
