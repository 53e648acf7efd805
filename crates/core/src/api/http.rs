use crate::api::error::ApiError;
use crate::api::DashboardApi;
use crate::config::Settings;
use crate::domain::params::RecommendationQueryParams;
use crate::domain::preferences::{PreferencesUpdate, UserPreferences};
use crate::domain::recommendation::{Recommendation, StockSearch, TrackingResponse};
use crate::domain::tier::TierStatus;
use crate::query::search::MIN_QUERY_LEN;
use crate::validation::{self, RegistrationForm};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use uuid::Uuid;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PREFERENCES_PATH: &str = "/api/v1/users/me/preferences";
const DEFAULT_TIER_STATUS_PATH: &str = "/api/v1/users/me/tier-status";

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredUser {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Serialize)]
struct RegisterRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// REST client for the dashboard backend. Every request carries the bearer
/// token when one is set.
#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    preferences_path: String,
    tier_status_path: String,
}

impl HttpDashboardApi {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_api_url()?.to_string();

        let timeout_secs = std::env::var("RECODASH_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let preferences_path = std::env::var("RECODASH_PREFERENCES_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PREFERENCES_PATH.to_string());

        let tier_status_path = std::env::var("RECODASH_TIER_STATUS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_TIER_STATUS_PATH.to_string());

        let mut api = Self::build(base_url, Duration::from_secs(timeout_secs))?;
        api.token = settings.api_token.clone();
        api.preferences_path = preferences_path;
        api.tier_status_path = tier_status_path;
        Ok(api)
    }

    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        Self::build(base_url.into(), Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    fn build(base_url: String, timeout: Duration) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build dashboard http client")?;

        Ok(Self {
            http,
            base_url,
            token: None,
            preferences_path: DEFAULT_PREFERENCES_PATH.to_string(),
            tier_status_path: DEFAULT_TIER_STATUS_PATH.to_string(),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ApiError::Validation(format!("invalid API token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let res = req
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        read_response(res).await
    }

    /// Exchanges credentials for a bearer token. The form is validated first;
    /// an invalid form is never sent.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let errors = validation::validate_login(email, password);
        if !errors.is_empty() {
            return Err(ApiError::Validation(validation::join_errors(&errors)));
        }

        let req = self
            .http
            .post(self.url("/auth/jwt/login"))
            .form(&[("username", email.trim()), ("password", password)]);
        let res = self.send::<LoginResponse>(req).await?;
        tracing::info!(email = %email.trim(), "logged in");
        Ok(res)
    }

    pub async fn register(&self, form: &RegistrationForm) -> Result<RegisteredUser, ApiError> {
        let errors = validation::validate_registration(form);
        if !errors.is_empty() {
            return Err(ApiError::Validation(validation::join_errors(&errors)));
        }

        let req = self.http.post(self.url("/auth/register")).json(&RegisterRequest {
            email: form.email.trim(),
            password: &form.password,
        });
        let user = self.send::<RegisteredUser>(req).await?;
        tracing::info!(user_id = %user.id, "registered account");
        Ok(user)
    }
}

#[async_trait::async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn list_recommendations(
        &self,
        params: Option<&RecommendationQueryParams>,
    ) -> Result<Vec<Recommendation>, ApiError> {
        let pairs = match params {
            Some(p) => {
                p.validate()
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                p.query_pairs()
            }
            None => Vec::new(),
        };

        let req = self
            .http
            .get(self.url("/api/v1/recommendations"))
            .query(&pairs);
        self.send(req).await
    }

    async fn get_recommendation(&self, id: Uuid) -> Result<Recommendation, ApiError> {
        let req = self
            .http
            .get(self.url(&format!("/api/v1/recommendations/{id}")));
        self.send(req).await
    }

    async fn search_stocks(&self, query: &str) -> Result<Vec<StockSearch>, ApiError> {
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_LEN {
            return Err(ApiError::Validation(format!(
                "search query must be at least {MIN_QUERY_LEN} characters"
            )));
        }

        let req = self
            .http
            .get(self.url("/api/v1/stocks/search"))
            .query(&[("q", query)]);
        self.send(req).await
    }

    async fn get_stock(&self, id: Uuid) -> Result<StockSearch, ApiError> {
        let req = self.http.get(self.url(&format!("/api/v1/stocks/{id}")));
        self.send(req).await
    }

    async fn track_stock(&self, id: Uuid) -> Result<TrackingResponse, ApiError> {
        let req = self
            .http
            .post(self.url(&format!("/api/v1/stocks/{id}/track")));
        self.send(req).await
    }

    async fn untrack_stock(&self, id: Uuid) -> Result<TrackingResponse, ApiError> {
        let req = self
            .http
            .delete(self.url(&format!("/api/v1/stocks/{id}/track")));
        self.send(req).await
    }

    async fn get_preferences(&self) -> Result<Option<UserPreferences>, ApiError> {
        let req = self.http.get(self.url(&self.preferences_path));
        match self.send::<UserPreferences>(req).await {
            Ok(prefs) => Ok(Some(prefs)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn update_preferences(
        &self,
        update: &PreferencesUpdate,
    ) -> Result<UserPreferences, ApiError> {
        if update.is_empty() {
            return Err(ApiError::Validation(
                "preferences update must change at least one field".to_string(),
            ));
        }

        let req = self.http.put(self.url(&self.preferences_path)).json(update);
        self.send(req).await
    }

    async fn get_tier_status(&self) -> Result<TierStatus, ApiError> {
        let req = self.http.get(self.url(&self.tier_status_path));
        self.send(req).await
    }
}

async fn read_response<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, ApiError> {
    let status = res.status();
    let text = res
        .text()
        .await
        .map_err(|e| ApiError::Network(format!("failed to read response body: {e}")))?;

    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            detail: error_detail(&text),
        });
    }

    serde_json::from_str::<T>(&text).map_err(|e| ApiError::Decode(format!("{e}: {text}")))
}

/// Pulls the human-readable part out of an error body. The backend wraps it
/// as `{"detail": ...}`; anything else is passed through trimmed.
fn error_detail(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(obj)) => match obj.get("detail") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => Some(Value::Object(obj).to_string()),
            Some(other) => Some(other.to_string()),
        },
        _ => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let api = HttpDashboardApi::new("http://localhost:8000/").unwrap();
        assert_eq!(
            api.url("/api/v1/stocks/search"),
            "http://localhost:8000/api/v1/stocks/search"
        );
        assert_eq!(
            api.url("api/v1/stocks/search"),
            "http://localhost:8000/api/v1/stocks/search"
        );
    }

    #[test]
    fn extracts_detail_from_error_bodies() {
        assert_eq!(
            error_detail(r#"{"detail":"Stock not found"}"#),
            Some("Stock not found".to_string())
        );
        assert_eq!(
            error_detail(r#"{"detail":[{"loc":["query","q"]}]}"#),
            Some(r#"[{"loc":["query","q"]}]"#.to_string())
        );
        assert_eq!(error_detail("Bad Gateway"), Some("Bad Gateway".to_string()));
        assert_eq!(error_detail("  "), None);
    }

    #[test]
    fn bearer_header_is_attached_when_token_set() {
        let api = HttpDashboardApi::new("http://localhost:8000")
            .unwrap()
            .with_token("abc123");
        let headers = api.headers().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc123");
        assert_eq!(api.token(), Some("abc123"));
    }

    #[tokio::test]
    async fn short_search_is_rejected_without_network() {
        // Nothing listens on this port; a request would surface as Network.
        let api = HttpDashboardApi::new("http://127.0.0.1:9").unwrap();
        let err = api.search_stocks(" a ").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn invalid_login_form_is_rejected_without_network() {
        let api = HttpDashboardApi::new("http://127.0.0.1:9").unwrap();
        let err = api.login("not-an-email", "pw").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }
}
