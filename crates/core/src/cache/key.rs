use crate::domain::params::RecommendationQueryParams;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryFamily {
    Preferences,
    Recommendations,
    RecommendationDetail,
    StockSearch,
    StockDetail,
    TierStatus,
}

impl QueryFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryFamily::Preferences => "preferences",
            QueryFamily::Recommendations => "recommendations",
            QueryFamily::RecommendationDetail => "recommendation",
            QueryFamily::StockSearch => "stock_search",
            QueryFamily::StockDetail => "stock",
            QueryFamily::TierStatus => "tier_status",
        }
    }
}

/// Semantic identity of a cached query. Two keys are equal exactly when they
/// would issue the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    family: QueryFamily,
    args: Vec<(&'static str, String)>,
}

impl QueryKey {
    pub fn family(&self) -> QueryFamily {
        self.family
    }

    pub fn args(&self) -> &[(&'static str, String)] {
        &self.args
    }

    pub fn preferences() -> Self {
        Self {
            family: QueryFamily::Preferences,
            args: Vec::new(),
        }
    }

    /// Keyed by the full effective params, so every filter/sort combination
    /// gets its own entry.
    pub fn recommendations(params: Option<&RecommendationQueryParams>) -> Self {
        Self {
            family: QueryFamily::Recommendations,
            args: params.map(|p| p.query_pairs()).unwrap_or_default(),
        }
    }

    pub fn recommendation(id: Uuid) -> Self {
        Self {
            family: QueryFamily::RecommendationDetail,
            args: vec![("id", id.to_string())],
        }
    }

    pub fn stock_search(query: &str) -> Self {
        Self {
            family: QueryFamily::StockSearch,
            args: vec![("q", query.trim().to_string())],
        }
    }

    pub fn stock(id: Uuid) -> Self {
        Self {
            family: QueryFamily::StockDetail,
            args: vec![("id", id.to_string())],
        }
    }

    pub fn tier_status() -> Self {
        Self {
            family: QueryFamily::TierStatus,
            args: Vec::new(),
        }
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.family.as_str())?;
        for (i, (k, v)) in self.args.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{k}={v}")?;
        }
        Ok(())
    }
}

/// Selects cache entries for invalidation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyPattern {
    Exact(QueryKey),
    Family(QueryFamily),
}

impl KeyPattern {
    pub fn matches(&self, key: &QueryKey) -> bool {
        match self {
            KeyPattern::Exact(k) => k == key,
            KeyPattern::Family(f) => key.family == *f,
        }
    }
}
