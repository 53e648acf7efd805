use crate::domain::preferences::{HoldingPeriod, RiskLevel};
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    Date,
    Confidence,
    Risk,
    Sentiment,
}

impl SortBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Date => "date",
            SortBy::Confidence => "confidence",
            SortBy::Risk => "risk",
            SortBy::Sentiment => "sentiment",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(SortBy::Date),
            "confidence" => Ok(SortBy::Confidence),
            "risk" => Ok(SortBy::Risk),
            "sentiment" => Ok(SortBy::Sentiment),
            other => Err(format!("invalid sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(format!("invalid sort direction: {other}")),
        }
    }
}

/// Filter and sort options for the recommendation list. Every field is
/// optional; an absent field is left out of the request so the backend applies
/// its own default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationQueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_period: Option<HoldingPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<RiskLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortBy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_direction: Option<SortDirection>,
}

impl RecommendationQueryParams {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(min) = self.confidence_min {
            ensure!(
                (0.0..=1.0).contains(&min),
                "confidence_min must be between 0 and 1 (got {min})"
            );
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.query_pairs().is_empty()
    }

    /// Query-string pairs in a fixed field order. Used both for the request
    /// URL and for the cache key, so two params values produce the same key
    /// exactly when they produce the same request.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::with_capacity(5);
        if let Some(v) = self.holding_period {
            out.push(("holding_period", v.as_str().to_string()));
        }
        if let Some(v) = self.risk_level {
            out.push(("risk_level", v.as_str().to_string()));
        }
        if let Some(v) = self.confidence_min {
            out.push(("confidence_min", v.to_string()));
        }
        if let Some(v) = self.sort_by {
            out.push(("sort_by", v.as_str().to_string()));
        }
        if let Some(v) = self.sort_direction {
            out.push(("sort_direction", v.as_str().to_string()));
        }
        out
    }
}
