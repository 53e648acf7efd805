use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Preferred recommendation horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HoldingPeriod {
    Daily,
    Weekly,
    Monthly,
}

impl HoldingPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoldingPeriod::Daily => "daily",
            HoldingPeriod::Weekly => "weekly",
            HoldingPeriod::Monthly => "monthly",
        }
    }
}

impl fmt::Display for HoldingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HoldingPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(HoldingPeriod::Daily),
            "weekly" => Ok(HoldingPeriod::Weekly),
            "monthly" => Ok(HoldingPeriod::Monthly),
            other => Err(format!("invalid holding period: {other}")),
        }
    }
}

/// Volatility band. The same scale is called `risk_tolerance` on saved
/// preferences and `risk_level` on recommendations and query params.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("invalid risk level: {other}")),
        }
    }
}

/// Saved personalization defaults. Absent entirely until the user saves once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    pub holding_period: HoldingPeriod,
    pub risk_tolerance: RiskLevel,
}

/// Partial update body for the preferences PUT.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreferencesUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holding_period: Option<HoldingPeriod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_tolerance: Option<RiskLevel>,
}

impl PreferencesUpdate {
    pub fn is_empty(&self) -> bool {
        self.holding_period.is_none() && self.risk_tolerance.is_none()
    }
}
