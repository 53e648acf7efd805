use crate::domain::preferences::RiskLevel;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Buy => f.write_str("buy"),
            Signal::Sell => f.write_str("sell"),
            Signal::Hold => f.write_str("hold"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stock {
    pub id: Uuid,
    pub symbol: String,
    pub company_name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub fortune_500_rank: Option<i32>,
}

/// Stock row returned by search and stock detail, annotated with the
/// caller's recommendation and tracking status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSearch {
    pub id: Uuid,
    pub symbol: String,
    pub company_name: String,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub fortune_500_rank: Option<i32>,
    #[serde(default)]
    pub has_recommendation: bool,
    #[serde(default)]
    pub is_tracked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: Uuid,
    pub user_id: Uuid,
    pub stock_id: Uuid,
    pub signal: Signal,
    pub confidence_score: f64,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    pub risk_level: RiskLevel,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    pub stock: Stock,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingResponse {
    pub message: String,
    pub tracked: bool,
}

/// Accepts RFC 3339 as well as the naive `YYYY-MM-DDTHH:MM:SS[.f]` form the
/// backend emits; naive values are read as UTC.
pub fn parse_timestamp(s: &str) -> anyhow::Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|e| anyhow::anyhow!("invalid timestamp {s:?}: {e}"))?;
    Ok(naive.and_utc())
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_timestamp(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn recommendation_json(created_at: &str) -> serde_json::Value {
        json!({
            "id": "6f1c1a36-5ad9-4c43-9d0e-3c1f7f7a9b10",
            "user_id": "0b7b0c4e-0d38-4f1e-8a5c-5d4c9e1d2a33",
            "stock_id": "c5e2b8f4-8b9a-4f7e-9a61-2f0d7c3b4e55",
            "signal": "buy",
            "confidence_score": 0.82,
            "risk_level": "medium",
            "created_at": created_at,
            "stock": {
                "id": "c5e2b8f4-8b9a-4f7e-9a61-2f0d7c3b4e55",
                "symbol": "AAPL",
                "company_name": "Apple Inc.",
                "sector": "Technology",
                "fortune_500_rank": 3
            }
        })
    }

    #[test]
    fn decodes_naive_backend_timestamp_as_utc() {
        let rec: Recommendation =
            serde_json::from_value(recommendation_json("2026-03-02T14:30:00.123456")).unwrap();
        assert_eq!(rec.signal, Signal::Buy);
        assert_eq!(rec.sentiment_score, None);
        assert_eq!(rec.explanation, None);
        assert_eq!(
            rec.created_at.date_naive(),
            chrono::NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
        );
    }

    #[test]
    fn decodes_rfc3339_timestamp() {
        let rec: Recommendation =
            serde_json::from_value(recommendation_json("2026-03-02T14:30:00+09:00")).unwrap();
        assert_eq!(
            rec.created_at,
            Utc.with_ymd_and_hms(2026, 3, 2, 5, 30, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn search_flags_default_to_false() {
        let s: StockSearch = serde_json::from_value(json!({
            "id": "c5e2b8f4-8b9a-4f7e-9a61-2f0d7c3b4e55",
            "symbol": "MSFT",
            "company_name": "Microsoft",
        }))
        .unwrap();
        assert!(!s.has_recommendation);
        assert!(!s.is_tracked);
    }
}
