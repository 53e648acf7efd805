//! Display helpers shared by every front end.

use crate::domain::preferences::{HoldingPeriod, RiskLevel};
use crate::domain::recommendation::Signal;
use chrono::{DateTime, Utc};

pub fn signal_label(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => "BUY",
        Signal::Sell => "SELL",
        Signal::Hold => "HOLD",
    }
}

/// `0.825` → `"83%"`. Out-of-range scores are clamped.
pub fn confidence_percent(score: f64) -> String {
    let pct = (score.clamp(0.0, 1.0) * 100.0).round() as u32;
    format!("{pct}%")
}

/// Sentiment in [-1, 1]. The neutral band is ±0.2.
pub fn sentiment_label(score: Option<f64>) -> &'static str {
    match score {
        None => "n/a",
        Some(s) if s >= 0.2 => "Positive",
        Some(s) if s <= -0.2 => "Negative",
        Some(_) => "Neutral",
    }
}

pub fn risk_label(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "Low risk",
        RiskLevel::Medium => "Medium risk",
        RiskLevel::High => "High risk",
    }
}

pub fn holding_period_label(period: HoldingPeriod) -> &'static str {
    match period {
        HoldingPeriod::Daily => "Daily",
        HoldingPeriod::Weekly => "Weekly",
        HoldingPeriod::Monthly => "Monthly",
    }
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// `"3 / 5"` for free accounts, `"12 / unlimited"` for premium.
pub fn tracking_usage(count: u32, limit: Option<u32>) -> String {
    match limit {
        Some(limit) => format!("{count} / {limit}"),
        None => format!("{count} / unlimited"),
    }
}
