use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    #[default]
    Free,
    Premium,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Free => f.write_str("free"),
            Tier::Premium => f.write_str("premium"),
        }
    }
}

/// Tracking-limit status as reported by the backend. `stock_limit` is `None`
/// for premium accounts (unlimited).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierStatus {
    pub tier: Tier,
    pub stock_count: u32,
    pub stock_limit: Option<u32>,
    pub can_add_more: bool,
}

impl TierStatus {
    pub fn is_premium(&self) -> bool {
        self.tier == Tier::Premium
    }

    /// Premium is never limit-reached, whatever `can_add_more` says.
    pub fn is_limit_reached(&self) -> bool {
        self.tier == Tier::Free && !self.can_add_more
    }
}
