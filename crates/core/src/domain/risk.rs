use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    Low,
    Medium,
    High,
}

/// How much of the budget a profile deploys, and the per-period volatility it accepts before
/// the allocation starts shrinking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskParameters {
    pub exposure: f64,
    pub volatility_tolerance: f64,
}

const LOW: RiskParameters = RiskParameters {
    exposure: 0.2,
    volatility_tolerance: 0.02,
};
const MEDIUM: RiskParameters = RiskParameters {
    exposure: 0.5,
    volatility_tolerance: 0.035,
};
const HIGH: RiskParameters = RiskParameters {
    exposure: 0.8,
    volatility_tolerance: 0.06,
};

impl RiskProfile {
    pub const ALL: [RiskProfile; 3] = [RiskProfile::Low, RiskProfile::Medium, RiskProfile::High];

    pub fn parameters(self) -> RiskParameters {
        match self {
            RiskProfile::Low => LOW,
            RiskProfile::Medium => MEDIUM,
            RiskProfile::High => HIGH,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskProfile::Low => "low",
            RiskProfile::Medium => "medium",
            RiskProfile::High => "high",
        }
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskProfile {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskProfile::Low),
            "medium" => Ok(RiskProfile::Medium),
            "high" => Ok(RiskProfile::High),
            other => anyhow::bail!("risk_level must be one of low, medium, high (got {other:?})"),
        }
    }
}
