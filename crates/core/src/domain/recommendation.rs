use crate::domain::risk::RiskProfile;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnStats {
    pub average_return: f64,
    pub volatility: f64,
    pub periods: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ManipulationFlag {
    pub manipulated: bool,
    pub reasons: Vec<String>,
}

impl ManipulationFlag {
    pub fn from_reasons(reasons: Vec<String>) -> Self {
        Self {
            manipulated: !reasons.is_empty(),
            reasons,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSuggestion {
    pub suggested_stocks: u64,
    pub effective_allocation: f64,
    pub investment_suggestion: String,
}

/// One row of a multi-symbol screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenEntry {
    pub ticker: String,
    pub average_return: f64,
    pub volatility: f64,
    /// Share of periods that closed above the previous close.
    pub up_ratio: f64,
    pub manipulated: bool,
    pub manipulation_reasons: Vec<String>,
}

/// Success body of `POST /screen`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenReport {
    pub results: Vec<ScreenEntry>,
    /// Symbols with fewer than two observations in the range, in request order.
    pub skipped: Vec<String>,
}

/// Result of one request. Built once by the engine and only read afterwards.
#[derive(Debug, Clone)]
pub struct Recommendation {
    ticker: String,
    risk_profile: RiskProfile,
    stats: ReturnStats,
    flag: ManipulationFlag,
    position: PositionSuggestion,
    stock_graph_png: Vec<u8>,
}

impl Recommendation {
    pub fn assemble(
        ticker: String,
        risk_profile: RiskProfile,
        stats: ReturnStats,
        flag: ManipulationFlag,
        position: PositionSuggestion,
        stock_graph_png: Vec<u8>,
    ) -> Self {
        Self {
            ticker,
            risk_profile,
            stats,
            flag,
            position,
            stock_graph_png,
        }
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn risk_profile(&self) -> RiskProfile {
        self.risk_profile
    }

    pub fn average_return(&self) -> f64 {
        self.stats.average_return
    }

    pub fn volatility(&self) -> f64 {
        self.stats.volatility
    }

    pub fn stats(&self) -> &ReturnStats {
        &self.stats
    }

    pub fn manipulated(&self) -> bool {
        self.flag.manipulated
    }

    pub fn manipulation_reasons(&self) -> &[String] {
        &self.flag.reasons
    }

    pub fn suggested_stocks(&self) -> u64 {
        self.position.suggested_stocks
    }

    pub fn effective_allocation(&self) -> f64 {
        self.position.effective_allocation
    }

    pub fn investment_suggestion(&self) -> &str {
        &self.position.investment_suggestion
    }

    pub fn stock_graph_png(&self) -> &[u8] {
        &self.stock_graph_png
    }
}
