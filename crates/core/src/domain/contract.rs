//! JSON contract shared by the API server and the client.

use crate::domain::recommendation::Recommendation;
use crate::domain::risk::RiskProfile;
use crate::error::RecommendError;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const MAX_TICKER_LEN: usize = 16;
const MAX_SCREEN_SYMBOLS: usize = 20;

pub const DEFAULT_SCREEN_SYMBOLS: [&str; 4] = ["AAPL", "TSLA", "MSFT", "GOOGL"];
pub const DEFAULT_SCREEN_START: &str = "2015-01-01";
pub const DEFAULT_SCREEN_END: &str = "2024-12-31";

/// Body of `POST /recommend` as the forms send it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendRequest {
    pub ticker: String,
    pub start_date: String,
    pub end_date: String,
    pub risk_level: String,
    #[serde(default)]
    pub budget: Option<f64>,
}

/// Validated request. A missing budget becomes 0, which means no funds are allocated.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationQuery {
    pub ticker: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub risk_profile: RiskProfile,
    pub budget: f64,
}

impl RecommendRequest {
    pub fn validate_and_into_query(self) -> Result<RecommendationQuery, RecommendError> {
        RecommendationQuery::parse(
            &self.ticker,
            &self.start_date,
            &self.end_date,
            &self.risk_level,
            self.budget,
        )
    }
}

impl RecommendationQuery {
    pub fn parse(
        ticker: &str,
        start_date: &str,
        end_date: &str,
        risk_level: &str,
        budget: Option<f64>,
    ) -> Result<Self, RecommendError> {
        let ticker = normalize_ticker(ticker)?;
        let (start_date, end_date) = parse_range(start_date, end_date)?;

        let risk_profile = risk_level
            .parse::<RiskProfile>()
            .map_err(|e| RecommendError::invalid(e.to_string()))?;

        let budget = budget.unwrap_or(0.0);
        if !budget.is_finite() || budget < 0.0 {
            return Err(RecommendError::invalid(format!(
                "budget must be a non-negative number (got {budget})"
            )));
        }

        Ok(Self {
            ticker,
            start_date,
            end_date,
            risk_profile,
            budget,
        })
    }
}

/// Body of `POST /screen`. Every field falls back to a default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScreenRequest {
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

/// Validated screen: normalized, de-duplicated symbols in request order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenQuery {
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl ScreenRequest {
    pub fn validate_and_into_query(self) -> Result<ScreenQuery, RecommendError> {
        let (start_date, end_date) = parse_range(
            self.start_date.as_deref().unwrap_or(DEFAULT_SCREEN_START),
            self.end_date.as_deref().unwrap_or(DEFAULT_SCREEN_END),
        )?;

        let raw = self.symbols.unwrap_or_else(|| {
            DEFAULT_SCREEN_SYMBOLS
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        if raw.is_empty() {
            return Err(RecommendError::invalid("symbols must be non-empty"));
        }
        if raw.len() > MAX_SCREEN_SYMBOLS {
            return Err(RecommendError::invalid(format!(
                "at most {MAX_SCREEN_SYMBOLS} symbols can be screened at once (got {})",
                raw.len()
            )));
        }

        let mut symbols = Vec::with_capacity(raw.len());
        for s in &raw {
            let ticker = normalize_ticker(s)?;
            if !symbols.contains(&ticker) {
                symbols.push(ticker);
            }
        }

        Ok(ScreenQuery {
            symbols,
            start_date,
            end_date,
        })
    }
}

pub fn normalize_ticker(raw: &str) -> Result<String, RecommendError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(RecommendError::invalid("ticker must be non-empty"));
    }
    if ticker.len() > MAX_TICKER_LEN {
        return Err(RecommendError::invalid(format!(
            "ticker must be at most {MAX_TICKER_LEN} characters"
        )));
    }
    let valid = ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='));
    if !valid {
        return Err(RecommendError::invalid(format!(
            "ticker {ticker:?} contains unsupported characters"
        )));
    }
    Ok(ticker)
}

fn parse_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), RecommendError> {
    let start_date = parse_date("start_date", start)?;
    let end_date = parse_date("end_date", end)?;
    if start_date >= end_date {
        return Err(RecommendError::invalid(format!(
            "start_date ({start_date}) must be before end_date ({end_date})"
        )));
    }
    Ok((start_date, end_date))
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, RecommendError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        RecommendError::invalid(format!("{field} must be a valid YYYY-MM-DD date (got {raw:?})"))
    })
}

/// Success body of `POST /recommend`. Fractions are not percentages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub ticker: String,
    pub average_return: f64,
    pub volatility: f64,
    pub manipulated: bool,
    pub suggested_stocks: u64,
    pub investment_suggestion: String,
    /// Base64 PNG, usable as `data:image/png;base64,<stock_graph>`.
    pub stock_graph: String,
    #[serde(default)]
    pub manipulation_reasons: Vec<String>,
}

impl From<&Recommendation> for RecommendResponse {
    fn from(rec: &Recommendation) -> Self {
        Self {
            ticker: rec.ticker().to_string(),
            average_return: rec.average_return(),
            volatility: rec.volatility(),
            manipulated: rec.manipulated(),
            suggested_stocks: rec.suggested_stocks(),
            investment_suggestion: rec.investment_suggestion().to_string(),
            stock_graph: base64::engine::general_purpose::STANDARD.encode(rec.stock_graph_png()),
            manipulation_reasons: rec.manipulation_reasons().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
