use crate::domain::recommendation::{ManipulationFlag, PositionSuggestion, ReturnStats};
use crate::domain::risk::RiskProfile;
use crate::error::RecommendError;

/// Portion of `budget` put at risk for a profile at the given volatility.
///
/// Volatility above the profile's tolerance scales the allocation by `tolerance / volatility`,
/// so the allocation never grows as volatility grows.
pub fn effective_allocation(budget: f64, profile: RiskProfile, volatility: f64) -> f64 {
    let params = profile.parameters();
    let base = budget * params.exposure;
    if volatility <= params.volatility_tolerance {
        return base;
    }
    base * (params.volatility_tolerance / volatility)
}

pub fn size_position(
    budget: f64,
    profile: RiskProfile,
    stats: &ReturnStats,
    current_price: Option<f64>,
    flag: &ManipulationFlag,
) -> Result<PositionSuggestion, RecommendError> {
    if !budget.is_finite() || budget < 0.0 {
        return Err(RecommendError::invalid(format!(
            "budget must be a non-negative number (got {budget})"
        )));
    }

    let price = match current_price {
        Some(p) if p.is_finite() && p > 0.0 => p,
        _ => {
            return Err(RecommendError::PricingUnavailable(
                "current price is unavailable, cannot size a position".to_string(),
            ))
        }
    };

    let allocation = effective_allocation(budget, profile, stats.volatility);
    let shares = (allocation / price).floor();
    let suggested_stocks = if shares.is_finite() && shares > 0.0 {
        shares as u64
    } else {
        0
    };

    Ok(PositionSuggestion {
        suggested_stocks,
        effective_allocation: allocation,
        investment_suggestion: render_suggestion(budget, profile, suggested_stocks, price, flag),
    })
}

fn render_suggestion(
    budget: f64,
    profile: RiskProfile,
    shares: u64,
    price: f64,
    flag: &ManipulationFlag,
) -> String {
    let mut out = if budget == 0.0 {
        format!("No funds allocated: no budget was provided for this {profile} risk analysis.")
    } else if shares == 0 {
        format!(
            "With a {profile} risk profile, the allocation from a budget of {budget:.2} does not cover one share at {price:.2}; no purchase suggested."
        )
    } else {
        let plural = if shares == 1 { "share" } else { "shares" };
        format!(
            "With a {profile} risk profile, consider buying {shares} {plural} at {price:.2} (about {:.2} of your {budget:.2} budget).",
            shares as f64 * price
        )
    };

    if flag.manipulated {
        out.push_str(&format!(
            " Caution: possible price manipulation detected ({}); review the price history carefully and proceed with caution regardless of the suggested size.",
            flag.reasons.join(", ")
        ));
    }
    out
}
