use stockrec_core::domain::contract::RecommendResponse;

/// Human-readable summary; the API returns fractions, percentages are formatted here.
pub fn render(rec: &RecommendResponse) -> String {
    let mut lines = vec![
        format!("Ticker:           {}", rec.ticker),
        format!("Average return:   {:.2}%", rec.average_return * 100.0),
        format!("Volatility:       {:.2}%", rec.volatility * 100.0),
        format!(
            "Manipulated:      {}",
            if rec.manipulated { "Yes" } else { "No" }
        ),
    ];
    if !rec.manipulation_reasons.is_empty() {
        lines.push(format!(
            "Triggered checks: {}",
            rec.manipulation_reasons.join(", ")
        ));
    }
    lines.push(format!("Suggested stocks: {}", rec.suggested_stocks));
    lines.push(format!("Suggestion:       {}", rec.investment_suggestion));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(manipulated: bool) -> RecommendResponse {
        RecommendResponse {
            ticker: "TSLA".to_string(),
            average_return: 0.0234,
            volatility: 0.0757,
            manipulated,
            suggested_stocks: 10,
            investment_suggestion: "Consider buying 10 shares.".to_string(),
            stock_graph: String::new(),
            manipulation_reasons: if manipulated {
                vec!["return-spike".to_string()]
            } else {
                Vec::new()
            },
        }
    }

    #[test]
    fn formats_fractions_as_percentages() {
        let out = render(&response(false));
        assert!(out.contains("Average return:   2.34%"));
        assert!(out.contains("Volatility:       7.57%"));
        assert!(out.contains("Manipulated:      No"));
        assert!(!out.contains("Triggered checks"));
    }

    #[test]
    fn lists_triggered_checks() {
        let out = render(&response(true));
        assert!(out.contains("Manipulated:      Yes"));
        assert!(out.contains("Triggered checks: return-spike"));
    }

    #[test]
    fn accepts_response_without_reasons_field() {
        let v = serde_json::json!({
            "ticker": "TSLA",
            "average_return": 0.01,
            "volatility": 0.02,
            "manipulated": false,
            "suggested_stocks": 3,
            "investment_suggestion": "ok",
            "stock_graph": ""
        });
        let rec: RecommendResponse = serde_json::from_value(v).unwrap();
        assert!(rec.manipulation_reasons.is_empty());
    }
}
