use crate::domain::price::PriceSeries;
use crate::domain::recommendation::ReturnStats;

/// Mean and sample standard deviation (N - 1) of the series' period returns.
///
/// The series must have at least two observations; a single return has volatility 0.
pub fn compute_return_stats(series: &PriceSeries) -> ReturnStats {
    let returns = series.period_returns();
    summarize(&returns)
}

pub fn summarize(returns: &[f64]) -> ReturnStats {
    let average_return = mean(returns);
    ReturnStats {
        average_return,
        volatility: sample_std_dev(returns, average_return),
        periods: returns.len(),
    }
}

/// Fraction of returns above zero; 0 for no returns.
pub fn up_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    returns.iter().filter(|r| **r > 0.0).count() as f64 / returns.len() as f64
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub(crate) fn sample_std_dev(values: &[f64], mean: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::price::PriceObservation;
    use chrono::{Duration, NaiveDate};

    fn series(closes: &[f64]) -> PriceSeries {
        let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let obs = closes
            .iter()
            .enumerate()
            .map(|(i, c)| PriceObservation::new(base + Duration::days(i as i64), *c))
            .collect();
        PriceSeries::new("TEST", obs).unwrap()
    }

    #[test]
    fn three_point_series() {
        let stats = compute_return_stats(&series(&[100.0, 105.0, 99.0]));
        assert_eq!(stats.periods, 2);
        assert!((stats.average_return - (-0.0035714)).abs() < 1e-6);
        assert!((stats.volatility - 0.0757614).abs() < 1e-6);
    }

    #[test]
    fn average_is_mean_of_returns() {
        let s = series(&[10.0, 12.0, 9.0, 9.5, 15.0, 14.0]);
        let r = s.period_returns();
        assert_eq!(r.len(), s.len() - 1);
        let stats = compute_return_stats(&s);
        let expected = r.iter().sum::<f64>() / r.len() as f64;
        assert!((stats.average_return - expected).abs() < 1e-12);
        assert!(stats.volatility > 0.0);
    }

    #[test]
    fn identical_returns_have_zero_volatility() {
        // Constant 10% growth.
        let stats = compute_return_stats(&series(&[100.0, 110.0, 121.0, 133.1]));
        assert!(stats.volatility.abs() < 1e-12);
        let flat = compute_return_stats(&series(&[50.0, 50.0, 50.0]));
        assert_eq!(flat.volatility, 0.0);
        assert_eq!(flat.average_return, 0.0);
    }

    #[test]
    fn single_return_has_zero_volatility() {
        let stats = compute_return_stats(&series(&[100.0, 120.0]));
        assert_eq!(stats.periods, 1);
        assert!((stats.average_return - 0.2).abs() < 1e-12);
        assert_eq!(stats.volatility, 0.0);
    }

    #[test]
    fn up_ratio_counts_rising_periods() {
        let s = series(&[100.0, 105.0, 99.0, 99.0, 101.0]);
        assert_eq!(up_ratio(&s.period_returns()), 0.5);
        assert_eq!(up_ratio(&[]), 0.0);
    }
}
