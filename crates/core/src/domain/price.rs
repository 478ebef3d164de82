use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    pub date: NaiveDate,
    pub close: f64,
    pub volume: Option<f64>,
    pub open: Option<f64>,
}

impl PriceObservation {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self {
            date,
            close,
            volume: None,
            open: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_open(mut self, open: f64) -> Self {
        self.open = Some(open);
        self
    }
}

/// Daily closes for one ticker, oldest first.
///
/// Only the loader builds these from source data, so every series seen by the analysis code has
/// strictly increasing dates and positive closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    observations: Vec<PriceObservation>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, observations: Vec<PriceObservation>) -> anyhow::Result<Self> {
        anyhow::ensure!(!observations.is_empty(), "price series must be non-empty");
        for pair in observations.windows(2) {
            anyhow::ensure!(
                pair[0].date < pair[1].date,
                "price series dates must be strictly increasing ({} then {})",
                pair[0].date,
                pair[1].date
            );
        }
        for obs in &observations {
            anyhow::ensure!(
                obs.close.is_finite() && obs.close > 0.0,
                "close on {} must be positive (got {})",
                obs.date,
                obs.close
            );
        }

        Ok(Self {
            ticker: ticker.into(),
            observations,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn observations(&self) -> &[PriceObservation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn closes(&self) -> impl Iterator<Item = f64> + '_ {
        self.observations.iter().map(|o| o.close)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }

    pub fn last_close(&self) -> Option<f64> {
        self.observations.last().map(|o| o.close)
    }

    /// Simple period-over-period returns, `len() - 1` of them.
    pub fn period_returns(&self) -> Vec<f64> {
        self.observations
            .windows(2)
            .map(|w| (w[1].close - w[0].close) / w[0].close)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn rejects_unordered_dates() {
        let obs = vec![PriceObservation::new(d(2), 10.0), PriceObservation::new(d(1), 11.0)];
        assert!(PriceSeries::new("AAPL", obs).is_err());
    }

    #[test]
    fn rejects_duplicate_dates() {
        let obs = vec![PriceObservation::new(d(1), 10.0), PriceObservation::new(d(1), 11.0)];
        assert!(PriceSeries::new("AAPL", obs).is_err());
    }

    #[test]
    fn rejects_non_positive_close() {
        let obs = vec![PriceObservation::new(d(1), 10.0), PriceObservation::new(d(2), 0.0)];
        assert!(PriceSeries::new("AAPL", obs).is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(PriceSeries::new("AAPL", Vec::new()).is_err());
    }

    #[test]
    fn period_returns_has_one_fewer_entry() {
        let obs = vec![
            PriceObservation::new(d(1), 100.0),
            PriceObservation::new(d(2), 110.0),
            PriceObservation::new(d(3), 99.0),
        ];
        let series = PriceSeries::new("AAPL", obs).unwrap();
        let r = series.period_returns();
        assert_eq!(r.len(), 2);
        assert!((r[0] - 0.1).abs() < 1e-12);
        assert!((r[1] + 0.1).abs() < 1e-12);
        assert_eq!(series.last_close(), Some(99.0));
    }
}
