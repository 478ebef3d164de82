use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// One daily bar as delivered by a source, before any validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResponse {
    pub chart: ChartEnvelope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartEnvelope {
    #[serde(default)]
    pub result: Option<Vec<ChartResult>>,
    #[serde(default)]
    pub error: Option<ChartError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChartResult {
    #[serde(default)]
    pub meta: ChartMeta,
    #[serde(default)]
    pub timestamp: Vec<i64>,
    #[serde(default)]
    pub indicators: ChartIndicators,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartMeta {
    #[serde(default)]
    pub symbol: String,
    /// Exchange offset from UTC in seconds, used to map bar timestamps to trading dates.
    #[serde(default)]
    pub gmtoffset: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<ChartQuote>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartQuote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResult {
    pub fn into_bars(self) -> anyhow::Result<Vec<RawPriceBar>> {
        let quote = self.indicators.quote.into_iter().next().unwrap_or_default();
        let mut out = Vec::with_capacity(self.timestamp.len());
        for (i, ts) in self.timestamp.iter().enumerate() {
            let local = ts
                .checked_add(self.meta.gmtoffset)
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .ok_or_else(|| {
                    anyhow::anyhow!(
                        "bar timestamp out of range: {ts} (gmtoffset {})",
                        self.meta.gmtoffset
                    )
                })?;
            out.push(RawPriceBar {
                date: local.date_naive(),
                open: quote.open.get(i).copied().flatten(),
                close: quote.close.get(i).copied().flatten(),
                volume: quote.volume.get(i).copied().flatten(),
            });
        }
        Ok(out)
    }
}
