//! Heuristic flagging of price series that look artificially moved.
//!
//! Each heuristic is a named predicate over the series, its return statistics, and the
//! detector thresholds. The detector runs them in a fixed order and reports the name of every
//! one that fires, so identical input always yields identical reasons in identical order.
//! The flag is advisory evidence, not a finding.

use crate::analysis::returns::{mean, sample_std_dev};
use crate::domain::price::PriceSeries;
use crate::domain::recommendation::{ManipulationFlag, ReturnStats};

pub const RETURN_SPIKE: &str = "return-spike";
pub const REVERSAL: &str = "reversal";
pub const VOLUME_PRICE_DIVERGENCE: &str = "volume-price-divergence";
pub const INTRADAY_SWING: &str = "intraday-swing";

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// A period return is a spike when its magnitude exceeds this many volatilities.
    pub spike_multiple: f64,

    /// Periods after a spike that are searched for the opposite move.
    pub reversal_window: usize,

    /// Opposite move must be at least this fraction of the spike's magnitude.
    pub reversal_ratio: f64,

    /// Price move (in volatilities) that should come with a volume spike.
    pub divergence_price_multiple: f64,

    /// Volume (in multiples of the series mean volume) that counts as a spike.
    pub divergence_volume_multiple: f64,

    /// A move below this many volatilities counts as quiet.
    pub divergence_quiet_multiple: f64,

    /// Open-to-close change (in standard deviations of those changes) that counts as a swing.
    pub intraday_multiple: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            spike_multiple: 5.0,
            reversal_window: 3,
            reversal_ratio: 0.5,
            divergence_price_multiple: 3.0,
            divergence_volume_multiple: 3.0,
            divergence_quiet_multiple: 0.5,
            intraday_multiple: 3.0,
        }
    }
}

impl DetectorConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let mut out = Self::default();

        if let Some(v) = env_parse("DETECTOR_SPIKE_MULTIPLE") {
            out.spike_multiple = v;
        }
        if let Some(v) = env_parse("DETECTOR_REVERSAL_WINDOW") {
            out.reversal_window = v;
        }
        if let Some(v) = env_parse("DETECTOR_REVERSAL_RATIO") {
            out.reversal_ratio = v;
        }
        if let Some(v) = env_parse("DETECTOR_DIVERGENCE_PRICE_MULTIPLE") {
            out.divergence_price_multiple = v;
        }
        if let Some(v) = env_parse("DETECTOR_DIVERGENCE_VOLUME_MULTIPLE") {
            out.divergence_volume_multiple = v;
        }
        if let Some(v) = env_parse("DETECTOR_DIVERGENCE_QUIET_MULTIPLE") {
            out.divergence_quiet_multiple = v;
        }
        if let Some(v) = env_parse("DETECTOR_INTRADAY_MULTIPLE") {
            out.intraday_multiple = v;
        }

        out.validate()?;
        Ok(out)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, v) in [
            ("spike_multiple", self.spike_multiple),
            ("divergence_price_multiple", self.divergence_price_multiple),
            ("divergence_volume_multiple", self.divergence_volume_multiple),
            ("divergence_quiet_multiple", self.divergence_quiet_multiple),
            ("intraday_multiple", self.intraday_multiple),
        ] {
            anyhow::ensure!(v.is_finite() && v > 0.0, "{name} must be positive (got {v})");
        }
        anyhow::ensure!(self.reversal_window >= 1, "reversal_window must be at least 1");
        anyhow::ensure!(
            self.reversal_ratio > 0.0 && self.reversal_ratio <= 1.0,
            "reversal_ratio must be in (0, 1] (got {})",
            self.reversal_ratio
        );
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse::<T>().ok())
}

pub type HeuristicFn = fn(&PriceSeries, &ReturnStats, &DetectorConfig) -> bool;

#[derive(Clone, Copy)]
pub struct Heuristic {
    pub name: &'static str,
    pub check: HeuristicFn,
}

impl std::fmt::Debug for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Heuristic").field("name", &self.name).finish()
    }
}

pub fn default_heuristics() -> Vec<Heuristic> {
    vec![
        Heuristic {
            name: RETURN_SPIKE,
            check: return_spike,
        },
        Heuristic {
            name: REVERSAL,
            check: reversal,
        },
        Heuristic {
            name: VOLUME_PRICE_DIVERGENCE,
            check: volume_price_divergence,
        },
        Heuristic {
            name: INTRADAY_SWING,
            check: intraday_swing,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct ManipulationDetector {
    config: DetectorConfig,
    heuristics: Vec<Heuristic>,
}

impl Default for ManipulationDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl ManipulationDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            heuristics: default_heuristics(),
        }
    }

    /// Append a heuristic; it reports after all existing ones.
    pub fn with_heuristic(mut self, heuristic: Heuristic) -> Self {
        self.heuristics.push(heuristic);
        self
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn heuristic_names(&self) -> Vec<&'static str> {
        self.heuristics.iter().map(|h| h.name).collect()
    }

    pub fn detect(&self, series: &PriceSeries, stats: &ReturnStats) -> ManipulationFlag {
        let reasons = self
            .heuristics
            .iter()
            .filter(|h| (h.check)(series, stats, &self.config))
            .map(|h| h.name.to_string())
            .collect();
        ManipulationFlag::from_reasons(reasons)
    }
}

/// Indices (into the return vector) of returns larger than `spike_multiple` volatilities.
fn spike_indices(returns: &[f64], stats: &ReturnStats, config: &DetectorConfig) -> Vec<usize> {
    if stats.volatility <= 0.0 {
        return Vec::new();
    }
    let threshold = config.spike_multiple * stats.volatility;
    returns
        .iter()
        .enumerate()
        .filter(|(_, r)| r.abs() > threshold)
        .map(|(i, _)| i)
        .collect()
}

pub fn return_spike(series: &PriceSeries, stats: &ReturnStats, config: &DetectorConfig) -> bool {
    !spike_indices(&series.period_returns(), stats, config).is_empty()
}

pub fn reversal(series: &PriceSeries, stats: &ReturnStats, config: &DetectorConfig) -> bool {
    let returns = series.period_returns();
    spike_indices(&returns, stats, config).into_iter().any(|i| {
        let spike = returns[i];
        let last = (i + config.reversal_window).min(returns.len() - 1);
        (i + 1..=last).any(|j| {
            let r = returns[j];
            r != 0.0
                && r.signum() != spike.signum()
                && r.abs() >= config.reversal_ratio * spike.abs()
        })
    })
}

pub fn volume_price_divergence(
    series: &PriceSeries,
    stats: &ReturnStats,
    config: &DetectorConfig,
) -> bool {
    if stats.volatility <= 0.0 {
        return false;
    }

    let volumes: Vec<f64> = series
        .observations()
        .iter()
        .filter_map(|o| o.volume)
        .collect();
    if volumes.len() < 2 {
        return false;
    }
    let mean_volume = mean(&volumes);
    if mean_volume <= 0.0 {
        return false;
    }

    let loud_move = config.divergence_price_multiple * stats.volatility;
    let quiet_move = config.divergence_quiet_multiple * stats.volatility;
    let heavy_volume = config.divergence_volume_multiple * mean_volume;

    series
        .observations()
        .windows(2)
        .filter_map(|w| {
            let volume = w[1].volume?;
            Some(((w[1].close - w[0].close) / w[0].close, volume))
        })
        .any(|(r, volume)| {
            let unbacked_move = r.abs() > loud_move && volume <= heavy_volume;
            let unexplained_volume = volume > heavy_volume && r.abs() < quiet_move;
            unbacked_move || unexplained_volume
        })
}

pub fn intraday_swing(series: &PriceSeries, _stats: &ReturnStats, config: &DetectorConfig) -> bool {
    let changes: Vec<f64> = series
        .observations()
        .iter()
        .filter_map(|o| o.open.map(|open| (o.close - open) / open))
        .collect();
    if changes.len() < 2 {
        return false;
    }
    let std_dev = sample_std_dev(&changes, mean(&changes));
    if std_dev <= 0.0 {
        return false;
    }
    let threshold = config.intraday_multiple * std_dev;
    changes.iter().any(|c| c.abs() > threshold)
}
