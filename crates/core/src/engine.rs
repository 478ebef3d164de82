//! Request orchestration: validate, load, analyse, size, chart, assemble.
//! Also runs the lighter multi-symbol screen.

use crate::analysis::manipulation::ManipulationDetector;
use crate::analysis::returns::{compute_return_stats, up_ratio};
use crate::analysis::sizing::size_position;
use crate::chart::render_price_chart;
use crate::config::Settings;
use crate::domain::contract::{RecommendationQuery, ScreenQuery};
use crate::domain::recommendation::{Recommendation, ScreenEntry, ScreenReport};
use crate::error::RecommendError;
use crate::ingest::cache::PriceCache;
use crate::ingest::loader::SeriesLoader;
use crate::ingest::provider::PriceSource;
use anyhow::Context;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::Instrument;

pub struct RecommendationEngine {
    loader: SeriesLoader,
    detector: ManipulationDetector,
    clock: fn() -> DateTime<Utc>,
}

impl RecommendationEngine {
    pub fn new(loader: SeriesLoader, detector: ManipulationDetector) -> Self {
        Self {
            loader,
            detector,
            clock: Utc::now,
        }
    }

    pub fn from_settings(settings: &Settings, source: Arc<dyn PriceSource>) -> Self {
        let mut loader = SeriesLoader::new(source, settings.price_fetch_timeout)
            .with_max_gap_days(settings.max_gap_days);
        if let Some(ttl) = settings.cache_ttl() {
            loader = loader.with_cache(Arc::new(PriceCache::new(ttl)));
        }
        Self::new(loader, ManipulationDetector::new(settings.detector.clone()))
    }

    /// Fix "now" for range clamping.
    pub fn with_clock(mut self, clock: fn() -> DateTime<Utc>) -> Self {
        self.clock = clock;
        self
    }

    /// Single entry point taking the fields exactly as clients send them.
    pub async fn produce_recommendation(
        &self,
        ticker: &str,
        start_date: &str,
        end_date: &str,
        risk_level: &str,
        budget: Option<f64>,
    ) -> Result<Recommendation, RecommendError> {
        let query = RecommendationQuery::parse(ticker, start_date, end_date, risk_level, budget)?;
        self.recommend(&query).await
    }

    pub async fn recommend(
        &self,
        query: &RecommendationQuery,
    ) -> Result<Recommendation, RecommendError> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "recommend",
            %request_id,
            ticker = %query.ticker,
            risk = %query.risk_profile
        );
        self.recommend_inner(query).instrument(span).await
    }

    async fn recommend_inner(
        &self,
        query: &RecommendationQuery,
    ) -> Result<Recommendation, RecommendError> {
        let series = self
            .loader
            .load(&query.ticker, query.start_date, query.end_date, (self.clock)())
            .await?;

        let chart_series = Arc::clone(&series);
        let chart = tokio::task::spawn_blocking(move || render_price_chart(&chart_series));

        let stats = compute_return_stats(&series);
        let flag = self.detector.detect(&series, &stats);
        if flag.manipulated {
            tracing::warn!(reasons = ?flag.reasons, "manipulation heuristics triggered");
        }

        let position = size_position(
            query.budget,
            query.risk_profile,
            &stats,
            series.last_close(),
            &flag,
        )?;

        let png = chart
            .await
            .context("chart rendering task failed")?
            .context("chart rendering failed")?;

        tracing::info!(
            average_return = stats.average_return,
            volatility = stats.volatility,
            manipulated = flag.manipulated,
            suggested_stocks = position.suggested_stocks,
            "recommendation assembled"
        );

        Ok(Recommendation::assemble(
            query.ticker.clone(),
            query.risk_profile,
            stats,
            flag,
            position,
            png,
        ))
    }

    /// Return statistics and manipulation flags for each symbol over one range.
    ///
    /// Symbols without enough data are reported as skipped. Any other failure aborts the
    /// whole screen.
    pub async fn screen(&self, query: &ScreenQuery) -> Result<ScreenReport, RecommendError> {
        let request_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "screen",
            %request_id,
            symbols = query.symbols.len()
        );
        self.screen_inner(query).instrument(span).await
    }

    async fn screen_inner(&self, query: &ScreenQuery) -> Result<ScreenReport, RecommendError> {
        let now = (self.clock)();
        let mut report = ScreenReport::default();

        for ticker in &query.symbols {
            let series = match self
                .loader
                .load(ticker, query.start_date, query.end_date, now)
                .await
            {
                Ok(series) => series,
                Err(RecommendError::NoDataAvailable(reason)) => {
                    tracing::info!(%ticker, %reason, "skipping symbol without data");
                    report.skipped.push(ticker.clone());
                    continue;
                }
                Err(err) => return Err(err),
            };

            let stats = compute_return_stats(&series);
            let flag = self.detector.detect(&series, &stats);
            if flag.manipulated {
                tracing::warn!(%ticker, reasons = ?flag.reasons, "manipulation heuristics triggered");
            }
            report.results.push(ScreenEntry {
                ticker: ticker.clone(),
                average_return: stats.average_return,
                volatility: stats.volatility,
                up_ratio: up_ratio(&series.period_returns()),
                manipulated: flag.manipulated,
                manipulation_reasons: flag.reasons,
            });
        }

        tracing::info!(
            screened = report.results.len(),
            skipped = report.skipped.len(),
            "screen finished"
        );
        Ok(report)
    }
}
