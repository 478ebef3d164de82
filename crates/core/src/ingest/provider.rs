use crate::config::Settings;
use crate::ingest::types::{ChartResponse, RawPriceBar};
use anyhow::Context;
use chrono::{Duration as ChronoDuration, NaiveDate, NaiveTime};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; stockrec/0.1)";
const CHART_PATH: &str = "/v8/finance/chart";

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("no market data for {0}")]
    NotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Daily bars for `ticker` with dates in `start..=end`, in any order.
    async fn fetch_daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPriceBar>, SourceError>;
}

/// Daily bars from a Yahoo-Finance-compatible chart endpoint.
#[derive(Debug, Clone)]
pub struct HttpChartProvider {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl HttpChartProvider {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings
            .price_provider_base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let user_agent = settings
            .price_provider_user_agent
            .clone()
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        // The engine enforces the request deadline; this only guards against hung sockets.
        let http = reqwest::Client::builder()
            .timeout(settings.price_fetch_timeout + Duration::from_secs(5))
            .build()
            .context("failed to build price provider http client")?;

        Ok(Self {
            http,
            base_url,
            user_agent,
        })
    }

    fn url(&self, ticker: &str) -> String {
        format!(
            "{}{}/{}",
            self.base_url.trim_end_matches('/'),
            CHART_PATH,
            ticker
        )
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_str(&self.user_agent)?);
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[async_trait::async_trait]
impl PriceSource for HttpChartProvider {
    fn provider_name(&self) -> &'static str {
        "http_chart"
    }

    async fn fetch_daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPriceBar>, SourceError> {
        let (period1, period2) = period_bounds(start, end);

        let res = self
            .http
            .get(self.url(ticker))
            .headers(self.headers()?)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .await
            .context("price provider request failed")?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read price provider response")?;

        if status == StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(ticker.to_string()));
        }
        if !status.is_success() {
            return Err(anyhow::anyhow!("price provider HTTP {status}: {text}").into());
        }

        parse_chart_body(ticker, &text)
    }
}

/// Unix bounds covering `start..=end`.
fn period_bounds(start: NaiveDate, end: NaiveDate) -> (i64, i64) {
    let p1 = start.and_time(NaiveTime::MIN).and_utc().timestamp();
    let p2 = (end + ChronoDuration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc()
        .timestamp();
    (p1, p2)
}

fn parse_chart_body(ticker: &str, text: &str) -> Result<Vec<RawPriceBar>, SourceError> {
    let parsed = serde_json::from_str::<ChartResponse>(text)
        .with_context(|| format!("price provider response is not a chart document: {text}"))?;

    if let Some(err) = parsed.chart.error {
        if err.code.eq_ignore_ascii_case("not found") {
            return Err(SourceError::NotFound(ticker.to_string()));
        }
        return Err(anyhow::anyhow!("price provider error {}: {}", err.code, err.description).into());
    }

    let Some(result) = parsed.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    Ok(result.into_bars()?)
}
