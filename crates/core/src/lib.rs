pub mod analysis;
pub mod chart;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod time;

pub mod config {
    use crate::analysis::manipulation::DetectorConfig;
    use crate::ingest::loader::DEFAULT_MAX_GAP_DAYS;
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
    const DEFAULT_CACHE_TTL_SECS: u64 = 300;
    pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub sentry_dsn: Option<String>,
        pub price_provider_base_url: Option<String>,
        pub price_provider_user_agent: Option<String>,
        pub price_fetch_timeout: Duration,
        pub price_cache_ttl: Duration,
        pub max_gap_days: u32,
        pub cors_allowed_origin: Option<String>,
        pub detector: DetectorConfig,
    }

    impl Default for Settings {
        fn default() -> Self {
            Self {
                sentry_dsn: None,
                price_provider_base_url: None,
                price_provider_user_agent: None,
                price_fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
                price_cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
                max_gap_days: DEFAULT_MAX_GAP_DAYS,
                cors_allowed_origin: None,
                detector: DetectorConfig::default(),
            }
        }
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            let price_fetch_timeout = std::env::var("PRICE_FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
            anyhow::ensure!(
                price_fetch_timeout > 0,
                "PRICE_FETCH_TIMEOUT_SECS must be positive"
            );

            let price_cache_ttl = std::env::var("PRICE_CACHE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(DEFAULT_CACHE_TTL_SECS);

            let max_gap_days = std::env::var("MAX_GAP_DAYS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .unwrap_or(DEFAULT_MAX_GAP_DAYS);

            Ok(Self {
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
                price_provider_base_url: std::env::var("PRICE_PROVIDER_BASE_URL")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                price_provider_user_agent: std::env::var("PRICE_PROVIDER_USER_AGENT")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                price_fetch_timeout: Duration::from_secs(price_fetch_timeout),
                price_cache_ttl: Duration::from_secs(price_cache_ttl),
                max_gap_days,
                cors_allowed_origin: std::env::var("CORS_ALLOWED_ORIGIN").ok(),
                detector: DetectorConfig::from_env().context("invalid detector thresholds")?,
            })
        }

        /// `None` when caching is disabled (`PRICE_CACHE_TTL_SECS=0`).
        pub fn cache_ttl(&self) -> Option<Duration> {
            (!self.price_cache_ttl.is_zero()).then_some(self.price_cache_ttl)
        }

        pub fn cors_origin(&self) -> &str {
            self.cors_allowed_origin
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(DEFAULT_CORS_ORIGIN)
        }
    }
}
