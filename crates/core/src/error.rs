use std::time::Duration;

/// Failure contract of a single recommendation request.
///
/// `Display` is the message shown to end users, so it must never carry internal
/// detail. Causes are kept in `source()` for logging.
#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    NoDataAvailable(String),

    #[error("market data source did not respond within {}s, please retry later", .0.as_secs())]
    UpstreamTimeout(Duration),

    #[error("market data source is unavailable, please retry later")]
    UpstreamUnavailable(#[source] anyhow::Error),

    #[error("{0}")]
    PricingUnavailable(String),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NoDataAvailable,
    UpstreamTimeout,
    UpstreamUnavailable,
    PricingUnavailable,
    Internal,
}

impl RecommendError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn no_data(msg: impl Into<String>) -> Self {
        Self::NoDataAvailable(msg.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::NoDataAvailable(_) => ErrorKind::NoDataAvailable,
            Self::UpstreamTimeout(_) => ErrorKind::UpstreamTimeout,
            Self::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            Self::PricingUnavailable(_) => ErrorKind::PricingUnavailable,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Whether a caller may retry the same request later with some chance of success.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UpstreamTimeout | ErrorKind::UpstreamUnavailable
        )
    }
}

impl From<anyhow::Error> for RecommendError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}
