use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use stockrec_core::domain::contract::ErrorBody;
use stockrec_core::error::{ErrorKind, RecommendError};

/// `RecommendError` rendered as the `{error}` envelope the forms display verbatim.
#[derive(Debug)]
pub struct ApiError(pub RecommendError);

impl From<RecommendError> for ApiError {
    fn from(err: RecommendError) -> Self {
        Self(err)
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorKind::NoDataAvailable => StatusCode::NOT_FOUND,
        ErrorKind::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::UpstreamUnavailable | ErrorKind::PricingUnavailable => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.0.kind());

        match &self.0 {
            RecommendError::Internal(cause) => {
                sentry_anyhow::capture_anyhow(cause);
                tracing::error!(error = %format!("{cause:#}"), "recommendation failed with internal error");
            }
            RecommendError::UpstreamUnavailable(cause) => {
                tracing::error!(error = %format!("{cause:#}"), "market data source unavailable");
            }
            other if status.is_server_error() => {
                tracing::warn!(error = %other, %status, "recommendation failed");
            }
            other => {
                tracing::info!(error = %other, %status, "recommendation rejected");
            }
        }

        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn maps_every_kind_to_its_status() {
        assert_eq!(status_for(ErrorKind::InvalidRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::NoDataAvailable), StatusCode::NOT_FOUND);
        assert_eq!(status_for(ErrorKind::UpstreamTimeout), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(status_for(ErrorKind::UpstreamUnavailable), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::PricingUnavailable), StatusCode::BAD_GATEWAY);
        assert_eq!(status_for(ErrorKind::Internal), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn renders_error_envelope() {
        let resp = ApiError(RecommendError::invalid("budget must be a non-negative number (got -10)"))
            .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(
            body,
            serde_json::json!({"error": "budget must be a non-negative number (got -10)"})
        );
    }

    #[tokio::test]
    async fn internal_detail_stays_out_of_the_body() {
        let resp = ApiError(RecommendError::Internal(anyhow::anyhow!("secret stack detail")))
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "internal error");
    }

    #[tokio::test]
    async fn timeout_is_gateway_timeout() {
        let resp = ApiError(RecommendError::UpstreamTimeout(Duration::from_secs(10))).into_response();
        assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
        let body = body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("10s"));
    }
}
