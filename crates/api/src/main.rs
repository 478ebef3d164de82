use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockrec_core::domain::contract::{RecommendRequest, RecommendResponse, ScreenRequest};
use stockrec_core::domain::recommendation::ScreenReport;
use stockrec_core::engine::RecommendationEngine;
use stockrec_core::error::RecommendError;
use stockrec_core::ingest::provider::HttpChartProvider;

mod error;

use error::ApiError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = stockrec_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let provider = HttpChartProvider::from_settings(&settings)?;
    let engine = RecommendationEngine::from_settings(&settings, Arc::new(provider));
    let state = AppState {
        engine: Arc::new(engine),
    };

    let cors = cors_layer(settings.cors_origin())?;
    let app = router(state).layer(cors).layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(
        %addr,
        fetch_timeout = ?settings.price_fetch_timeout,
        cache_ttl = ?settings.cache_ttl(),
        "api listening"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    engine: Arc<RecommendationEngine>,
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/recommend", post(recommend))
        .route("/screen", post(screen))
        .with_state(state)
}

fn cors_layer(origin: &str) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(origin)
        .map_err(|e| anyhow::anyhow!("invalid CORS_ALLOWED_ORIGIN {origin:?}: {e}"))?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any))
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": "Welcome to the Stock Recommendation API!"}))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn recommend(
    State(state): State<AppState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<RecommendResponse>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        RecommendError::invalid(format!("invalid request body: {}", rejection.body_text()))
    })?;

    let query = req.validate_and_into_query()?;
    let recommendation = state.engine.recommend(&query).await?;
    Ok(Json(RecommendResponse::from(&recommendation)))
}

async fn screen(
    State(state): State<AppState>,
    payload: Result<Json<ScreenRequest>, JsonRejection>,
) -> Result<Json<ScreenReport>, ApiError> {
    let Json(req) = payload.map_err(|rejection| {
        RecommendError::invalid(format!("invalid request body: {}", rejection.body_text()))
    })?;

    let query = req.validate_and_into_query()?;
    Ok(Json(state.engine.screen(&query).await?))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &stockrec_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
