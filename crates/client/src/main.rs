use anyhow::Context;
use base64::Engine as _;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stockrec_core::domain::contract::{ErrorBody, RecommendRequest, RecommendResponse};

mod report;

#[derive(Debug, Parser)]
#[command(name = "stockrec_client", about = "Ask the recommendation API about one ticker")]
struct Args {
    /// Ticker symbol, e.g. TSLA.
    #[arg(long)]
    ticker: String,

    /// First day of the analysed range (YYYY-MM-DD).
    #[arg(long)]
    start_date: String,

    /// Last day of the analysed range (YYYY-MM-DD).
    #[arg(long)]
    end_date: String,

    /// low, medium or high.
    #[arg(long, default_value = "medium")]
    risk_level: String,

    /// Amount available to invest. Omit for an analysis without sizing.
    #[arg(long)]
    budget: Option<f64>,

    #[arg(long, env = "STOCKREC_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    /// Write the decoded price chart PNG here.
    #[arg(long)]
    chart_out: Option<PathBuf>,

    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let request = RecommendRequest {
        ticker: args.ticker.clone(),
        start_date: args.start_date.clone(),
        end_date: args.end_date.clone(),
        risk_level: args.risk_level.clone(),
        budget: args.budget,
    };

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
        .context("failed to build http client")?;

    let url = format!("{}/recommend", args.api_url.trim_end_matches('/'));
    tracing::debug!(%url, ticker = %request.ticker, "requesting recommendation");

    let res = http
        .post(&url)
        .json(&request)
        .send()
        .await
        .with_context(|| format!("request to {url} failed"))?;

    let status = res.status();
    let text = res.text().await.context("failed to read API response")?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| b.error)
            .unwrap_or_else(|_| format!("HTTP {status}"));
        eprintln!("Error: {message}");
        std::process::exit(1);
    }

    let rec = serde_json::from_str::<RecommendResponse>(&text)
        .context("API response does not match the recommendation contract")?;

    println!("{}", report::render(&rec));

    if let Some(path) = args.chart_out {
        let png = base64::engine::general_purpose::STANDARD
            .decode(rec.stock_graph.as_bytes())
            .context("stock_graph is not valid base64")?;
        std::fs::write(&path, png)
            .with_context(|| format!("failed to write chart to {}", path.display()))?;
        println!("Chart written to {}", path.display());
    }

    Ok(())
}
