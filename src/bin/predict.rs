//! newsreact CLI - estimate a stock's reaction to one news headline
//!
//! # Usage
//! ```sh
//! cargo run --bin predict -- --headline "BBRI catat laba bersih naik 12%" \
//!     --ticker BBRI --price 4850 --date 2024-03-04
//! ```
//!
//! Configuration comes from environment variables (see `.env`), e.g.
//! `MODEL_DIR`, `MARKET_DATA_MODE`, `EXPLAIN_NUM_SAMPLES`.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::Parser;
use newsreact::application::explain::ExplainerConfig;
use newsreact::application::market_data::PriceVolatilityService;
use newsreact::application::ml::load_all_models;
use newsreact::application::{AnalysisReport, AnalysisSession, ReactionPredictor};
use newsreact::config::Config;
use newsreact::domain::types::PredictionRequest;
use newsreact::infrastructure::ServiceFactory;
use newsreact::infrastructure::observability::Metrics;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, info};
use tracing_subscriber::prelude::*;

#[derive(Parser)]
#[command(author, version, about = "News headline price reaction estimator", long_about = None)]
struct Cli {
    /// News headline text
    #[arg(long)]
    headline: String,

    /// Stock ticker (exchange suffix added automatically)
    #[arg(short, long)]
    ticker: String,

    /// Price before the news
    #[arg(short, long)]
    price: f64,

    /// News date (YYYY-MM-DD), defaults to today
    #[arg(short, long)]
    date: Option<String>,

    /// Skip the word-level explanation
    #[arg(long)]
    no_explain: bool,

    /// Number of words to show in the explanation
    #[arg(long)]
    top_k: Option<usize>,

    /// Override MODEL_DIR
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Print Prometheus metrics after the report
    #[arg(long)]
    metrics: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(Level::WARN.into()))
        .with(stderr_layer)
        .init();

    let cli = Cli::parse();

    let mut config = Config::from_env().context("Failed to load configuration")?;
    if let Some(dir) = &cli.model_dir {
        config.model.model_dir = dir.clone();
    }

    let start_date = match &cli.date {
        Some(d) => NaiveDate::parse_from_str(d, "%Y-%m-%d")
            .with_context(|| format!("Invalid --date '{}', expected YYYY-MM-DD", d))?,
        None => Local::now().date_naive(),
    };
    let request = PredictionRequest::new(&cli.headline, &cli.ticker, cli.price, start_date)?;

    let registry = load_all_models(&config.model.paths()).context("Failed to load models")?;
    info!("Loaded models: {:?}", registry);

    let metrics = Metrics::new()?;
    let market = ServiceFactory::create_market_data_service(&config);
    let timeout = config.market_data.timeout();

    let mut explainer: ExplainerConfig = config.explainer.to_explainer_config();
    if let Some(k) = cli.top_k {
        explainer.num_features = k;
    }

    let predictor = ReactionPredictor::new(Arc::new(registry), market.clone(), explainer, timeout)
        .with_metrics(metrics.clone());
    let prices = PriceVolatilityService::new(market, timeout).with_metrics(metrics.clone());
    let session = AnalysisSession::new(Arc::new(predictor), Arc::new(prices));

    let report = session.analyze(request, !cli.no_explain).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if cli.metrics {
        println!("{}", metrics.render());
    }

    Ok(())
}

fn print_report(report: &AnalysisReport) {
    let request = &report.request;
    println!("{}", "═".repeat(60));
    println!("📰 {}", request.headline);
    println!(
        "{} @ {:.2} on {} (horizon until {})",
        request.ticker,
        request.price_before,
        request.start_date,
        request.end_date()
    );
    println!("{}", "═".repeat(60));

    println!(
        "\n📈 Estimated change: {:+.2}%  [{}]",
        report.estimate.percent(),
        report.estimate.signal()
    );

    if let Some(explanation) = &report.explanation {
        if explanation.contributions.is_empty() {
            println!("\n🔍 No words to explain.");
        } else {
            println!(
                "\n🔍 Word contributions (R² {:.3}, {} samples):",
                explanation.score, explanation.num_samples
            );
            for c in &explanation.contributions {
                println!("  {:<20} {:>+10.5}  {}", c.word, c.weight, c.direction());
            }
        }
    }

    let vol = &report.volatility;
    if vol.available {
        println!(
            "\n🌊 Volatility: {:.3}% ({}) from {} closes",
            vol.percent(),
            vol.level(),
            vol.observations
        );
    } else {
        println!("\n🌊 Volatility: unavailable");
    }

    if !report.recent_history.is_empty() {
        println!("\n🗓  Recent closes:");
        for p in &report.recent_history {
            println!("  {}  {:>12.2}", p.date, p.close);
        }
    }
    println!();
}
