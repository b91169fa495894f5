//! crypto-forecast: fetch daily history for crypto assets, fit the seasonal
//! trend model and print the dashboard views.
//!
//! Usage:
//!   cargo run -p forecast-cli -- --symbol BTC
//!   cargo run -p forecast-cli -- --symbol BTC,ETH,SOL --rows 5
//!   cargo run -p forecast-cli -- --symbol ETH --start 2024-06-01 --json
//!   cargo run -p forecast-cli -- --list

use anyhow::{Context, Result};
use forecast_core::{CryptoAsset, NormalizedDate};
use forecast_pipeline::{ForecastPipeline, ForecastService};
use std::sync::Arc;

mod render;

const DEFAULT_SYMBOL: &str = "BTC";
const DEFAULT_ROWS: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    if args.iter().any(|a| a == "--list") {
        for asset in CryptoAsset::ALL {
            println!("{:<6} {}", asset.symbol(), asset.display_name());
        }
        return Ok(());
    }

    let json_output = args.iter().any(|a| a == "--json");

    let symbols: Vec<String> = arg_value(&args, "--symbol")
        .unwrap_or(DEFAULT_SYMBOL)
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let currency = arg_value(&args, "--currency");
    let start = arg_value(&args, "--start")
        .map(NormalizedDate::parse)
        .transpose()?
        .map(|d| d.as_naive());
    let end = arg_value(&args, "--end")
        .map(NormalizedDate::parse)
        .transpose()?
        .map(|d| d.as_naive());
    let rows = arg_value(&args, "--rows")
        .map(|v| v.parse::<usize>())
        .transpose()
        .context("--rows expects a number")?
        .unwrap_or(DEFAULT_ROWS);

    let pipeline = ForecastPipeline::from_env().context("invalid configuration")?;
    let specs = symbols
        .iter()
        .map(|symbol| pipeline.config().instrument(symbol, currency, start, end))
        .collect::<Result<Vec<_>, _>>()?;

    let service = Arc::new(ForecastService::new(pipeline));

    // Run all requested instruments concurrently; repeated symbols share one run.
    let handles: Vec<_> = specs
        .iter()
        .cloned()
        .map(|spec| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.get_report(&spec).await })
        })
        .collect();

    let mut failures = 0usize;
    for handle in handles {
        match handle.await? {
            Ok(report) => {
                if json_output {
                    println!("{}", serde_json::to_string_pretty(report.as_ref())?);
                } else {
                    print!("{}", render::render(&report, rows)?);
                }
            }
            Err(e) => {
                tracing::error!("{}", e);
                eprintln!("Error: {}", e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} forecasts failed", failures, specs.len());
    }

    Ok(())
}

fn init_tracing() {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(
                "crypto_forecast=info,forecast_pipeline=info,yahoo_client=warn,forecast_engine=warn",
            )
        })
    };

    let json_logging = std::env::var("RUST_LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logging {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  crypto-forecast [--symbol SYM[,SYM...]] [options]");
    eprintln!("  crypto-forecast --list                 Supported assets");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --symbol SYM       Asset symbol(s), comma separated (default: {})", DEFAULT_SYMBOL);
    eprintln!("  --currency CUR     Quote currency (default: QUOTE_CURRENCY or USD)");
    eprintln!("  --start YYYY-MM-DD First history day (default: HISTORY_START or 2024-01-01)");
    eprintln!("  --end YYYY-MM-DD   Last history day (default: today, UTC)");
    eprintln!("  --rows N           Table rows shown per section (default: {})", DEFAULT_ROWS);
    eprintln!("  --json             Print the full report as JSON");
}
