//! oil-market-signal CLI

use anyhow::Context;
use clap::{Parser, Subcommand};
use oil_market_signal::bootstrap::{build_engine, load_app_config};
use oil_market_signal::core::types::SourceKind;
use oil_market_signal::decision::config::{ConfigStore, SignalConfig};
use oil_market_signal::decision::snapshot::SignalView;
use regex::Regex;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "oil-market-signal")]
#[command(about = "Blend heating-oil price sources into a market snapshot")]
struct Cli {
    /// Process config file (defaults to config/base.toml)
    #[arg(short, long, global = true, env = "OIL_SIGNAL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the market snapshot for a ZIP code
    Snapshot {
        #[arg(value_parser = parse_postal_code)]
        postal_code: String,

        /// Tank fill level as a fraction between 0 and 1
        #[arg(long, value_parser = parse_tank_fraction)]
        tank: Option<f64>,
    },
    /// Compute a single source's signal
    Signal {
        /// scraped, aggregator, community or market
        source: SourceKind,

        #[arg(value_parser = parse_postal_code)]
        postal_code: Option<String>,
    },
    /// Print the effective weighting config
    Config {
        /// Fail if the config file is missing or invalid instead of falling back
        #[arg(long)]
        validate: bool,
    },
}

fn parse_postal_code(s: &str) -> Result<String, String> {
    let zip = Regex::new(r"^\d{5}$").map_err(|e| e.to_string())?;
    if zip.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(format!("`{s}` is not a 5-digit ZIP code"))
    }
}

fn parse_tank_fraction(s: &str) -> Result<f64, String> {
    let v: f64 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=1.0).contains(&v) {
        Ok(v)
    } else {
        Err(format!("tank fraction must be within 0 and 1, got {v}"))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("oil_market_signal=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let app = load_app_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Snapshot { postal_code, tank } => {
            let engine = build_engine(&app)?;
            let snapshot = engine.compute_market_snapshot(&postal_code, tank).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }
        Commands::Signal { source, postal_code } => {
            if source != SourceKind::Market && postal_code.is_none() {
                anyhow::bail!("a ZIP code is required for the {source} source");
            }
            let engine = build_engine(&app)?;
            let signal = engine.compute_signal(source, postal_code.as_deref().unwrap_or_default()).await;
            println!("{}", serde_json::to_string_pretty(&SignalView::from(&signal))?);
        }
        Commands::Config { validate } => {
            let path = app.signals_path();
            let cfg = if validate {
                let cfg = SignalConfig::from_file(&path).with_context(|| format!("validating {path}"))?;
                info!(%path, "signal config is valid");
                cfg
            } else {
                ConfigStore::load(&path).current().as_ref().clone()
            };
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postal_codes_must_be_five_digits() {
        assert!(parse_postal_code("06101").is_ok());
        assert!(parse_postal_code("6101").is_err());
        assert!(parse_postal_code("06101-1234").is_err());
        assert!(parse_postal_code("abcde").is_err());
    }

    #[test]
    fn tank_fraction_is_bounded() {
        assert_eq!(parse_tank_fraction("0.2"), Ok(0.2));
        assert!(parse_tank_fraction("1.5").is_err());
        assert!(parse_tank_fraction("half").is_err());
    }
}
