//! StrikeLab CLI: run and validate commands.
//!
//! Commands:
//! - `run` executes a backtest from a TOML config file over the CSV tables it
//!   names, or over a seeded synthetic chain with `--synthetic`
//! - `validate` parses and checks a config without loading any data

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use strikelab_core::domain::format_price;
use strikelab_runner::{
    generate_synthetic_chain, load_lot_sizes, run_from_config, save_artifacts, BacktestConfig,
    BacktestResult, CsvChainStore, DateRange, SyntheticParams, UniverseFilter,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "strikelab",
    about = "StrikeLab CLI: intraday short-option exit backtester"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Use a seeded synthetic chain instead of the CSV tables.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for the synthetic chain.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Evaluate dates one at a time instead of on the thread pool.
        #[arg(long, default_value_t = false)]
        serial: bool,

        /// Output directory for the artifact bundle.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Parse and validate a config file without running it.
    Validate {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            synthetic,
            seed,
            serial,
            output_dir,
        } => run_backtest_cmd(config, synthetic, seed, !serial, output_dir),
        Commands::Validate { config } => run_validate(config),
    }
}

fn run_backtest_cmd(
    config_path: PathBuf,
    synthetic: bool,
    seed: u64,
    parallel: bool,
    output_dir: PathBuf,
) -> Result<()> {
    let config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("invalid config {}", config_path.display()))?;

    let result = if synthetic {
        let (start, end) = config.date_range()?;
        let range = DateRange::new(start, end)?;
        let (loader, lots) = generate_synthetic_chain(&range.dates(), &SyntheticParams::default(), seed)
            .context("failed to generate synthetic chain")?;
        let mut result = run_from_config(&config, &loader, &lots, parallel)?;
        result.has_synthetic = true;
        result
    } else {
        let data = &config.data;
        let Some(options_csv) = data.options_csv.as_deref() else {
            bail!("[data] options_csv is required unless --synthetic is given");
        };
        let Some(lot_size_csv) = data.lot_size_csv.as_deref() else {
            bail!("[data] lot_size_csv is required unless --synthetic is given");
        };

        let filter = UniverseFilter {
            week_expiry: config.backtest.week_expiry,
            segment: config.backtest.segment,
        };
        let store = CsvChainStore::open(options_csv, data.spot_csv.as_deref(), filter)
            .with_context(|| format!("failed to load option table {}", options_csv.display()))?;
        let lots = load_lot_sizes(lot_size_csv, &data.lot_size_column)
            .with_context(|| format!("failed to load lot sizes {}", lot_size_csv.display()))?;
        tracing::info!(dataset = %store.dataset_hash(), "dataset fingerprint");

        run_from_config(&config, &store, &lots, parallel)?
    };

    print_summary(&result);

    let run_dir = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());

    Ok(())
}

fn run_validate(config_path: PathBuf) -> Result<()> {
    let config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("invalid config {}", config_path.display()))?;
    let params = config.to_params()?;
    let (start, end) = config.date_range()?;

    println!("Config OK: {}", config_path.display());
    println!("Instrument:     {}", config.backtest.stock_name);
    println!("Period:         {start} to {end}");
    println!(
        "Window:         {} to {}",
        params.entry_time, params.squareoff_time
    );
    println!("Selection:      {}", params.selection.name());
    println!("Entry Rule:     {}", params.entry_rule.name());
    println!("Re-entry:       {}", params.cascade.policy.name());
    println!("Run ID:         {}", config.run_id());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let s = &result.summary;
    println!();
    println!("=== Backtest Result ===");
    if !result.stock_name.is_empty() {
        println!("Instrument:     {}", result.stock_name);
    }
    println!(
        "Period:         {} to {}",
        result.start_date, result.end_date
    );
    println!(
        "Days:           {} processed, {} skipped",
        result.days_processed,
        result.skipped.len()
    );
    println!(
        "Trades:         {} ({} re-entries)",
        s.trade_count, s.reentries
    );
    println!(
        "Exits:          {} TARGET / {} STOPLOSS / {} SQOFF / {} NONE",
        s.targets, s.stoplosses, s.square_offs, s.unresolved
    );
    println!();
    println!("--- PNL ---");
    println!("Total:          {}", format_price(s.total_pnl));
    println!("CE:             {}", format_price(s.call_pnl));
    println!("PE:             {}", format_price(s.put_pnl));
    println!("Win Rate:       {:.1}%", s.win_rate * 100.0);
    if result.has_synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
    if s.missing_lot_size > 0 {
        println!(
            "WARNING: {} trade(s) have no lot size; their PNL is empty",
            s.missing_lot_size
        );
    }
    if result.skipped_rows > 0 {
        println!(
            "WARNING: {} source row(s) dropped while loading",
            result.skipped_rows
        );
    }
    for skip in &result.skipped {
        println!("WARNING: {} skipped: {}", skip.date, skip.reason);
    }
    println!();
}
