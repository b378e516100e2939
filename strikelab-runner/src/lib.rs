//! StrikeLab Runner: configuration, data loading, batch runs, export.
//!
//! This crate builds on `strikelab-core` to provide:
//! - TOML configuration with up-front validation and content-hashed run ids
//! - CSV loaders for option, spot and lot-size tables, plus synthetic chains
//! - A per-date batch runner (serial or rayon-parallel) with failure isolation
//! - Trade summary metrics
//! - CSV / JSON / Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, RunId};
pub use data_loader::{
    generate_synthetic_chain, load_lot_sizes, CsvChainStore, SyntheticParams, UniverseFilter,
};
pub use export::{
    export_json, export_trades_csv, generate_report, import_json, load_artifacts, save_artifacts,
};
pub use metrics::TradeSummary;
pub use runner::{
    run_backtest, run_from_config, BacktestResult, DateRange, RunError, SelectionFailure,
    SkippedDate, UntriggeredEntry, SCHEMA_VERSION,
};
