//! Reporting and export: JSON, CSV, and Markdown artifact generation.
//!
//! Provides three export formats for backtest results:
//! - **JSON**: full round-trip serialization with schema versioning
//! - **CSV**: the trade table, one row per leg
//! - **Markdown**: a human-readable run report
//!
//! All persisted artifacts include a `schema_version` field. Unknown versions
//! are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rust_decimal::Decimal;
use strikelab_core::domain::{format_price, Trade};

use crate::runner::{BacktestResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Column order of the trade table.
pub const TRADE_COLUMNS: [&str; 14] = [
    "date",
    "option_type",
    "strike",
    "leg",
    "entry_time",
    "entry_price",
    "target",
    "stoploss",
    "exit_type",
    "exit_price",
    "exit_time",
    "lot_size",
    "pnl",
    "spot_price",
];

/// Export trades as CSV. Missing values are empty cells; prices carry three
/// decimal places.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(TRADE_COLUMNS)?;

    for t in trades {
        let e = &t.entry;
        wtr.write_record([
            e.key.date.format("%Y-%m-%d").to_string(),
            e.key.option_type.code().to_string(),
            e.key.strike.normalize().to_string(),
            e.leg.to_string(),
            e.entry_time.format("%H:%M:%S").to_string(),
            format_price(e.entry_price),
            format_price(e.target),
            format_price(e.stoploss),
            t.exit_type().as_str().to_string(),
            opt_price(t.exit.exit_price()),
            t.exit
                .exit_time()
                .map(|time| time.format("%H:%M:%S").to_string())
                .unwrap_or_default(),
            t.lot_size.map(|l| l.to_string()).unwrap_or_default(),
            opt_price(t.pnl),
            opt_price(t.spot_price),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

fn opt_price(value: Option<Decimal>) -> String {
    value.map(format_price).unwrap_or_default()
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a backtest run.
///
/// Creates a directory named `{run_id[..12]}_{timestamp}/` under `output_dir`
/// containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `trades.csv`: the trade table
/// - `report.md`: the Markdown report
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let prefix: String = result.run_id.chars().take(12).collect();
    let dirname = format!("{}_{}", prefix, chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let run_dir = output_dir.join(dirname);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    std::fs::write(run_dir.join("manifest.json"), &json)
        .with_context(|| format!("failed to write manifest in {}", run_dir.display()))?;

    let trades_csv = export_trades_csv(&result.trades)?;
    std::fs::write(run_dir.join("trades.csv"), &trades_csv)
        .with_context(|| format!("failed to write trades.csv in {}", run_dir.display()))?;

    std::fs::write(run_dir.join("report.md"), generate_report(result))
        .with_context(|| format!("failed to write report.md in {}", run_dir.display()))?;

    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}

// ─── Markdown report ────────────────────────────────────────────────

/// Generate a Markdown report for a backtest run.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::with_capacity(2048);
    let p = &result.params;

    md.push_str("# Backtest Report\n\n");

    md.push_str("## Metadata\n\n");
    md.push_str("| Field | Value |\n");
    md.push_str("| --- | --- |\n");
    if !result.stock_name.is_empty() {
        md.push_str(&format!("| Instrument | {} |\n", result.stock_name));
    }
    md.push_str(&format!(
        "| Period | {} to {} |\n",
        result.start_date, result.end_date
    ));
    md.push_str(&format!("| Run ID | {} |\n", result.run_id));
    md.push_str(&format!("| Data | {} |\n", result.loader));
    if result.has_synthetic {
        md.push_str("| Data Quality | **SYNTHETIC** |\n");
    }
    md.push_str(&format!("| Days Processed | {} |\n", result.days_processed));
    md.push_str(&format!("| Days Skipped | {} |\n", result.skipped.len()));
    md.push('\n');

    md.push_str("## Strategy\n\n");
    md.push_str("| Setting | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!(
        "| Window | {} to {} |\n",
        p.entry_time, p.squareoff_time
    ));
    md.push_str(&format!(
        "| Multipliers | target {} / stoploss {} |\n",
        p.multipliers.target, p.multipliers.stoploss
    ));
    md.push_str(&format!("| Selection | {} |\n", p.selection.name()));
    md.push_str(&format!("| Entry Rule | {} |\n", p.entry_rule.name()));
    md.push_str(&format!("| Tie Break | {} |\n", p.tie_break.name()));
    md.push_str(&format!(
        "| Re-entry | {}{} |\n",
        p.cascade.policy.name(),
        p.cascade
            .max_legs
            .map(|n| format!(" (max {n} legs)"))
            .unwrap_or_default()
    ));
    md.push('\n');

    let s = &result.summary;
    md.push_str("## Summary\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("| --- | --- |\n");
    md.push_str(&format!("| Trades | {} |\n", s.trade_count));
    md.push_str(&format!("| Re-entries | {} |\n", s.reentries));
    md.push_str(&format!("| TARGET | {} |\n", s.targets));
    md.push_str(&format!("| STOPLOSS | {} |\n", s.stoplosses));
    md.push_str(&format!("| SQOFF | {} |\n", s.square_offs));
    md.push_str(&format!("| NONE | {} |\n", s.unresolved));
    md.push_str(&format!("| Total PNL | {} |\n", format_price(s.total_pnl)));
    md.push_str(&format!("| CE PNL | {} |\n", format_price(s.call_pnl)));
    md.push_str(&format!("| PE PNL | {} |\n", format_price(s.put_pnl)));
    md.push_str(&format!("| Win Rate | {:.1}% |\n", s.win_rate * 100.0));
    if let Some(w) = s.largest_win {
        md.push_str(&format!("| Largest Win | {} |\n", format_price(w)));
    }
    if let Some(l) = s.largest_loss {
        md.push_str(&format!("| Largest Loss | {} |\n", format_price(l)));
    }
    md.push('\n');

    if s.missing_lot_size > 0
        || result.skipped_rows > 0
        || !result.skipped.is_empty()
        || !result.selection_failures.is_empty()
        || !result.untriggered.is_empty()
    {
        md.push_str("## Data Quality\n\n");
        if s.missing_lot_size > 0 {
            md.push_str(&format!(
                "- {} trade(s) without a lot size (PNL left empty)\n",
                s.missing_lot_size
            ));
        }
        if result.skipped_rows > 0 {
            md.push_str(&format!(
                "- {} source row(s) dropped while loading\n",
                result.skipped_rows
            ));
        }
        for skip in &result.skipped {
            md.push_str(&format!("- {} skipped: {}\n", skip.date, skip.reason));
        }
        for f in &result.selection_failures {
            md.push_str(&format!(
                "- {} {}: no strike selected ({})\n",
                f.date, f.option_type, f.reason
            ));
        }
        for u in &result.untriggered {
            md.push_str(&format!(
                "- {} {}: entry never triggered on {}\n",
                u.date, u.option_type, u.instrument
            ));
        }
        md.push('\n');
    }

    md
}
