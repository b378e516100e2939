//! Backtest runner: evaluates every date in a range and collects the rows.
//!
//! Two entry points:
//! - `run_backtest()`: strategy params + collaborators. Used by tests and the
//!   synthetic path.
//! - `run_from_config()`: a validated `BacktestConfig` + collaborators. Used by
//!   the CLI; tags the result with the config's run id.
//!
//! Each date is independent. A date whose data fails to load is recorded as
//! skipped and the run continues; a date with no bars at all is a holiday and
//! is not reported.

use chrono::{NaiveDate, NaiveTime};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use strikelab_core::data::{DataError, LotSizeLookup, PriceSeriesLoader};
use strikelab_core::domain::{OptionType, Trade};
use strikelab_core::strategy::{evaluate_day, DayReport, StrategyParams};

use crate::config::{BacktestConfig, ConfigError, RunId};
use crate::metrics::TradeSummary;

/// Errors from the runner. Per-date data errors never surface here.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] DataError),
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RunError> {
        if start > end {
            return Err(RunError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start.iter_days().take_while(|d| *d <= self.end).collect()
    }
}

/// A date that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedDate {
    pub date: NaiveDate,
    pub reason: String,
}

/// A selected contract whose entry rule never fired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UntriggeredEntry {
    pub date: NaiveDate,
    pub option_type: OptionType,
    pub instrument: String,
}

/// A date/option type where no strike could be selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionFailure {
    pub date: NaiveDate,
    pub option_type: OptionType,
    pub reason: String,
}

/// Complete result of a backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub run_id: RunId,
    #[serde(default)]
    pub stock_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub params: StrategyParams,
    pub loader: String,
    #[serde(default)]
    pub has_synthetic: bool,
    pub trades: Vec<Trade>,
    /// Dates that had a session and were evaluated.
    pub days_processed: usize,
    pub skipped: Vec<SkippedDate>,
    /// Source rows the loader dropped before any date was evaluated.
    #[serde(default)]
    pub skipped_rows: usize,
    pub untriggered: Vec<UntriggeredEntry>,
    pub selection_failures: Vec<SelectionFailure>,
    pub summary: TradeSummary,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Outcome of one date.
enum DayOutcome {
    Evaluated(DayReport),
    NoSession,
    Skipped(SkippedDate),
}

/// Run the strategy over every date in `range`.
///
/// With `parallel` the dates are evaluated on the rayon pool; results are
/// always concatenated in date order, so serial and parallel runs produce
/// identical output.
pub fn run_backtest(
    params: &StrategyParams,
    range: DateRange,
    loader: &dyn PriceSeriesLoader,
    lots: &dyn LotSizeLookup,
    parallel: bool,
) -> BacktestResult {
    let dates = range.dates();
    tracing::info!(
        loader = loader.name(),
        start = %range.start,
        end = %range.end,
        dates = dates.len(),
        parallel,
        "starting backtest"
    );

    let outcomes: Vec<DayOutcome> = if parallel {
        dates
            .par_iter()
            .map(|&date| evaluate_date(params, date, loader, lots))
            .collect()
    } else {
        dates
            .iter()
            .map(|&date| evaluate_date(params, date, loader, lots))
            .collect()
    };

    let mut result = BacktestResult {
        schema_version: SCHEMA_VERSION,
        run_id: params_run_id(params, range),
        stock_name: String::new(),
        start_date: range.start,
        end_date: range.end,
        params: params.clone(),
        loader: loader.name().to_string(),
        has_synthetic: false,
        trades: Vec::new(),
        days_processed: 0,
        skipped: Vec::new(),
        skipped_rows: loader.skipped_rows(),
        untriggered: Vec::new(),
        selection_failures: Vec::new(),
        summary: TradeSummary::default(),
    };

    for outcome in outcomes {
        match outcome {
            DayOutcome::NoSession => {}
            DayOutcome::Skipped(s) => result.skipped.push(s),
            DayOutcome::Evaluated(report) => {
                result.days_processed += 1;
                let date = report.date.unwrap_or(range.start);
                result.trades.extend(report.trades);
                result
                    .untriggered
                    .extend(report.untriggered.into_iter().map(|(option_type, instrument)| {
                        UntriggeredEntry {
                            date,
                            option_type,
                            instrument,
                        }
                    }));
                result.selection_failures.extend(report.selection_failures.into_iter().map(
                    |(option_type, reason)| SelectionFailure {
                        date,
                        option_type,
                        reason,
                    },
                ));
            }
        }
    }

    result.summary = TradeSummary::compute(&result.trades);
    tracing::info!(
        days = result.days_processed,
        trades = result.trades.len(),
        skipped = result.skipped.len(),
        total_pnl = %result.summary.total_pnl,
        "backtest finished"
    );
    result
}

/// Run a validated config. The result carries the config's run id.
pub fn run_from_config(
    config: &BacktestConfig,
    loader: &dyn PriceSeriesLoader,
    lots: &dyn LotSizeLookup,
    parallel: bool,
) -> Result<BacktestResult, RunError> {
    let params = config.to_params()?;
    let (start, end) = config.date_range()?;
    let range = DateRange::new(start, end)?;

    let mut result = run_backtest(&params, range, loader, lots, parallel);
    result.run_id = config.run_id();
    result.stock_name = config.backtest.stock_name.clone();
    Ok(result)
}

fn evaluate_date(
    params: &StrategyParams,
    date: NaiveDate,
    loader: &dyn PriceSeriesLoader,
    lots: &dyn LotSizeLookup,
) -> DayOutcome {
    // A spot table that is broken for this date fails at the entry time too.
    let loaded = loader.load_chain(date).and_then(|chain| {
        loader.load_spot(date, params.entry_time)?;
        Ok(chain)
    });
    let chain = match loaded {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%date, error = %e, "skipping date");
            return DayOutcome::Skipped(SkippedDate {
                date,
                reason: e.to_string(),
            });
        }
    };
    if chain.is_empty() {
        return DayOutcome::NoSession;
    }
    let spot_at = |time: NaiveTime| loader.load_spot(date, time).ok().flatten();
    DayOutcome::Evaluated(evaluate_day(params, date, &chain, spot_at, lots.lot_size(date)))
}

/// Content hash of the strategy params and date range.
fn params_run_id(params: &StrategyParams, range: DateRange) -> RunId {
    let json = serde_json::to_vec(&(params, range)).unwrap_or_default();
    blake3::hash(&json).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use rust_decimal_macros::dec;
    use strikelab_core::cascade::CascadeConfig;
    use strikelab_core::data::{InMemoryLoader, LotSizeTable};
    use strikelab_core::domain::{Bar, InstrumentKey, Multipliers};
    use strikelab_core::entry_rule::EntryRule;
    use strikelab_core::resolver::TieBreak;
    use strikelab_core::selection::StrikeSelection;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, day).unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 59).unwrap()
    }

    fn params() -> StrategyParams {
        StrategyParams {
            entry_time: t(9, 20),
            squareoff_time: t(15, 14),
            multipliers: Multipliers {
                target: dec!(0.5),
                stoploss: dec!(1.5),
            },
            selection: StrikeSelection::Fixed { strike: dec!(27000) },
            entry_rule: EntryRule::AtEntryTime,
            tie_break: TieBreak::TargetFirst,
            cascade: CascadeConfig::default(),
            option_types: vec![OptionType::Call],
        }
    }

    fn day_bars(date: NaiveDate) -> Vec<Bar> {
        let key = InstrumentKey::new(date, OptionType::Call, dec!(27000));
        vec![
            Bar {
                key,
                time: t(9, 20),
                open: dec!(200),
                high: dec!(200),
                low: dec!(200),
                close: dec!(200),
            },
            Bar {
                key,
                time: t(15, 14),
                open: dec!(180),
                high: dec!(180),
                low: dec!(180),
                close: dec!(180),
            },
        ]
    }

    #[test]
    fn date_range_is_inclusive() {
        let r = DateRange::new(d(1), d(3)).unwrap();
        assert_eq!(r.dates(), vec![d(1), d(2), d(3)]);
        assert!(DateRange::new(d(3), d(1)).is_err());
    }

    #[test]
    fn holidays_are_silent_and_failures_are_skipped() {
        let loader = InMemoryLoader::new()
            .with_bars(d(1), day_bars(d(1)))
            .unwrap()
            .with_failure(d(2), "corrupt export")
            .with_bars(d(4), day_bars(d(4)))
            .unwrap();
        let lots: LotSizeTable = [(d(1), 20)].into_iter().collect();
        let result = run_backtest(&params(), DateRange::new(d(1), d(4)).unwrap(), &loader, &lots, false);

        assert_eq!(result.days_processed, 2);
        assert_eq!(result.trades.len(), 2);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].date, d(2));
        assert_eq!(result.trades[0].pnl, Some(dec!(400)));
        // d(4) has no lot size
        assert_eq!(result.trades[1].pnl, None);
        assert_eq!(result.summary.missing_lot_size, 1);
    }

    #[test]
    fn run_id_is_deterministic() {
        let r = DateRange::new(d(1), d(2)).unwrap();
        assert_eq!(params_run_id(&params(), r), params_run_id(&params(), r));
        let mut p = params();
        p.tie_break = TieBreak::StoplossFirst;
        assert_ne!(params_run_id(&params(), r), params_run_id(&p, r));
    }
}
