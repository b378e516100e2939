//! Per-day strategy evaluation.
//!
//! For each configured option type: select a strike at the entry time, apply
//! the entry rule, run the re-entry cascade over the contract's bars, and
//! assemble one trade row per leg.

use crate::cascade::{CascadeConfig, Cascade};
use crate::data::OptionChain;
use crate::domain::{Entry, Multipliers, OptionType, Trade};
use crate::entry_rule::{apply_entry_rule, EntryRule};
use crate::pnl::assemble_trade;
use crate::resolver::{ExitResolver, TieBreak};
use crate::selection::{select_strike, StrikeSelection};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Everything needed to evaluate one trading date. Built once per run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub entry_time: NaiveTime,
    pub squareoff_time: NaiveTime,
    pub multipliers: Multipliers,
    pub selection: StrikeSelection,
    pub entry_rule: EntryRule,
    pub tie_break: TieBreak,
    pub cascade: CascadeConfig,
    pub option_types: Vec<OptionType>,
}

impl StrategyParams {
    pub fn resolver(&self) -> ExitResolver {
        ExitResolver::new(self.squareoff_time, self.tie_break)
    }
}

/// Outcome of one date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DayReport {
    pub date: Option<NaiveDate>,
    pub trades: Vec<Trade>,
    /// Contracts selected but never entered (pullback not reached).
    pub untriggered: Vec<(OptionType, String)>,
    pub selection_failures: Vec<(OptionType, String)>,
}

/// Evaluate one date.
///
/// `spot_at` returns the index close at a time of day. Strike selection reads
/// it at the entry time; each trade row carries the spot at its own leg's
/// entry time.
pub fn evaluate_day<S>(
    params: &StrategyParams,
    date: NaiveDate,
    chain: &OptionChain,
    spot_at: S,
    lot_size: Option<u32>,
) -> DayReport
where
    S: Fn(NaiveTime) -> Option<Decimal>,
{
    let mut report = DayReport {
        date: Some(date),
        ..Default::default()
    };
    let resolver = params.resolver();

    if lot_size.is_none() {
        tracing::warn!(%date, "no lot size for date; PNL will be empty");
    }

    for &option_type in &params.option_types {
        let selection = match select_strike(
            chain,
            date,
            option_type,
            params.entry_time,
            spot_at(params.entry_time),
            params.selection,
        ) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(%date, option_type = %option_type, error = %e, "strike selection failed");
                report.selection_failures.push((option_type, e.to_string()));
                continue;
            }
        };

        let bars = chain.series(&selection.key);
        let Some(fill) = apply_entry_rule(
            params.entry_rule,
            &selection.key,
            bars,
            params.entry_time,
            params.squareoff_time,
            selection.reference_price,
        ) else {
            tracing::debug!(instrument = %selection.key, "entry never triggered");
            report
                .untriggered
                .push((option_type, selection.key.to_string()));
            continue;
        };

        let origin = Entry::new(selection.key, fill.time, fill.price, params.multipliers, 0);
        let cascade = Cascade::new(origin, bars, resolver, params.multipliers, params.cascade);
        for leg in cascade {
            tracing::debug!(
                instrument = %leg.entry.key,
                leg = leg.entry.leg,
                exit = %leg.outcome.exit_type(),
                "leg resolved"
            );
            let spot = spot_at(leg.entry.entry_time);
            report.trades.push(assemble_trade(leg, lot_size, spot));
        }
    }

    report
}
