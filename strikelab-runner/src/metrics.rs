//! Trade summary: pure functions over the trade list.
//!
//! Everything is computed from `Trade` rows alone. PNL stays in `Decimal`;
//! only the win rate is a float.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strikelab_core::domain::{ExitType, OptionType, Trade};

/// Aggregate statistics for one backtest run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub trade_count: usize,
    pub targets: usize,
    pub stoplosses: usize,
    pub square_offs: usize,
    pub unresolved: usize,
    pub missing_lot_size: usize,
    /// Legs beyond the first (re-entries).
    pub reentries: usize,
    pub total_pnl: Decimal,
    pub call_pnl: Decimal,
    pub put_pnl: Decimal,
    pub winners: usize,
    pub losers: usize,
    /// Winners over trades with a PNL, 0.0 if none.
    pub win_rate: f64,
    pub largest_win: Option<Decimal>,
    pub largest_loss: Option<Decimal>,
}

impl TradeSummary {
    pub fn compute(trades: &[Trade]) -> Self {
        let mut s = Self {
            trade_count: trades.len(),
            ..Default::default()
        };

        for trade in trades {
            match trade.exit_type() {
                ExitType::Target => s.targets += 1,
                ExitType::Stoploss => s.stoplosses += 1,
                ExitType::SquareOff => s.square_offs += 1,
                ExitType::None => s.unresolved += 1,
            }
            if trade.lot_size.is_none() {
                s.missing_lot_size += 1;
            }
            if trade.entry.leg > 0 {
                s.reentries += 1;
            }
        }

        let priced: Vec<(OptionType, Decimal)> = trades
            .iter()
            .filter_map(|t| t.pnl.map(|p| (t.entry.key.option_type, p)))
            .collect();
        for &(ot, pnl) in &priced {
            s.total_pnl += pnl;
            match ot {
                OptionType::Call => s.call_pnl += pnl,
                OptionType::Put => s.put_pnl += pnl,
            }
        }
        s.winners = trades.iter().filter(|t| t.is_winner()).count();
        s.losers = trades.iter().filter(|t| t.is_loser()).count();
        s.win_rate = win_rate(s.winners, priced.len());
        s.largest_win = priced.iter().map(|&(_, p)| p).filter(|p| *p > Decimal::ZERO).max();
        s.largest_loss = priced.iter().map(|&(_, p)| p).filter(|p| *p < Decimal::ZERO).min();
        s
    }
}

/// Fraction of priced trades that won.
pub fn win_rate(winners: usize, priced: usize) -> f64 {
    if priced == 0 {
        return 0.0;
    }
    (Decimal::from(winners as u64) / Decimal::from(priced as u64))
        .to_f64()
        .unwrap_or(0.0)
}
