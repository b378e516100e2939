//! Trade: an entry joined with its exit, lot size and PNL.

use super::entry::Entry;
use super::exit::{ExitOutcome, ExitType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One reported row: a single leg from entry to exit.
///
/// `pnl` is `Some` only when the exit resolved and the lot size is known.
/// Missing inputs stay `None` all the way to the report; they are never
/// replaced by zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub entry: Entry,
    pub exit: ExitOutcome,
    pub lot_size: Option<u32>,
    pub pnl: Option<Decimal>,
    /// Spot index close at this leg's entry time, if recorded.
    pub spot_price: Option<Decimal>,
}

impl Trade {
    pub fn exit_type(&self) -> ExitType {
        self.exit.exit_type()
    }

    pub fn is_winner(&self) -> bool {
        self.pnl.is_some_and(|p| p > Decimal::ZERO)
    }

    pub fn is_loser(&self) -> bool {
        self.pnl.is_some_and(|p| p < Decimal::ZERO)
    }
}
