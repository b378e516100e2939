//! Bar: one intraday observation of one option contract.

use super::instrument::InstrumentKey;
use super::price::MAX_PRICE;
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// OHLC bar for a single contract at a single time of day.
///
/// Bars are immutable once loaded. Within one instrument-day the `time` is
/// unique; the loader is responsible for that guarantee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    pub key: InstrumentKey,
    pub time: NaiveTime,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
}

impl Bar {
    /// Basic OHLC sanity check: high >= low, open/close inside the range, prices
    /// within `[0, MAX_PRICE]`.
    pub fn is_sane(&self) -> bool {
        self.high <= MAX_PRICE
            && self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low >= Decimal::ZERO
    }
}
