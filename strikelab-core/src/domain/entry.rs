//! Entry: one leg's entry definition with its fixed target and stoploss.

use super::instrument::InstrumentKey;
use super::price::round_price;
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Target and stoploss multipliers applied to the entry price.
///
/// The strategy sells premium: the target sits below the entry price and the
/// stoploss above it (e.g. 0.5 / 1.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multipliers {
    pub target: Decimal,
    pub stoploss: Decimal,
}

/// Entry definition for one leg.
///
/// Constructed once by the strategy layer and never mutated: target and
/// stoploss are derived at construction and hold for the life of the leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub key: InstrumentKey,
    pub entry_time: NaiveTime,
    pub entry_price: Decimal,
    pub target: Decimal,
    pub stoploss: Decimal,
    /// 0 for the originating leg, n for the n-th re-entry.
    pub leg: u32,
}

impl Entry {
    pub fn new(
        key: InstrumentKey,
        entry_time: NaiveTime,
        entry_price: Decimal,
        multipliers: Multipliers,
        leg: u32,
    ) -> Self {
        let entry_price = round_price(entry_price);
        Self {
            key,
            entry_time,
            entry_price,
            // Saturating: an absurd multiplier yields an unreachable level, not a panic.
            target: round_price(entry_price.saturating_mul(multipliers.target)),
            stoploss: round_price(entry_price.saturating_mul(multipliers.stoploss)),
            leg,
        }
    }
}
