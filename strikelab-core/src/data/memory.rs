//! In-memory collaborators for tests and synthetic runs.

use super::chain::OptionChain;
use super::provider::{DataError, LotSizeLookup, PriceSeriesLoader};
use crate::domain::Bar;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

/// Loader backed by fixed in-memory tables.
#[derive(Debug, Default)]
pub struct InMemoryLoader {
    chains: BTreeMap<NaiveDate, OptionChain>,
    spot: HashMap<(NaiveDate, NaiveTime), Decimal>,
    failing: BTreeMap<NaiveDate, String>,
}

impl InMemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add all bars of one date.
    pub fn with_bars(mut self, date: NaiveDate, bars: Vec<Bar>) -> Result<Self, DataError> {
        self.chains.insert(date, OptionChain::from_bars(date, bars)?);
        Ok(self)
    }

    pub fn with_spot(mut self, date: NaiveDate, time: NaiveTime, price: Decimal) -> Self {
        self.spot.insert((date, time), price);
        self
    }

    /// Make `load_chain` fail for `date` (for exercising per-date isolation).
    pub fn with_failure(mut self, date: NaiveDate, reason: impl Into<String>) -> Self {
        self.failing.insert(date, reason.into());
        self
    }
}

impl PriceSeriesLoader for InMemoryLoader {
    fn name(&self) -> &str {
        "in-memory"
    }

    fn load_chain(&self, date: NaiveDate) -> Result<OptionChain, DataError> {
        if let Some(reason) = self.failing.get(&date) {
            return Err(DataError::Other(reason.clone()));
        }
        Ok(self
            .chains
            .get(&date)
            .cloned()
            .unwrap_or_else(|| OptionChain::empty()))
    }

    fn load_spot(&self, date: NaiveDate, time: NaiveTime) -> Result<Option<Decimal>, DataError> {
        Ok(self.spot.get(&(date, time)).copied())
    }
}

/// Lot size per date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LotSizeTable {
    sizes: BTreeMap<NaiveDate, u32>,
}

impl LotSizeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, lot_size: u32) {
        self.sizes.insert(date, lot_size);
    }

    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }
}

impl FromIterator<(NaiveDate, u32)> for LotSizeTable {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, u32)>>(iter: I) -> Self {
        Self {
            sizes: iter.into_iter().collect(),
        }
    }
}

impl LotSizeLookup for LotSizeTable {
    fn lot_size(&self, date: NaiveDate) -> Option<u32> {
        self.sizes.get(&date).copied()
    }
}
