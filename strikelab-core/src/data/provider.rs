//! Collaborator traits and structured error types.
//!
//! `PriceSeriesLoader` abstracts over where option-chain and spot data come
//! from (CSV files, a database export, synthetic generation) so the strategy
//! layer can be tested against fixed in-memory tables.

use super::chain::OptionChain;
use crate::domain::{Bar, InstrumentKey};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use thiserror::Error;

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error at line {line}: {reason}")]
    Parse { line: u64, reason: String },

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("duplicate bar for {key} at {time}")]
    DuplicateBar { key: String, time: NaiveTime },

    #[error("bar for {found} does not belong to chain date {expected}")]
    WrongDate { expected: NaiveDate, found: NaiveDate },

    #[error("data error: {0}")]
    Other(String),
}

/// Source of intraday option and spot prices.
///
/// Implementations must return each instrument's bars sorted by time with at
/// most one bar per time.
pub trait PriceSeriesLoader: Send + Sync {
    /// Human-readable name of this loader.
    fn name(&self) -> &str;

    /// All option bars for one trading date. An empty chain means no session.
    fn load_chain(&self, date: NaiveDate) -> Result<OptionChain, DataError>;

    /// Time-ordered bars for one instrument-day.
    fn load_bars(&self, key: &InstrumentKey) -> Result<Vec<Bar>, DataError> {
        let chain = self.load_chain(key.date)?;
        Ok(chain.series(key).to_vec())
    }

    /// Spot index close at `time` on `date`, if recorded.
    fn load_spot(&self, date: NaiveDate, time: NaiveTime) -> Result<Option<Decimal>, DataError>;

    /// Source rows dropped at load time because no date could be read from them.
    fn skipped_rows(&self) -> usize {
        0
    }
}

/// Contract multiplier per trading date.
pub trait LotSizeLookup: Send + Sync {
    fn lot_size(&self, date: NaiveDate) -> Option<u32>;
}
