//! Instrument identity: option type and the (date, type, strike) key.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptionType {
    #[serde(rename = "CE")]
    Call,
    #[serde(rename = "PE")]
    Put,
}

impl OptionType {
    pub const ALL: [OptionType; 2] = [OptionType::Call, OptionType::Put];

    /// Exchange code as it appears in option-chain data (`CE` / `PE`).
    pub fn code(&self) -> &'static str {
        match self {
            OptionType::Call => "CE",
            OptionType::Put => "PE",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InstrumentError {
    #[error("unknown option type '{0}' (expected CE or PE)")]
    UnknownOptionType(String),
}

impl FromStr for OptionType {
    type Err = InstrumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CE" => Ok(OptionType::Call),
            "PE" => Ok(OptionType::Put),
            other => Err(InstrumentError::UnknownOptionType(other.to_string())),
        }
    }
}

/// One option contract on one trading day.
///
/// Ordering is (date, option type, strike) so keys can be used directly in
/// ordered maps and produce deterministic report ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InstrumentKey {
    pub date: NaiveDate,
    pub option_type: OptionType,
    pub strike: Decimal,
}

impl InstrumentKey {
    pub fn new(date: NaiveDate, option_type: OptionType, strike: Decimal) -> Self {
        Self {
            date,
            option_type,
            strike,
        }
    }
}

impl fmt::Display for InstrumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.date, self.strike.normalize(), self.option_type)
    }
}
