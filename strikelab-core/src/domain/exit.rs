//! Exit outcome of one leg.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a leg was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitType {
    Target,
    Stoploss,
    #[serde(rename = "SQOFF")]
    SquareOff,
    /// No trigger in the window and no bar at the square-off time.
    None,
}

impl ExitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitType::Target => "TARGET",
            ExitType::Stoploss => "STOPLOSS",
            ExitType::SquareOff => "SQOFF",
            ExitType::None => "NONE",
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, ExitType::None)
    }
}

impl fmt::Display for ExitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolved exit of one leg.
///
/// `exit_price` and `exit_time` are `None` exactly when `exit_type` is
/// [`ExitType::None`]. The constructors are the only way to build one, so the
/// invariant holds by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitOutcome {
    exit_type: ExitType,
    exit_price: Option<Decimal>,
    exit_time: Option<NaiveTime>,
}

impl ExitOutcome {
    pub fn target(price: Decimal, time: NaiveTime) -> Self {
        Self::resolved(ExitType::Target, price, time)
    }

    pub fn stoploss(price: Decimal, time: NaiveTime) -> Self {
        Self::resolved(ExitType::Stoploss, price, time)
    }

    pub fn square_off(price: Decimal, time: NaiveTime) -> Self {
        Self::resolved(ExitType::SquareOff, price, time)
    }

    pub fn unresolved() -> Self {
        Self {
            exit_type: ExitType::None,
            exit_price: None,
            exit_time: None,
        }
    }

    fn resolved(exit_type: ExitType, price: Decimal, time: NaiveTime) -> Self {
        Self {
            exit_type,
            exit_price: Some(price),
            exit_time: Some(time),
        }
    }

    pub fn exit_type(&self) -> ExitType {
        self.exit_type
    }

    pub fn exit_price(&self) -> Option<Decimal> {
        self.exit_price
    }

    pub fn exit_time(&self) -> Option<NaiveTime> {
        self.exit_time
    }

    pub fn is_resolved(&self) -> bool {
        self.exit_type.is_resolved()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn exit_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&ExitType::SquareOff).unwrap(),
            "\"SQOFF\""
        );
        assert_eq!(
            serde_json::to_string(&ExitType::Stoploss).unwrap(),
            "\"STOPLOSS\""
        );
        assert_eq!(serde_json::to_string(&ExitType::None).unwrap(), "\"NONE\"");
        assert_eq!(ExitType::Target.to_string(), "TARGET");
    }

    #[test]
    fn unresolved_has_no_price_or_time() {
        let outcome = ExitOutcome::unresolved();
        assert_eq!(outcome.exit_type(), ExitType::None);
        assert!(outcome.exit_price().is_none());
        assert!(outcome.exit_time().is_none());
        assert!(!outcome.is_resolved());
    }

    #[test]
    fn resolved_carries_price_and_time() {
        let t = NaiveTime::from_hms_opt(10, 5, 59).unwrap();
        let outcome = ExitOutcome::stoploss(dec!(301.5), t);
        assert_eq!(outcome.exit_type(), ExitType::Stoploss);
        assert_eq!(outcome.exit_price(), Some(dec!(301.5)));
        assert_eq!(outcome.exit_time(), Some(t));
    }
}
