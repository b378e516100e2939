//! Trigger checking: does a bar close the leg?
//!
//! The position is short premium: the target is hit when the bar trades down
//! to it (`low <= target`), the stoploss when the bar trades up to it
//! (`high >= stoploss`). Fills are at the level itself, never at the bar's
//! own prices.

use super::tie_break::TieBreak;
use crate::domain::{Bar, Entry, ExitType};

/// Check whether `bar` triggers an exit for `entry`.
///
/// Does NOT check the time window or the instrument key; the caller filters.
pub fn check_bar(entry: &Entry, bar: &Bar, tie_break: TieBreak) -> Option<ExitType> {
    let target_hit = bar.low <= entry.target;
    let stoploss_hit = bar.high >= entry.stoploss;
    tie_break.pick(target_hit, stoploss_hit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstrumentKey, Multipliers, OptionType};
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn key() -> InstrumentKey {
        InstrumentKey::new(
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            OptionType::Call,
            dec!(27000),
        )
    }

    fn entry() -> Entry {
        // target 100, stoploss 300
        Entry::new(
            key(),
            NaiveTime::from_hms_opt(9, 20, 59).unwrap(),
            dec!(200),
            Multipliers {
                target: dec!(0.5),
                stoploss: dec!(1.5),
            },
            0,
        )
    }

    fn bar(low: Decimal, high: Decimal) -> Bar {
        Bar {
            key: key(),
            time: NaiveTime::from_hms_opt(10, 0, 59).unwrap(),
            open: low,
            high,
            low,
            close: high,
        }
    }

    #[test]
    fn inside_range_no_trigger() {
        assert_eq!(check_bar(&entry(), &bar(dec!(150), dec!(250)), TieBreak::TargetFirst), None);
    }

    #[test]
    fn touching_target_exactly_triggers() {
        assert_eq!(
            check_bar(&entry(), &bar(dec!(100), dec!(120)), TieBreak::TargetFirst),
            Some(ExitType::Target)
        );
    }

    #[test]
    fn touching_stoploss_exactly_triggers() {
        assert_eq!(
            check_bar(&entry(), &bar(dec!(250), dec!(300)), TieBreak::TargetFirst),
            Some(ExitType::Stoploss)
        );
    }

    #[test]
    fn both_levels_follow_policy() {
        let wide = bar(dec!(90), dec!(310));
        assert_eq!(check_bar(&entry(), &wide, TieBreak::TargetFirst), Some(ExitType::Target));
        assert_eq!(
            check_bar(&entry(), &wide, TieBreak::StoplossFirst),
            Some(ExitType::Stoploss)
        );
    }
}
