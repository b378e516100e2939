//! Trade Resolver: decide how one leg exits.
//!
//! Given an entry and the time-ordered bars of its instrument-day:
//! 1. Scan bars with `entry_time < time <= squareoff_time` in order.
//! 2. The first bar that touches the target or the stoploss closes the leg at
//!    that level; same-bar ties go through the [`TieBreak`] policy.
//! 3. Otherwise the bar stamped exactly at `squareoff_time` closes it at its close.
//! 4. Otherwise the leg is unresolved (`NONE`).

pub mod tie_break;
pub mod trigger;

pub use tie_break::TieBreak;
pub use trigger::check_bar;

use crate::domain::{round_price, Bar, Entry, ExitOutcome, ExitType};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Resolves exits for a fixed square-off time and tie-break policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitResolver {
    pub squareoff_time: NaiveTime,
    pub tie_break: TieBreak,
}

impl ExitResolver {
    pub fn new(squareoff_time: NaiveTime, tie_break: TieBreak) -> Self {
        Self {
            squareoff_time,
            tie_break,
        }
    }

    /// Resolve the exit of `entry` against `bars`.
    ///
    /// `bars` must be sorted ascending by time and hold at most one bar per
    /// time for the entry's instrument. Bars belonging to other instruments
    /// are skipped. The function is pure: the same inputs always give the
    /// same outcome.
    pub fn resolve(&self, entry: &Entry, bars: &[Bar]) -> ExitOutcome {
        let window = bars.iter().filter(|b| {
            b.key == entry.key && b.time > entry.entry_time && b.time <= self.squareoff_time
        });

        for bar in window {
            if let Some(exit_type) = check_bar(entry, bar, self.tie_break) {
                let outcome = match exit_type {
                    ExitType::Target => ExitOutcome::target(entry.target, bar.time),
                    ExitType::Stoploss => ExitOutcome::stoploss(entry.stoploss, bar.time),
                    // check_bar only reports the two level exits
                    ExitType::SquareOff | ExitType::None => continue,
                };
                tracing::debug!(
                    instrument = %entry.key,
                    leg = entry.leg,
                    exit = %exit_type,
                    time = %bar.time,
                    "leg resolved on level"
                );
                return outcome;
            }
        }

        self.square_off(entry, bars)
    }

    fn square_off(&self, entry: &Entry, bars: &[Bar]) -> ExitOutcome {
        if entry.entry_time >= self.squareoff_time {
            return ExitOutcome::unresolved();
        }
        match bars
            .iter()
            .find(|b| b.key == entry.key && b.time == self.squareoff_time)
        {
            Some(bar) => ExitOutcome::square_off(round_price(bar.close), self.squareoff_time),
            None => {
                tracing::debug!(
                    instrument = %entry.key,
                    leg = entry.leg,
                    "no level hit and no square-off bar; leg unresolved"
                );
                ExitOutcome::unresolved()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{InstrumentKey, Multipliers, OptionType};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 59).unwrap()
    }

    fn key() -> InstrumentKey {
        InstrumentKey::new(
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            OptionType::Put,
            dec!(27000),
        )
    }

    fn entry_at(time: NaiveTime) -> Entry {
        // target 100.000, stoploss 300.000
        Entry::new(
            key(),
            time,
            dec!(200),
            Multipliers {
                target: dec!(0.5),
                stoploss: dec!(1.5),
            },
            0,
        )
    }

    fn bar(time: NaiveTime, low: Decimal, high: Decimal, close: Decimal) -> Bar {
        Bar {
            key: key(),
            time,
            open: close,
            high,
            low,
            close,
        }
    }

    fn resolver() -> ExitResolver {
        ExitResolver::new(t(15, 14), TieBreak::TargetFirst)
    }

    #[test]
    fn bar_at_entry_time_never_triggers() {
        let bars = vec![
            bar(t(9, 20), dec!(50), dec!(400), dec!(200)),
            bar(t(9, 21), dec!(190), dec!(210), dec!(200)),
            bar(t(15, 14), dec!(180), dec!(190), dec!(185.5)),
        ];
        let outcome = resolver().resolve(&entry_at(t(9, 20)), &bars);
        assert_eq!(outcome.exit_type(), ExitType::SquareOff);
        assert_eq!(outcome.exit_price(), Some(dec!(185.5)));
    }

    #[test]
    fn first_trigger_wins() {
        let bars = vec![
            bar(t(9, 21), dec!(190), dec!(210), dec!(200)),
            bar(t(9, 30), dec!(250), dec!(305), dec!(300)),
            bar(t(9, 40), dec!(90), dec!(120), dec!(95)),
        ];
        let outcome = resolver().resolve(&entry_at(t(9, 20)), &bars);
        assert_eq!(outcome.exit_type(), ExitType::Stoploss);
        assert_eq!(outcome.exit_price(), Some(dec!(300)));
        assert_eq!(outcome.exit_time(), Some(t(9, 30)));
    }

    #[test]
    fn bars_after_squareoff_are_ignored() {
        let bars = vec![
            bar(t(9, 21), dec!(190), dec!(210), dec!(200)),
            bar(t(15, 20), dec!(50), dec!(60), dec!(55)),
        ];
        let outcome = resolver().resolve(&entry_at(t(9, 20)), &bars);
        assert_eq!(outcome.exit_type(), ExitType::None);
    }

    #[test]
    fn trigger_on_squareoff_bar_is_a_level_exit() {
        let bars = vec![bar(t(15, 14), dec!(95), dec!(150), dec!(120))];
        let outcome = resolver().resolve(&entry_at(t(9, 20)), &bars);
        assert_eq!(outcome.exit_type(), ExitType::Target);
        assert_eq!(outcome.exit_time(), Some(t(15, 14)));
    }

    #[test]
    fn square_off_close_is_rounded() {
        let bars = vec![bar(t(15, 14), dec!(150), dec!(160), dec!(155.12345))];
        let outcome = resolver().resolve(&entry_at(t(9, 20)), &bars);
        assert_eq!(outcome.exit_price(), Some(dec!(155.123)));
    }

    #[test]
    fn other_instruments_are_skipped() {
        let mut foreign = bar(t(9, 30), dec!(10), dec!(20), dec!(15));
        foreign.key.strike = dec!(27100);
        let bars = vec![foreign, bar(t(15, 14), dec!(150), dec!(160), dec!(155))];
        let outcome = resolver().resolve(&entry_at(t(9, 20)), &bars);
        assert_eq!(outcome.exit_type(), ExitType::SquareOff);
    }

    #[test]
    fn entry_at_squareoff_is_unresolved() {
        let bars = vec![bar(t(15, 14), dec!(150), dec!(160), dec!(155))];
        let outcome = resolver().resolve(&entry_at(t(15, 14)), &bars);
        assert_eq!(outcome.exit_type(), ExitType::None);
    }
}
