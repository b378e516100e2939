//! Entry rules: when and at what price a selected contract is entered.

use crate::domain::{round_price, Bar, InstrumentKey};
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the originating leg is entered once a strike is selected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum EntryRule {
    /// Enter at the configured entry time at the selected bar's close.
    #[default]
    AtEntryTime,
    /// Wait for the premium to trade down to `reference × trigger_multiplier`
    /// and enter at that trigger price.
    OnPullback { trigger_multiplier: Decimal },
}

impl EntryRule {
    pub fn name(&self) -> &'static str {
        match self {
            EntryRule::AtEntryTime => "at_entry_time",
            EntryRule::OnPullback { .. } => "on_pullback",
        }
    }
}

/// A concrete entry point: time and price.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryFill {
    pub time: NaiveTime,
    pub price: Decimal,
}

/// Apply `rule` to a selected contract.
///
/// `reference_price` is the selected bar's close at `entry_time`. Returns
/// `None` when a pullback entry never triggers before the square-off time.
pub fn apply_entry_rule(
    rule: EntryRule,
    key: &InstrumentKey,
    bars: &[Bar],
    entry_time: NaiveTime,
    squareoff_time: NaiveTime,
    reference_price: Decimal,
) -> Option<EntryFill> {
    match rule {
        EntryRule::AtEntryTime => Some(EntryFill {
            time: entry_time,
            price: round_price(reference_price),
        }),
        EntryRule::OnPullback { trigger_multiplier } => {
            let trigger = round_price(reference_price * trigger_multiplier);
            find_pullback_entry(key, bars, entry_time, squareoff_time, trigger).map(|time| {
                EntryFill {
                    time,
                    price: trigger,
                }
            })
        }
    }
}

/// First bar strictly inside `(after, squareoff_time)` whose low reaches `trigger`.
pub fn find_pullback_entry(
    key: &InstrumentKey,
    bars: &[Bar],
    after: NaiveTime,
    squareoff_time: NaiveTime,
    trigger: Decimal,
) -> Option<NaiveTime> {
    bars.iter()
        .filter(|b| b.key == *key && b.time > after && b.time < squareoff_time)
        .find(|b| b.low <= trigger)
        .map(|b| b.time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OptionType;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 59).unwrap()
    }

    fn key() -> InstrumentKey {
        InstrumentKey::new(
            NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(),
            OptionType::Call,
            dec!(27000),
        )
    }

    fn bar(time: NaiveTime, low: Decimal) -> Bar {
        Bar {
            key: key(),
            time,
            open: low + dec!(5),
            high: low + dec!(10),
            low,
            close: low + dec!(5),
        }
    }

    #[test]
    fn at_entry_time_uses_reference_close() {
        let fill = apply_entry_rule(
            EntryRule::AtEntryTime,
            &key(),
            &[],
            t(9, 20),
            t(15, 14),
            dec!(201.2345),
        )
        .unwrap();
        assert_eq!(fill.time, t(9, 20));
        assert_eq!(fill.price, dec!(201.234));
    }

    #[test]
    fn pullback_waits_for_trigger() {
        let bars = vec![bar(t(9, 21), dec!(195)), bar(t(9, 25), dec!(179)), bar(t(9, 30), dec!(170))];
        let rule = EntryRule::OnPullback {
            trigger_multiplier: dec!(0.9),
        };
        let fill = apply_entry_rule(rule, &key(), &bars, t(9, 20), t(15, 14), dec!(200)).unwrap();
        assert_eq!(fill.time, t(9, 25));
        assert_eq!(fill.price, dec!(180));
    }

    #[test]
    fn pullback_excludes_start_and_squareoff() {
        let bars = vec![bar(t(9, 20), dec!(100)), bar(t(15, 14), dec!(100))];
        assert_eq!(
            find_pullback_entry(&key(), &bars, t(9, 20), t(15, 14), dec!(180)),
            None
        );
    }

    #[test]
    fn pullback_never_triggering_yields_none() {
        let bars = vec![bar(t(9, 21), dec!(195))];
        let rule = EntryRule::OnPullback {
            trigger_multiplier: dec!(0.5),
        };
        assert!(apply_entry_rule(rule, &key(), &bars, t(9, 20), t(15, 14), dec!(200)).is_none());
    }
}
