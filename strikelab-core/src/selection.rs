//! Strike selection.
//!
//! Picks one contract per option type per date from the bars stamped exactly
//! at the entry time. Ties always go to the lower strike.

use crate::data::OptionChain;
use crate::domain::{Bar, InstrumentKey, OptionType};
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the traded strike is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StrikeSelection {
    /// Cheapest contract whose close is at least `min_premium`.
    PremiumFloor { min_premium: Decimal },
    /// Contract whose close is nearest to `target_premium`.
    NearestPremium { target_premium: Decimal },
    /// Spot rounded to the nearest `step`.
    AtTheMoney { step: Decimal },
    Fixed { strike: Decimal },
}

impl StrikeSelection {
    pub fn name(&self) -> &'static str {
        match self {
            StrikeSelection::PremiumFloor { .. } => "premium_floor",
            StrikeSelection::NearestPremium { .. } => "nearest_premium",
            StrikeSelection::AtTheMoney { .. } => "at_the_money",
            StrikeSelection::Fixed { .. } => "fixed",
        }
    }
}

impl Default for StrikeSelection {
    fn default() -> Self {
        StrikeSelection::NearestPremium {
            target_premium: Decimal::from(200),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no {option_type} quotes at {time}")]
    NoQuotesAtEntry {
        option_type: OptionType,
        time: NaiveTime,
    },

    #[error("spot price missing at {0}")]
    MissingSpot(NaiveTime),

    #[error("no {option_type} strike matches {mode}")]
    NoCandidate {
        option_type: OptionType,
        mode: &'static str,
    },

    #[error("spot {spot} cannot be rounded to a multiple of {step}")]
    StepOverflow { spot: Decimal, step: Decimal },
}

/// The chosen contract and the prices observed at the entry time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub key: InstrumentKey,
    /// Close of the selected contract at the entry time.
    pub reference_price: Decimal,
    pub spot_price: Option<Decimal>,
}

pub fn select_strike(
    chain: &OptionChain,
    date: NaiveDate,
    option_type: OptionType,
    entry_time: NaiveTime,
    spot: Option<Decimal>,
    mode: StrikeSelection,
) -> Result<Selection, SelectionError> {
    let quotes: Vec<&Bar> = chain
        .quotes_at(option_type, entry_time)
        .into_iter()
        .filter(|b| b.key.date == date)
        .collect();
    if quotes.is_empty() {
        return Err(SelectionError::NoQuotesAtEntry {
            option_type,
            time: entry_time,
        });
    }

    // `quotes` is ascending by strike, so `min_by_key` keeps the lower strike on ties.
    let picked = match mode {
        StrikeSelection::PremiumFloor { min_premium } => quotes
            .iter()
            .filter(|b| b.close >= min_premium)
            .min_by_key(|b| b.close),
        StrikeSelection::NearestPremium { target_premium } => quotes
            .iter()
            .min_by_key(|b| (b.close - target_premium).abs()),
        StrikeSelection::AtTheMoney { step } => {
            let spot = spot.ok_or(SelectionError::MissingSpot(entry_time))?;
            let strike =
                round_to_step(spot, step).ok_or(SelectionError::StepOverflow { spot, step })?;
            quotes.iter().find(|b| b.key.strike == strike)
        }
        StrikeSelection::Fixed { strike } => quotes.iter().find(|b| b.key.strike == strike),
    };

    let bar = picked.ok_or(SelectionError::NoCandidate {
        option_type,
        mode: mode.name(),
    })?;

    Ok(Selection {
        key: bar.key,
        reference_price: bar.close,
        spot_price: spot,
    })
}

/// Round `value` to the nearest multiple of `step`, halves away from zero.
///
/// `None` if `step` is zero or the quotient does not fit in a `Decimal`.
pub fn round_to_step(value: Decimal, step: Decimal) -> Option<Decimal> {
    value
        .checked_div(step)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2019, 1, 1).unwrap()
    }

    fn t() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 20, 59).unwrap()
    }

    fn chain(quotes: &[(OptionType, Decimal, Decimal)]) -> OptionChain {
        let bars = quotes
            .iter()
            .map(|&(ot, strike, close)| Bar {
                key: InstrumentKey::new(d(), ot, strike),
                time: t(),
                open: close,
                high: close,
                low: close,
                close,
            })
            .collect();
        OptionChain::from_bars(d(), bars).unwrap()
    }

    fn calls() -> OptionChain {
        chain(&[
            (OptionType::Call, dec!(26800), dec!(330)),
            (OptionType::Call, dec!(26900), dec!(260)),
            (OptionType::Call, dec!(27000), dec!(205)),
            (OptionType::Call, dec!(27100), dec!(160)),
            (OptionType::Put, dec!(27000), dec!(190)),
        ])
    }

    #[test]
    fn premium_floor_picks_cheapest_above_floor() {
        let sel = select_strike(
            &calls(),
            d(),
            OptionType::Call,
            t(),
            None,
            StrikeSelection::PremiumFloor {
                min_premium: dec!(200),
            },
        )
        .unwrap();
        assert_eq!(sel.key.strike, dec!(27000));
        assert_eq!(sel.reference_price, dec!(205));
    }

    #[test]
    fn nearest_premium_prefers_lower_strike_on_tie() {
        let c = chain(&[
            (OptionType::Put, dec!(26900), dec!(190)),
            (OptionType::Put, dec!(27000), dec!(210)),
        ]);
        let sel = select_strike(
            &c,
            d(),
            OptionType::Put,
            t(),
            None,
            StrikeSelection::NearestPremium {
                target_premium: dec!(200),
            },
        )
        .unwrap();
        assert_eq!(sel.key.strike, dec!(26900));
    }

    #[test]
    fn at_the_money_rounds_spot() {
        let sel = select_strike(
            &calls(),
            d(),
            OptionType::Call,
            t(),
            Some(dec!(26951.2)),
            StrikeSelection::AtTheMoney { step: dec!(100) },
        )
        .unwrap();
        assert_eq!(sel.key.strike, dec!(27000));
        assert_eq!(sel.spot_price, Some(dec!(26951.2)));
    }

    #[test]
    fn at_the_money_needs_spot() {
        let err = select_strike(
            &calls(),
            d(),
            OptionType::Call,
            t(),
            None,
            StrikeSelection::AtTheMoney { step: dec!(100) },
        )
        .unwrap_err();
        assert_eq!(err, SelectionError::MissingSpot(t()));
    }

    #[test]
    fn fixed_strike_missing_is_no_candidate() {
        let err = select_strike(
            &calls(),
            d(),
            OptionType::Put,
            t(),
            None,
            StrikeSelection::Fixed { strike: dec!(30000) },
        )
        .unwrap_err();
        assert!(matches!(err, SelectionError::NoCandidate { .. }));
    }

    #[test]
    fn empty_time_slot_is_reported() {
        let err = select_strike(
            &OptionChain::empty(),
            d(),
            OptionType::Call,
            t(),
            None,
            StrikeSelection::default(),
        )
        .unwrap_err();
        assert!(matches!(err, SelectionError::NoQuotesAtEntry { .. }));
    }

    #[test]
    fn round_to_step_half_goes_up() {
        assert_eq!(round_to_step(dec!(27050), dec!(100)), Some(dec!(27100)));
        assert_eq!(round_to_step(dec!(27049.99), dec!(100)), Some(dec!(27000)));
    }

    #[test]
    fn round_to_step_rejects_zero_step() {
        assert_eq!(round_to_step(dec!(27050), Decimal::ZERO), None);
    }

    #[test]
    fn tiny_step_is_an_error_not_a_panic() {
        let step = Decimal::new(1, 28);
        let err = select_strike(
            &calls(),
            d(),
            OptionType::Call,
            t(),
            Some(dec!(27000)),
            StrikeSelection::AtTheMoney { step },
        )
        .unwrap_err();
        assert_eq!(
            err,
            SelectionError::StepOverflow {
                spot: dec!(27000),
                step
            }
        );
    }
}
