//! Re-entry cascade scenarios over full bar sequences.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use strikelab_core::cascade::{resolve_cascade, CascadeConfig, ReentryPolicy};
use strikelab_core::domain::{Bar, Entry, ExitType, InstrumentKey, Multipliers, OptionType};
use strikelab_core::pnl::assemble_trade;
use strikelab_core::resolver::{ExitResolver, TieBreak};

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 59).unwrap()
}

fn key() -> InstrumentKey {
    InstrumentKey::new(
        NaiveDate::from_ymd_opt(2019, 3, 7).unwrap(),
        OptionType::Put,
        dec!(27500),
    )
}

fn mult() -> Multipliers {
    Multipliers {
        target: dec!(0.5),
        stoploss: dec!(1.5),
    }
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

fn at_stop_exit() -> CascadeConfig {
    CascadeConfig {
        policy: ReentryPolicy::AtStopExit,
        max_legs: None,
    }
}

#[test]
fn stop_stop_target_yields_three_trades() {
    let bars = vec![
        bar(t(9, 20), dec!(98), dec!(102), dec!(100)),
        bar(t(9, 30), dec!(120), dec!(150), dec!(150)),
        bar(t(9, 40), dec!(160), dec!(230), dec!(228)),
        bar(t(9, 50), dec!(110), dec!(200), dec!(120)),
        bar(t(15, 14), dec!(90), dec!(100), dec!(95)),
    ];
    let origin = Entry::new(key(), t(9, 20), dec!(100), mult(), 0);
    let resolver = ExitResolver::new(t(15, 14), TieBreak::TargetFirst);

    let legs = resolve_cascade(origin, &bars, resolver, mult(), at_stop_exit());
    assert_eq!(legs.len(), 3);

    let kinds: Vec<ExitType> = legs.iter().map(|l| l.outcome.exit_type()).collect();
    assert_eq!(kinds, vec![ExitType::Stoploss, ExitType::Stoploss, ExitType::Target]);

    for pair in legs.windows(2) {
        assert!(pair[1].entry.entry_time > pair[0].entry.entry_time);
        assert!(pair[1].outcome.exit_time() > pair[0].outcome.exit_time());
    }
    assert_eq!(
        legs.iter().map(|l| l.entry.leg).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    let pnls: Vec<Option<Decimal>> = legs
        .into_iter()
        .map(|l| assemble_trade(l, Some(10), None).pnl)
        .collect();
    assert_eq!(
        pnls,
        vec![Some(dec!(-500)), Some(dec!(-750)), Some(dec!(1140))]
    );
}

#[test]
fn legs_are_not_netted() {
    let bars = vec![
        bar(t(9, 30), dec!(120), dec!(150), dec!(150)),
        bar(t(15, 14), dec!(140), dec!(160), dec!(155)),
    ];
    let origin = Entry::new(key(), t(9, 20), dec!(100), mult(), 0);
    let resolver = ExitResolver::new(t(15, 14), TieBreak::TargetFirst);
    let legs = resolve_cascade(origin, &bars, resolver, mult(), at_stop_exit());

    assert_eq!(legs.len(), 2);
    // leg 1 keeps its own levels from its own entry price
    assert_eq!(legs[1].entry.entry_price, dec!(150));
    assert_eq!(legs[1].entry.stoploss, dec!(225));
    assert_eq!(legs[1].outcome.exit_type(), ExitType::SquareOff);
    assert_eq!(legs[1].outcome.exit_price(), Some(dec!(155)));
    assert_eq!(legs[0].outcome.exit_price(), Some(dec!(150)));
}

#[test]
fn pullback_reentries_chain_until_squareoff() {
    // Anchor is 100. Each rally stops out, each dip back to 100 re-enters.
    let bars = vec![
        bar(t(9, 30), dec!(110), dec!(150), dec!(150)),
        bar(t(9, 40), dec!(99), dec!(120), dec!(101)),
        bar(t(9, 50), dec!(120), dec!(155), dec!(150)),
        bar(t(10, 0), dec!(100), dec!(110), dec!(105)),
        bar(t(15, 14), dec!(80), dec!(90), dec!(85)),
    ];
    let origin = Entry::new(key(), t(9, 20), dec!(100), mult(), 0);
    let resolver = ExitResolver::new(t(15, 14), TieBreak::TargetFirst);
    let cfg = CascadeConfig {
        policy: ReentryPolicy::OnPullback,
        max_legs: None,
    };
    let legs = resolve_cascade(origin, &bars, resolver, mult(), cfg);

    assert_eq!(legs.len(), 3);
    assert!(legs.iter().all(|l| l.entry.entry_price == dec!(100)));
    assert_eq!(legs[1].entry.entry_time, t(9, 40));
    assert_eq!(legs[2].entry.entry_time, t(10, 0));
    assert_eq!(legs[2].outcome.exit_type(), ExitType::SquareOff);
}
