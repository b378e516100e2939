//! Re-entry cascade: chain new legs after stoploss exits.
//!
//! Leg 0 is the originating entry. Leg n+1 exists iff leg n exited on its
//! stoploss before the square-off time, re-entry is enabled, the leg cap is
//! not reached, and the re-entry can be priced. Each leg is resolved with the
//! same [`ExitResolver`]; legs are never netted against each other.
//!
//! The cascade is a lazy iterator: legs are resolved one at a time as the
//! caller pulls them.

use crate::domain::{round_price, Bar, Entry, ExitOutcome, ExitType, Multipliers};
use crate::entry_rule::find_pullback_entry;
use crate::resolver::ExitResolver;
use serde::{Deserialize, Serialize};

/// How a new leg is entered after a stoploss exit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentryPolicy {
    /// One leg per origin.
    #[default]
    Disabled,
    /// Re-enter at the stoploss exit time, at that bar's close.
    AtStopExit,
    /// Re-enter once the premium trades back down to the originating leg's
    /// entry price, entering at that price.
    OnPullback,
}

impl ReentryPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            ReentryPolicy::Disabled => "disabled",
            ReentryPolicy::AtStopExit => "at_stop_exit",
            ReentryPolicy::OnPullback => "on_pullback",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeConfig {
    pub policy: ReentryPolicy,
    /// Maximum number of legs per origin, including leg 0. `None` = unbounded.
    pub max_legs: Option<usize>,
}

/// One resolved leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub entry: Entry,
    pub outcome: ExitOutcome,
}

/// Lazy sequence of legs for one originating entry.
pub struct Cascade<'a> {
    bars: &'a [Bar],
    resolver: ExitResolver,
    multipliers: Multipliers,
    config: CascadeConfig,
    /// Entry price of leg 0; the pullback re-entry level.
    anchor_price: rust_decimal::Decimal,
    pending: Option<Entry>,
    emitted: usize,
}

impl<'a> Cascade<'a> {
    /// `bars` are the time-ordered bars of the origin's instrument-day.
    pub fn new(
        origin: Entry,
        bars: &'a [Bar],
        resolver: ExitResolver,
        multipliers: Multipliers,
        config: CascadeConfig,
    ) -> Self {
        Self {
            bars,
            resolver,
            multipliers,
            config,
            anchor_price: origin.entry_price,
            pending: Some(origin),
            emitted: 0,
        }
    }

    fn cap_reached(&self) -> bool {
        self.config.max_legs.is_some_and(|cap| self.emitted >= cap)
    }

    /// Build the next leg's entry after `prev` resolved to `outcome`, if any.
    fn reentry_after(&self, prev: &Entry, outcome: &ExitOutcome) -> Option<Entry> {
        if self.config.policy == ReentryPolicy::Disabled || self.cap_reached() {
            return None;
        }
        if outcome.exit_type() != ExitType::Stoploss {
            return None;
        }
        let stop_time = outcome.exit_time()?;
        if stop_time >= self.resolver.squareoff_time {
            return None;
        }

        let (time, price) = match self.config.policy {
            ReentryPolicy::Disabled => return None,
            ReentryPolicy::AtStopExit => {
                let bar = self
                    .bars
                    .iter()
                    .find(|b| b.key == prev.key && b.time == stop_time)?;
                (stop_time, round_price(bar.close))
            }
            ReentryPolicy::OnPullback => {
                let time = find_pullback_entry(
                    &prev.key,
                    self.bars,
                    stop_time,
                    self.resolver.squareoff_time,
                    self.anchor_price,
                )?;
                (time, self.anchor_price)
            }
        };

        // Entry times must strictly increase or the chain could repeat forever.
        if time <= prev.entry_time {
            tracing::warn!(
                instrument = %prev.key,
                leg = prev.leg,
                "re-entry time does not advance; stopping cascade"
            );
            return None;
        }

        tracing::debug!(
            instrument = %prev.key,
            leg = prev.leg + 1,
            time = %time,
            price = %price,
            "re-entering after stoploss"
        );
        Some(Entry::new(prev.key, time, price, self.multipliers, prev.leg + 1))
    }
}

impl Iterator for Cascade<'_> {
    type Item = Leg;

    fn next(&mut self) -> Option<Leg> {
        let entry = self.pending.take()?;
        let outcome = self.resolver.resolve(&entry, self.bars);
        self.emitted += 1;
        self.pending = self.reentry_after(&entry, &outcome);
        Some(Leg { entry, outcome })
    }
}

/// Resolve every leg of a cascade eagerly.
pub fn resolve_cascade(
    origin: Entry,
    bars: &[Bar],
    resolver: ExitResolver,
    multipliers: Multipliers,
    config: CascadeConfig,
) -> Vec<Leg> {
    Cascade::new(origin, bars, resolver, multipliers, config).collect()
}
