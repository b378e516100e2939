//! StrikeLab Core: exit resolution for intraday short-premium option trades.
//!
//! This crate contains the evaluation kernel:
//! - Domain types (instrument keys, bars, entries, exit outcomes, trades)
//! - Trade resolver (first-touch target/stoploss scan with square-off fallback)
//! - Re-entry cascade after stoploss exits
//! - Strike selection and entry rules
//! - PNL assembly
//! - Collaborator traits for price series and lot sizes
//! - Per-day strategy evaluation

pub mod cascade;
pub mod data;
pub mod domain;
pub mod entry_rule;
pub mod pnl;
pub mod resolver;
pub mod selection;
pub mod strategy;

pub use cascade::{resolve_cascade, Cascade, CascadeConfig, Leg, ReentryPolicy};
pub use domain::{Bar, Entry, ExitOutcome, ExitType, InstrumentKey, Multipliers, OptionType, Trade};
pub use resolver::{ExitResolver, TieBreak};
pub use strategy::{evaluate_day, DayReport, StrategyParams};
