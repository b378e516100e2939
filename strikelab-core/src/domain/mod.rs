//! Domain types for StrikeLab

pub mod bar;
pub mod entry;
pub mod exit;
pub mod instrument;
pub mod price;
pub mod trade;

pub use bar::Bar;
pub use entry::{Entry, Multipliers};
pub use exit::{ExitOutcome, ExitType};
pub use instrument::{InstrumentError, InstrumentKey, OptionType};
pub use price::{format_price, round_price, MAX_PRICE, PRICE_DP};
pub use trade::Trade;
