//! Data collaborators: loader traits, option chains, in-memory tables

pub mod chain;
pub mod memory;
pub mod provider;

pub use chain::OptionChain;
pub use memory::{InMemoryLoader, LotSizeTable};
pub use provider::{DataError, LotSizeLookup, PriceSeriesLoader};
