//! PNL and trade assembly.
//!
//! PNL = (entry_price − exit_price) × lot_size, in fixed-point decimals. A
//! missing input yields a missing PNL, never zero.

use crate::cascade::Leg;
use crate::domain::{round_price, Trade};
use rust_decimal::Decimal;

/// PNL of a short-premium leg, rounded to the price precision.
pub fn compute_pnl(entry_price: Decimal, exit_price: Decimal, lot_size: u32) -> Decimal {
    round_price(
        entry_price
            .saturating_sub(exit_price)
            .saturating_mul(Decimal::from(lot_size)),
    )
}

/// Join a resolved leg with its lot size and spot price into a report row.
pub fn assemble_trade(leg: Leg, lot_size: Option<u32>, spot_price: Option<Decimal>) -> Trade {
    let pnl = match (leg.outcome.exit_price(), lot_size) {
        (Some(exit_price), Some(lots)) => Some(compute_pnl(leg.entry.entry_price, exit_price, lots)),
        _ => None,
    };
    Trade {
        entry: leg.entry,
        exit: leg.outcome,
        lot_size,
        pnl,
        spot_price,
    }
}
