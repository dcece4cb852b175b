//! Trade execution against the engine state.
//!
//! Fills happen at the day's close with no commission or slippage.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use super::engine::EngineState;
use super::strategy::StrategyConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// One executed trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub side: Side,
    pub date: NaiveDate,
    pub price: f64,
    pub shares: f64,
}

impl Transaction {
    /// Dollar value of the trade (price * shares).
    pub fn value(&self) -> f64 {
        self.price * self.shares
    }
}

/// Details of a buy, returned alongside the transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyFill {
    pub transaction: Transaction,
    pub amount: f64,
    pub level: usize,
}

/// Details of a sell, returned alongside the transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SellFill {
    pub transaction: Transaction,
    pub proceeds: f64,
    pub multiplier: f64,
    pub anchor: f64,
}

/// Buy the current ladder level at `price`.
///
/// The first buy of a cycle (level 0) re-anchors the sell ladder at `price`
/// and restarts it from its first target.
pub fn execute_buy(
    state: &mut EngineState,
    price: f64,
    date: NaiveDate,
    config: &StrategyConfig,
) -> BuyFill {
    if state.current_drop_level == 0 {
        state.anchored_sell_price = Some(price);
        state.next_sell_index = 0;
    }

    let level = state.current_drop_level;
    let amount = config.buy_amount(level);
    let shares = amount / price;

    state.holding_shares += shares;
    state.cumulative_invested += amount;
    state.current_drop_level += 1;

    BuyFill {
        transaction: Transaction {
            side: Side::Buy,
            date,
            price,
            shares,
        },
        amount,
        level,
    }
}

/// Sell `sell_fraction` of the current holdings at `price` and advance the
/// sell ladder by one target. `anchor` and `multiplier` describe the target
/// that was reached.
pub fn execute_sell(
    state: &mut EngineState,
    price: f64,
    date: NaiveDate,
    anchor: f64,
    multiplier: f64,
    config: &StrategyConfig,
) -> SellFill {
    let shares = state.holding_shares * config.sell_fraction;
    let proceeds = shares * price;

    state.holding_shares -= shares;
    state.cumulative_sold += proceeds;
    state.next_sell_index += 1;

    SellFill {
        transaction: Transaction {
            side: Side::Sell,
            date,
            price,
            shares,
        },
        proceeds,
        multiplier,
        anchor,
    }
}
