//! Daily portfolio snapshots and chart downsampling.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use super::engine::EngineState;

/// End-of-day view of the portfolio. Cash is the cumulative sale proceeds;
/// nothing is ever reinvested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSnapshot {
    pub date: NaiveDate,
    pub portfolio_value: f64,
    pub cash_value: f64,
    pub total_value: f64,
    pub cumulative_invested: f64,
}

impl PortfolioSnapshot {
    pub fn capture(date: NaiveDate, close: f64, state: &EngineState) -> Self {
        let portfolio_value = state.holding_shares * close;
        let cash_value = state.cumulative_sold;
        PortfolioSnapshot {
            date,
            portfolio_value,
            cash_value,
            total_value: portfolio_value + cash_value,
            cumulative_invested: state.cumulative_invested,
        }
    }
}

/// Keep the last snapshot of every calendar month.
pub fn month_end(snapshots: &[PortfolioSnapshot]) -> Vec<PortfolioSnapshot> {
    let mut monthly: Vec<PortfolioSnapshot> = Vec::new();

    for snap in snapshots {
        match monthly.last_mut() {
            Some(last)
                if last.date.year() == snap.date.year()
                    && last.date.month() == snap.date.month() =>
            {
                *last = snap.clone();
            }
            _ => monthly.push(snap.clone()),
        }
    }

    monthly
}
