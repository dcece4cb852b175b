//! Backtest driver: replays a price series through the ladder engine.

use chrono::NaiveDate;
use tracing::{debug, info};

use super::engine::{advance_one_day, DayEvent, EngineState};
use super::error::LadderError;
use super::execution::{Side, Transaction};
use super::portfolio::PortfolioSnapshot;
use super::price_series::PriceSeries;
use super::strategy::StrategyConfig;

/// Inclusive date window. Records outside it are skipped entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BacktestConfig {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl BacktestConfig {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }
}

/// Final accounting for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub final_date: NaiveDate,
    pub final_close: f64,
    pub holding_shares: f64,
    pub total_invested: f64,
    pub total_sold: f64,
    pub final_holding_value: f64,
    pub net_profit: f64,
    /// Sold proceeds plus the value of what is still held.
    pub total_value: f64,
    /// `total_value / total_invested`, 0 when nothing was invested.
    pub multiple: f64,
}

#[derive(Debug)]
pub struct BacktestResult {
    pub transactions: Vec<Transaction>,
    pub snapshots: Vec<PortfolioSnapshot>,
    pub final_state: EngineState,
    /// Fails only when no record exists on or before the end date; the
    /// transactions and snapshots are valid either way.
    pub summary: Result<RunSummary, LadderError>,
}

pub fn run_backtest(
    series: &PriceSeries,
    strategy: &StrategyConfig,
    config: &BacktestConfig,
) -> BacktestResult {
    let mut state = EngineState::new();
    let mut transactions = Vec::new();
    let mut snapshots = Vec::new();

    for record in series.records() {
        if !config.contains(record.date) {
            continue;
        }

        let (next, events) = advance_one_day(state, record, strategy);
        state = next;

        for event in events {
            log_event(&event);
            if let Some(t) = event.transaction() {
                transactions.push(t.clone());
            }
        }

        snapshots.push(PortfolioSnapshot::capture(record.date, record.close, &state));
    }

    debug!(
        days = snapshots.len(),
        trades = transactions.len(),
        "backtest loop finished"
    );

    let summary = finalize(series, &state, &transactions, config.end_date);

    BacktestResult {
        transactions,
        snapshots,
        final_state: state,
        summary,
    }
}

/// Value the final holdings at the last close on or before `end_date`.
pub fn finalize(
    series: &PriceSeries,
    state: &EngineState,
    transactions: &[Transaction],
    end_date: Option<NaiveDate>,
) -> Result<RunSummary, LadderError> {
    let last = series
        .last_on_or_before(end_date)
        .ok_or_else(|| LadderError::NoData {
            end_date: end_date
                .map(|d| d.to_string())
                .unwrap_or_else(|| "end of series".to_string()),
        })?;

    let final_holding_value = if state.holding_shares > 0.0 {
        state.holding_shares * last.close
    } else {
        0.0
    };

    let total_invested: f64 = transactions
        .iter()
        .filter(|t| t.side == Side::Buy)
        .map(Transaction::value)
        .sum();
    let total_sold: f64 = transactions
        .iter()
        .filter(|t| t.side == Side::Sell)
        .map(Transaction::value)
        .sum();

    let total_value = final_holding_value + total_sold;
    let multiple = if total_invested > 0.0 {
        total_value / total_invested
    } else {
        0.0
    };

    Ok(RunSummary {
        final_date: last.date,
        final_close: last.close,
        holding_shares: state.holding_shares,
        total_invested,
        total_sold,
        final_holding_value,
        net_profit: total_value - total_invested,
        total_value,
        multiple,
    })
}

fn log_event(event: &DayEvent) {
    match event {
        DayEvent::Buy {
            fill,
            cycle_peak,
            drop_from_peak,
        } => info!(
            date = %fill.transaction.date,
            level = fill.level,
            "buy {:.2} shares at ${:.2} for ${:.2} (drop {:.2}% from ${:.2})",
            fill.transaction.shares,
            fill.transaction.price,
            fill.amount,
            drop_from_peak * 100.0,
            cycle_peak,
        ),
        DayEvent::Sell(fill) => info!(
            date = %fill.transaction.date,
            "sell {:.2} shares at ${:.2} for ${:.2} (target {}x of ${:.2})",
            fill.transaction.shares,
            fill.transaction.price,
            fill.proceeds,
            fill.multiplier,
            fill.anchor,
        ),
        DayEvent::Recovered { date, price } => info!(
            date = %date,
            "recovered to cycle peak at ${:.2}, resetting buy ladder",
            price,
        ),
    }
}
