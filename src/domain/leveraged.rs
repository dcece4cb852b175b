//! Synthetic daily-rebalanced leveraged series built from an underlying index.
//!
//! Each day the leveraged close moves by `leverage * underlying_return`
//! minus the daily share of the expense ratio and financing drag.

use chrono::NaiveDate;
use tracing::warn;

use super::error::LadderError;
use super::price_series::PriceSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct LeverageParams {
    /// Leveraged close assigned to the first underlying row.
    pub initial_price: f64,
    pub leverage: f64,
    /// Annual expense ratio, as a fraction.
    pub expense_ratio: f64,
    /// Annual financing and swap cost, as a fraction.
    pub annual_drag: f64,
    pub trading_days: f64,
}

impl Default for LeverageParams {
    fn default() -> Self {
        LeverageParams {
            initial_price: 85.0,
            leverage: 3.0,
            expense_ratio: 0.0095,
            annual_drag: 0.08,
            trading_days: 252.0,
        }
    }
}

impl LeverageParams {
    pub fn daily_fee(&self) -> f64 {
        (self.expense_ratio + self.annual_drag) / self.trading_days
    }

    pub fn validate(&self) -> Result<(), LadderError> {
        if !(self.initial_price.is_finite() && self.initial_price > 0.0) {
            return Err(LadderError::invalid(
                "leverage",
                "initial_price",
                "initial_price must be positive",
            ));
        }
        if !(self.leverage.is_finite() && self.leverage > 0.0) {
            return Err(LadderError::invalid(
                "leverage",
                "leverage",
                "leverage must be positive",
            ));
        }
        if !(self.expense_ratio.is_finite() && self.expense_ratio >= 0.0) {
            return Err(LadderError::invalid(
                "leverage",
                "expense_ratio",
                "expense_ratio must be non-negative",
            ));
        }
        if !(self.annual_drag.is_finite() && self.annual_drag >= 0.0) {
            return Err(LadderError::invalid(
                "leverage",
                "annual_drag",
                "annual_drag must be non-negative",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeveragedDay {
    pub date: NaiveDate,
    pub close: f64,
    /// Day-over-day change of the leveraged close, in percent.
    pub change_pct: f64,
    pub peak: f64,
    /// Distance below the running peak, as a fraction (<= 0).
    pub drawdown: f64,
}

/// Build the leveraged series. The first underlying row only seeds the
/// price; output starts on the second row. A leveraged close that reaches
/// zero ends the series.
pub fn simulate(underlying: &PriceSeries, params: &LeverageParams) -> Vec<LeveragedDay> {
    let records = underlying.records();
    let fee = params.daily_fee();
    let mut out = Vec::with_capacity(records.len().saturating_sub(1));
    let mut prev_close = params.initial_price;
    let mut peak = 0.0_f64;

    for w in records.windows(2) {
        let underlying_return = (w[1].close - w[0].close) / w[0].close;
        let leveraged_return = params.leverage * underlying_return - fee;
        let close = prev_close * (1.0 + leveraged_return);

        if close <= 0.0 {
            warn!(date = %w[1].date, "leveraged price wiped out, truncating series");
            break;
        }

        peak = peak.max(close);
        out.push(LeveragedDay {
            date: w[1].date,
            close,
            change_pct: (close - prev_close) / prev_close * 100.0,
            peak,
            drawdown: (close - peak) / peak,
        });
        prev_close = close;
    }

    out
}
