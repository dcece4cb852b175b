//! Performance statistics over the daily snapshot stream.

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

use super::error::LadderError;
use super::portfolio::PortfolioSnapshot;

const TRADING_DAYS_PER_YEAR: f64 = 252.0;
const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct YearReturn {
    pub year: i32,
    pub start_value: f64,
    pub end_value: f64,
    pub return_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_value: f64,
    pub final_value: f64,
    /// Compound annual growth rate of total value.
    pub annual_return: f64,
    pub best_year: Option<YearReturn>,
    pub worst_year: Option<YearReturn>,
    /// Most negative peak-to-trough change, as a fraction (<= 0).
    pub max_drawdown: f64,
    /// `None` when mean or standard deviation of daily returns is zero.
    pub sharpe_ratio: Option<f64>,
    pub annual_returns: Vec<YearReturn>,
}

/// Compute the summary statistics for `snapshots` up to `end_date`
/// (the last snapshot when `None`).
pub fn summarize(
    snapshots: &[PortfolioSnapshot],
    end_date: Option<NaiveDate>,
) -> Result<Summary, LadderError> {
    if snapshots.len() < 2 {
        return Err(LadderError::InsufficientData {
            snapshots: snapshots.len(),
        });
    }

    let initial = snapshots
        .iter()
        .find(|s| s.total_value > 0.0)
        .ok_or(LadderError::NoValidStart)?;

    let last = match end_date {
        Some(end) => snapshots.iter().rev().find(|s| s.date <= end),
        None => snapshots.last(),
    }
    .ok_or_else(|| LadderError::NoValidEnd {
        end_date: end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "end of series".to_string()),
    })?;

    let num_years = (last.date - initial.date).num_days() as f64 / DAYS_PER_YEAR;
    if num_years <= 0.0 || initial.total_value == 0.0 {
        return Err(LadderError::InvalidRange {
            start: initial.date,
            end: last.date,
            reason: "statistics window must span a positive number of days".to_string(),
        });
    }

    let cutoff = last.date;
    let in_range: Vec<&PortfolioSnapshot> =
        snapshots.iter().take_while(|s| s.date <= cutoff).collect();

    let returns = daily_returns(&in_range);
    let (mean, stddev) = mean_and_stddev(&returns);
    let sharpe_ratio = if mean != 0.0 && stddev != 0.0 {
        Some(mean / stddev * TRADING_DAYS_PER_YEAR.sqrt())
    } else {
        None
    };

    let annual_return = (last.total_value / initial.total_value).powf(1.0 / num_years) - 1.0;

    let annual_returns = calendar_year_returns(&in_range);
    let best_year = annual_returns
        .iter()
        .max_by(|a, b| a.return_pct.total_cmp(&b.return_pct))
        .cloned();
    let worst_year = annual_returns
        .iter()
        .min_by(|a, b| a.return_pct.total_cmp(&b.return_pct))
        .cloned();

    Ok(Summary {
        start_date: initial.date,
        end_date: last.date,
        initial_value: initial.total_value,
        final_value: last.total_value,
        annual_return,
        best_year,
        worst_year,
        max_drawdown: max_drawdown(&in_range),
        sharpe_ratio,
        annual_returns,
    })
}

/// Simple returns between consecutive snapshots, skipping pairs whose
/// earlier value is zero.
fn daily_returns(snapshots: &[&PortfolioSnapshot]) -> Vec<f64> {
    snapshots
        .windows(2)
        .filter(|w| w[0].total_value != 0.0)
        .map(|w| (w[1].total_value - w[0].total_value) / w[0].total_value)
        .collect()
}

/// Mean and population standard deviation; (0, 0) for an empty slice.
fn mean_and_stddev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn max_drawdown(snapshots: &[&PortfolioSnapshot]) -> f64 {
    let mut peak = 0.0_f64;
    let mut max_dd = 0.0_f64;

    for point in snapshots {
        if point.total_value > peak {
            peak = point.total_value;
        }
        if peak > 0.0 {
            let dd = (point.total_value - peak) / peak;
            if dd < max_dd {
                max_dd = dd;
            }
        }
    }

    max_dd
}

/// A year's start value is the snapshot just before its first entry, so
/// each year's return chains onto the previous year's close.
fn calendar_year_returns(snapshots: &[&PortfolioSnapshot]) -> Vec<YearReturn> {
    let mut years: BTreeMap<i32, (f64, f64)> = BTreeMap::new();

    for w in snapshots.windows(2) {
        let (prev, curr) = (w[0], w[1]);
        years
            .entry(curr.date.year())
            .and_modify(|(_, end)| *end = curr.total_value)
            .or_insert((prev.total_value, curr.total_value));
    }

    years
        .into_iter()
        .filter(|(_, (start, _))| *start != 0.0)
        .map(|(year, (start, end))| YearReturn {
            year,
            start_value: start,
            end_value: end,
            return_pct: (end - start) / start,
        })
        .collect()
}
