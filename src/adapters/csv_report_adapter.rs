//! CSV report adapter implementing ReportPort.
//!
//! Writes into one output directory:
//! - `transactions.csv`: every executed trade
//! - `daily.csv`: one portfolio snapshot per simulated day
//! - `monthly.csv`: last snapshot of each calendar month, for charting
//! - `annual_returns.csv`: calendar year returns, when statistics exist

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::adapters::csv_adapter::csv_error;
use crate::domain::backtest::BacktestResult;
use crate::domain::error::LadderError;
use crate::domain::execution::{Side, Transaction};
use crate::domain::metrics::{Summary, YearReturn};
use crate::domain::portfolio::month_end;
use crate::ports::report_port::ReportPort;

pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const DAILY_FILE: &str = "daily.csv";
pub const MONTHLY_FILE: &str = "monthly.csv";
pub const ANNUAL_FILE: &str = "annual_returns.csv";

#[derive(Serialize)]
struct TradeRow {
    date: NaiveDate,
    side: Side,
    price: f64,
    shares: f64,
    value: f64,
}

impl From<&Transaction> for TradeRow {
    fn from(t: &Transaction) -> Self {
        TradeRow {
            date: t.date,
            side: t.side,
            price: t.price,
            shares: t.shares,
            value: t.value(),
        }
    }
}

#[derive(Serialize)]
struct YearRow {
    year: i32,
    start_value: f64,
    end_value: f64,
    return_pct: f64,
}

impl From<&YearReturn> for YearRow {
    fn from(y: &YearReturn) -> Self {
        YearRow {
            year: y.year,
            start_value: y.start_value,
            end_value: y.end_value,
            return_pct: y.return_pct,
        }
    }
}

pub struct CsvReportAdapter {
    output_dir: PathBuf,
}

impl CsvReportAdapter {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

fn write_rows<T: Serialize>(
    path: &Path,
    rows: impl IntoIterator<Item = T>,
) -> Result<usize, LadderError> {
    let file = path.display().to_string();
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(&file, e))?;
    let mut count = 0;
    for row in rows {
        wtr.serialize(row).map_err(|e| csv_error(&file, e))?;
        count += 1;
    }
    wtr.flush()?;
    Ok(count)
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, result: &BacktestResult, summary: Option<&Summary>) -> Result<(), LadderError> {
        fs::create_dir_all(&self.output_dir)?;

        let trades = write_rows(
            &self.output_dir.join(TRANSACTIONS_FILE),
            result.transactions.iter().map(TradeRow::from),
        )?;
        let days = write_rows(&self.output_dir.join(DAILY_FILE), &result.snapshots)?;
        let months = write_rows(
            &self.output_dir.join(MONTHLY_FILE),
            month_end(&result.snapshots),
        )?;

        if let Some(summary) = summary {
            write_rows(
                &self.output_dir.join(ANNUAL_FILE),
                summary.annual_returns.iter().map(YearRow::from),
            )?;
        }

        info!(
            dir = %self.output_dir.display(),
            trades,
            days,
            months,
            "report written"
        );
        Ok(())
    }
}
