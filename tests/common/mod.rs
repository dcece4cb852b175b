#![allow(dead_code)]

use chrono::NaiveDate;
use ladderbt::domain::backtest::BacktestResult;
use ladderbt::domain::error::LadderError;
use ladderbt::domain::metrics::Summary;
use ladderbt::domain::price_series::{DailyRecord, PriceSeries};
use ladderbt::domain::strategy::StrategyConfig;
use ladderbt::ports::data_port::DataPort;
use ladderbt::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// One record per calendar day starting at `start`.
pub fn series_from_closes(start: &str, closes: &[f64]) -> PriceSeries {
    let start = date(start);
    PriceSeries::from_records(
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| DailyRecord::new(start + chrono::Duration::days(i as i64), c))
            .collect(),
    )
}

pub fn write_price_csv(dir: &Path, name: &str, start: &str, closes: &[f64]) -> PathBuf {
    let start = date(start);
    let mut content = String::from("Date,Close\n");
    for (i, c) in closes.iter().enumerate() {
        let d = start + chrono::Duration::days(i as i64);
        content.push_str(&format!("{d},{c}\n"));
    }
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn ladder(drop_levels: &[f64], sell_multipliers: &[f64], sell_fraction: f64) -> StrategyConfig {
    StrategyConfig {
        initial_buy_amount: 1000.0,
        buy_multiple: 2.0,
        sell_fraction,
        drop_levels: drop_levels.to_vec(),
        sell_multipliers: sell_multipliers.to_vec(),
    }
}

pub struct MockDataPort {
    pub series: Option<PriceSeries>,
}

impl MockDataPort {
    pub fn new(series: PriceSeries) -> Self {
        Self {
            series: Some(series),
        }
    }

    pub fn failing() -> Self {
        Self { series: None }
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self) -> Result<PriceSeries, LadderError> {
        self.series.clone().ok_or_else(|| LadderError::Csv {
            file: "mock".into(),
            reason: "unavailable".into(),
        })
    }
}

/// Records what each `write` call received.
#[derive(Default)]
pub struct RecordingReport {
    pub writes: RefCell<Vec<(usize, usize, bool)>>,
}

impl ReportPort for RecordingReport {
    fn write(&self, result: &BacktestResult, summary: Option<&Summary>) -> Result<(), LadderError> {
        self.writes.borrow_mut().push((
            result.transactions.len(),
            result.snapshots.len(),
            summary.is_some(),
        ));
        Ok(())
    }
}
