//! CSV price file adapter.
//!
//! Columns are located by header name, case-insensitively: `Date` and
//! `Close` are required, `Peak Price` and `Drawdown %` are optional. Any other
//! column is ignored.

use crate::domain::error::LadderError;
use crate::domain::leveraged::LeveragedDay;
use crate::domain::price_series::{PriceSeries, RawRow};
use crate::ports::data_port::DataPort;
use csv::StringRecord;
use std::path::{Path, PathBuf};
use tracing::info;

pub struct CsvAdapter {
    path: PathBuf,
}

struct Columns {
    date: usize,
    close: usize,
    peak: Option<usize>,
    drawdown: Option<usize>,
}

impl Columns {
    fn locate(headers: &StringRecord, file: &str) -> Result<Self, LadderError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let missing = |name: &str| LadderError::Csv {
            file: file.to_string(),
            reason: format!("missing {} column", name),
        };

        Ok(Columns {
            date: find("date").ok_or_else(|| missing("Date"))?,
            close: find("close").ok_or_else(|| missing("Close"))?,
            peak: find("peak price"),
            drawdown: find("drawdown %"),
        })
    }

    fn raw_row(&self, record: &StringRecord) -> RawRow {
        let field = |i: usize| record.get(i).unwrap_or("").to_string();
        RawRow {
            date: field(self.date),
            close: field(self.close),
            peak: self.peak.map(field),
            drawdown: self.drawdown.map(field),
        }
    }
}

impl CsvAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn display(&self) -> String {
        self.path.display().to_string()
    }

    /// Read the raw rows without parsing numbers or dates.
    pub fn read_rows(&self) -> Result<Vec<RawRow>, LadderError> {
        let file = self.display();
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| csv_error(&file, e))?;

        let headers = rdr.headers().map_err(|e| csv_error(&file, e))?.clone();
        let columns = Columns::locate(&headers, &file)?;

        let mut rows = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| csv_error(&file, e))?;
            rows.push(columns.raw_row(&record));
        }
        Ok(rows)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self) -> Result<PriceSeries, LadderError> {
        let rows = self.read_rows()?;
        let series = PriceSeries::from_raw_rows(&rows);
        info!(
            file = %self.display(),
            rows = rows.len(),
            records = series.len(),
            skipped = series.skipped(),
            "loaded price series"
        );
        Ok(series)
    }
}

/// Write a synthetic leveraged series in the format [`CsvAdapter`] reads.
pub fn write_leveraged_series(path: &Path, days: &[LeveragedDay]) -> Result<(), LadderError> {
    let file = path.display().to_string();
    let mut wtr = csv::Writer::from_path(path).map_err(|e| csv_error(&file, e))?;

    wtr.write_record(["Date", "Close", "Change %", "Peak Price", "Drawdown %"])
        .map_err(|e| csv_error(&file, e))?;
    for day in days {
        wtr.write_record([
            day.date.to_string(),
            format!("{:.6}", day.close),
            format!("{:.2}%", day.change_pct),
            format!("{:.6}", day.peak),
            format!("{:.2}%", day.drawdown * 100.0),
        ])
        .map_err(|e| csv_error(&file, e))?;
    }
    wtr.flush()?;
    Ok(())
}

pub(crate) fn csv_error(file: &str, e: csv::Error) -> LadderError {
    LadderError::Csv {
        file: file.to_string(),
        reason: e.to_string(),
    }
}
