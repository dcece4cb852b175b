//! Daily close price series.
//!
//! Rows arrive from a loader as strings. Each row either parses into a
//! [`DailyRecord`] or is skipped: a skipped row never reaches the engine and
//! produces no snapshot.

use chrono::NaiveDate;
use tracing::warn;

use super::error::LadderError;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One trading day. The optional peak/drawdown columns are carried through
/// for reporting only.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub close: f64,
    pub peak: Option<f64>,
    pub drawdown: Option<f64>,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        DailyRecord {
            date,
            close,
            peak: None,
            drawdown: None,
        }
    }
}

/// A row as read from a delimited file, before numeric parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub date: String,
    pub close: String,
    pub peak: Option<String>,
    pub drawdown: Option<String>,
}

impl RawRow {
    pub fn new(date: &str, close: &str) -> Self {
        RawRow {
            date: date.to_string(),
            close: close.to_string(),
            peak: None,
            drawdown: None,
        }
    }
}

/// Parse a raw row. `line` is the 1-based line number used in the error.
///
/// The close must be a finite, strictly positive number. Auxiliary columns
/// never cause a row to be rejected; unparseable values become `None`.
pub fn parse_row(line: usize, raw: &RawRow) -> Result<DailyRecord, LadderError> {
    let date = NaiveDate::parse_from_str(raw.date.trim(), DATE_FORMAT).map_err(|_| {
        LadderError::DataParse {
            row: line,
            field: "date",
            value: raw.date.clone(),
        }
    })?;

    let close = parse_number(&raw.close)
        .filter(|c| c.is_finite() && *c > 0.0)
        .ok_or_else(|| LadderError::DataParse {
            row: line,
            field: "close",
            value: raw.close.clone(),
        })?;

    let peak = raw.peak.as_deref().and_then(parse_number);
    let drawdown = raw
        .drawdown
        .as_deref()
        .and_then(|s| parse_number(s.trim().trim_end_matches('%')))
        .map(|pct| pct / 100.0);

    Ok(DailyRecord {
        date,
        close,
        peak,
        drawdown,
    })
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().replace(',', "").parse::<f64>().ok()
}

/// Date-ordered sequence of daily records with unique dates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    records: Vec<DailyRecord>,
    skipped: usize,
}

impl PriceSeries {
    /// Sorts by date; on duplicate dates the first record wins.
    pub fn from_records(mut records: Vec<DailyRecord>) -> Self {
        records.sort_by_key(|r| r.date);
        records.dedup_by_key(|r| r.date);
        PriceSeries {
            records,
            skipped: 0,
        }
    }

    /// Parses every row, skipping (and logging) the ones that fail.
    /// Row `i` is reported as line `i + 2`, the header being line 1.
    pub fn from_raw_rows(rows: &[RawRow]) -> Self {
        let mut records = Vec::with_capacity(rows.len());
        let mut skipped = 0;

        for (i, raw) in rows.iter().enumerate() {
            match parse_row(i + 2, raw) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(error = %e, "skipping row");
                    skipped += 1;
                }
            }
        }

        let mut series = Self::from_records(records);
        series.skipped = skipped;
        series
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of input rows dropped because they failed to parse.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    /// Last record dated on or before `end`; the last record overall when
    /// `end` is `None`.
    pub fn last_on_or_before(&self, end: Option<NaiveDate>) -> Option<&DailyRecord> {
        match end {
            Some(end) => self.records.iter().rev().find(|r| r.date <= end),
            None => self.records.last(),
        }
    }
}
