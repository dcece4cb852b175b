//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for ladderbt.
#[derive(Debug, thiserror::Error)]
pub enum LadderError {
    #[error("row {row}: cannot parse {field} from {value:?}")]
    DataParse {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("no price data on or before {end_date}")]
    NoData { end_date: String },

    #[error("not enough snapshots to compute statistics: have {snapshots}, need 2")]
    InsufficientData { snapshots: usize },

    #[error("no snapshot with a positive total value")]
    NoValidStart,

    #[error("no snapshot on or before {end_date}")]
    NoValidEnd { end_date: String },

    #[error("invalid statistics range {start} to {end}: {reason}")]
    InvalidRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String,
    },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("csv error in {file}: {reason}")]
    Csv { file: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LadderError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        LadderError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<&LadderError> for std::process::ExitCode {
    fn from(err: &LadderError) -> Self {
        let code: u8 = match err {
            LadderError::Io(_) | LadderError::Csv { .. } => 1,
            LadderError::ConfigParse { .. }
            | LadderError::ConfigMissing { .. }
            | LadderError::ConfigInvalid { .. } => 2,
            LadderError::DataParse { .. } | LadderError::NoData { .. } => 5,
            LadderError::InsufficientData { .. }
            | LadderError::NoValidStart
            | LadderError::NoValidEnd { .. }
            | LadderError::InvalidRange { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
