//! Report generation port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::LadderError;
use crate::domain::metrics::Summary;

/// Port for writing the outputs of a run.
pub trait ReportPort {
    /// `summary` is `None` when the statistics could not be computed; the
    /// transaction log and snapshots are still written.
    fn write(&self, result: &BacktestResult, summary: Option<&Summary>) -> Result<(), LadderError>;
}
