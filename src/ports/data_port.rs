//! Price data access port trait.

use crate::domain::error::LadderError;
use crate::domain::price_series::PriceSeries;

pub trait DataPort {
    /// Load the full daily series. Rows that fail to parse are skipped,
    /// not reported as errors.
    fn fetch_series(&self) -> Result<PriceSeries, LadderError>;
}
