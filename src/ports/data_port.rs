//! Bar source port.

use crate::domain::error::BarcalcError;
use crate::domain::ohlcv::BarSeries;

pub trait DataPort {
    /// Load the whole series, oldest bar first.
    fn load_bars(&self) -> Result<BarSeries, BarcalcError>;
}
