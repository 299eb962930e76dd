//! Indicator output sink port.

use crate::domain::error::BarcalcError;
use crate::domain::series::IndicatorOutput;

pub trait OutputPort {
    fn write_output(&self, output: &IndicatorOutput) -> Result<(), BarcalcError>;
}
