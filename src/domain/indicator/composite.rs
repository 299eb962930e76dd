//! Composite indicator: several single-line indicators folded into one line.
//!
//! Every part is calculated over the whole source, then each row's values are
//! passed to the combiner. A part shorter than the source contributes NaN.
//!
//! ```
//! use barcalc::domain::indicator::Indicator;
//! use barcalc::domain::indicator::composite::CompositeIndicator;
//! use barcalc::domain::indicator::ema::Ema;
//!
//! let spread = CompositeIndicator::builder("ema_spread")
//!     .add(Box::new(Ema::new(12).unwrap()))
//!     .add(Box::new(Ema::new(26).unwrap()))
//!     .difference()
//!     .build()
//!     .unwrap();
//! assert_eq!(spread.minimum_bars(), 26);
//! ```

use std::fmt;

use crate::domain::error::InvalidParameterError;
use crate::domain::indicator::{Indicator, LineIndicator};
use crate::domain::ohlcv::BarSeries;
use crate::domain::series::LineSeries;

pub type CombineFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// How the parts' values at one row become the output value.
pub enum Combiner {
    /// Mean of the non-NaN values; NaN if all are NaN.
    Average,
    /// Sum of the non-NaN values; NaN if all are NaN.
    Sum,
    /// First value minus all the others; any NaN gives NaN.
    Difference,
    /// Product of all values; any NaN gives NaN.
    Product,
    Custom(CombineFn),
}

impl Combiner {
    pub fn combine(&self, values: &[f64]) -> f64 {
        match self {
            Combiner::Average => {
                let valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
                if valid.is_empty() {
                    f64::NAN
                } else {
                    valid.iter().sum::<f64>() / valid.len() as f64
                }
            }
            Combiner::Sum => values
                .iter()
                .copied()
                .filter(|v| !v.is_nan())
                .reduce(|a, b| a + b)
                .unwrap_or(f64::NAN),
            Combiner::Difference => match values.split_first() {
                Some((first, rest)) => rest.iter().fold(*first, |acc, v| acc - v),
                None => f64::NAN,
            },
            Combiner::Product => {
                if values.is_empty() {
                    f64::NAN
                } else {
                    values.iter().product()
                }
            }
            Combiner::Custom(f) => f(values),
        }
    }
}

impl fmt::Debug for Combiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Combiner::Average => f.write_str("Average"),
            Combiner::Sum => f.write_str("Sum"),
            Combiner::Difference => f.write_str("Difference"),
            Combiner::Product => f.write_str("Product"),
            Combiner::Custom(_) => f.write_str("Custom"),
        }
    }
}

pub struct CompositeIndicator {
    id: String,
    name: String,
    parts: Vec<LineIndicator>,
    combiner: Combiner,
}

impl CompositeIndicator {
    pub fn builder(id: impl Into<String>) -> CompositeBuilder {
        let id = id.into();
        CompositeBuilder {
            name: id.clone(),
            id,
            parts: Vec::new(),
            combiner: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn parts(&self) -> usize {
        self.parts.len()
    }

    pub fn combiner(&self) -> &Combiner {
        &self.combiner
    }
}

impl fmt::Debug for CompositeIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.parts.iter().map(|p| p.name()).collect();
        f.debug_struct("CompositeIndicator")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parts", &names)
            .field("combiner", &self.combiner)
            .finish()
    }
}

impl Indicator for CompositeIndicator {
    type Output = LineSeries;

    fn name(&self) -> &str {
        &self.name
    }

    fn minimum_bars(&self) -> usize {
        self.parts
            .iter()
            .map(|p| p.minimum_bars())
            .max()
            .unwrap_or(1)
            .max(1)
    }

    fn calculate(&self, source: &BarSeries) -> LineSeries {
        let outputs: Vec<LineSeries> = self.parts.iter().map(|p| p.calculate(source)).collect();
        let mut row = vec![f64::NAN; outputs.len()];
        let values = (0..source.len())
            .map(|i| {
                for (slot, output) in row.iter_mut().zip(&outputs) {
                    *slot = output.value(i).unwrap_or(f64::NAN);
                }
                self.combiner.combine(&row)
            })
            .collect();
        LineSeries::from_values(&self.name, source.timestamps(), values)
    }
}

pub struct CompositeBuilder {
    id: String,
    name: String,
    parts: Vec<LineIndicator>,
    combiner: Option<Combiner>,
}

impl CompositeBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn add(mut self, indicator: LineIndicator) -> Self {
        self.parts.push(indicator);
        self
    }

    pub fn average(self) -> Self {
        self.combiner(Combiner::Average)
    }

    pub fn sum(self) -> Self {
        self.combiner(Combiner::Sum)
    }

    pub fn difference(self) -> Self {
        self.combiner(Combiner::Difference)
    }

    pub fn product(self) -> Self {
        self.combiner(Combiner::Product)
    }

    /// Combine the first two parts; NaN if either is NaN or a part is missing.
    pub fn combine<F>(self, f: F) -> Self
    where
        F: Fn(f64, f64) -> f64 + Send + Sync + 'static,
    {
        self.combine_all(Box::new(move |values: &[f64]| match values {
            [a, b, ..] if !a.is_nan() && !b.is_nan() => f(*a, *b),
            _ => f64::NAN,
        }))
    }

    pub fn combine_all(self, f: CombineFn) -> Self {
        self.combiner(Combiner::Custom(f))
    }

    pub fn combiner(mut self, combiner: Combiner) -> Self {
        self.combiner = Some(combiner);
        self
    }

    pub fn build(self) -> Result<CompositeIndicator, InvalidParameterError> {
        if self.parts.is_empty() {
            return Err(InvalidParameterError::new(
                &self.id,
                "parts",
                "at least one indicator is required",
            ));
        }
        let Some(combiner) = self.combiner else {
            return Err(InvalidParameterError::new(
                &self.id,
                "combiner",
                "a combine function is required",
            ));
        };
        Ok(CompositeIndicator {
            id: self.id,
            name: self.name,
            parts: self.parts,
            combiner,
        })
    }
}
