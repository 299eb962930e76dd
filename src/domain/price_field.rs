//! Symbolic price fields (`close`, `hl2`, ...) resolved against a bar series.

use crate::domain::ohlcv::BarSeries;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    Volume,
    Hl2,
    Hlc3,
    Ohlc4,
}

impl PriceField {
    pub const ALL: [PriceField; 8] = [
        PriceField::Open,
        PriceField::High,
        PriceField::Low,
        PriceField::Close,
        PriceField::Volume,
        PriceField::Hl2,
        PriceField::Hlc3,
        PriceField::Ohlc4,
    ];

    /// Case-insensitive lookup, accepting the one-letter aliases `o h l c v`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "open" | "o" => Some(PriceField::Open),
            "high" | "h" => Some(PriceField::High),
            "low" | "l" => Some(PriceField::Low),
            "close" | "c" => Some(PriceField::Close),
            "volume" | "v" => Some(PriceField::Volume),
            "hl2" => Some(PriceField::Hl2),
            "hlc3" => Some(PriceField::Hlc3),
            "ohlc4" => Some(PriceField::Ohlc4),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PriceField::Open => "open",
            PriceField::High => "high",
            PriceField::Low => "low",
            PriceField::Close => "close",
            PriceField::Volume => "volume",
            PriceField::Hl2 => "hl2",
            PriceField::Hlc3 => "hlc3",
            PriceField::Ohlc4 => "ohlc4",
        }
    }

    /// Field value at `index`, NaN when out of range.
    pub fn value_at(self, source: &BarSeries, index: usize) -> f64 {
        match self {
            PriceField::Open => source.open(index),
            PriceField::High => source.high(index),
            PriceField::Low => source.low(index),
            PriceField::Close => source.close(index),
            PriceField::Volume => source.volume(index),
            PriceField::Hl2 => (source.high(index) + source.low(index)) / 2.0,
            PriceField::Hlc3 => source.typical_price(index),
            PriceField::Ohlc4 => {
                (source.open(index) + source.high(index) + source.low(index) + source.close(index))
                    / 4.0
            }
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
