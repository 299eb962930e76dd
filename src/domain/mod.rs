//! Core domain types and logic.
//!
//! Bars flow in through [`ohlcv::BarSeries`]; indicators in [`indicator`]
//! and expressions in [`expr`] turn them into [`series`] outputs, and
//! [`registry`] builds either by id from typed parameters.

pub mod ohlcv;
pub mod price_field;
pub mod series;
pub mod indicator;
pub mod indicator_helpers;
pub mod expr;
pub mod registry;
pub mod config_validation;
pub mod error;
