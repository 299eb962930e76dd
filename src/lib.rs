//! barcalc — OHLCV indicator engine.
//!
//! Hexagonal architecture: bars, series, indicators and the expression
//! language in [`domain`], port traits in [`ports`], file-backed
//! implementations in [`adapters`], and the command-line front end in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
