//! Aggregation and reshaping of bit-flip trial metrics.
//!
//! A run loads one long-form CSV ([`loader`]), reduces it by `percent` and
//! `bits` ([`aggregate`]) or pivots it into a `bits x percent` matrix
//! ([`reshape`]), writes the results ([`writer`]) and hands chart
//! descriptions to a [`chart::ChartSink`].

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod errors;
pub mod loader;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod reshape;
pub mod writer;

pub use errors::{FlipstatError, Result};
pub use model::{GroupKey, KeyColumn, MetricRow, MetricTable};
