//! Correlation analysis modules.
//!
//! `correlation` holds the correlation functions, `engine` applies one to a
//! reference/metric pair and `aggregator` folds results into summary tables.

pub mod aggregator;
pub mod correlation;
pub mod engine;

pub use aggregator::*;
pub use correlation::correlator_for;
pub use engine::{correlate_metric, EngineOptions};
