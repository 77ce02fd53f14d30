//! Report writing.
//!
//! Per-dimension text files, the two summary CSV tables and the optional
//! JSON run summary.

pub mod writer;

pub use writer::*;
