//! Reporting utilities: summary table, per-category detail and warnings.

pub mod format;

pub use format::*;
