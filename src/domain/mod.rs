//! Domain types used throughout the study.
//!
//! This module defines:
//!
//! - loaded inputs (`PriceSeries`, `ReturnSeries`, `EventRecord`)
//! - run configuration (`StudyConfig`)
//! - per-event and per-category outputs (`AbnormalReturnVector`, `StudyResult`, `SummaryRow`)

pub mod types;

pub use types::*;
