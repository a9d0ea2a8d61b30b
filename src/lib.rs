//! `event-study` library crate.
//!
//! The binary (`car`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the study can be driven from other front-ends or notebooks

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod study;
