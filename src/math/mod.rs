//! Mathematical utilities: least squares and the Student-t distribution.

pub mod ols;
pub mod student_t;

pub use ols::*;
pub use student_t::*;
