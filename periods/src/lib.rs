//! Period calculator.
//!
//! The staking contracts count time in discrete periods:
//! `period(t) = floor((t - epoch) / period_length)`. Everything here is pure
//! integer arithmetic with no clock access; callers pass the timestamp.

pub mod calculator;
pub mod error;

pub use calculator::PeriodCalculator;
pub use error::PeriodError;
