//! # Budget Math
//!
//! Numeric helpers shared by the sales budget crates.
//! This crate provides zero-guarded ratios, growth rates and the descriptive
//! statistics used to score forecast quality.

use thiserror::Error;

pub mod ratio;
pub mod statistics;

pub use ratio::{checked_ratio, growth_rate, ratio_or_zero, shares};
pub use statistics::{coefficient_of_variation, mean, mean_absolute_percentage_error, variance};

/// Errors that can occur in budget calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for budget math operations
pub type Result<T> = std::result::Result<T, MathError>;
