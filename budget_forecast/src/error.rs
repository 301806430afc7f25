//! Error types for the budget_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the budget_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// The historical dataset cannot be used; nothing was computed
    #[error("Data validation error: {0}")]
    DataValidation(#[from] DataValidationError),

    /// A configuration value is out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Fatal problems with the historical dataset
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DataValidationError {
    #[error("required column '{column}' is missing")]
    MissingColumn { column: String },

    #[error("no rows found for required year {year}")]
    MissingYear { year: i32 },

    #[error("group '{group}' has no rows in {first_year} or {second_year}")]
    EmptyGroup {
        group: String,
        first_year: i32,
        second_year: i32,
    },

    #[error("year {value} at row {row} is out of range")]
    InvalidYear { row: usize, value: i64 },

    #[error("invalid month {month} for group '{group}' in {year}")]
    InvalidMonth { year: i32, group: String, month: i64 },

    #[error("column '{column}' has a missing value at row {row}")]
    MissingValue { column: String, row: usize },

    #[error("column '{column}' has non-finite value {value} for group '{group}' in {year}-{month:02}")]
    InvalidValue {
        column: String,
        year: i32,
        month: u32,
        group: String,
        value: f64,
    },

    #[error("dataset contains no rows")]
    EmptyDataset,
}

/// A parameter value that is neither a number nor the reset marker
#[derive(Debug, Clone, PartialEq, Error)]
#[error("cannot parse '{raw}' for {table} as a rate or reset marker")]
pub struct ParameterError {
    /// Parameter table the value came from
    pub table: String,
    /// Raw input as supplied
    pub raw: String,
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
