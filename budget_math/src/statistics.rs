//! Descriptive statistics
//!
//! Contains the statistics used by forecast quality scoring:
//! - Mean and population variance
//! - Coefficient of variation
//! - Mean Absolute Percentage Error (MAPE)

use crate::ratio::EPSILON;
use crate::{MathError, Result};

/// Arithmetic mean of the values
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot take the mean of an empty series".to_string(),
        ));
    }

    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance of the values
pub fn variance(values: &[f64]) -> Result<f64> {
    let mean = mean(values)?;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();

    Ok(sum_sq / values.len() as f64)
}

/// Standard deviation divided by the absolute mean
pub fn coefficient_of_variation(values: &[f64]) -> Result<f64> {
    let mean = mean(values)?;
    if mean.abs() < EPSILON {
        return Err(MathError::InvalidInput(
            "Coefficient of variation is undefined for a zero mean".to_string(),
        ));
    }

    Ok(variance(values)?.sqrt() / mean.abs())
}

/// Mean Absolute Percentage Error, in percent
///
/// Pairs whose actual value is zero carry no percentage error and are skipped.
/// At least `min_points` usable pairs are required.
pub fn mean_absolute_percentage_error(
    actual: &[f64],
    predicted: &[f64],
    min_points: usize,
) -> Result<f64> {
    if actual.len() != predicted.len() {
        return Err(MathError::InvalidInput(format!(
            "Actual length ({}) doesn't match predicted length ({})",
            actual.len(),
            predicted.len()
        )));
    }

    let errors: Vec<f64> = actual
        .iter()
        .zip(predicted.iter())
        .filter(|(a, _)| a.abs() >= EPSILON)
        .map(|(a, p)| (a - p).abs() / a.abs() * 100.0)
        .collect();

    if errors.len() < min_points.max(1) {
        return Err(MathError::InsufficientData(format!(
            "MAPE needs {} comparable points, got {}",
            min_points.max(1),
            errors.len()
        )));
    }

    mean(&errors)
}
