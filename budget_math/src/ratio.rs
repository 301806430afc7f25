//! Ratios with an explicit answer for a zero denominator
//!
//! Budget figures routinely contain empty months and new product groups, so
//! every division here reports a zero denominator as `None` and leaves the
//! fallback to the caller.

/// Denominators with a smaller magnitude are treated as zero
pub const EPSILON: f64 = 1e-9;

/// Divide `numerator` by `denominator`, or `None` when the denominator is zero or not finite
pub fn checked_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    if !denominator.is_finite() || denominator.abs() < EPSILON {
        return None;
    }

    Some(numerator / denominator)
}

/// Divide, substituting zero for a zero denominator
pub fn ratio_or_zero(numerator: f64, denominator: f64) -> f64 {
    checked_ratio(numerator, denominator).unwrap_or(0.0)
}

/// Period-over-period growth as a fraction (0.2 = 20%)
pub fn growth_rate(previous: f64, current: f64) -> Option<f64> {
    checked_ratio(current - previous, previous)
}

/// Share of the total held by each value, or `None` when the values sum to zero
pub fn shares(values: &[f64]) -> Option<Vec<f64>> {
    let total: f64 = values.iter().sum();
    if total.abs() < EPSILON {
        return None;
    }

    Some(values.iter().map(|v| v / total).collect())
}
