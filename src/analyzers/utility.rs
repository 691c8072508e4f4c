/// Computes the arithmetic mean of a slice of values. Returns 0.0 for empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Computes the population standard deviation given a pre-computed mean.
/// Returns 0.0 for empty input.
pub fn stddev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    variance.sqrt()
}

/// Median of the values; the mean of the two middle values for even lengths.
/// Returns 0.0 for empty input.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Most decimal places worth keeping in an `f64` grade.
pub const MAX_ROUND_DIGITS: u32 = 12;

/// Rounds half away from zero to `digits` decimal places, capped at
/// [`MAX_ROUND_DIGITS`].
pub fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits.min(MAX_ROUND_DIGITS) as i32);
    (value * factor).round() / factor
}
