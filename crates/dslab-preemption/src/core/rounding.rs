//! Deterministic rounding of capacity values.
//!
//! Capacity accounting is updated by many additions and subtractions during a long simulation.
//! Every result is rounded to a fixed number of decimal digits to keep binary floating-point error
//! from accumulating, so that `a + b - b == a` holds for the stored values.

/// Default number of decimal digits kept by capacity values.
pub const DEFAULT_PRECISION: u32 = 9;

/// Largest supported precision, `f64` keeps at most 15 significant decimal digits.
pub const MAX_PRECISION: u32 = 15;

/// Rounds `value` to `precision` decimal digits.
///
/// Precision above [`MAX_PRECISION`] is treated as [`MAX_PRECISION`].
pub fn round(value: f64, precision: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(precision.min(MAX_PRECISION) as i32);
    let rounded = (value * factor).round() / factor;
    // normalizes -0.0 so that equal capacities are equal bitwise
    if rounded == 0. {
        0.
    } else {
        rounded
    }
}
