//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Round a f64 and clamp it to the u8 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_u8(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    let clamped = value.clamp(0.0, f64::from(u8::MAX)).round();
    cast::<f64, u8>(clamped).unwrap_or(0)
}

/// Mean of two small scores as a float.
#[must_use]
pub fn mean_u8(a: u8, b: u8) -> f64 {
    (f64::from(a) + f64::from(b)) / 2.0
}

/// `round(numerator / denominator * 100)`, 0 when the denominator is zero.
#[must_use]
pub fn percent_of(numerator: u16, denominator: u16) -> u8 {
    if denominator == 0 {
        return 0;
    }
    round_f64_to_u8(f64::from(numerator) / f64::from(denominator) * 100.0)
}
