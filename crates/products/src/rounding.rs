//! Float rounding to a unit precision.

use core::cmp::Ordering;

/// Precision used when a unit does not define one.
pub const DEFAULT_PRECISION: f64 = 0.01;

const MAX_DIGITS: i32 = 15;

fn effective_precision(precision: f64) -> f64 {
    if precision.is_finite() && precision > 0.0 {
        precision
    } else {
        DEFAULT_PRECISION
    }
}

/// Number of decimals needed to write `precision` exactly (0.01 -> 2, 0.5 -> 1, 1.0 -> 0).
fn decimal_digits(precision: f64) -> i32 {
    (0..MAX_DIGITS)
        .find(|&digits| {
            let scaled = precision * 10f64.powi(digits);
            (scaled - scaled.round()).abs() < 1e-9 * scaled.max(1.0)
        })
        .unwrap_or(MAX_DIGITS)
}

/// Round `value` to the nearest multiple of `precision`, halves away from zero.
///
/// The normalized value is nudged by one ulp before rounding so that a decimal
/// half such as `2.675` (stored as `2.67499999...`) rounds up at 0.01. The
/// result is snapped to the precision's decimal digits.
pub fn float_round(value: f64, precision: f64) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return if value == 0.0 { 0.0 } else { value };
    }
    let precision = effective_precision(precision);

    let normalized = value / precision;
    let epsilon = 2f64.powf(normalized.abs().log2() - 52.0);
    let rounded = (normalized + normalized.signum() * epsilon).round();

    let scale = 10f64.powi(decimal_digits(precision));
    let result = (rounded * precision * scale).round() / scale;
    if result == 0.0 { 0.0 } else { result }
}

/// True when `value` rounds to zero at `precision`.
pub fn float_is_zero(value: f64, precision: f64) -> bool {
    let precision = effective_precision(precision);
    float_round(value, precision).abs() < precision
}

/// Compare two values after rounding both to `precision`.
pub fn float_compare(a: f64, b: f64, precision: f64) -> Ordering {
    let delta = float_round(a, precision) - float_round(b, precision);
    if float_is_zero(delta, precision) {
        Ordering::Equal
    } else if delta < 0.0 {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_hundredths() {
        assert_eq!(float_round(1.9999992, 0.01), 2.0);
        assert_eq!(float_round(0.0833333, 0.01), 0.08);
        assert_eq!(float_round(3.14159, 0.01), 3.14);
    }

    #[test]
    fn decimal_halves_round_away_from_zero() {
        assert_eq!(float_round(2.675, 0.01), 2.68);
        assert_eq!(float_round(-2.675, 0.01), -2.68);
        assert_eq!(float_round(0.125, 0.01), 0.13);
        assert_eq!(float_round(2.5, 1.0), 3.0);
    }

    #[test]
    fn coarse_and_odd_precisions() {
        assert_eq!(float_round(7.3, 0.5), 7.5);
        assert_eq!(float_round(7.2, 0.5), 7.0);
        assert_eq!(float_round(1234.0, 100.0), 1200.0);
        assert_eq!(float_round(0.2, 0.0833), 0.1666);
    }

    #[test]
    fn invalid_precision_uses_default() {
        assert_eq!(float_round(1.23456, 0.0), 1.23);
        assert_eq!(float_round(1.23456, -1.0), 1.23);
        assert_eq!(float_round(1.23456, f64::NAN), 1.23);
    }

    #[test]
    fn zero_and_non_finite_pass_through() {
        assert_eq!(float_round(0.0, 0.01), 0.0);
        assert!(float_round(-0.0, 0.01).is_sign_positive());
        assert!(float_round(f64::NAN, 0.01).is_nan());
        assert_eq!(float_round(f64::INFINITY, 0.01), f64::INFINITY);
    }

    #[test]
    fn tiny_values_do_not_leave_negative_zero() {
        let r = float_round(-0.001, 0.01);
        assert_eq!(r, 0.0);
        assert!(r.is_sign_positive());
    }

    #[test]
    fn zero_and_compare_helpers() {
        assert!(float_is_zero(0.004, 0.01));
        assert!(!float_is_zero(0.005, 0.01));
        assert_eq!(float_compare(1.001, 1.004, 0.01), Ordering::Equal);
        assert_eq!(float_compare(1.0, 1.02, 0.01), Ordering::Less);
        assert_eq!(float_compare(2.0, 1.98, 0.01), Ordering::Greater);
    }
}
