//! Numeric helpers for map arithmetic.

/// Default number of decimal places kept by [`format_num`].
pub const DEFAULT_PRECISION: u32 = 6;

/// Wraps `x` into `[range.0, range.1)` by modulo.
///
/// The result is always smaller than `range.1` unless `include_max` is set
/// and `x` is exactly the maximum. Used for longitude wrapping.
pub fn wrap_num(x: f64, range: (f64, f64), include_max: bool) -> f64 {
    let (min, max) = range;
    let d = max - min;
    if x == max && include_max {
        x
    } else {
        ((x - min) % d + d) % d + min
    }
}

/// Rounds `num` to `precision` decimal places.
pub fn format_num(num: f64, precision: u32) -> f64 {
    let pow = 10f64.powi(precision as i32);
    (num * pow).round() / pow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_into_range() {
        assert_eq!(wrap_num(190.0, (-180.0, 180.0), false), -170.0);
        assert_eq!(wrap_num(-190.0, (-180.0, 180.0), false), 170.0);
        assert_eq!(wrap_num(0.0, (-180.0, 180.0), false), 0.0);
    }

    #[test]
    fn max_wraps_to_min_unless_included() {
        assert_eq!(wrap_num(180.0, (-180.0, 180.0), false), -180.0);
        assert_eq!(wrap_num(180.0, (-180.0, 180.0), true), 180.0);
    }

    #[test]
    fn rounds_to_requested_precision() {
        assert_eq!(format_num(1.23456789, 4), 1.2346);
        assert_eq!(format_num(1.5, 0), 2.0);
        assert_eq!(format_num(1.23456789, DEFAULT_PRECISION), 1.234568);
    }
}
