//! Conversions between 8-bit samples and normalized `f32` values.

/// Map an 8-bit sample to `[0, 1]`.
pub(crate) fn to_unit(value: u8) -> f32 {
    f32::from(value) / 255.0
}

/// Map a normalized value back to 8 bits, clamping to `[0, 1]` and
/// rounding to nearest. NaN maps to 0.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn from_unit(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_byte_survives_a_round_trip() {
        for v in 0..=u8::MAX {
            assert_eq!(from_unit(to_unit(v)), v);
        }
    }

    #[test]
    fn out_of_range_values_clamp() {
        assert_eq!(from_unit(-0.3), 0);
        assert_eq!(from_unit(1.7), 255);
        assert_eq!(from_unit(f32::INFINITY), 255);
        assert_eq!(from_unit(f32::NAN), 0);
    }
}
