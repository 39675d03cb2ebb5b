//! Note index to frequency conversion

/// Note index of concert A
pub const A4_NOTE: i32 = 69;

/// Frequency of concert A in Hz
pub const A4_FREQUENCY: f64 = 440.0;

/// Convert a semitone note index to a frequency in Hz (equal temperament, A4 = 440 Hz)
///
/// Defined for every `i32`. Notes far outside the audible range
/// saturate to `0.0` or `f64::INFINITY`.
pub fn frequency(note: i32) -> f64 {
    A4_FREQUENCY * 2f64.powf((note as f64 - A4_NOTE as f64) / 12.0)
}

/// Frequency ratio for a detune amount in cents
pub fn cents_to_ratio(cents: f64) -> f64 {
    2f64.powf(cents / 1200.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concert_a() {
        assert_eq!(frequency(69), 440.0);
    }

    #[test]
    fn test_octave_doubles() {
        assert_eq!(frequency(81), 880.0);
        assert_eq!(frequency(57), 220.0);
    }

    #[test]
    fn test_middle_c() {
        assert!((frequency(60) - 261.6256).abs() < 0.001);
    }

    #[test]
    fn test_monotonic() {
        for note in 0..127 {
            assert!(frequency(note + 1) > frequency(note));
        }
    }

    #[test]
    fn test_extreme_notes_do_not_overflow() {
        assert_eq!(frequency(i32::MIN), 0.0);
        assert_eq!(frequency(i32::MAX), f64::INFINITY);
        assert!(frequency(-1000) >= 0.0);
        assert!(frequency(20000) > frequency(200));
    }

    #[test]
    fn test_cents() {
        assert_eq!(cents_to_ratio(0.0), 1.0);
        assert!((cents_to_ratio(1200.0) - 2.0).abs() < 1e-12);
        assert!(cents_to_ratio(-6.0) < 1.0);
    }
}
