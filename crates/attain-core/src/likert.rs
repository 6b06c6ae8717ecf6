//! Likert scoring: percentage averages to 1-5 competency levels

/// Lower bound (inclusive) of each level above 1, highest first
const THRESHOLDS: [(f64, u8); 4] = [(90.0, 5), (80.0, 4), (70.0, 3), (60.0, 2)];

/// Lowest competency level
pub const MIN_LEVEL: u8 = 1;

/// Highest competency level
pub const MAX_LEVEL: u8 = 5;

/// Convert a raw 0-100 average into a competency level.
///
/// Anything below 60, including NaN, is level 1.
pub fn to_likert(score: f64) -> u8 {
    THRESHOLDS
        .iter()
        .find(|(bound, _)| score >= *bound)
        .map_or(MIN_LEVEL, |(_, level)| *level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_boundaries_are_exact() {
        assert_eq!(to_likert(90.0), 5);
        assert_eq!(to_likert(89.999), 4);
        assert_eq!(to_likert(80.0), 4);
        assert_eq!(to_likert(70.0), 3);
        assert_eq!(to_likert(60.0), 2);
        assert_eq!(to_likert(59.999), 1);
    }

    #[test]
    fn test_out_of_range_inputs() {
        assert_eq!(to_likert(0.0), 1);
        assert_eq!(to_likert(-5.0), 1);
        assert_eq!(to_likert(104.0), 5);
        assert_eq!(to_likert(f64::NAN), 1);
    }

    proptest! {
        #[test]
        fn level_is_always_in_range(score in -1000.0f64..1000.0) {
            let level = to_likert(score);
            prop_assert!((MIN_LEVEL..=MAX_LEVEL).contains(&level));
        }

        #[test]
        fn level_is_monotonic(a in 0.0f64..100.0, b in 0.0f64..100.0) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(to_likert(lo) <= to_likert(hi));
        }
    }
}
