//! Knob-to-time encodings for envelope stage rates.

use crate::MIN_TIME;

/*
Rate Encodings
==============

Envelope stage times arrive as normalized 0..1 knob values and must become
a per-block phase increment. Two encodings cover the hardware conventions:

  TwoToX      time = 2^x seconds, with x swept linearly across a fixed
              exponent range as the knob turns. The classic "2^-x"
              engineering encoding: every equal knob move halves or
              doubles the time. Range here is 2^-8 (~4ms) to 2^5 (32s).

  ExpSeconds  time swept exponentially between a min and max expressed
              directly in seconds (1ms to 30s). The same perceptual feel
              with endpoints that read naturally in a UI.

The phase increment for a block is then simply

    increment = block_size / (sample_rate * time)

so a stage crosses phase 1.0 after `time` seconds of blocks. Times are
floored to one sample so a zero knob can never produce a zero divisor.
*/

/// Converts a normalized 0..1 knob value to a stage time in seconds.
pub trait RateMapping {
    fn time_seconds(norm: f32) -> f32;
}

/// `2^x` seconds across the exponent range [`TwoToX::ET_MIN`]..[`TwoToX::ET_MAX`].
pub struct TwoToX;

impl TwoToX {
    pub const ET_MIN: f32 = -8.0;
    pub const ET_MAX: f32 = 5.0;
}

impl RateMapping for TwoToX {
    #[inline]
    fn time_seconds(norm: f32) -> f32 {
        let x = Self::ET_MIN + norm * (Self::ET_MAX - Self::ET_MIN);
        x.exp2()
    }
}

/// Exponential sweep between [`ExpSeconds::MIN_SECONDS`] and
/// [`ExpSeconds::MAX_SECONDS`].
pub struct ExpSeconds;

impl ExpSeconds {
    pub const MIN_SECONDS: f32 = 0.001;
    pub const MAX_SECONDS: f32 = 30.0;
}

impl RateMapping for ExpSeconds {
    #[inline]
    fn time_seconds(norm: f32) -> f32 {
        let ratio = Self::MAX_SECONDS / Self::MIN_SECONDS;
        Self::MIN_SECONDS * ratio.powf(norm)
    }
}

/// Per-block phase increment for a stage whose knob sits at `norm`.
#[inline]
pub(crate) fn phase_rate<R: RateMapping>(norm: f32, sample_rate: f32, block_size: usize) -> f32 {
    let time = R::time_seconds(norm).max(MIN_TIME);
    block_size as f32 / (sample_rate * time)
}

/// Per-block one-pole coefficient for an RC segment with the given time.
#[inline]
pub(crate) fn rc_coefficient<R: RateMapping>(
    norm: f32,
    sample_rate: f32,
    block_size: usize,
) -> f32 {
    let time = R::time_seconds(norm).max(MIN_TIME);
    let dt = block_size as f32 / sample_rate;
    1.0 - (-dt / time).exp()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_to_x_spans_the_exponent_range() {
        assert!((TwoToX::time_seconds(0.0) - (-8.0f32).exp2()).abs() < 1e-9);
        assert!((TwoToX::time_seconds(1.0) - 32.0).abs() < 1e-4);
    }

    #[test]
    fn two_to_x_halves_per_equal_knob_move() {
        // 13 exponent units over the full throw; 1/13 of the throw = one octave
        let step = 1.0 / (TwoToX::ET_MAX - TwoToX::ET_MIN);
        let t0 = TwoToX::time_seconds(0.5);
        let t1 = TwoToX::time_seconds(0.5 + step);
        assert!((t1 / t0 - 2.0).abs() < 1e-3);
    }

    #[test]
    fn exp_seconds_hits_endpoints() {
        assert!((ExpSeconds::time_seconds(0.0) - 0.001).abs() < 1e-7);
        assert!((ExpSeconds::time_seconds(1.0) - 30.0).abs() < 1e-3);
    }

    #[test]
    fn phase_rate_crosses_one_after_the_stage_time() {
        // 2^0 = 1 second at norm where x = 0: norm = 8/13
        let norm = 8.0 / 13.0;
        let rate = phase_rate::<TwoToX>(norm, 48_000.0, 16);
        let blocks_per_second = 48_000.0 / 16.0;
        assert!((rate * blocks_per_second - 1.0).abs() < 1e-3);
    }

    #[test]
    fn zero_time_is_floored_to_one_sample() {
        let rate = phase_rate::<ExpSeconds>(-10.0, 48_000.0, 16);
        assert!(rate.is_finite());
        assert!(rate > 0.0);
    }

    #[test]
    fn rc_coefficient_stays_in_unit_interval() {
        for norm in [0.0, 0.25, 0.5, 0.75, 1.0] {
            let c = rc_coefficient::<TwoToX>(norm, 48_000.0, 16);
            assert!(c > 0.0 && c < 1.0, "coefficient {} out of (0,1)", c);
        }
    }
}
