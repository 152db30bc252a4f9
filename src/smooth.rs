//! Smoothing primitives that keep control-value changes click-free.

/*
Value Smoothing
===============

Setting a parameter directly creates a step discontinuity in the signal that
consumes it, and steps are audible as clicks or zipper noise. Every component
in this crate that accepts a "new value" therefore runs it through one of
these smoothers before the audio math sees it.

Vocabulary
----------

  target      The value most recently requested. Where the smoother is headed.

  current     The value the audio math actually reads this step. Approaches
              the target over time.

  instantize  Skip the approach and jump straight to the target. Used on the
              very first value a smoother sees, so a voice doesn't fade in
              from a meaningless zero.

Three flavors, three jobs:

  BlockRamp   Linear ramp across exactly one audio block. `new_value()` at
              the block boundary, `process()` once per sample. Reaches the
              target precisely on the block's last sample.

  LinearRamp  Linear ramp over a configurable time, advanced once per call
              (typically once per block). Used for linear-style source lag
              in the routing matrix.

  OnePoleLag  Exponential approach: v = v*(1-lp) + target*lp. Never quite
              arrives, always moving. The classic analog-feeling lag for
              modulation sources.

None of these allocate, branch into syscalls, or panic. Calling `process()`
more or fewer times than the nominal schedule is a caller bug but stays pure
arithmetic.
*/

/// Linear ramp from the previous value to the target across one block.
///
/// The first value ever set is applied instantly so nothing ramps up from
/// zero at voice start.
#[derive(Debug, Clone, Copy)]
pub struct BlockRamp {
    current: f32,
    target: f32,
    delta: f32,
    steps_remaining: u32,
    block_size: u32,
    first_run: bool,
}

impl BlockRamp {
    pub fn new(block_size: usize) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            delta: 0.0,
            steps_remaining: 0,
            block_size: block_size.max(1) as u32,
            first_run: true,
        }
    }

    /// Set the value to reach by the end of the current block.
    pub fn new_value(&mut self, target: f32) {
        self.target = target;
        if self.first_run {
            self.instantize();
            self.first_run = false;
            return;
        }
        self.delta = (target - self.current) / self.block_size as f32;
        self.steps_remaining = self.block_size;
    }

    /// Jump to the target immediately.
    pub fn instantize(&mut self) {
        self.current = self.target;
        self.delta = 0.0;
        self.steps_remaining = 0;
    }

    /// Advance one sample. Call once per sample within the block.
    #[inline]
    pub fn process(&mut self) -> f32 {
        if self.steps_remaining > 0 {
            self.current += self.delta;
            self.steps_remaining -= 1;
            if self.steps_remaining == 0 {
                // land exactly, no float drift
                self.current = self.target;
            }
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }
}

/// Linear lag over a configured time, advanced once per call.
///
/// Where [`BlockRamp`] always takes one block to arrive, this takes
/// `time_ms` regardless of how that maps to calls. The matrix runs one
/// `process()` per audio block, so `calls_per_sec = sample_rate / block_size`.
#[derive(Debug, Clone, Copy)]
pub struct LinearRamp {
    current: f32,
    target: f32,
    increment: f32,
    steps_remaining: u32,
    total_steps: u32,
}

impl LinearRamp {
    pub fn new(time_ms: f32, calls_per_sec: f32) -> Self {
        let total_steps = ((time_ms / 1000.0) * calls_per_sec) as u32;
        Self {
            current: 0.0,
            target: 0.0,
            increment: 0.0,
            steps_remaining: 0,
            total_steps,
        }
    }

    /// Change the ramp time. Applies from the next `set_target`; a ramp
    /// already in progress keeps its old increment.
    pub fn set_time(&mut self, time_ms: f32, calls_per_sec: f32) {
        self.total_steps = ((time_ms / 1000.0) * calls_per_sec) as u32;
    }

    /// Begin ramping toward `target` from the current value.
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
        if self.total_steps == 0 {
            self.current = target;
            self.steps_remaining = 0;
            return;
        }
        self.increment = (target - self.current) / self.total_steps as f32;
        self.steps_remaining = self.total_steps;
    }

    /// Force both current and target, cancelling any ramp in progress.
    pub fn snap_to(&mut self, value: f32) {
        self.current = value;
        self.target = value;
        self.increment = 0.0;
        self.steps_remaining = 0;
    }

    #[inline]
    pub fn process(&mut self) -> f32 {
        if self.steps_remaining > 0 {
            self.current += self.increment;
            self.steps_remaining -= 1;
            if self.steps_remaining == 0 {
                self.current = self.target;
            }
        }
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }
}

/// One-pole exponential lag: `v = v*(1-lp) + target*lp`.
#[derive(Debug, Clone, Copy)]
pub struct OnePoleLag {
    current: f32,
    target: f32,
    lp: f32,
}

impl OnePoleLag {
    /// `time_ms` is the time constant tau; `calls_per_sec` is how often
    /// `process()` runs (sample rate for per-sample use, sample rate over
    /// block size for block-rate use).
    pub fn new(time_ms: f32, calls_per_sec: f32) -> Self {
        Self {
            current: 0.0,
            target: 0.0,
            lp: Self::coefficient(time_ms, calls_per_sec),
        }
    }

    /// One-pole coefficient: `1 - exp(-1 / (tau * calls_per_sec))`.
    ///
    /// Non-positive time degenerates to lp = 1.0, an instant transition.
    fn coefficient(time_ms: f32, calls_per_sec: f32) -> f32 {
        if time_ms <= 0.0 {
            return 1.0;
        }
        let tau = time_ms / 1000.0;
        1.0 - (-1.0 / (tau * calls_per_sec)).exp()
    }

    pub fn set_rate(&mut self, time_ms: f32, calls_per_sec: f32) {
        self.lp = Self::coefficient(time_ms, calls_per_sec);
    }

    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Force both current and target, killing the glide.
    pub fn snap_to(&mut self, value: f32) {
        self.current = value;
        self.target = value;
    }

    #[inline]
    pub fn process(&mut self) -> f32 {
        self.current += self.lp * (self.target - self.current);
        self.current
    }

    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_ramp_first_value_is_instant() {
        let mut ramp = BlockRamp::new(16);
        ramp.new_value(0.8);
        assert_eq!(ramp.current(), 0.8);
    }

    #[test]
    fn block_ramp_reaches_target_in_exactly_one_block() {
        let block = 16;
        let mut ramp = BlockRamp::new(block);
        ramp.new_value(0.0); // consume the first-run snap
        ramp.new_value(1.0);

        for i in 0..block {
            let v = ramp.process();
            assert!(v > 0.0, "sample {} should have moved off zero", i);
        }
        assert_eq!(ramp.current(), 1.0);

        // further steps hold the target
        assert_eq!(ramp.process(), 1.0);
    }

    #[test]
    fn block_ramp_is_monotonic_upward() {
        let mut ramp = BlockRamp::new(32);
        ramp.new_value(0.0);
        ramp.new_value(1.0);

        let mut prev = 0.0;
        for _ in 0..32 {
            let v = ramp.process();
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn linear_ramp_lands_exactly() {
        // 10ms at 1000 calls/sec = 10 steps
        let mut lag = LinearRamp::new(10.0, 1000.0);
        lag.snap_to(2.0);
        lag.set_target(4.0);

        for _ in 0..10 {
            lag.process();
        }
        assert_eq!(lag.current(), 4.0);
    }

    #[test]
    fn linear_ramp_zero_time_snaps() {
        let mut lag = LinearRamp::new(0.0, 1000.0);
        lag.set_target(3.0);
        assert_eq!(lag.current(), 3.0);
    }

    #[test]
    fn linear_ramp_retime_applies_to_the_next_target() {
        let mut lag = LinearRamp::new(10.0, 1000.0);
        lag.set_time(2.0, 1000.0); // 2 steps from here on
        lag.set_target(1.0);
        lag.process();
        assert!((lag.current() - 0.5).abs() < 1e-6);
        lag.process();
        assert_eq!(lag.current(), 1.0);
    }

    #[test]
    fn one_pole_error_decays_monotonically_without_overshoot() {
        let mut lag = OnePoleLag::new(5.0, 3000.0);
        lag.snap_to(0.0);
        lag.set_target(1.0);

        let mut prev_err = 1.0;
        for _ in 0..200 {
            let v = lag.process();
            assert!(v <= 1.0, "must never overshoot the target");
            let err = (1.0 - v).abs();
            assert!(err <= prev_err, "error must shrink every step");
            prev_err = err;
        }
        assert!(prev_err < 0.05);
    }

    #[test]
    fn one_pole_snap_kills_glide() {
        let mut lag = OnePoleLag::new(100.0, 1000.0);
        lag.set_target(1.0);
        lag.process();
        lag.snap_to(0.5);
        assert_eq!(lag.process(), 0.5);
    }
}
