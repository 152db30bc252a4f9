//! Envelope generator state machines sharing one block-ramped core.
//!
//! Every flavor in this module is the same machine wearing a different set
//! of stages: a [`Stage`] enum, a phase accumulator (or an RC state variable
//! in analog mode), and a per-block output cache that linearly interpolates
//! from the previous block's last sample to the new block target. Flavors
//! differ only in which stages exist and how the gate moves between them.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::smooth::BlockRamp;

/// Gated attack/decay/sustain/release, digital and analog modes.
pub mod adsr;
/// One-shot delay/attack/hold/decay and gate-stretched attack/release.
pub mod dahd;
/// Gated delay/attack/hold/decay/sustain/release, with shaped segments.
pub mod dahdsr;
/// Normalized-knob to stage-time encodings.
pub mod rates;
/// Cross-thread gate messaging over a lock-free queue.
#[cfg(feature = "rtrb")]
pub mod remote;

pub use adsr::{AdsrEnvelope, AdsrParams};
pub use dahd::{AdarEnvelope, AdarParams, DahdEnvelope, DahdParams};
pub use dahdsr::{AhdsrEnvelope, AhdsrParams, DahdsrEnvelope, DahdsrParams};
pub use rates::{ExpSeconds, RateMapping, TwoToX};
#[cfg(feature = "rtrb")]
pub use remote::{GateHandle, GateMessage, SharedAdsr};

/*
Stage Machine Core
==================

Hosts drive an envelope once per audio block:

    env.attack();                       // note on
    loop per block {
        env.process_block(&params, gate);
        for i in 0..BLOCK { amp[i] *= env.out_block()[i]; }
    }
    if env.stage() == Stage::Complete { recycle the voice; }

Within a block the output is a straight line from wherever the previous
block ended to the target computed for this block's end. That per-block
ramp is what makes retriggers and fast gates click-free: a new attack
starts its line from the last sample actually played, never from zero.

Two stage-advance disciplines share the cache:

  digital   Each stage owns a phase in [0,1], incremented per block by a
            rate derived from the stage's time parameter. Crossing 1.0
            moves to the next stage. Segment shapes (square root, linear,
            cubic) remap the phase before it becomes the target.

  analog    One RC state `v_c1` charges toward a rail slightly above full
            scale, then discharges toward sustain and eventually zero,
            like a capacitor around a comparator. The discharge flag flips
            once the attack threshold is reached. The thresholds below are
            tuned values; conforming output depends on them bit-for-bit.

End of life is signaled, not inferred: after release finishes, the stage
sits in `Eoc` for roughly ten milliseconds of blocks with `eoc_output()`
high, so hosts can run one-shot logic (voice recycling, round-robin
advance) on a clean edge, then settles in `Complete`.
*/

/// Attack rail voltage for analog mode. The capacitor charges toward this,
/// slightly past full scale, so the attack knee lands above 1.0 and output
/// clamps flat before discharge begins.
pub const V_CC: f32 = 1.01;

/// Attack is considered complete once `v_c1` crosses this.
pub const ATTACK_REACHED: f32 = 0.99999;

/// Below this the analog envelope counts as silent.
pub const SILENT_EPS: f32 = 1e-6;

/// Length of the end-of-cycle window in seconds (and of the analog
/// residual ramp-to-zero).
const EOC_SECONDS: f32 = 0.01;

/// How many blocks the end-of-cycle window spans at the given rates.
#[inline]
pub(crate) fn eoc_blocks(sample_rate: f32, block_size: usize) -> u32 {
    ((EOC_SECONDS * sample_rate / block_size as f32).ceil() as u32).max(1)
}

/// The stage an envelope instance is currently in. Exactly one is active.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Delay,
    Attack,
    Decay,
    Sustain,
    Hold,
    Release,
    /// Analog decay dropped below [`SILENT_EPS`]; ramping the cache to an
    /// exact zero over the end-of-cycle window.
    AnalogResidualDecay,
    /// Analog release dropped below [`SILENT_EPS`]; same ramp-out.
    AnalogResidualRelease,
    /// Output is zero, `eoc_output` is high for a short countdown.
    Eoc,
    /// Silent and idle.
    Complete,
}

/// Segment shape selector: 0 = square root (convex), 1 = linear,
/// 2 = cubic (concave). All three are monotonic on [0,1].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Shape {
    Convex,
    #[default]
    Linear,
    Concave,
}

impl Shape {
    /// Remap a raw phase in [0,1].
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Shape::Convex => x.max(0.0).sqrt(),
            Shape::Linear => x,
            Shape::Concave => x * x * x,
        }
    }
}

/// Shared state for every envelope flavor: current stage, phase (or RC
/// state), the per-block output cache, and the end-of-cycle countdown.
///
/// `BLOCK_SIZE` is the host's audio block length in samples; the cache is
/// sized by it at compile time so processing never allocates.
#[derive(Debug, Clone)]
pub struct EnvelopeCore<const BLOCK_SIZE: usize> {
    stage: Stage,
    phase: f32,
    out: [f32; BLOCK_SIZE],
    out_index: usize,
    ramp: BlockRamp,
    eoc_countdown: u32,
    residual_countdown: u32,
    residual_total: u32,
    residual_from: f32,
    eoc_output: f32,
    // analog mode
    v_c1: f32,
    discharge: bool,
}

impl<const BLOCK_SIZE: usize> EnvelopeCore<BLOCK_SIZE> {
    pub fn new() -> Self {
        Self {
            stage: Stage::Complete,
            phase: 0.0,
            out: [0.0; BLOCK_SIZE],
            out_index: 0,
            ramp: BlockRamp::new(BLOCK_SIZE),
            eoc_countdown: 0,
            residual_countdown: 0,
            residual_total: 0,
            residual_from: 0.0,
            eoc_output: 0.0,
            v_c1: 0.0,
            discharge: false,
        }
    }

    /// Enter the first active stage. `start` is the value the new cycle
    /// continues from (0.0 for a fresh note, the current output when
    /// retriggering out of a release). The output cache is NOT reset:
    /// the next block ramps from the last sample actually played.
    pub fn attack_from(&mut self, start: f32, has_delay: bool) {
        self.stage = if has_delay { Stage::Delay } else { Stage::Attack };
        self.phase = start.clamp(0.0, 1.0);
        self.v_c1 = start.clamp(0.0, 1.0);
        self.discharge = false;
        self.eoc_countdown = 0;
        self.residual_countdown = 0;
        self.eoc_output = 0.0;
    }

    /// Hard stop: silent, idle, all caches zeroed. For voice stealing.
    pub fn immediately_silence(&mut self) {
        self.stage = Stage::Complete;
        self.phase = 0.0;
        self.out = [0.0; BLOCK_SIZE];
        self.out_index = 0;
        self.ramp.new_value(0.0);
        self.ramp.instantize();
        self.eoc_countdown = 0;
        self.residual_countdown = 0;
        self.eoc_output = 0.0;
        self.v_c1 = 0.0;
        self.discharge = false;
    }

    /// Fill the cache with a line from the previous block's end to `target`.
    ///
    /// The ramp's first-run rule carries over: the very first block ever
    /// rendered snaps instead of ramping, so a fresh envelope doesn't glide
    /// up from an arbitrary zero.
    pub fn update_block_to(&mut self, target: f32) {
        self.ramp.new_value(target);
        for slot in self.out.iter_mut() {
            *slot = self.ramp.process();
        }
        self.out_index = 0;
    }

    /// Read the next cached sample and advance. Past the end of the block
    /// (a caller bug) the last sample repeats rather than wrapping.
    #[inline]
    pub fn step(&mut self) -> f32 {
        let v = self.out[self.out_index];
        if self.out_index + 1 < BLOCK_SIZE {
            self.out_index += 1;
        }
        v
    }

    /// The cached per-sample ramp for the current block.
    #[inline]
    pub fn out_block(&self) -> &[f32; BLOCK_SIZE] {
        &self.out
    }

    /// The value at the end of the current block.
    #[inline]
    pub fn output(&self) -> f32 {
        self.ramp.current()
    }

    /// 1.0 while the end-of-cycle pulse is active, else 0.0.
    #[inline]
    pub fn eoc_output(&self) -> f32 {
        self.eoc_output
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.stage == Stage::Complete
    }

    #[inline]
    pub(crate) fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
        self.phase = 0.0;
    }

    #[inline]
    pub(crate) fn advance_phase(&mut self, rate: f32) -> f32 {
        self.phase += rate;
        self.phase
    }

    #[inline]
    pub(crate) fn v_c1(&self) -> f32 {
        self.v_c1
    }

    #[inline]
    pub(crate) fn set_v_c1(&mut self, v: f32) {
        self.v_c1 = v;
    }

    #[inline]
    pub(crate) fn discharge(&self) -> bool {
        self.discharge
    }

    #[inline]
    pub(crate) fn set_discharge(&mut self, discharge: bool) {
        self.discharge = discharge;
    }

    /// Begin the end-of-cycle pulse: output zero, `eoc_output` high for
    /// a ~10ms countdown of blocks.
    pub(crate) fn begin_eoc(&mut self, sample_rate: f32, block_size: usize) {
        self.stage = Stage::Eoc;
        self.eoc_countdown = eoc_blocks(sample_rate, block_size);
        self.eoc_output = 1.0;
        self.update_block_to(0.0);
    }

    /// One block of the end-of-cycle stage. Returns true while still in it.
    pub(crate) fn tick_eoc(&mut self) -> bool {
        self.update_block_to(0.0);
        if self.eoc_countdown > 0 {
            self.eoc_countdown -= 1;
        }
        if self.eoc_countdown == 0 {
            self.stage = Stage::Complete;
            self.eoc_output = 0.0;
            return false;
        }
        true
    }

    /// Begin an analog residual stage: ramp the cache from the current
    /// sub-epsilon value to an exact zero over the end-of-cycle window,
    /// with the eoc pulse high for the duration.
    pub(crate) fn begin_residual(&mut self, stage: Stage, sample_rate: f32, block_size: usize) {
        debug_assert!(matches!(
            stage,
            Stage::AnalogResidualDecay | Stage::AnalogResidualRelease
        ));
        self.stage = stage;
        self.residual_total = eoc_blocks(sample_rate, block_size);
        self.residual_countdown = self.residual_total;
        self.residual_from = self.ramp.current();
        self.eoc_output = 1.0;
    }

    /// One block of a residual stage. Returns true while still in it.
    pub(crate) fn tick_residual(&mut self) -> bool {
        if self.residual_countdown > 0 {
            self.residual_countdown -= 1;
        }
        let remaining = self.residual_countdown as f32 / self.residual_total.max(1) as f32;
        self.update_block_to(self.residual_from * remaining);
        if self.residual_countdown == 0 {
            self.stage = Stage::Complete;
            self.eoc_output = 0.0;
            self.v_c1 = 0.0;
            return false;
        }
        true
    }
}

impl<const BLOCK_SIZE: usize> Default for EnvelopeCore<BLOCK_SIZE> {
    fn default() -> Self {
        Self::new()
    }
}
