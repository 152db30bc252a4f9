//! Gated ADSR envelope with digital and analog stage advancement.

use std::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::rates::{phase_rate, rc_coefficient, RateMapping, TwoToX};
use super::{EnvelopeCore, Shape, Stage, ATTACK_REACHED, SILENT_EPS, V_CC};

/*
ADSR
====

The workhorse gated envelope. Gate high walks attack -> decay -> sustain;
gate low starts release from wherever the output currently sits: releasing
mid-attack must not jump to the sustain level first, or it clicks.

    Level
      1.0 ┐     ╱╲
          │    ╱  ╲___________
      S   │   ╱               ╲
          │  ╱                 ╲
      0.0 └─╱───────────────────╲──→ Time
          Attack Decay  Sustain  Release

Two stage-advance disciplines, selected per block by `AdsrParams::analog`:

  digital   Phase ramps with shape remapping, exact stage boundaries.
            Predictable, punchy, cheap.

  analog    One RC state chased toward rails, like the capacitor in a
            CEM3310-style envelope chip. The attack curve eases into the
            top because the rail sits at V_CC = 1.01, just above full
            scale; decay and release are true exponentials. Stage
            boundaries are emergent, read off the state for host queries.

Both disciplines end with the shared end-of-cycle pulse so voice lifecycle
code doesn't care which mode a patch uses.
*/

/// Per-block parameters. Times are normalized 0..1 knob values resolved
/// through the envelope's rate mapping; sustain is a plain level.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct AdsrParams {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub attack_shape: Shape,
    pub decay_shape: Shape,
    pub release_shape: Shape,
    pub analog: bool,
}

impl Default for AdsrParams {
    fn default() -> Self {
        Self {
            attack: 0.2,
            decay: 0.3,
            sustain: 0.7,
            release: 0.4,
            attack_shape: Shape::Linear,
            decay_shape: Shape::Linear,
            release_shape: Shape::Linear,
            analog: false,
        }
    }
}

/// Gated attack/decay/sustain/release generator.
///
/// `BLOCK_SIZE` fixes the output cache length at compile time; `R` selects
/// the knob-to-time encoding (defaults to the 2^x engineering encoding).
pub struct AdsrEnvelope<const BLOCK_SIZE: usize, R: RateMapping = TwoToX> {
    core: EnvelopeCore<BLOCK_SIZE>,
    sample_rate: f32,
    release_from: f32,
    _rate: PhantomData<R>,
}

impl<const BLOCK_SIZE: usize, R: RateMapping> AdsrEnvelope<BLOCK_SIZE, R> {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            core: EnvelopeCore::new(),
            sample_rate,
            release_from: 0.0,
            _rate: PhantomData,
        }
    }

    /// Gate high: start a fresh cycle from zero.
    pub fn attack(&mut self) {
        self.core.attack_from(0.0, false);
    }

    /// Gate high, continuing from `start` (retrigger out of a release).
    pub fn attack_from(&mut self, start: f32) {
        self.core.attack_from(start, false);
    }

    /// Hard stop for voice stealing.
    pub fn immediately_silence(&mut self) {
        self.core.immediately_silence();
    }

    /// Advance one audio block. Call exactly once per block with the gate
    /// state for that block.
    pub fn process_block(&mut self, params: &AdsrParams, gate: bool) {
        if params.analog {
            self.process_analog(params, gate);
        } else {
            self.process_digital(params, gate);
        }
    }

    #[inline]
    pub fn output(&self) -> f32 {
        self.core.output()
    }

    #[inline]
    pub fn out_block(&self) -> &[f32; BLOCK_SIZE] {
        self.core.out_block()
    }

    /// Read the next cached sample within the current block.
    #[inline]
    pub fn step(&mut self) -> f32 {
        self.core.step()
    }

    #[inline]
    pub fn eoc_output(&self) -> f32 {
        self.core.eoc_output()
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.core.stage()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.core.is_complete()
    }

    fn process_digital(&mut self, p: &AdsrParams, gate: bool) {
        // Gate low pulls any live stage into release, starting from the
        // CURRENT output value, not the sustain level.
        if !gate
            && matches!(
                self.core.stage(),
                Stage::Attack | Stage::Decay | Stage::Sustain
            )
        {
            self.release_from = self.core.output();
            self.core.set_stage(Stage::Release);
        }

        let sr = self.sample_rate;
        match self.core.stage() {
            Stage::Attack => {
                let phase = self
                    .core
                    .advance_phase(phase_rate::<R>(p.attack, sr, BLOCK_SIZE));
                if phase >= 1.0 {
                    self.core.update_block_to(1.0);
                    self.core.set_stage(Stage::Decay);
                } else {
                    self.core.update_block_to(p.attack_shape.apply(phase));
                }
            }
            Stage::Decay => {
                let phase = self
                    .core
                    .advance_phase(phase_rate::<R>(p.decay, sr, BLOCK_SIZE));
                if phase >= 1.0 {
                    self.core.update_block_to(p.sustain);
                    self.core.set_stage(Stage::Sustain);
                } else {
                    let t = 1.0 + (p.sustain - 1.0) * p.decay_shape.apply(phase);
                    self.core.update_block_to(t);
                }
            }
            Stage::Sustain => {
                self.core.update_block_to(p.sustain);
            }
            Stage::Release => {
                let phase = self
                    .core
                    .advance_phase(phase_rate::<R>(p.release, sr, BLOCK_SIZE));
                if phase >= 1.0 {
                    self.core.begin_eoc(sr, BLOCK_SIZE);
                } else {
                    let t = self.release_from * (1.0 - p.release_shape.apply(phase));
                    self.core.update_block_to(t);
                }
            }
            Stage::Eoc => {
                self.core.tick_eoc();
            }
            _ => {
                // Complete, and stages this flavor never enters
                self.core.update_block_to(0.0);
            }
        }
    }

    fn process_analog(&mut self, p: &AdsrParams, gate: bool) {
        match self.core.stage() {
            Stage::AnalogResidualDecay | Stage::AnalogResidualRelease => {
                self.core.tick_residual();
                return;
            }
            Stage::Eoc => {
                self.core.tick_eoc();
                return;
            }
            Stage::Complete => {
                self.core.update_block_to(0.0);
                return;
            }
            _ => {}
        }

        let coef_a = rc_coefficient::<R>(p.attack, self.sample_rate, BLOCK_SIZE);
        let coef_d = rc_coefficient::<R>(p.decay, self.sample_rate, BLOCK_SIZE);
        let coef_r = rc_coefficient::<R>(p.release, self.sample_rate, BLOCK_SIZE);

        let v_c1 = self.core.v_c1();
        let discharge = (v_c1 > ATTACK_REACHED && gate) || (self.core.discharge() && gate);
        self.core.set_discharge(discharge);

        let v_gate = if gate { V_CC } else { 0.0 };
        let v_attack = if discharge { 0.0 } else { v_gate };
        let v_decay = if discharge { p.sustain } else { V_CC };
        let v_release = v_gate;

        // The three branches are mutually exclusive by sign, so a single
        // update covers whichever segment the state is actually in.
        let diff_a = (v_attack - v_c1).max(0.0);
        let diff_d = if discharge && gate {
            v_decay - v_c1
        } else {
            (v_decay - v_c1).min(0.0)
        };
        let diff_r = (v_release - v_c1).min(0.0);

        let v = v_c1 + diff_a * coef_a + diff_d * coef_d + diff_r * coef_r;
        self.core.set_v_c1(v);

        let out = v.clamp(0.0, 1.0);
        if v < SILENT_EPS && (!gate || discharge) {
            // Silent: either released all the way down, or decayed to a
            // near-zero sustain while still gated.
            self.core.update_block_to(out);
            let residual = if gate {
                Stage::AnalogResidualDecay
            } else {
                Stage::AnalogResidualRelease
            };
            self.core
                .begin_residual(residual, self.sample_rate, BLOCK_SIZE);
            return;
        }

        // Host-visible stage labels are read off the state.
        let stage = if !gate {
            Stage::Release
        } else if !discharge {
            Stage::Attack
        } else if (v - p.sustain).abs() > 1e-4 {
            Stage::Decay
        } else {
            Stage::Sustain
        };
        if stage != self.core.stage() {
            self.core.set_stage(stage);
        }
        self.core.update_block_to(out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::rates::ExpSeconds;

    const SR: f32 = 48_000.0;
    const BLOCK: usize = 16;

    type Env = AdsrEnvelope<BLOCK, ExpSeconds>;

    fn run_until(env: &mut Env, p: &AdsrParams, gate: bool, stop: Stage, max_blocks: u32) -> u32 {
        let mut blocks = 0;
        while env.stage() != stop {
            env.process_block(p, gate);
            blocks += 1;
            assert!(blocks < max_blocks, "never reached {:?}", stop);
        }
        blocks
    }

    #[test]
    fn retrigger_resets_stage_and_phase() {
        let p = AdsrParams::default();
        let mut env = Env::new(SR);

        env.attack();
        for _ in 0..50 {
            env.process_block(&p, true);
        }
        env.process_block(&p, false); // enter release

        env.attack_from(0.0);
        assert_eq!(env.stage(), Stage::Attack);

        // and again from a terminal stage
        env.immediately_silence();
        env.attack_from(0.0);
        assert_eq!(env.stage(), Stage::Attack);
    }

    #[test]
    fn full_cycle_traverses_all_stages() {
        // short stages so the whole cycle fits in a few hundred blocks
        let p = AdsrParams {
            attack: 0.2,
            decay: 0.2,
            sustain: 0.5,
            release: 0.2,
            ..Default::default()
        };
        let mut env = Env::new(SR);
        env.attack();

        run_until(&mut env, &p, true, Stage::Decay, 2000);
        assert!((env.output() - 1.0).abs() < 1e-6, "attack peaks at 1.0");

        run_until(&mut env, &p, true, Stage::Sustain, 2000);
        assert!((env.output() - 0.5).abs() < 1e-6);

        // hold at sustain while gated
        for _ in 0..20 {
            env.process_block(&p, true);
            assert_eq!(env.stage(), Stage::Sustain);
        }

        run_until(&mut env, &p, false, Stage::Eoc, 2000);
        assert_eq!(env.output(), 0.0);
        assert_eq!(env.eoc_output(), 1.0);

        run_until(&mut env, &p, false, Stage::Complete, 2000);
        assert_eq!(env.output(), 0.0);
        assert_eq!(env.eoc_output(), 0.0);
    }

    #[test]
    fn attack_is_monotonic_under_every_shape() {
        for shape in [Shape::Convex, Shape::Linear, Shape::Concave] {
            let p = AdsrParams {
                attack: 0.5,
                attack_shape: shape,
                ..Default::default()
            };
            let mut env = Env::new(SR);
            env.attack();

            let mut prev = 0.0;
            while env.stage() == Stage::Attack {
                env.process_block(&p, true);
                assert!(
                    env.output() >= prev,
                    "{:?} attack must be non-decreasing",
                    shape
                );
                prev = env.output();
            }
        }
    }

    #[test]
    fn release_starts_from_current_level_mid_attack() {
        let p = AdsrParams {
            attack: 0.6,
            sustain: 1.0,
            ..Default::default()
        };
        let mut env = Env::new(SR);
        env.attack();

        // leave attack early, well below peak
        for _ in 0..10 {
            env.process_block(&p, true);
        }
        let level = env.output();
        assert!(level < 0.9);

        env.process_block(&p, false);
        assert_eq!(env.stage(), Stage::Release);
        assert!(
            env.output() <= level,
            "release must descend from the caught level"
        );
    }

    #[test]
    fn block_cache_ramps_smoothly() {
        let p = AdsrParams {
            attack: 0.4,
            ..Default::default()
        };
        let mut env = Env::new(SR);
        env.attack();
        env.process_block(&p, true);
        let mut prev = 0.0;
        for &s in env.out_block().iter() {
            assert!(s >= prev);
            prev = s;
        }
    }

    #[test]
    fn analog_charges_discharges_and_terminates() {
        let p = AdsrParams {
            attack: 0.3,
            decay: 0.3,
            sustain: 0.5,
            release: 0.2,
            analog: true,
            ..Default::default()
        };
        let mut env = Env::new(SR);
        env.attack();

        // charge: output must rise monotonically and never exceed 1.0
        let mut prev = 0.0;
        let mut blocks = 0;
        while env.stage() == Stage::Attack {
            env.process_block(&p, true);
            assert!(env.output() >= prev - 1e-6);
            assert!(env.output() <= 1.0);
            prev = env.output();
            blocks += 1;
            assert!(blocks < 100_000, "attack must reach the threshold");
        }
        assert_eq!(env.stage(), Stage::Decay);

        // decay toward sustain
        for _ in 0..100_000 {
            env.process_block(&p, true);
            if env.stage() == Stage::Sustain {
                break;
            }
        }
        assert!((env.output() - p.sustain).abs() < 0.01);

        // release down through the residual ramp to an exact zero
        let mut blocks = 0;
        while !env.is_complete() {
            env.process_block(&p, false);
            blocks += 1;
            assert!(blocks < 200_000, "release must terminate");
        }
        assert_eq!(env.output(), 0.0);
    }

    #[test]
    fn analog_silence_passes_through_residual_release() {
        let p = AdsrParams {
            attack: 0.1,
            release: 0.1,
            analog: true,
            ..Default::default()
        };
        let mut env = Env::new(SR);
        env.attack();
        for _ in 0..500 {
            env.process_block(&p, true);
        }

        let mut saw_residual = false;
        for _ in 0..200_000 {
            env.process_block(&p, false);
            if env.stage() == Stage::AnalogResidualRelease {
                saw_residual = true;
                assert_eq!(env.eoc_output(), 1.0);
            }
            if env.is_complete() {
                break;
            }
        }
        assert!(saw_residual, "termination must pass through the residual stage");
        assert!(env.is_complete());
    }
}
