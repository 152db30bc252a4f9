//! One-shot envelope flavors: DAHD and the gate-stretched ADAR.

use std::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::rates::{phase_rate, RateMapping, TwoToX};
use super::{EnvelopeCore, Shape, Stage};

/*
One-Shots
=========

DAHD fires once and runs to completion on its own: wait out the delay,
attack to full, hold, decay to zero, pulse end-of-cycle, done. The gate is
only the trigger; releasing it changes nothing. This is the percussion and
transient-shaper envelope.

ADAR sits between one-shot and gated: attack to full, then

  gate already low at the peak  ->  release immediately (behaves as AD)
  gate still high at the peak   ->  hold full until the gate drops (AR)

which is the useful "short tap = blip, held key = gate" behavior for
auto-bend and transient envelopes.

Knob values at hard zero disable their stage (no delay / no hold) rather
than requesting the minimum time; anything above zero resolves through the
rate mapping as usual.
*/

/// Per-block parameters for [`DahdEnvelope`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct DahdParams {
    pub delay: f32,
    pub attack: f32,
    pub hold: f32,
    pub decay: f32,
    pub attack_shape: Shape,
    pub decay_shape: Shape,
}

impl Default for DahdParams {
    fn default() -> Self {
        Self {
            delay: 0.0,
            attack: 0.1,
            hold: 0.2,
            decay: 0.4,
            attack_shape: Shape::Linear,
            decay_shape: Shape::Linear,
        }
    }
}

/// One-shot delay/attack/hold/decay generator. Triggered, never gated.
pub struct DahdEnvelope<const BLOCK_SIZE: usize, R: RateMapping = TwoToX> {
    core: EnvelopeCore<BLOCK_SIZE>,
    sample_rate: f32,
    _rate: PhantomData<R>,
}

impl<const BLOCK_SIZE: usize, R: RateMapping> DahdEnvelope<BLOCK_SIZE, R> {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            core: EnvelopeCore::new(),
            sample_rate,
            _rate: PhantomData,
        }
    }

    /// Fire the envelope. A zero delay knob skips straight to attack.
    pub fn attack(&mut self, params: &DahdParams) {
        self.core.attack_from(0.0, params.delay > 0.0);
    }

    pub fn immediately_silence(&mut self) {
        self.core.immediately_silence();
    }

    /// Advance one audio block. No gate: the cycle runs unattended.
    pub fn process_block(&mut self, p: &DahdParams) {
        let sr = self.sample_rate;
        match self.core.stage() {
            Stage::Delay => {
                let phase = self
                    .core
                    .advance_phase(phase_rate::<R>(p.delay, sr, BLOCK_SIZE));
                self.core.update_block_to(0.0);
                if phase >= 1.0 {
                    self.core.set_stage(Stage::Attack);
                }
            }
            Stage::Attack => {
                let phase = self
                    .core
                    .advance_phase(phase_rate::<R>(p.attack, sr, BLOCK_SIZE));
                if phase >= 1.0 {
                    self.core.update_block_to(1.0);
                    self.core.set_stage(if p.hold > 0.0 {
                        Stage::Hold
                    } else {
                        Stage::Decay
                    });
                } else {
                    self.core.update_block_to(p.attack_shape.apply(phase));
                }
            }
            Stage::Hold => {
                let phase = self
                    .core
                    .advance_phase(phase_rate::<R>(p.hold, sr, BLOCK_SIZE));
                self.core.update_block_to(1.0);
                if phase >= 1.0 {
                    self.core.set_stage(Stage::Decay);
                }
            }
            Stage::Decay => {
                let phase = self
                    .core
                    .advance_phase(phase_rate::<R>(p.decay, sr, BLOCK_SIZE));
                if phase >= 1.0 {
                    self.core.begin_eoc(sr, BLOCK_SIZE);
                } else {
                    self.core.update_block_to(1.0 - p.decay_shape.apply(phase));
                }
            }
            Stage::Eoc => {
                self.core.tick_eoc();
            }
            _ => {
                self.core.update_block_to(0.0);
            }
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
}

/// Per-block parameters for [`AdarEnvelope`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct AdarParams {
    pub attack: f32,
    pub release: f32,
    pub attack_shape: Shape,
    pub release_shape: Shape,
}

impl Default for AdarParams {
    fn default() -> Self {
        Self {
            attack: 0.1,
            release: 0.3,
            attack_shape: Shape::Linear,
            release_shape: Shape::Linear,
        }
    }
}

/// Attack to full, hold while the gate lasts, release.
///
/// Short gates make it an AD blip; held gates stretch the top.
pub struct AdarEnvelope<const BLOCK_SIZE: usize, R: RateMapping = TwoToX> {
    core: EnvelopeCore<BLOCK_SIZE>,
    sample_rate: f32,
    release_from: f32,
    _rate: PhantomData<R>,
}

impl<const BLOCK_SIZE: usize, R: RateMapping> AdarEnvelope<BLOCK_SIZE, R> {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            core: EnvelopeCore::new(),
            sample_rate,
            release_from: 0.0,
            _rate: PhantomData,
        }
    }

    pub fn attack(&mut self) {
        self.core.attack_from(0.0, false);
    }

    pub fn attack_from(&mut self, start: f32) {
        self.core.attack_from(start, false);
    }

    pub fn immediately_silence(&mut self) {
        self.core.immediately_silence();
    }

    pub fn process_block(&mut self, p: &AdarParams, gate: bool) {
        // The attack always completes (one-shot); only the hold at the top
        // is cut short by the gate.
        if !gate && self.core.stage() == Stage::Hold {
            self.release_from = 1.0;
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
                    // peak reached: hold if the gate is still down,
                    // otherwise fall straight into release
                    if gate {
                        self.core.set_stage(Stage::Hold);
                    } else {
                        self.release_from = 1.0;
                        self.core.set_stage(Stage::Release);
                    }
                } else {
                    self.core.update_block_to(p.attack_shape.apply(phase));
                }
            }
            Stage::Hold => {
                self.core.update_block_to(1.0);
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
                self.core.update_block_to(0.0);
            }
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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::rates::ExpSeconds;

    const SR: f32 = 48_000.0;
    const BLOCK: usize = 16;

    #[test]
    fn dahd_runs_unattended_to_complete() {
        let p = DahdParams {
            delay: 0.1,
            attack: 0.1,
            hold: 0.1,
            decay: 0.1,
            ..Default::default()
        };
        let mut env: DahdEnvelope<BLOCK, ExpSeconds> = DahdEnvelope::new(SR);
        env.attack(&p);
        assert_eq!(env.stage(), Stage::Delay);

        let mut seen = vec![env.stage()];
        let mut blocks = 0;
        while !env.is_complete() {
            env.process_block(&p);
            if *seen.last().unwrap() != env.stage() {
                seen.push(env.stage());
            }
            blocks += 1;
            assert!(blocks < 10_000);
        }
        assert_eq!(
            seen,
            vec![
                Stage::Delay,
                Stage::Attack,
                Stage::Hold,
                Stage::Decay,
                Stage::Eoc,
                Stage::Complete
            ]
        );
        assert_eq!(env.output(), 0.0);
    }

    #[test]
    fn dahd_zero_delay_skips_the_delay_stage() {
        let p = DahdParams {
            delay: 0.0,
            ..Default::default()
        };
        let mut env: DahdEnvelope<BLOCK, ExpSeconds> = DahdEnvelope::new(SR);
        env.attack(&p);
        assert_eq!(env.stage(), Stage::Attack);
    }

    #[test]
    fn dahd_is_silent_during_delay() {
        let p = DahdParams {
            delay: 0.3,
            ..Default::default()
        };
        let mut env: DahdEnvelope<BLOCK, ExpSeconds> = DahdEnvelope::new(SR);
        env.attack(&p);
        for _ in 0..5 {
            env.process_block(&p);
            assert_eq!(env.output(), 0.0);
        }
    }

    #[test]
    fn adar_held_gate_holds_the_top() {
        let p = AdarParams {
            attack: 0.1,
            ..Default::default()
        };
        let mut env: AdarEnvelope<BLOCK, ExpSeconds> = AdarEnvelope::new(SR);
        env.attack();

        let mut blocks = 0;
        while env.stage() == Stage::Attack {
            env.process_block(&p, true);
            blocks += 1;
            assert!(blocks < 10_000);
        }
        assert_eq!(env.stage(), Stage::Hold);

        for _ in 0..50 {
            env.process_block(&p, true);
            assert_eq!(env.output(), 1.0);
        }
    }

    #[test]
    fn adar_short_gate_releases_from_the_peak() {
        let p = AdarParams {
            attack: 0.15,
            release: 0.15,
            ..Default::default()
        };
        let mut env: AdarEnvelope<BLOCK, ExpSeconds> = AdarEnvelope::new(SR);
        env.attack();
        // gate dropped long before the peak: the one-shot attack still
        // completes…
        env.process_block(&p, true);
        let mut peak = 0.0f32;
        let mut blocks = 0;
        while env.stage() == Stage::Attack {
            env.process_block(&p, false);
            peak = peak.max(env.output());
            blocks += 1;
            assert!(blocks < 10_000);
        }
        // …reaches full level, and only then releases
        assert_eq!(env.stage(), Stage::Release);
        assert!((peak - 1.0).abs() < 1e-6);
        let mut blocks = 0;
        while !env.is_complete() {
            env.process_block(&p, false);
            blocks += 1;
            assert!(blocks < 10_000);
        }
        assert_eq!(env.output(), 0.0);
    }
}
