//! Gated DAHDSR and the shaped AHDSR built on it.

use std::marker::PhantomData;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::rates::{phase_rate, RateMapping, TwoToX};
use super::{EnvelopeCore, Shape, Stage};

/// Per-block parameters for [`DahdsrEnvelope`]. Zero delay or hold knobs
/// disable those stages.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct DahdsrParams {
    pub delay: f32,
    pub attack: f32,
    pub hold: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub attack_shape: Shape,
    pub decay_shape: Shape,
    pub release_shape: Shape,
}

impl Default for DahdsrParams {
    fn default() -> Self {
        Self {
            delay: 0.0,
            attack: 0.2,
            hold: 0.0,
            decay: 0.3,
            sustain: 0.7,
            release: 0.4,
            attack_shape: Shape::Linear,
            decay_shape: Shape::Linear,
            release_shape: Shape::Linear,
        }
    }
}

/// The full gated stage set: delay, attack, hold, decay, sustain, release.
///
/// An ADSR with a pre-attack wait and a post-attack plateau. The gate works
/// exactly as in [`super::AdsrEnvelope`]: dropping it pulls any live stage
/// into release from the current output value.
pub struct DahdsrEnvelope<const BLOCK_SIZE: usize, R: RateMapping = TwoToX> {
    core: EnvelopeCore<BLOCK_SIZE>,
    sample_rate: f32,
    release_from: f32,
    _rate: PhantomData<R>,
}

impl<const BLOCK_SIZE: usize, R: RateMapping> DahdsrEnvelope<BLOCK_SIZE, R> {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            core: EnvelopeCore::new(),
            sample_rate,
            release_from: 0.0,
            _rate: PhantomData,
        }
    }

    /// Gate high: start a fresh cycle, waiting out the delay first if one
    /// is configured.
    pub fn attack(&mut self, params: &DahdsrParams) {
        self.core.attack_from(0.0, params.delay > 0.0);
    }

    /// Gate high, continuing from `start`. Skips the delay: a retrigger is
    /// already mid-phrase.
    pub fn attack_from(&mut self, start: f32) {
        self.core.attack_from(start, false);
    }

    pub fn immediately_silence(&mut self) {
        self.core.immediately_silence();
    }

    pub fn process_block(&mut self, p: &DahdsrParams, gate: bool) {
        if !gate
            && matches!(
                self.core.stage(),
                Stage::Delay | Stage::Attack | Stage::Hold | Stage::Decay | Stage::Sustain
            )
        {
            self.release_from = self.core.output();
            self.core.set_stage(Stage::Release);
        }

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

/// Per-block parameters for [`AhdsrEnvelope`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy)]
pub struct AhdsrParams {
    pub attack: f32,
    pub hold: f32,
    pub decay: f32,
    pub sustain: f32,
    pub release: f32,
    pub attack_shape: Shape,
    pub decay_shape: Shape,
    pub release_shape: Shape,
}

impl Default for AhdsrParams {
    fn default() -> Self {
        let d = DahdsrParams::default();
        Self {
            attack: d.attack,
            hold: d.hold,
            decay: d.decay,
            sustain: d.sustain,
            release: d.release,
            attack_shape: d.attack_shape,
            decay_shape: d.decay_shape,
            release_shape: d.release_shape,
        }
    }
}

impl AhdsrParams {
    #[inline]
    fn widen(&self) -> DahdsrParams {
        DahdsrParams {
            delay: 0.0,
            attack: self.attack,
            hold: self.hold,
            decay: self.decay,
            sustain: self.sustain,
            release: self.release,
            attack_shape: self.attack_shape,
            decay_shape: self.decay_shape,
            release_shape: self.release_shape,
        }
    }
}

/// DAHDSR minus the delay, with the segment shape selectors as the
/// headline feature: convex, linear or concave attack, decay and release.
pub struct AhdsrEnvelope<const BLOCK_SIZE: usize, R: RateMapping = TwoToX> {
    inner: DahdsrEnvelope<BLOCK_SIZE, R>,
}

impl<const BLOCK_SIZE: usize, R: RateMapping> AhdsrEnvelope<BLOCK_SIZE, R> {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            inner: DahdsrEnvelope::new(sample_rate),
        }
    }

    pub fn attack(&mut self) {
        self.inner.attack_from(0.0);
    }

    pub fn attack_from(&mut self, start: f32) {
        self.inner.attack_from(start);
    }

    pub fn immediately_silence(&mut self) {
        self.inner.immediately_silence();
    }

    pub fn process_block(&mut self, params: &AhdsrParams, gate: bool) {
        self.inner.process_block(&params.widen(), gate);
    }

    #[inline]
    pub fn output(&self) -> f32 {
        self.inner.output()
    }

    #[inline]
    pub fn out_block(&self) -> &[f32; BLOCK_SIZE] {
        self.inner.out_block()
    }

    /// Read the next cached sample within the current block.
    #[inline]
    pub fn step(&mut self) -> f32 {
        self.inner.step()
    }

    #[inline]
    pub fn eoc_output(&self) -> f32 {
        self.inner.eoc_output()
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.inner.stage()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.inner.is_complete()
    }
}
