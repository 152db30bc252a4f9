//! Lock-free gate control for an envelope owned by the audio thread.
//!
//! The envelope itself must live on the audio thread; note events usually
//! originate somewhere else (MIDI thread, UI thread). [`SharedAdsr`] pairs
//! an [`AdsrEnvelope`] with the consumer end of a ring buffer so the audio
//! thread drains gate messages at each block boundary, and [`GateHandle`]
//! is the send side the control thread keeps.

use rtrb::{Consumer, Producer, RingBuffer};

use super::adsr::{AdsrEnvelope, AdsrParams};
use super::rates::{RateMapping, TwoToX};
use super::Stage;

pub enum GateMessage {
    GateOn,
    /// Gate on continuing from a given level (retrigger out of release).
    GateOnFrom(f32),
    GateOff,
    /// Hard stop for voice stealing.
    Silence,
}

/// Control-thread side: push gate events, never blocks.
///
/// A full queue drops the message; with a queue far deeper than any
/// realistic burst of note events, that only happens when the audio thread
/// has stalled, at which point a lost gate is the least of the problems.
pub struct GateHandle {
    tx: Producer<GateMessage>,
}

impl GateHandle {
    pub fn gate_on(&mut self) {
        let _ = self.tx.push(GateMessage::GateOn);
    }

    pub fn gate_on_from(&mut self, level: f32) {
        let _ = self.tx.push(GateMessage::GateOnFrom(level));
    }

    pub fn gate_off(&mut self) {
        let _ = self.tx.push(GateMessage::GateOff);
    }

    pub fn silence(&mut self) {
        let _ = self.tx.push(GateMessage::Silence);
    }
}

const GATE_QUEUE_SIZE: usize = 64;

/// Audio-thread side: an ADSR that drains its gate queue once per block.
pub struct SharedAdsr<const BLOCK_SIZE: usize, R: RateMapping = TwoToX> {
    env: AdsrEnvelope<BLOCK_SIZE, R>,
    rx: Consumer<GateMessage>,
    gate: bool,
}

impl<const BLOCK_SIZE: usize, R: RateMapping> SharedAdsr<BLOCK_SIZE, R> {
    pub fn new(sample_rate: f32) -> (Self, GateHandle) {
        let (tx, rx) = RingBuffer::<GateMessage>::new(GATE_QUEUE_SIZE);
        let handle = GateHandle { tx };
        let node = Self {
            env: AdsrEnvelope::new(sample_rate),
            rx,
            gate: false,
        };
        (node, handle)
    }

    /// Drain pending gate messages, then advance one block.
    pub fn process_block(&mut self, params: &AdsrParams) {
        while let Ok(msg) = self.rx.pop() {
            match msg {
                GateMessage::GateOn => {
                    self.gate = true;
                    self.env.attack();
                }
                GateMessage::GateOnFrom(level) => {
                    self.gate = true;
                    self.env.attack_from(level);
                }
                GateMessage::GateOff => {
                    self.gate = false;
                }
                GateMessage::Silence => {
                    self.gate = false;
                    self.env.immediately_silence();
                }
            }
        }

        self.env.process_block(params, self.gate);
    }

    #[inline]
    pub fn output(&self) -> f32 {
        self.env.output()
    }

    #[inline]
    pub fn out_block(&self) -> &[f32; BLOCK_SIZE] {
        self.env.out_block()
    }

    /// Read the next cached sample within the current block.
    #[inline]
    pub fn step(&mut self) -> f32 {
        self.env.step()
    }

    #[inline]
    pub fn stage(&self) -> Stage {
        self.env.stage()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.env.is_complete()
    }
}
