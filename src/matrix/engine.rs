//! The modulation matrix runtime: bind, prepare, process, query.

use std::collections::HashMap;

use crate::bank::{ValueBank, ValueHandle};
use crate::smooth::{LinearRamp, OnePoleLag};

use super::routing::{ApplicationMode, LagStyle, RoutingTable};
use super::MatrixConfig;

/*
Execution Model
===============

The matrix is a tiny compiler. `prepare()` walks the routing table once and
turns every usable row into a flat evaluation slot: identifiers resolved to
bank handles, targets resolved to indices in a dense output array, curves
resolved to function pointers, lag smoothers built and seeded. `process()`
then runs the slots in table order with no hashing, no allocation and no
branching beyond what the routes themselves require.

    prepare:  Routing { "lfo1" -> "cutoff", depth 0.4, curve "cubed" }
                  |
                  v
    slot:     { source: bank[7], target: outputs[0], curve: fn, ... }

    process:  outputs[0] = bank[base of "cutoff"]
              outputs[0] += depth * scale * cubed(bank[7])

What is read live and what is compiled:

  live each process()    depth, active (tweakable with no re-prepare)
  compiled at prepare()  everything structural: which rows exist, id
                         bindings, lag settings, curves, ranges

Rows that reference an identifier nobody bound are silently left out of the
compiled slots. That is deliberate: on the audio thread there is no one to
throw to, and a quietly inert route is diagnosable while a crash is not.

Self-modulation (a route's depth being itself a modulated target) is the
one place evaluation is not strictly table-order: slots whose depth reads
another target's output run in a second pass, after every static-depth slot
has deposited its contribution. One level deep, so two passes settle it.

Threading: everything here assumes the caller's discipline from the crate
docs: bind/table edits and `prepare` must not overlap a running
`process`. The matrix has no locks and wants none on the audio path.
*/

/// Where a value comes from: a bank slot or an internal constant.
#[derive(Debug, Clone, Copy)]
enum Binding {
    Handle(ValueHandle),
    Constant(f32),
}

impl Binding {
    #[inline]
    fn read(&self, bank: &ValueBank) -> f32 {
        match *self {
            Binding::Handle(h) => bank.get(h),
            Binding::Constant(v) => v,
        }
    }
}

/// Per-route lag smoother, block-rate.
#[derive(Debug, Clone, Copy)]
enum Lag {
    Exponential(OnePoleLag),
    Linear(LinearRamp),
}

impl Lag {
    fn new(style: LagStyle, ms: f32, calls_per_sec: f32, snap: f32) -> Self {
        match style {
            LagStyle::Exponential => {
                let mut lag = OnePoleLag::new(ms, calls_per_sec);
                lag.snap_to(snap);
                Lag::Exponential(lag)
            }
            LagStyle::Linear => {
                let mut lag = LinearRamp::new(ms, calls_per_sec);
                lag.snap_to(snap);
                Lag::Linear(lag)
            }
        }
    }

    #[inline]
    fn process(&mut self, target: f32) -> f32 {
        match self {
            Lag::Exponential(lag) => {
                lag.set_target(target);
                lag.process()
            }
            Lag::Linear(lag) => {
                // re-arming the ramp every block would Zeno toward the
                // target; only a changed target restarts it
                if lag.target() != target {
                    lag.set_target(target);
                }
                lag.process()
            }
        }
    }
}

/// A resolved source: binding plus optional lag.
#[derive(Debug, Clone, Copy)]
struct SourceSlot {
    binding: Binding,
    lag: Option<Lag>,
}

impl SourceSlot {
    #[inline]
    fn read(&mut self, bank: &ValueBank) -> f32 {
        let raw = self.binding.read(bank);
        match &mut self.lag {
            Some(lag) => lag.process(raw),
            None => raw,
        }
    }
}

/// Where a slot's depth comes from each block.
#[derive(Debug, Clone, Copy)]
enum DepthRead {
    /// The routing's own `depth` field, read live from the table.
    Static,
    /// Another target's computed output (self-modulation).
    Output(usize),
}

/// One compiled evaluation slot.
struct Slot {
    routing_index: usize,
    source: SourceSlot,
    via: Option<SourceSlot>,
    target_slot: usize,
    depth: DepthRead,
    depth_scale: f32,
    curve: Option<fn(f32) -> f32>,
    mode: ApplicationMode,
    clamp: Option<(f32, f32)>,
}

/// Stable answer to "where does this target's value live right now".
/// Valid until the next `prepare`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TargetRef {
    /// Modulated: read `ModMatrix::output(index)` after each `process`.
    Routed(usize),
    /// Pass-through to the bound base value in the bank.
    Base(ValueHandle),
    /// Pass-through to an internally seeded constant.
    Constant(f32),
}

/// Generic modulation-routing engine over a host-supplied [`MatrixConfig`].
///
/// Call order discipline (the caller's job, not this type's):
///
/// 1. `bind_*` calls and routing-table edits happen off the audio thread,
///    or between blocks.
/// 2. `prepare` must complete before the next `process` that depends on
///    the change; never run the two concurrently.
/// 3. `process` runs once per audio block and neither allocates nor
///    panics.
///
/// Depth and active flags are the exception to rule 2: they are read live
/// from the table every `process`, so tweaking them needs no re-prepare.
pub struct ModMatrix<C: MatrixConfig> {
    source_values: HashMap<C::SourceId, Binding>,
    base_values: HashMap<C::TargetId, Binding>,
    target_index: HashMap<C::TargetId, usize>,
    target_order: Vec<C::TargetId>,
    base_of_target: Vec<Binding>,
    outputs: Vec<f32>,
    slots: Vec<Slot>,
}

impl<C: MatrixConfig> ModMatrix<C> {
    pub fn new() -> Self {
        let cap = C::FIXED_SLOTS.unwrap_or(0);
        Self {
            source_values: HashMap::new(),
            base_values: HashMap::new(),
            target_index: HashMap::new(),
            target_order: Vec::with_capacity(cap),
            base_of_target: Vec::with_capacity(cap),
            outputs: Vec::with_capacity(cap),
            slots: Vec::with_capacity(cap),
        }
    }

    /// Bind (or rebind) a modulation source to a bank slot the host keeps
    /// updated. Takes effect at the next `prepare`.
    pub fn bind_source_value(&mut self, source: C::SourceId, handle: ValueHandle) {
        self.source_values.insert(source, Binding::Handle(handle));
    }

    /// Bind a source to a fixed value held inside the matrix. Handy for
    /// always-on via multipliers.
    pub fn bind_source_constant(&mut self, source: C::SourceId, value: f32) {
        self.source_values.insert(source, Binding::Constant(value));
    }

    /// Bind (or rebind) a target's dry base value. Takes effect at the
    /// next `prepare`.
    pub fn bind_target_base_value(&mut self, target: C::TargetId, handle: ValueHandle) {
        self.base_values.insert(target, Binding::Handle(handle));
    }

    /// Compile the routing table. O(routes). Control-path only: this is
    /// where all allocation and hashing happens.
    pub fn prepare(
        &mut self,
        table: &RoutingTable<C>,
        bank: &ValueBank,
        sample_rate: f32,
        block_size: usize,
    ) {
        debug_assert!(block_size <= crate::MAX_BLOCK_SIZE);
        let calls_per_sec = sample_rate / block_size.max(1) as f32;

        self.slots.clear();
        self.target_index.clear();
        self.target_order.clear();
        self.base_of_target.clear();
        self.outputs.clear();

        // Self-modulation pre-pass: a target that IS some routing's depth
        // gets that routing's static depth seeded as its base value, so
        // the target's output starts from the knob position.
        if C::FIXED_SLOTS.is_some() {
            for routing in table.iter() {
                let Some(target) = &routing.target else {
                    continue;
                };
                if routing.is_default() {
                    continue;
                }
                if let Some(controlled) = C::depth_slot_for_target(target) {
                    let static_depth = table.get(controlled).map(|r| r.depth).unwrap_or(0.0);
                    self.base_values
                        .insert(target.clone(), Binding::Constant(static_depth));
                }
            }
        }

        for (routing_index, routing) in table.iter().enumerate() {
            if routing.is_default() {
                continue;
            }
            // Unbound references leave the row uncompiled: silently inert.
            let Some(source_id) = &routing.source else {
                continue;
            };
            let Some(target_id) = &routing.target else {
                continue;
            };
            let Some(&source_binding) = self.source_values.get(source_id) else {
                continue;
            };
            let via = match &routing.source_via {
                None => None,
                Some(via_id) => match self.source_values.get(via_id) {
                    Some(&binding) => Some(SourceSlot {
                        binding,
                        lag: Self::make_lag(
                            via_id,
                            routing.source_via_lag_ms,
                            routing.source_via_lag_style,
                            calls_per_sec,
                            binding.read(bank),
                        ),
                    }),
                    // a torn half-route is exactly what the soft policy
                    // is there to contain
                    None => continue,
                },
            };
            let Some(&base) = self.base_values.get(target_id) else {
                continue;
            };

            // first-seen order allocates the target's output slot
            let target_slot = match self.target_index.get(target_id) {
                Some(&slot) => slot,
                None => {
                    let slot = self.target_order.len();
                    self.target_index.insert(target_id.clone(), slot);
                    self.target_order.push(target_id.clone());
                    self.base_of_target.push(base);
                    self.outputs.push(0.0);
                    slot
                }
            };

            let curve = routing
                .curve
                .as_ref()
                .and_then(|curve_id| C::curve_operator(curve_id));

            self.slots.push(Slot {
                routing_index,
                source: SourceSlot {
                    binding: source_binding,
                    lag: Self::make_lag(
                        source_id,
                        routing.source_lag_ms,
                        routing.source_lag_style,
                        calls_per_sec,
                        source_binding.read(bank),
                    ),
                },
                via,
                target_slot,
                depth: DepthRead::Static,
                depth_scale: C::depth_scale(target_id),
                curve,
                mode: routing.application_mode,
                clamp: C::target_range(target_id),
            });
        }

        // Self-modulation fixup: redirect the controlled slot's depth to
        // read the controlling target's computed output.
        if C::FIXED_SLOTS.is_some() {
            for (target_slot, target_id) in self.target_order.iter().enumerate() {
                if let Some(controlled) = C::depth_slot_for_target(target_id) {
                    if let Some(slot) = self
                        .slots
                        .iter_mut()
                        .find(|s| s.routing_index == controlled)
                    {
                        slot.depth = DepthRead::Output(target_slot);
                    }
                }
            }
        }
    }

    fn make_lag(source: &C::SourceId, ms: f32, style: LagStyle, calls_per_sec: f32, snap: f32) -> Option<Lag> {
        if ms > 0.0 && C::supports_lag(source) {
            Some(Lag::new(style, ms, calls_per_sec, snap))
        } else {
            None
        }
    }

    /// Evaluate one block: every known target output starts from its base
    /// value, then compiled slots accumulate onto it in table order
    /// (static-depth slots first, depth-redirected slots second).
    ///
    /// Allocation-free and panic-free; numeric contracts are
    /// `debug_assert!`s.
    pub fn process(&mut self, table: &RoutingTable<C>, bank: &ValueBank) {
        for (output, base) in self.outputs.iter_mut().zip(self.base_of_target.iter()) {
            *output = base.read(bank);
        }

        for pass2 in [false, true] {
            for slot in self.slots.iter_mut() {
                let redirected = matches!(slot.depth, DepthRead::Output(_));
                if redirected != pass2 {
                    continue;
                }
                let Some(routing) = table.get(slot.routing_index) else {
                    continue;
                };
                if !routing.active {
                    continue;
                }

                let mut combined = slot.source.read(bank);
                if let Some(via) = &mut slot.via {
                    combined *= via.read(bank);
                }
                if let Some(curve) = slot.curve {
                    combined = curve(combined);
                }

                let depth = match slot.depth {
                    DepthRead::Static => routing.depth,
                    DepthRead::Output(slot_index) => self.outputs[slot_index],
                };

                match slot.mode {
                    ApplicationMode::Additive => {
                        self.outputs[slot.target_slot] += depth * slot.depth_scale * combined;
                    }
                    ApplicationMode::Multiplicative => {
                        let c = combined.abs().min(1.0);
                        let mulfac = if depth > 0.0 {
                            depth * c + (1.0 - depth)
                        } else {
                            1.0 + depth * c
                        };
                        debug_assert!(
                            (0.0..=1.0).contains(&mulfac),
                            "multiplicative factor {} out of [0,1]; depth {} outside [-1,1]?",
                            mulfac,
                            depth
                        );
                        self.outputs[slot.target_slot] *= mulfac;
                    }
                }

                if let Some((lo, hi)) = slot.clamp {
                    self.outputs[slot.target_slot] =
                        self.outputs[slot.target_slot].clamp(lo, hi);
                }
            }
        }
    }

    /// The target's value after the last `process`: its computed output if
    /// any compiled route feeds it, else its base value, else 0.0.
    pub fn target_value(&self, target: &C::TargetId, bank: &ValueBank) -> f32 {
        if let Some(&slot) = self.target_index.get(target) {
            self.outputs[slot]
        } else if let Some(base) = self.base_values.get(target) {
            base.read(bank)
        } else {
            0.0
        }
    }

    /// Stable location of the target's value, valid until the next
    /// `prepare`. `None` for targets this matrix has never heard of.
    pub fn target_ref(&self, target: &C::TargetId) -> Option<TargetRef> {
        if let Some(&slot) = self.target_index.get(target) {
            return Some(TargetRef::Routed(slot));
        }
        match self.base_values.get(target) {
            Some(Binding::Handle(handle)) => Some(TargetRef::Base(*handle)),
            Some(Binding::Constant(value)) => Some(TargetRef::Constant(*value)),
            None => None,
        }
    }

    /// Read a routed output by the index from [`TargetRef::Routed`].
    #[inline]
    pub fn output(&self, index: usize) -> f32 {
        self.outputs.get(index).copied().unwrap_or(0.0)
    }

    /// Number of distinct targets fed by at least one compiled route.
    pub fn target_count(&self) -> usize {
        self.target_order.len()
    }
}

impl<C: MatrixConfig> Default for ModMatrix<C> {
    fn default() -> Self {
        Self::new()
    }
}
