//! Data-driven modulation routing: sources × depths × targets.
//!
//! A host engine binds identifiers to [`crate::bank::ValueBank`] slots,
//! describes routings in a [`RoutingTable`], compiles the table with
//! [`ModMatrix::prepare`], and evaluates it once per audio block with
//! [`ModMatrix::process`]. Identifier types are the host's own; the matrix
//! never looks inside them.

/// The runtime engine: bind, prepare, process, query.
pub mod engine;
/// Routing entries and the stable-order table that holds them.
pub mod routing;

pub use engine::{ModMatrix, TargetRef};
pub use routing::{ApplicationMode, LagStyle, Routing, RoutingTable};

use std::hash::Hash;

/// Compile-time description of a matrix: the host's identifier types plus
/// optional capability hooks.
///
/// The hooks default to "not supported" so a minimal config is three type
/// aliases and a unit payload. Capabilities are detected from what the
/// config overrides, never from runtime flags:
///
/// - `supports_lag`: sources that may carry per-route lag smoothing.
/// - `curve_operator`: resolve a curve identifier to a `f32 -> f32` shaper.
/// - `depth_slot_for_target`: targets that ARE another routing's depth;
///   returning the controlled slot index enables self-modulation. Only
///   meaningful together with `FIXED_SLOTS`, since slot indices must be
///   stable for the mapping to mean anything.
/// - `target_range`: clamp a target's output after every contributing
///   route.
///
/// Identifier bounds (`Eq + Hash + Default + Clone`) are enforced here, at
/// compile time; a malformed config is a type error, never a runtime one.
pub trait MatrixConfig {
    type SourceId: Clone + Eq + Hash + Default;
    type TargetId: Clone + Eq + Hash + Default;
    type CurveId: Clone + Eq + Hash + Default;
    /// Host-private payload carried on each routing, ignored by the engine.
    type Extra: Clone + Default;

    /// `Some(n)` pins the routing table to exactly `n` slots (hardware-style
    /// fixed matrix) and makes slot indices stable enough for
    /// `depth_slot_for_target` to refer to them.
    const FIXED_SLOTS: Option<usize> = None;

    fn supports_lag(_source: &Self::SourceId) -> bool {
        false
    }

    fn curve_operator(_curve: &Self::CurveId) -> Option<fn(f32) -> f32> {
        None
    }

    fn depth_slot_for_target(_target: &Self::TargetId) -> Option<usize> {
        None
    }

    fn target_range(_target: &Self::TargetId) -> Option<(f32, f32)> {
        None
    }

    /// Extra gain applied between a route's depth and its contribution.
    /// Hosts use this to express targets in natural units (semitones,
    /// octaves, dB) while depths stay normalized.
    fn depth_scale(_target: &Self::TargetId) -> f32 {
        1.0
    }
}
