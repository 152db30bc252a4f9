//! Routing entries and the table that holds them in stable order.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::MatrixConfig;

/// How a route's contribution combines into its target.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApplicationMode {
    /// `target += depth * scale * combined`
    #[default]
    Additive,
    /// `target *= mulfac`, where the factor is built so it stays in [0,1]
    /// for depths in [-1,1]: an attenuator, never a boost.
    Multiplicative,
}

/// Which smoother a lagged source runs through.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LagStyle {
    #[default]
    Exponential,
    Linear,
}

/// One entry in the routing table: source (optionally ring-multiplied with
/// a second "via" source), target, depth, optional curve, optional
/// per-source lag.
///
/// The default entry routes nothing anywhere at depth zero; `prepare`
/// skips it entirely, so a fixed table can sit full of defaults until the
/// host fills slots in.
pub struct Routing<C: MatrixConfig> {
    pub active: bool,
    pub source: Option<C::SourceId>,
    pub source_via: Option<C::SourceId>,
    pub target: Option<C::TargetId>,
    pub curve: Option<C::CurveId>,
    pub depth: f32,
    pub application_mode: ApplicationMode,
    pub source_lag_ms: f32,
    pub source_lag_style: LagStyle,
    pub source_via_lag_ms: f32,
    pub source_via_lag_style: LagStyle,
    /// Host-private payload; the engine never reads it.
    pub extra: C::Extra,
}

// hand-written: a derive would demand `C: Clone` on the config marker
// type itself, not just on the identifier types it names
impl<C: MatrixConfig> Clone for Routing<C> {
    fn clone(&self) -> Self {
        Self {
            active: self.active,
            source: self.source.clone(),
            source_via: self.source_via.clone(),
            target: self.target.clone(),
            curve: self.curve.clone(),
            depth: self.depth,
            application_mode: self.application_mode,
            source_lag_ms: self.source_lag_ms,
            source_lag_style: self.source_lag_style,
            source_via_lag_ms: self.source_via_lag_ms,
            source_via_lag_style: self.source_via_lag_style,
            extra: self.extra.clone(),
        }
    }
}

impl<C: MatrixConfig> Default for Routing<C> {
    fn default() -> Self {
        Self {
            active: true,
            source: None,
            source_via: None,
            target: None,
            curve: None,
            depth: 0.0,
            application_mode: ApplicationMode::Additive,
            source_lag_ms: 0.0,
            source_lag_style: LagStyle::Exponential,
            source_via_lag_ms: 0.0,
            source_via_lag_style: LagStyle::Exponential,
            extra: C::Extra::default(),
        }
    }
}

impl<C: MatrixConfig> Routing<C> {
    pub fn new(source: C::SourceId, target: C::TargetId, depth: f32) -> Self {
        Self {
            source: Some(source),
            target: Some(target),
            depth,
            ..Self::default()
        }
    }

    /// Ring-multiply the primary source with `via` before depth scaling.
    pub fn via(mut self, via: C::SourceId) -> Self {
        self.source_via = Some(via);
        self
    }

    pub fn with_curve(mut self, curve: C::CurveId) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn multiplicative(mut self) -> Self {
        self.application_mode = ApplicationMode::Multiplicative;
        self
    }

    pub fn with_source_lag(mut self, ms: f32, style: LagStyle) -> Self {
        self.source_lag_ms = ms;
        self.source_lag_style = style;
        self
    }

    pub fn with_source_via_lag(mut self, ms: f32, style: LagStyle) -> Self {
        self.source_via_lag_ms = ms;
        self.source_via_lag_style = style;
        self
    }

    /// True for entries that route nothing: no source, no target, depth
    /// zero. Never compiled into an evaluation slot.
    pub fn is_default(&self) -> bool {
        self.source.is_none() && self.target.is_none() && self.depth == 0.0
    }
}

/// Ordered collection of routings. Storage position is significant: the UI
/// addresses rows by index, and evaluation accumulates in table order.
///
/// With `C::FIXED_SLOTS = Some(n)` the table is born holding `n` default
/// entries and keeps exactly that many; otherwise it grows as rows are
/// pushed.
pub struct RoutingTable<C: MatrixConfig> {
    entries: Vec<Routing<C>>,
}

impl<C: MatrixConfig> Clone for RoutingTable<C> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<C: MatrixConfig> RoutingTable<C> {
    /// An empty growable table, or a full-of-defaults fixed table,
    /// depending on the config.
    pub fn new() -> Self {
        match C::FIXED_SLOTS {
            Some(n) => Self {
                entries: vec![Routing::default(); n],
            },
            None => Self {
                entries: Vec::new(),
            },
        }
    }

    /// Append a routing. On a fixed table this is a config error; the row
    /// is dropped (debug builds assert).
    pub fn push(&mut self, routing: Routing<C>) {
        if let Some(n) = C::FIXED_SLOTS {
            debug_assert!(
                self.entries.len() < n,
                "fixed routing table of {} slots is full",
                n
            );
            if self.entries.len() >= n {
                return;
            }
        }
        self.entries.push(routing);
    }

    pub fn get(&self, index: usize) -> Option<&Routing<C>> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Routing<C>> {
        self.entries.get_mut(index)
    }

    /// Replace the routing at `index`. Out-of-range writes are dropped.
    pub fn update_routing_at(&mut self, index: usize, routing: Routing<C>) {
        if let Some(slot) = self.entries.get_mut(index) {
            *slot = routing;
        }
    }

    /// Live-tweakable without a re-prepare: depth is read from the table
    /// every `process` call.
    pub fn update_depth_at(&mut self, index: usize, depth: f32) {
        if let Some(slot) = self.entries.get_mut(index) {
            slot.depth = depth;
        }
    }

    /// Live-tweakable without a re-prepare, like depth.
    pub fn update_active_at(&mut self, index: usize, active: bool) {
        if let Some(slot) = self.entries.get_mut(index) {
            slot.active = active;
        }
    }

    /// Takes effect at the next `prepare` (lag smoothers are built there).
    pub fn set_source_lag_at(&mut self, index: usize, ms: f32, style: LagStyle) {
        if let Some(slot) = self.entries.get_mut(index) {
            slot.source_lag_ms = ms;
            slot.source_lag_style = style;
        }
    }

    /// Takes effect at the next `prepare`, like the primary source lag.
    pub fn set_source_via_lag_at(&mut self, index: usize, ms: f32, style: LagStyle) {
        if let Some(slot) = self.entries.get_mut(index) {
            slot.source_via_lag_ms = ms;
            slot.source_via_lag_style = style;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Routing<C>> {
        self.entries.iter()
    }
}

impl<C: MatrixConfig> Default for RoutingTable<C> {
    fn default() -> Self {
        Self::new()
    }
}
