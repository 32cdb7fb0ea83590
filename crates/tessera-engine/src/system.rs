//! Systems and their registration descriptors.
//!
//! A system is constructed once per [`World`] by its factory and then
//! updated every pass of its [`SystemKind`]. Ordering constraints and the
//! optional tag predicate are declared on the [`SystemDescriptor`] and
//! resolved when the catalog is committed.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tessera_ecs::expr::TagPredicate;

use crate::world::World;

// ---------------------------------------------------------------------------
// SystemKind
// ---------------------------------------------------------------------------

/// Which pass a system belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemKind {
    /// Runs once per variable-length frame.
    Normal,
    /// Runs once per fixed-duration simulation tick.
    Fixed,
}

impl SystemKind {
    /// All kinds, in kind-index order.
    pub const ALL: [SystemKind; 2] = [SystemKind::Normal, SystemKind::Fixed];

    pub fn index(self) -> usize {
        match self {
            SystemKind::Normal => 0,
            SystemKind::Fixed => 1,
        }
    }
}

impl fmt::Display for SystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SystemKind::Normal => "normal",
            SystemKind::Fixed => "fixed",
        })
    }
}

// ---------------------------------------------------------------------------
// System
// ---------------------------------------------------------------------------

/// A unit of per-frame or per-tick logic bound to one world.
///
/// Any `FnMut(&mut World, f32)` is a system, which keeps small systems
/// closure-sized.
pub trait System {
    /// Advance by `elapsed` seconds.
    fn update(&mut self, world: &mut World, elapsed: f32);
}

impl<F: FnMut(&mut World, f32)> System for F {
    fn update(&mut self, world: &mut World, elapsed: f32) {
        (self)(world, elapsed);
    }
}

/// Builds a system instance for a world. Runs once per world, on first use.
pub type SystemFactory = Arc<dyn Fn(&mut World) -> Box<dyn System> + Send + Sync>;

// ---------------------------------------------------------------------------
// SystemDescriptor
// ---------------------------------------------------------------------------

/// Registration record for a system.
///
/// ```
/// use tessera_engine::prelude::*;
///
/// let desc = SystemDescriptor::normal("render.present", |_world| {
///     Box::new(|_world: &mut World, _dt: f32| {})
/// })
/// .after("render.draw")
/// .before("debug.overlay");
/// assert_eq!(desc.name(), "render.present");
/// ```
pub struct SystemDescriptor {
    pub(crate) name: String,
    pub(crate) kind: SystemKind,
    pub(crate) factory: SystemFactory,
    pub(crate) before: Vec<String>,
    pub(crate) after: Vec<String>,
    pub(crate) predicate: Option<Box<dyn TagPredicate>>,
}

impl SystemDescriptor {
    pub fn new<F>(name: &str, kind: SystemKind, factory: F) -> Self
    where
        F: Fn(&mut World) -> Box<dyn System> + Send + Sync + 'static,
    {
        Self {
            name: name.to_owned(),
            kind,
            factory: Arc::new(factory),
            before: Vec::new(),
            after: Vec::new(),
            predicate: None,
        }
    }

    pub fn normal<F>(name: &str, factory: F) -> Self
    where
        F: Fn(&mut World) -> Box<dyn System> + Send + Sync + 'static,
    {
        Self::new(name, SystemKind::Normal, factory)
    }

    pub fn fixed<F>(name: &str, factory: F) -> Self
    where
        F: Fn(&mut World) -> Box<dyn System> + Send + Sync + 'static,
    {
        Self::new(name, SystemKind::Fixed, factory)
    }

    /// This system must run before `other` (same kind).
    pub fn before(mut self, other: &str) -> Self {
        self.before.push(other.to_owned());
        self
    }

    /// This system must run after `other` (same kind).
    pub fn after(mut self, other: &str) -> Self {
        self.after.push(other.to_owned());
        self
    }

    /// Only update this system in worlds whose tags satisfy `predicate`.
    pub fn run_if(mut self, predicate: impl TagPredicate + 'static) -> Self {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SystemKind {
        self.kind
    }
}

impl fmt::Debug for SystemDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("before", &self.before)
            .field("after", &self.after)
            .field("gated", &self.predicate.is_some())
            .finish()
    }
}
