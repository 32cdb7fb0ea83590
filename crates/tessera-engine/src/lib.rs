//! Tessera Engine -- system scheduling and the world execution loop.
//!
//! This crate builds on [`tessera_ecs`] to drive worlds: systems are
//! registered on a [`CatalogBuilder`](catalog::CatalogBuilder) with ordering
//! constraints and optional tag predicates, the catalog is committed into a
//! dependency graph, and each [`World`](world::World) resolves that graph into
//! a deterministic per-kind execution order. The [`Runner`](runner::Runner)
//! turns variable frame times into fixed-timestep passes plus one normal pass
//! per frame.
//!
//! # Quick Start
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! let mut builder = CatalogBuilder::new();
//! let render = builder.tag("render").unwrap();
//! builder
//!     .system(SystemDescriptor::fixed("physics", |_w| {
//!         Box::new(|_w: &mut World, _dt: f32| {})
//!     }))
//!     .system(
//!         SystemDescriptor::normal("draw", |_w| Box::new(|_w: &mut World, _dt: f32| {}))
//!             .run_if(render),
//!     );
//! let catalog = builder.build().unwrap();
//!
//! let world = World::new(catalog, &[render]).unwrap();
//! let mut runner = Runner::new(world, RunConfig::default()).unwrap();
//! runner.run_frames(10, 1.0 / 60.0);
//! assert_eq!(runner.frame_count(), 10);
//! ```

#![deny(unsafe_code)]

pub mod catalog;
pub mod config;
pub mod graph;
pub mod logging;
pub mod runner;
pub mod system;
pub mod world;

use system::SystemKind;

/// Re-export the ECS crate for convenience.
pub use tessera_ecs;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while assembling catalogs, creating worlds, or loading
/// configuration.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Two systems of the same kind share a name.
    #[error("{kind} system '{name}' is registered more than once")]
    DuplicateSystem { name: String, kind: SystemKind },

    /// A `before`/`after` constraint names a system that does not exist in
    /// the same kind.
    #[error("{kind} system '{system}' depends on unknown system '{dependency}'")]
    UnknownDependency {
        system: String,
        dependency: String,
        kind: SystemKind,
    },

    /// A system is ordered relative to itself.
    #[error("{kind} system '{system}' depends on itself")]
    SelfDependency { system: String, kind: SystemKind },

    /// The dependency graph of a kind contains a cycle.
    #[error("dependency cycle among {kind} systems: {}", path.join(" -> "))]
    Cycle { kind: SystemKind, path: Vec<String> },

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error(transparent)]
    Ecs(#[from] tessera_ecs::EcsError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use tessera_ecs::prelude::*;

    pub use crate::catalog::{Catalog, CatalogBuilder, Plugin};
    pub use crate::config::{RunConfig, WorldConfig};
    pub use crate::graph::{SystemCatalog, SystemGraph};
    pub use crate::runner::{FrameDiagnostics, Runner};
    pub use crate::system::{System, SystemDescriptor, SystemFactory, SystemKind};
    pub use crate::world::{Running, World};
    pub use crate::EngineError;
}
