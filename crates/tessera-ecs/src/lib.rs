//! Tessera ECS -- entities, type-erased components, and world tags.
//!
//! This crate holds the data side of the Tessera engine: generational entity
//! handles, a sparse-set entity store, the per-world [`ComponentRegistry`]
//! that drives component values through type-erased descriptors, and the
//! tag machinery (registry, per-world [`TagSet`], boolean [`TagExpr`]s) that
//! decides which systems are active in a world.
//!
//! Scheduling and the world execution loop live in `tessera-engine`.
//!
//! # Quick Start
//!
//! ```
//! use tessera_ecs::prelude::*;
//!
//! #[derive(Debug, Default, Clone, PartialEq)]
//! struct Position { x: f32, y: f32 }
//!
//! let mut registry = ComponentRegistry::new();
//! let position = registry.register(ComponentOps::<Position>::full("Position"));
//!
//! let mut store = EntityStore::new();
//! let entity = store.spawn();
//! registry.assign_default(&mut store, position, entity).unwrap();
//!
//! assert!(registry.has(&store, position, entity));
//! assert_eq!(store.get::<Position>(entity), Some(&Position::default()));
//! ```
//!
//! [`ComponentRegistry`]: component::ComponentRegistry
//! [`TagSet`]: tag::TagSet
//! [`TagExpr`]: expr::TagExpr

#![deny(unsafe_code)]

pub mod component;
pub mod entity;
pub mod expr;
pub mod storage;
pub mod tag;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by ECS operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The entity does not exist (stale generation or never allocated).
    #[error("entity {0:?} does not exist (stale or never allocated)")]
    StaleEntity(entity::EntityId),

    /// A component type was referenced that has not been registered.
    #[error("component type '{0}' not registered")]
    UnknownComponent(String),

    /// The component type does not provide the requested operation.
    #[error("component '{component}' does not support {capability}")]
    Unsupported {
        component: String,
        capability: component::Capability,
    },

    /// A replace targeted an entity that lacks the component.
    #[error("entity {entity:?} has no '{component}' component")]
    MissingComponent {
        component: String,
        entity: entity::EntityId,
    },

    /// A tag name was registered twice.
    #[error("tag '{0}' is already registered")]
    DuplicateTag(String),

    /// A tag name was referenced that has not been registered.
    #[error("tag '{0}' not registered")]
    UnknownTag(String),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::component::{
        Capabilities, Capability, ComponentBox, ComponentInfo, ComponentOps, ComponentRegistry,
        ComponentTypeId, ErasedComponent,
    };
    pub use crate::entity::{EntityAllocator, EntityId};
    pub use crate::expr::{TagExpr, TagPredicate};
    pub use crate::storage::{Column, EntityStore};
    pub use crate::tag::{Tag, TagFlags, TagInfo, TagRegistry, TagSet};
    pub use crate::EcsError;
}
