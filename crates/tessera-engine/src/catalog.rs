//! Assembling tags, components, and systems before any world exists.
//!
//! Independent modules contribute registrations to a [`CatalogBuilder`]
//! (directly or through a [`Plugin`]). [`CatalogBuilder::build`] commits the
//! system graph and freezes everything into an immutable [`Catalog`] that is
//! shared by every [`World`](crate::world::World) created from it.
//!
//! ```
//! use tessera_engine::prelude::*;
//!
//! #[derive(Default, Clone)]
//! struct Velocity(f32);
//!
//! let mut builder = CatalogBuilder::new();
//! let render = builder.tag("render").unwrap();
//! builder.component(ComponentOps::<Velocity>::full("Velocity"));
//! builder.system(
//!     SystemDescriptor::normal("draw", |_w| Box::new(|_w: &mut World, _dt: f32| {}))
//!         .run_if(render),
//! );
//! let catalog = builder.build().unwrap();
//! assert_eq!(catalog.tags().count(), 1);
//! ```

use std::fmt;
use std::sync::Arc;

use tessera_ecs::component::{ComponentOps, ComponentRegistry};
use tessera_ecs::tag::{Tag, TagFlags, TagRegistry};

use crate::graph::{SystemCatalog, SystemGraph};
use crate::system::SystemDescriptor;
use crate::EngineError;

/// Component registration callback, replayed into every new world.
pub type ComponentRegistration = Box<dyn Fn(&mut ComponentRegistry) + Send + Sync>;

// ---------------------------------------------------------------------------
// Plugin
// ---------------------------------------------------------------------------

/// A bundle of registrations contributed by one module.
pub trait Plugin: Send + Sync {
    fn build(&self, catalog: &mut CatalogBuilder) -> Result<(), EngineError>;
}

// ---------------------------------------------------------------------------
// CatalogBuilder
// ---------------------------------------------------------------------------

/// Collects registrations. Consumed by [`build`](Self::build).
#[derive(Default)]
pub struct CatalogBuilder {
    tags: TagRegistry,
    components: Vec<ComponentRegistration>,
    systems: SystemCatalog,
}

impl fmt::Debug for CatalogBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogBuilder")
            .field("tags", &self.tags.count())
            .field("components", &self.components.len())
            .field("systems", &self.systems.len())
            .finish()
    }
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tag(&mut self, name: &str) -> Result<Tag, EngineError> {
        Ok(self.tags.register(name)?)
    }

    pub fn tag_with(&mut self, name: &str, flags: TagFlags) -> Result<Tag, EngineError> {
        Ok(self.tags.register_with(name, flags)?)
    }

    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    /// Register a component type in every world built from this catalog.
    pub fn component<T: 'static>(&mut self, ops: ComponentOps<T>) -> &mut Self {
        self.components.push(Box::new(move |registry: &mut ComponentRegistry| {
            registry.register(ops.clone());
        }));
        self
    }

    /// Run arbitrary registration code against each new world's registry.
    pub fn components_with<F>(&mut self, register: F) -> &mut Self
    where
        F: Fn(&mut ComponentRegistry) + Send + Sync + 'static,
    {
        self.components.push(Box::new(register));
        self
    }

    pub fn system(&mut self, descriptor: SystemDescriptor) -> &mut Self {
        self.systems.register(descriptor);
        self
    }

    pub fn plugin(&mut self, plugin: &dyn Plugin) -> Result<&mut Self, EngineError> {
        plugin.build(self)?;
        Ok(self)
    }

    /// Commit the system graph and freeze the catalog.
    pub fn build(self) -> Result<Arc<Catalog>, EngineError> {
        let graph = self.systems.commit()?;
        tracing::debug!(
            tags = self.tags.count(),
            components = self.components.len(),
            "catalog built"
        );
        Ok(Arc::new(Catalog {
            tags: self.tags,
            components: self.components,
            graph,
        }))
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Frozen registrations shared by every world built from them.
pub struct Catalog {
    tags: TagRegistry,
    components: Vec<ComponentRegistration>,
    graph: SystemGraph,
}

impl fmt::Debug for Catalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Catalog")
            .field("tags", &self.tags.count())
            .field("components", &self.components.len())
            .field("graph", &self.graph)
            .finish()
    }
}

impl Catalog {
    pub fn tags(&self) -> &TagRegistry {
        &self.tags
    }

    pub fn graph(&self) -> &SystemGraph {
        &self.graph
    }

    /// Replay every component registration into `registry`.
    pub fn register_components(&self, registry: &mut ComponentRegistry) {
        for register in &self.components {
            register(registry);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::SystemKind;
    use crate::world::World;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Health(u32);

    struct RenderPlugin;

    impl Plugin for RenderPlugin {
        fn build(&self, catalog: &mut CatalogBuilder) -> Result<(), EngineError> {
            let render = catalog.tag("render")?;
            catalog
                .component(ComponentOps::<Health>::full("Health"))
                .system(
                    SystemDescriptor::normal("render.draw", |_w| {
                        Box::new(|_w: &mut World, _dt: f32| {})
                    })
                    .run_if(render),
                );
            Ok(())
        }
    }

    #[test]
    fn plugin_registrations_land_in_catalog() {
        let mut builder = CatalogBuilder::new();
        builder.plugin(&RenderPlugin).unwrap();
        let catalog = builder.build().unwrap();

        assert_eq!(catalog.tags().find("render").map(|t| t.index()), Some(0));
        assert_eq!(catalog.graph().kind(SystemKind::Normal).len(), 1);

        let mut registry = ComponentRegistry::new();
        catalog.register_components(&mut registry);
        assert!(registry.lookup::<Health>().is_some());
    }

    #[test]
    fn registrations_replay_per_world_registry() {
        let mut builder = CatalogBuilder::new();
        builder.component(ComponentOps::<Health>::full("Health"));
        let catalog = builder.build().unwrap();

        let mut a = ComponentRegistry::new();
        let mut b = ComponentRegistry::new();
        catalog.register_components(&mut a);
        catalog.register_components(&mut b);
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn duplicate_tag_surfaces_as_engine_error() {
        let mut builder = CatalogBuilder::new();
        builder.tag("editor").unwrap();
        assert!(matches!(builder.tag("editor"), Err(EngineError::Ecs(_))));
    }

    #[test]
    fn plugin_applied_twice_fails() {
        let mut builder = CatalogBuilder::new();
        builder.plugin(&RenderPlugin).unwrap();
        assert!(builder.plugin(&RenderPlugin).is_err());
    }
}
