//! The [`World`]: entities, components, tags, and the system execution loop.
//!
//! A world is created from a shared [`Catalog`]. Construction registers the
//! catalog's component types, spawns the world entity carrying the
//! [`Running`] marker, applies the initial tags, and resolves the execution
//! order of each [`SystemKind`]. A dependency cycle aborts construction.
//!
//! Systems are built lazily, in resolved order, the first time a pass runs
//! (or when [`World::construct_systems`] is called). Each pass then updates
//! the systems of its kind in that order.
//!
//! # Tag gating
//!
//! A system whose tag predicate is false for this world is *present but
//! inactive*: it is constructed in dependency order and keeps its slot in
//! the resolved order, but its `update` is skipped. Tags therefore never
//! change the relative order of the systems that do run.
//!
//! # Termination
//!
//! [`World::update_normal`] checks for the [`Running`] marker before every
//! system it invokes and stops as soon as it is gone. Systems request
//! shutdown with [`World::request_stop`].

use std::any::Any;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tessera_ecs::component::{
    ComponentBox, ComponentOps, ComponentRegistry, ComponentTypeId,
};
use tessera_ecs::entity::EntityId;
use tessera_ecs::storage::EntityStore;
use tessera_ecs::tag::{Tag, TagRegistry, TagSet};
use tessera_ecs::EcsError;

use crate::catalog::Catalog;
use crate::config::WorldConfig;
use crate::system::{System, SystemKind};
use crate::EngineError;

/// Marker component on the world entity. Removing it stops the world.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Running;

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Per-kind execution state. Positions index into `order`.
#[derive(Default)]
struct Schedule {
    /// Node indices of the kind graph, in resolved order.
    order: Vec<usize>,
    /// Whether the system at each position passes its tag predicate.
    active: Vec<bool>,
    instances: Vec<Option<Box<dyn System>>>,
    /// Positions in the order their systems were constructed.
    constructed: Vec<usize>,
}

impl Schedule {
    fn new(order: Vec<usize>) -> Self {
        let len = order.len();
        Self {
            order,
            active: vec![true; len],
            instances: (0..len).map(|_| None).collect(),
            constructed: Vec::with_capacity(len),
        }
    }
}

// ---------------------------------------------------------------------------
// World
// ---------------------------------------------------------------------------

/// Entities, components, tags, and the systems that run over them.
pub struct World {
    catalog: Arc<Catalog>,
    components: ComponentRegistry,
    entities: EntityStore,
    tags: TagSet,
    world_entity: EntityId,
    /// Indexed by `SystemKind::index()`.
    schedules: [Schedule; 2],
    systems_constructed: bool,
    /// Activation masks must be recomputed before the next pass.
    tags_dirty: bool,
    /// Set while a pass or construction is running.
    busy: bool,
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entity_count", &self.entities.entity_count())
            .field("components", &self.components.len())
            .field("tags", &self.tags.iter().collect::<Vec<_>>())
            .field("systems_constructed", &self.systems_constructed)
            .field("running", &self.is_running())
            .finish()
    }
}

impl World {
    /// Create a world with the given tags switched on.
    ///
    /// # Errors
    ///
    /// [`EngineError::Cycle`] if either kind's dependency graph is cyclic.
    pub fn new(catalog: Arc<Catalog>, tags: &[Tag]) -> Result<Self, EngineError> {
        let mut components = ComponentRegistry::new();
        components.register(
            ComponentOps::<Running>::new()
                .named("Running")
                .ignored()
                .default_constructible()
                .copy_constructible()
                .move_constructible(),
        );
        catalog.register_components(&mut components);

        let mut entities = EntityStore::new();
        let world_entity = entities.spawn();
        entities.insert(world_entity, Running)?;

        let mut tag_set = TagSet::sized_for(catalog.tags());
        for &tag in tags {
            tag_set.insert(tag);
        }

        let graph = catalog.graph();
        let schedules = [
            Schedule::new(graph.resolve_order(SystemKind::Normal)?),
            Schedule::new(graph.resolve_order(SystemKind::Fixed)?),
        ];

        let mut world = Self {
            catalog,
            components,
            entities,
            tags: tag_set,
            world_entity,
            schedules,
            systems_constructed: false,
            tags_dirty: false,
            busy: false,
        };
        world.refresh_activation();
        for kind in SystemKind::ALL {
            tracing::debug!(
                %kind,
                order = ?world.resolved_order(kind),
                "resolved system order"
            );
        }
        Ok(world)
    }

    /// Create a world whose initial tags are named in `config`.
    ///
    /// # Errors
    ///
    /// [`EngineError::Ecs`] wrapping [`EcsError::UnknownTag`] for a tag name
    /// the catalog does not know, plus everything [`World::new`] returns.
    pub fn from_config(catalog: Arc<Catalog>, config: &WorldConfig) -> Result<Self, EngineError> {
        let tags = config
            .tags
            .iter()
            .map(|name| catalog.tags().resolve(name))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(catalog, &tags)
    }

    // -- accessors ----------------------------------------------------------

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut EntityStore {
        &mut self.entities
    }

    /// The entity that carries the [`Running`] marker.
    pub fn world_entity(&self) -> EntityId {
        self.world_entity
    }

    // -- tags ---------------------------------------------------------------

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn tag_registry(&self) -> &TagRegistry {
        self.catalog.tags()
    }

    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(tag)
    }

    /// Switch a tag on or off. Takes effect at the start of the next pass.
    pub fn set_tag(&mut self, tag: Tag, on: bool) {
        if self.tags.set(tag, on) {
            self.tags_dirty = true;
        }
    }

    /// Copy the parent's inheritable tags into this world.
    pub fn inherit_tags_from(&mut self, parent: &World) {
        if self.tags.inherit_from(&parent.tags, self.catalog.tags()) > 0 {
            self.tags_dirty = true;
        }
    }

    /// Push this world's propagable tags into `child`.
    pub fn propagate_tags_to(&self, child: &mut World) {
        if self.tags.propagate_to(&mut child.tags, self.catalog.tags()) > 0 {
            child.tags_dirty = true;
        }
    }

    fn refresh_activation(&mut self) {
        let graph = self.catalog.graph();
        for kind in SystemKind::ALL {
            let nodes = graph.kind(kind);
            let schedule = &mut self.schedules[kind.index()];
            for (pos, &node) in schedule.order.iter().enumerate() {
                schedule.active[pos] = nodes.node(node).is_active(&self.tags);
            }
        }
        self.tags_dirty = false;
    }

    // -- running marker -----------------------------------------------------

    pub fn is_running(&self) -> bool {
        self.entities.has::<Running>(self.world_entity)
    }

    /// Remove the [`Running`] marker. The current normal pass stops before
    /// its next system.
    pub fn request_stop(&mut self) {
        if self.entities.remove::<Running>(self.world_entity).is_some() {
            tracing::info!("world stop requested");
        }
    }

    // -- schedule introspection ---------------------------------------------

    /// System names of `kind` in resolved order.
    pub fn resolved_order(&self, kind: SystemKind) -> Vec<&str> {
        let nodes = self.catalog.graph().kind(kind);
        self.schedules[kind.index()]
            .order
            .iter()
            .map(|&i| nodes.node(i).name())
            .collect()
    }

    fn position_of(&self, kind: SystemKind, name: &str) -> Option<usize> {
        let node = self.catalog.graph().kind(kind).index_of(name)?;
        self.schedules[kind.index()].order.iter().position(|&i| i == node)
    }

    /// Whether `name` passes its tag predicate in this world.
    ///
    /// Reflects tag changes made since the last pass.
    pub fn is_system_active(&self, kind: SystemKind, name: &str) -> bool {
        let Some(node) = self.catalog.graph().kind(kind).index_of(name) else {
            return false;
        };
        self.catalog.graph().kind(kind).node(node).is_active(&self.tags)
    }

    pub fn is_system_constructed(&self, kind: SystemKind, name: &str) -> bool {
        self.position_of(kind, name)
            .is_some_and(|pos| self.schedules[kind.index()].constructed.contains(&pos))
    }

    pub fn systems_constructed(&self) -> bool {
        self.systems_constructed
    }

    // -- system lifecycle ---------------------------------------------------

    /// Build every system that does not exist yet, kind by kind, in
    /// resolved order. Idempotent.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a system.
    pub fn construct_systems(&mut self) {
        assert!(!self.busy, "construct_systems called re-entrantly from a system");
        let mut world = self.enter();
        for kind in SystemKind::ALL {
            let k = kind.index();
            for pos in 0..world.schedules[k].order.len() {
                if world.schedules[k].instances[pos].is_some() {
                    continue;
                }
                let node = world.schedules[k].order[pos];
                let catalog = Arc::clone(&world.catalog);
                let node = catalog.graph().kind(kind).node(node);
                tracing::trace!(%kind, system = node.name(), "constructing system");
                let instance = (node.factory())(&mut *world);
                let schedule = &mut world.schedules[k];
                schedule.instances[pos] = Some(instance);
                schedule.constructed.push(pos);
            }
        }
        world.systems_constructed = true;
    }

    /// Mark the world busy until the returned guard drops, unwinding included.
    fn enter(&mut self) -> BusyGuard<'_> {
        self.busy = true;
        BusyGuard { world: self }
    }

    fn begin_pass(&mut self) -> BusyGuard<'_> {
        assert!(!self.busy, "world update driven re-entrantly from a system");
        if !self.systems_constructed {
            self.construct_systems();
        }
        if self.tags_dirty {
            self.refresh_activation();
        }
        self.enter()
    }

    /// Run one step of `kind`'s system at `pos` if it is active.
    fn run_at(&mut self, k: usize, pos: usize, elapsed: f32) {
        if !self.schedules[k].active[pos] {
            return;
        }
        if let Some(mut system) = self.schedules[k].instances[pos].take() {
            system.update(self, elapsed);
            self.schedules[k].instances[pos] = Some(system);
        }
    }

    /// Update every active fixed-timestep system once, in resolved order.
    pub fn update_fixed(&mut self, elapsed: f32) {
        let mut world = self.begin_pass();
        let k = SystemKind::Fixed.index();
        for pos in 0..world.schedules[k].order.len() {
            world.run_at(k, pos, elapsed);
        }
    }

    /// Update every active normal system once, in resolved order.
    ///
    /// Returns `false` as soon as the [`Running`] marker is found missing
    /// (before any remaining system runs), otherwise whether the world is
    /// still running after the pass.
    pub fn update_normal(&mut self, elapsed: f32) -> bool {
        let mut world = self.begin_pass();
        let k = SystemKind::Normal.index();
        for pos in 0..world.schedules[k].order.len() {
            if !world.is_running() {
                return false;
            }
            world.run_at(k, pos, elapsed);
        }
        world.is_running()
    }

    // -- entity helpers -----------------------------------------------------

    pub fn spawn(&mut self) -> EntityId {
        self.entities.spawn()
    }

    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        self.entities.despawn(entity)
    }

    pub fn insert<T: 'static>(&mut self, entity: EntityId, value: T) -> Result<&mut T, EcsError> {
        self.entities.insert(entity, value)
    }

    pub fn get<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        self.entities.get(entity)
    }

    pub fn get_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.entities.get_mut(entity)
    }

    // -- type-erased component operations ------------------------------------
    //
    // Thin dispatch onto the registry against this world's entity store.
    // Unregistered ids and missing capabilities panic.

    pub fn construct_component(&self, id: ComponentTypeId) -> ComponentBox {
        self.components.construct_component(id)
    }

    pub fn copy_component(&self, id: ComponentTypeId, src: &dyn Any) -> ComponentBox {
        self.components.copy_component(id, src)
    }

    pub fn move_component(&self, id: ComponentTypeId, src: ComponentBox) -> ComponentBox {
        self.components.move_component(id, src)
    }

    pub fn assign_default(&mut self, id: ComponentTypeId, entity: EntityId) -> Result<&mut dyn Any, EcsError> {
        self.components.assign_default(&mut self.entities, id, entity)
    }

    pub fn assign_copy(&mut self, id: ComponentTypeId, entity: EntityId, src: &dyn Any) -> Result<&mut dyn Any, EcsError> {
        self.components.assign_copy(&mut self.entities, id, entity, src)
    }

    pub fn assign_move(&mut self, id: ComponentTypeId, entity: EntityId, src: ComponentBox) -> Result<&mut dyn Any, EcsError> {
        self.components.assign_move(&mut self.entities, id, entity, src)
    }

    pub fn replace_copy(&mut self, id: ComponentTypeId, entity: EntityId, src: &dyn Any) -> Result<&mut dyn Any, EcsError> {
        self.components.replace_copy(&mut self.entities, id, entity, src)
    }

    pub fn replace_move(&mut self, id: ComponentTypeId, entity: EntityId, src: ComponentBox) -> Result<&mut dyn Any, EcsError> {
        self.components.replace_move(&mut self.entities, id, entity, src)
    }

    pub fn get_or_assign(&mut self, id: ComponentTypeId, entity: EntityId) -> Result<&mut dyn Any, EcsError> {
        self.components.get_or_assign(&mut self.entities, id, entity)
    }

    pub fn remove_component(&mut self, id: ComponentTypeId, entity: EntityId) -> bool {
        self.components.remove(&mut self.entities, id, entity)
    }

    pub fn has_component(&self, id: ComponentTypeId, entity: EntityId) -> bool {
        self.components.has(&self.entities, id, entity)
    }

    pub fn get_component(&self, id: ComponentTypeId, entity: EntityId) -> Option<&dyn Any> {
        self.components.get(&self.entities, id, entity)
    }

    pub fn get_component_mut(&mut self, id: ComponentTypeId, entity: EntityId) -> Option<&mut dyn Any> {
        self.components.get_mut(&mut self.entities, id, entity)
    }

    pub fn is_component_editable(&self, id: ComponentTypeId) -> bool {
        self.components.is_component_editable(id)
    }
}

/// Clears [`World::busy`] on drop.
struct BusyGuard<'w> {
    world: &'w mut World,
}

impl Deref for BusyGuard<'_> {
    type Target = World;

    fn deref(&self) -> &World {
        self.world
    }
}

impl DerefMut for BusyGuard<'_> {
    fn deref_mut(&mut self) -> &mut World {
        self.world
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.world.busy = false;
    }
}

impl Drop for World {
    /// Systems are released in reverse construction order, last kind first.
    fn drop(&mut self) {
        for kind in SystemKind::ALL.iter().rev() {
            let schedule = &mut self.schedules[kind.index()];
            while let Some(pos) = schedule.constructed.pop() {
                if let Some(system) = schedule.instances[pos].take() {
                    tracing::trace!(%kind, position = pos, "dropping system");
                    drop(system);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogBuilder;
    use crate::system::SystemDescriptor;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    /// Records construction, updates, and drop into a shared log.
    struct Logged {
        name: &'static str,
        log: Log,
    }

    impl System for Logged {
        fn update(&mut self, _world: &mut World, _elapsed: f32) {
            self.log.lock().unwrap().push(format!("update {}", self.name));
        }
    }

    impl Drop for Logged {
        fn drop(&mut self) {
            self.log.lock().unwrap().push(format!("drop {}", self.name));
        }
    }

    fn logged(kind: SystemKind, name: &'static str, log: &Log) -> SystemDescriptor {
        let log = Arc::clone(log);
        SystemDescriptor::new(name, kind, move |_world| {
            log.lock().unwrap().push(format!("construct {name}"));
            Box::new(Logged {
                name,
                log: Arc::clone(&log),
            })
        })
    }

    fn entries(log: &Log, prefix: &str) -> Vec<String> {
        log.lock()
            .unwrap()
            .iter()
            .filter_map(|e| e.strip_prefix(prefix).map(str::to_owned))
            .collect()
    }

    #[test]
    fn systems_are_constructed_lazily_in_resolved_order() {
        let log: Log = Arc::default();
        let mut builder = CatalogBuilder::new();
        builder
            .system(logged(SystemKind::Normal, "b", &log).after("a"))
            .system(logged(SystemKind::Normal, "a", &log))
            .system(logged(SystemKind::Fixed, "tick", &log));
        let catalog = builder.build().unwrap();

        let mut world = World::new(catalog, &[]).unwrap();
        assert!(!world.systems_constructed());
        assert!(log.lock().unwrap().is_empty());

        world.update_fixed(0.016);
        assert_eq!(entries(&log, "construct "), ["a", "b", "tick"]);
        assert!(world.is_system_constructed(SystemKind::Normal, "b"));

        world.construct_systems();
        assert_eq!(entries(&log, "construct ").len(), 3, "construction is idempotent");
    }

    #[test]
    fn passes_run_only_their_kind() {
        let log: Log = Arc::default();
        let mut builder = CatalogBuilder::new();
        builder
            .system(logged(SystemKind::Normal, "draw", &log))
            .system(logged(SystemKind::Fixed, "step", &log));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();

        world.update_fixed(0.01);
        world.update_fixed(0.01);
        assert!(world.update_normal(0.02));
        assert_eq!(entries(&log, "update "), ["step", "step", "draw"]);
    }

    #[test]
    fn drop_releases_in_reverse_construction_order_fixed_first() {
        let log: Log = Arc::default();
        let mut builder = CatalogBuilder::new();
        builder
            .system(logged(SystemKind::Normal, "n1", &log))
            .system(logged(SystemKind::Normal, "n2", &log).after("n1"))
            .system(logged(SystemKind::Fixed, "f1", &log))
            .system(logged(SystemKind::Fixed, "f2", &log).after("f1"));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();
        world.construct_systems();
        drop(world);

        assert_eq!(entries(&log, "drop "), ["f2", "f1", "n2", "n1"]);
    }

    #[test]
    fn unconstructed_world_drops_cleanly() {
        let log: Log = Arc::default();
        let mut builder = CatalogBuilder::new();
        builder.system(logged(SystemKind::Normal, "idle", &log));
        let world = World::new(builder.build().unwrap(), &[]).unwrap();
        drop(world);
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn removing_marker_stops_before_next_system() {
        let log: Log = Arc::default();
        let mut builder = CatalogBuilder::new();
        builder
            .system(logged(SystemKind::Normal, "a", &log))
            .system(SystemDescriptor::normal("b", |_w| {
                Box::new(|world: &mut World, _dt: f32| world.request_stop())
            }))
            .system(logged(SystemKind::Normal, "c", &log));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();

        assert!(world.is_running());
        assert!(!world.update_normal(0.016));
        assert!(!world.is_running());
        assert_eq!(entries(&log, "update "), ["a"]);

        assert!(!world.update_normal(0.016));
        assert_eq!(entries(&log, "update "), ["a"], "a stopped world runs nothing");
    }

    #[test]
    fn fixed_pass_ignores_running_marker() {
        let log: Log = Arc::default();
        let mut builder = CatalogBuilder::new();
        builder
            .system(SystemDescriptor::fixed("a.stop", |_w| {
                Box::new(|world: &mut World, _dt: f32| world.request_stop())
            }))
            .system(logged(SystemKind::Fixed, "b", &log));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();

        world.update_fixed(0.01);
        assert!(!world.is_running());
        assert_eq!(entries(&log, "update "), ["b"]);
    }

    #[test]
    fn gated_system_is_constructed_but_not_updated() {
        let log: Log = Arc::default();
        let mut builder = CatalogBuilder::new();
        let editor = builder.tag("editor").unwrap();
        builder
            .system(logged(SystemKind::Normal, "gizmos", &log).run_if(editor))
            .system(logged(SystemKind::Normal, "present", &log).after("gizmos"));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();

        assert!(world.update_normal(0.016));
        assert_eq!(entries(&log, "construct "), ["gizmos", "present"]);
        assert_eq!(entries(&log, "update "), ["present"]);
        assert_eq!(world.resolved_order(SystemKind::Normal), ["gizmos", "present"]);
    }

    #[test]
    fn tag_change_applies_on_next_pass() {
        let log: Log = Arc::default();
        let mut builder = CatalogBuilder::new();
        let debug = builder.tag("debug").unwrap();
        builder
            .system(SystemDescriptor::normal("a.toggle", move |_w| {
                Box::new(move |world: &mut World, _dt: f32| world.set_tag(debug, true))
            }))
            .system(logged(SystemKind::Normal, "b.overlay", &log).run_if(debug));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();

        world.update_normal(0.016);
        assert!(entries(&log, "update ").is_empty(), "mask is fixed for the pass");
        assert!(world.has_tag(debug));
        assert!(world.is_system_active(SystemKind::Normal, "b.overlay"));

        world.update_normal(0.016);
        assert_eq!(entries(&log, "update "), ["b.overlay"]);
    }

    #[test]
    fn cycle_prevents_world_construction() {
        let mut builder = CatalogBuilder::new();
        builder
            .system(SystemDescriptor::normal("A", |_w| Box::new(|_w: &mut World, _dt: f32| {})).after("B"))
            .system(SystemDescriptor::normal("B", |_w| Box::new(|_w: &mut World, _dt: f32| {})).after("A"));
        let catalog = builder.build().unwrap();
        let err = World::new(catalog, &[]).unwrap_err();
        assert!(matches!(err, EngineError::Cycle { .. }));
    }

    #[test]
    fn factories_can_touch_the_world() {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Score(u32);

        let mut builder = CatalogBuilder::new();
        builder
            .component(ComponentOps::<Score>::full("Score"))
            .system(SystemDescriptor::normal("scorer", |world| {
                let e = world.spawn();
                world.insert(e, Score(0)).unwrap();
                Box::new(move |world: &mut World, _dt: f32| {
                    if let Some(score) = world.get_mut::<Score>(e) {
                        score.0 += 1;
                    }
                })
            }));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();
        for _ in 0..3 {
            world.update_normal(0.016);
        }
        let total: u32 = world.entities().iter::<Score>().map(|(_, s)| s.0).sum();
        assert_eq!(total, 3);
    }

    #[test]
    #[should_panic(expected = "re-entrantly")]
    fn reentrant_update_panics() {
        let mut builder = CatalogBuilder::new();
        builder.system(SystemDescriptor::normal("recurse", |_w| {
            Box::new(|world: &mut World, dt: f32| {
                world.update_normal(dt);
            })
        }));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();
        world.update_normal(0.016);
    }

    #[test]
    fn panicking_factory_does_not_leave_world_busy() {
        use std::panic::{catch_unwind, AssertUnwindSafe};
        use std::sync::atomic::{AtomicBool, Ordering};

        let log: Log = Arc::default();
        let armed = Arc::new(AtomicBool::new(true));
        let mut builder = CatalogBuilder::new();
        builder
            .system(SystemDescriptor::normal("flaky", {
                let armed = Arc::clone(&armed);
                move |_w| {
                    if armed.swap(false, Ordering::SeqCst) {
                        panic!("factory failed");
                    }
                    Box::new(|_w: &mut World, _dt: f32| {})
                }
            }))
            .system(logged(SystemKind::Normal, "steady", &log).after("flaky"));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();

        let first = catch_unwind(AssertUnwindSafe(|| world.update_normal(0.016)));
        assert!(first.is_err());

        assert!(world.update_normal(0.016));
        assert_eq!(entries(&log, "update "), ["steady"]);
    }

    #[test]
    fn panicking_system_does_not_leave_world_busy() {
        use std::panic::{catch_unwind, AssertUnwindSafe};

        let mut builder = CatalogBuilder::new();
        builder.system(SystemDescriptor::fixed("boom", |_w| {
            Box::new(|_w: &mut World, _dt: f32| panic!("system failed"))
        }));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();

        assert!(catch_unwind(AssertUnwindSafe(|| world.update_fixed(0.016))).is_err());
        // The panicking instance is lost; the world itself must still be drivable.
        world.update_fixed(0.016);
        assert!(world.update_normal(0.016));
    }

    #[test]
    fn erased_operations_dispatch_through_world() {
        #[derive(Debug, Default, Clone, PartialEq)]
        struct Mass(f32);

        let mut builder = CatalogBuilder::new();
        builder.component(ComponentOps::<Mass>::full("Mass"));
        let mut world = World::new(builder.build().unwrap(), &[]).unwrap();
        let id = world.components().lookup_by_name("Mass").unwrap();
        let e = world.spawn();

        world.assign_copy(id, e, &Mass(2.0)).unwrap();
        assert!(world.has_component(id, e));
        world.replace_move(id, e, Box::new(Mass(3.0))).unwrap();
        assert_eq!(world.get::<Mass>(e), Some(&Mass(3.0)));
        assert!(world.is_component_editable(id));

        let running = world.components().lookup::<Running>().unwrap();
        assert!(!world.is_component_editable(running), "marker is hidden");
        assert!(world.remove_component(id, e));
        assert!(world.get_component(id, e).is_none());
    }

    #[test]
    fn tags_follow_inheritance_flags() {
        use tessera_ecs::tag::TagFlags;

        let mut builder = CatalogBuilder::new();
        let editor = builder
            .tag_with("editor", TagFlags { inheritable: true, propagable: false })
            .unwrap();
        let paused = builder
            .tag_with("paused", TagFlags { inheritable: false, propagable: true })
            .unwrap();
        let catalog = builder.build().unwrap();

        let parent = World::new(Arc::clone(&catalog), &[editor, paused]).unwrap();
        let mut child = World::new(catalog, &[]).unwrap();
        child.inherit_tags_from(&parent);
        assert!(child.has_tag(editor));
        assert!(!child.has_tag(paused));

        parent.propagate_tags_to(&mut child);
        assert!(child.has_tag(paused));
    }

    #[test]
    fn unknown_config_tag_fails() {
        let catalog = CatalogBuilder::new().build().unwrap();
        let config = WorldConfig {
            tags: vec!["missing".into()],
        };
        let err = World::from_config(catalog, &config).unwrap_err();
        assert!(matches!(err, EngineError::Ecs(EcsError::UnknownTag(_))));
    }
}
