//! Component type registration and type-erased component operations.
//!
//! Every component type a world uses is registered in that world's
//! [`ComponentRegistry`] together with a [`ComponentOps`] value declaring
//! which operations the type supports. Registration produces a
//! [`ComponentTypeId`] and an [`ErasedComponent`] descriptor that lets code
//! with no static knowledge of the type construct, copy, move, assign,
//! replace, remove and fetch its values.
//!
//! Capabilities are opt-in. A type that only declares default and copy
//! construction has no move or assignment operations, and asking the
//! registry for one of those is a caller bug (it panics). Descriptor-level
//! callers that want to check first use [`ComponentRegistry::capabilities`]
//! or match on [`EcsError::Unsupported`].

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::storage::EntityStore;
use crate::EcsError;

/// Owned, type-erased component value.
pub type ComponentBox = Box<dyn Any>;

// ---------------------------------------------------------------------------
// ComponentTypeId
// ---------------------------------------------------------------------------

/// Opaque, lightweight identifier for a registered component type.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub(crate) u32);

impl ComponentTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentTypeId({})", self.0)
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// A single optional operation family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Capability {
    DefaultConstruct,
    CopyConstruct,
    MoveConstruct,
    CopyAssign,
    MoveAssign,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Capability::DefaultConstruct => "default construction",
            Capability::CopyConstruct => "copy construction",
            Capability::MoveConstruct => "move construction",
            Capability::CopyAssign => "copy assignment",
            Capability::MoveAssign => "move assignment",
        })
    }
}

/// Which optional operations a component type supports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub default_constructible: bool,
    pub copy_constructible: bool,
    pub move_constructible: bool,
    pub copy_assignable: bool,
    pub move_assignable: bool,
}

impl Capabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::DefaultConstruct => self.default_constructible,
            Capability::CopyConstruct => self.copy_constructible,
            Capability::MoveConstruct => self.move_constructible,
            Capability::CopyAssign => self.copy_assignable,
            Capability::MoveAssign => self.move_assignable,
        }
    }
}

// ---------------------------------------------------------------------------
// ComponentOps
// ---------------------------------------------------------------------------

/// Declaration of a component type's metadata and supported operations.
///
/// Each capability method is only available when `T` has the trait it needs,
/// so a declaration can never promise an operation the type cannot perform.
///
/// ```
/// use tessera_ecs::prelude::*;
///
/// #[derive(Default, Clone)]
/// struct Health(u32);
///
/// let ops = ComponentOps::<Health>::new()
///     .named("Health")
///     .default_constructible()
///     .copy_constructible();
/// assert!(!ops.capabilities().copy_assignable);
/// ```
pub struct ComponentOps<T: 'static> {
    name: String,
    ignored: bool,
    default_fn: Option<fn() -> T>,
    clone_fn: Option<fn(&T) -> T>,
    clone_into_fn: Option<fn(&mut T, &T)>,
    movable: bool,
    move_assignable: bool,
}

impl<T: 'static> ComponentOps<T> {
    /// No metadata, no optional operations.
    pub fn new() -> Self {
        Self {
            name: String::new(),
            ignored: false,
            default_fn: None,
            clone_fn: None,
            clone_into_fn: None,
            movable: false,
            move_assignable: false,
        }
    }

    /// Display name shown by editor and serialization collaborators.
    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_owned();
        self
    }

    /// Hide the type from editor and serialization collaborators.
    pub fn ignored(mut self) -> Self {
        self.ignored = true;
        self
    }

    pub fn move_constructible(mut self) -> Self {
        self.movable = true;
        self
    }

    pub fn move_assignable(mut self) -> Self {
        self.move_assignable = true;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            default_constructible: self.default_fn.is_some(),
            copy_constructible: self.clone_fn.is_some(),
            move_constructible: self.movable,
            copy_assignable: self.clone_into_fn.is_some(),
            move_assignable: self.move_assignable,
        }
    }
}

impl<T: Default + 'static> ComponentOps<T> {
    pub fn default_constructible(mut self) -> Self {
        self.default_fn = Some(T::default);
        self
    }
}

impl<T: Clone + 'static> ComponentOps<T> {
    pub fn copy_constructible(mut self) -> Self {
        self.clone_fn = Some(T::clone);
        self
    }

    pub fn copy_assignable(mut self) -> Self {
        self.clone_into_fn = Some(|dst: &mut T, src: &T| dst.clone_from(src));
        self
    }
}

impl<T: Default + Clone + 'static> ComponentOps<T> {
    /// Every capability, plus a display name.
    pub fn full(name: &str) -> Self {
        Self::new()
            .named(name)
            .default_constructible()
            .copy_constructible()
            .move_constructible()
            .copy_assignable()
            .move_assignable()
    }
}

impl<T: 'static> Default for ComponentOps<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Clone for ComponentOps<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            ignored: self.ignored,
            default_fn: self.default_fn,
            clone_fn: self.clone_fn,
            clone_into_fn: self.clone_into_fn,
            movable: self.movable,
            move_assignable: self.move_assignable,
        }
    }
}

impl<T: 'static> fmt::Debug for ComponentOps<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOps")
            .field("type", &type_name::<T>())
            .field("name", &self.name)
            .field("ignored", &self.ignored)
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ComponentInfo
// ---------------------------------------------------------------------------

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentInfo {
    pub id: ComponentTypeId,
    /// Display name; empty when the type was registered without one.
    pub name: String,
    pub type_name: &'static str,
    pub type_id: TypeId,
    pub ignored: bool,
    pub capabilities: Capabilities,
}

impl ComponentInfo {
    /// Named, not ignored, and default-constructible, copy-constructible and
    /// copy-assignable.
    pub fn is_editable(&self) -> bool {
        !self.name.is_empty()
            && !self.ignored
            && self.capabilities.default_constructible
            && self.capabilities.copy_constructible
            && self.capabilities.copy_assignable
    }

    /// Name used in diagnostics: the display name, or the Rust type name.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            self.type_name
        } else {
            &self.name
        }
    }
}

// ---------------------------------------------------------------------------
// ErasedComponent
// ---------------------------------------------------------------------------

/// Type-erased operations on one component type.
///
/// Value arguments must hold the descriptor's concrete type; passing anything
/// else panics. Missing capabilities surface as [`EcsError::Unsupported`].
pub trait ErasedComponent: Send + Sync {
    fn info(&self) -> &ComponentInfo;

    fn construct(&self) -> Result<ComponentBox, EcsError>;
    fn copy(&self, src: &dyn Any) -> Result<ComponentBox, EcsError>;
    fn move_value(&self, src: ComponentBox) -> Result<ComponentBox, EcsError>;

    fn assign_default<'s>(&self, store: &'s mut EntityStore, entity: EntityId) -> Result<&'s mut dyn Any, EcsError>;
    fn assign_copy<'s>(&self, store: &'s mut EntityStore, entity: EntityId, src: &dyn Any) -> Result<&'s mut dyn Any, EcsError>;
    fn assign_move<'s>(&self, store: &'s mut EntityStore, entity: EntityId, src: ComponentBox) -> Result<&'s mut dyn Any, EcsError>;
    fn replace_copy<'s>(&self, store: &'s mut EntityStore, entity: EntityId, src: &dyn Any) -> Result<&'s mut dyn Any, EcsError>;
    fn replace_move<'s>(&self, store: &'s mut EntityStore, entity: EntityId, src: ComponentBox) -> Result<&'s mut dyn Any, EcsError>;
    fn get_or_assign<'s>(&self, store: &'s mut EntityStore, entity: EntityId) -> Result<&'s mut dyn Any, EcsError>;

    fn remove(&self, store: &mut EntityStore, entity: EntityId) -> bool;
    fn has(&self, store: &EntityStore, entity: EntityId) -> bool;
    fn get<'s>(&self, store: &'s EntityStore, entity: EntityId) -> Option<&'s dyn Any>;
    fn get_mut<'s>(&self, store: &'s mut EntityStore, entity: EntityId) -> Option<&'s mut dyn Any>;
}

/// [`ErasedComponent`] for a concrete `T`.
struct TypedComponent<T: 'static> {
    info: ComponentInfo,
    ops: ComponentOps<T>,
}

impl<T: 'static> TypedComponent<T> {
    fn unsupported(&self, capability: Capability) -> EcsError {
        EcsError::Unsupported {
            component: self.info.label().to_owned(),
            capability,
        }
    }

    fn missing(&self, entity: EntityId) -> EcsError {
        EcsError::MissingComponent {
            component: self.info.label().to_owned(),
            entity,
        }
    }

    fn downcast_ref<'v>(&self, value: &'v dyn Any) -> &'v T {
        value.downcast_ref::<T>().unwrap_or_else(|| {
            panic!(
                "value passed to component '{}' is not a {}",
                self.info.label(),
                type_name::<T>()
            )
        })
    }

    fn downcast_box(&self, value: ComponentBox) -> T {
        match value.downcast::<T>() {
            Ok(typed) => *typed,
            Err(_) => panic!(
                "value passed to component '{}' is not a {}",
                self.info.label(),
                type_name::<T>()
            ),
        }
    }

    fn default_fn(&self) -> Result<fn() -> T, EcsError> {
        self.ops
            .default_fn
            .ok_or_else(|| self.unsupported(Capability::DefaultConstruct))
    }

    fn clone_fn(&self) -> Result<fn(&T) -> T, EcsError> {
        self.ops
            .clone_fn
            .ok_or_else(|| self.unsupported(Capability::CopyConstruct))
    }

    fn require(&self, capability: Capability) -> Result<(), EcsError> {
        if self.info.capabilities.supports(capability) {
            Ok(())
        } else {
            Err(self.unsupported(capability))
        }
    }
}

impl<T: 'static> ErasedComponent for TypedComponent<T> {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn construct(&self) -> Result<ComponentBox, EcsError> {
        let make = self.default_fn()?;
        Ok(Box::new(make()))
    }

    fn copy(&self, src: &dyn Any) -> Result<ComponentBox, EcsError> {
        let clone = self.clone_fn()?;
        Ok(Box::new(clone(self.downcast_ref(src))))
    }

    fn move_value(&self, src: ComponentBox) -> Result<ComponentBox, EcsError> {
        self.require(Capability::MoveConstruct)?;
        Ok(Box::new(self.downcast_box(src)))
    }

    fn assign_default<'s>(&self, store: &'s mut EntityStore, entity: EntityId) -> Result<&'s mut dyn Any, EcsError> {
        let make = self.default_fn()?;
        Ok(store.insert(entity, make())?)
    }

    fn assign_copy<'s>(&self, store: &'s mut EntityStore, entity: EntityId, src: &dyn Any) -> Result<&'s mut dyn Any, EcsError> {
        let clone = self.clone_fn()?;
        let value = clone(self.downcast_ref(src));
        Ok(store.insert(entity, value)?)
    }

    fn assign_move<'s>(&self, store: &'s mut EntityStore, entity: EntityId, src: ComponentBox) -> Result<&'s mut dyn Any, EcsError> {
        self.require(Capability::MoveConstruct)?;
        let value = self.downcast_box(src);
        Ok(store.insert(entity, value)?)
    }

    fn replace_copy<'s>(&self, store: &'s mut EntityStore, entity: EntityId, src: &dyn Any) -> Result<&'s mut dyn Any, EcsError> {
        let assign = self
            .ops
            .clone_into_fn
            .ok_or_else(|| self.unsupported(Capability::CopyAssign))?;
        let src = self.downcast_ref(src);
        if !store.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        let slot = store.get_mut::<T>(entity).ok_or_else(|| self.missing(entity))?;
        assign(slot, src);
        Ok(slot)
    }

    fn replace_move<'s>(&self, store: &'s mut EntityStore, entity: EntityId, src: ComponentBox) -> Result<&'s mut dyn Any, EcsError> {
        self.require(Capability::MoveAssign)?;
        let value = self.downcast_box(src);
        if !store.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        let slot = store.get_mut::<T>(entity).ok_or_else(|| self.missing(entity))?;
        *slot = value;
        Ok(slot)
    }

    fn get_or_assign<'s>(&self, store: &'s mut EntityStore, entity: EntityId) -> Result<&'s mut dyn Any, EcsError> {
        let make = self.default_fn()?;
        if store.has::<T>(entity) {
            let slot = store.get_mut::<T>(entity).ok_or_else(|| self.missing(entity))?;
            return Ok(slot);
        }
        Ok(store.insert(entity, make())?)
    }

    fn remove(&self, store: &mut EntityStore, entity: EntityId) -> bool {
        store.remove::<T>(entity).is_some()
    }

    fn has(&self, store: &EntityStore, entity: EntityId) -> bool {
        store.has::<T>(entity)
    }

    fn get<'s>(&self, store: &'s EntityStore, entity: EntityId) -> Option<&'s dyn Any> {
        store.get::<T>(entity).map(|v| v as &dyn Any)
    }

    fn get_mut<'s>(&self, store: &'s mut EntityStore, entity: EntityId) -> Option<&'s mut dyn Any> {
        store.get_mut::<T>(entity).map(|v| v as &mut dyn Any)
    }
}

// ---------------------------------------------------------------------------
// ComponentRegistry
// ---------------------------------------------------------------------------

/// Per-world table of component descriptors.
///
/// A type can only be registered once; registering the same Rust type again
/// returns the existing [`ComponentTypeId`] and ignores the new declaration.
/// The table is read-only once the owning world has finished construction.
#[derive(Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<String, ComponentTypeId>,
    /// Indexed by `ComponentTypeId.0`.
    descriptors: Vec<Box<dyn ErasedComponent>>,
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("components", &self.registered_names())
            .finish()
    }
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` with the given declaration.
    ///
    /// # Panics
    ///
    /// Panics if the display name is already used by a different type.
    pub fn register<T: 'static>(&mut self, ops: ComponentOps<T>) -> ComponentTypeId {
        let rust_type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&rust_type_id) {
            return existing;
        }
        if !ops.name.is_empty() && self.by_name.contains_key(&ops.name) {
            panic!(
                "component name '{}' is already registered for a different type",
                ops.name
            );
        }

        let id = ComponentTypeId(self.descriptors.len() as u32);
        let info = ComponentInfo {
            id,
            name: ops.name.clone(),
            type_name: type_name::<T>(),
            type_id: rust_type_id,
            ignored: ops.ignored,
            capabilities: ops.capabilities(),
        };
        tracing::trace!(component = info.label(), ?id, capabilities = ?info.capabilities, "registered component");

        if !info.name.is_empty() {
            self.by_name.insert(info.name.clone(), id);
        }
        self.by_type.insert(rust_type_id, id);
        self.descriptors.push(Box::new(TypedComponent { info, ops }));
        id
    }

    pub fn lookup<T: 'static>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    pub fn lookup_by_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    /// Resolve a component type by name for configuration input.
    pub fn resolve(&self, name: &str) -> Result<ComponentTypeId, EcsError> {
        self.lookup_by_name(name)
            .ok_or_else(|| EcsError::UnknownComponent(name.to_owned()))
    }

    /// Like [`lookup`](Self::lookup) but for callers that require registration.
    ///
    /// # Panics
    ///
    /// Panics if `T` was never registered.
    pub fn id_of<T: 'static>(&self) -> ComponentTypeId {
        self.lookup::<T>().unwrap_or_else(|| {
            panic!(
                "component type {} not registered -- register it before use",
                type_name::<T>()
            )
        })
    }

    /// The descriptor for `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not issued by this registry.
    pub fn descriptor(&self, id: ComponentTypeId) -> &dyn ErasedComponent {
        match self.descriptors.get(id.index()) {
            Some(d) => d.as_ref(),
            None => panic!("{id:?} is not registered in this world"),
        }
    }

    pub fn get_info(&self, id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.descriptors.get(id.index()).map(|d| d.info())
    }

    pub fn capabilities(&self, id: ComponentTypeId) -> Capabilities {
        self.descriptor(id).info().capabilities
    }

    pub fn is_component_editable(&self, id: ComponentTypeId) -> bool {
        self.descriptor(id).info().is_editable()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.descriptors.iter().map(|d| d.info())
    }

    /// Display names of all named component types, sorted.
    pub fn registered_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    // -- erased operations --------------------------------------------------
    //
    // Unregistered ids and absent capabilities are contract violations and
    // panic. Entity failures come back as `Err`.

    pub fn construct_component(&self, id: ComponentTypeId) -> ComponentBox {
        expect_supported(self.descriptor(id).construct())
    }

    pub fn copy_component(&self, id: ComponentTypeId, src: &dyn Any) -> ComponentBox {
        expect_supported(self.descriptor(id).copy(src))
    }

    pub fn move_component(&self, id: ComponentTypeId, src: ComponentBox) -> ComponentBox {
        expect_supported(self.descriptor(id).move_value(src))
    }

    pub fn assign_default<'s>(
        &self,
        store: &'s mut EntityStore,
        id: ComponentTypeId,
        entity: EntityId,
    ) -> Result<&'s mut dyn Any, EcsError> {
        check_supported(self.descriptor(id).assign_default(store, entity))
    }

    pub fn assign_copy<'s>(
        &self,
        store: &'s mut EntityStore,
        id: ComponentTypeId,
        entity: EntityId,
        src: &dyn Any,
    ) -> Result<&'s mut dyn Any, EcsError> {
        check_supported(self.descriptor(id).assign_copy(store, entity, src))
    }

    pub fn assign_move<'s>(
        &self,
        store: &'s mut EntityStore,
        id: ComponentTypeId,
        entity: EntityId,
        src: ComponentBox,
    ) -> Result<&'s mut dyn Any, EcsError> {
        check_supported(self.descriptor(id).assign_move(store, entity, src))
    }

    /// Overwrite an existing component by copy assignment.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if `entity` has no such component.
    pub fn replace_copy<'s>(
        &self,
        store: &'s mut EntityStore,
        id: ComponentTypeId,
        entity: EntityId,
        src: &dyn Any,
    ) -> Result<&'s mut dyn Any, EcsError> {
        check_supported(self.descriptor(id).replace_copy(store, entity, src))
    }

    /// Overwrite an existing component by move assignment.
    ///
    /// # Errors
    ///
    /// [`EcsError::MissingComponent`] if `entity` has no such component.
    pub fn replace_move<'s>(
        &self,
        store: &'s mut EntityStore,
        id: ComponentTypeId,
        entity: EntityId,
        src: ComponentBox,
    ) -> Result<&'s mut dyn Any, EcsError> {
        check_supported(self.descriptor(id).replace_move(store, entity, src))
    }

    pub fn get_or_assign<'s>(
        &self,
        store: &'s mut EntityStore,
        id: ComponentTypeId,
        entity: EntityId,
    ) -> Result<&'s mut dyn Any, EcsError> {
        check_supported(self.descriptor(id).get_or_assign(store, entity))
    }

    /// Returns whether a component was removed.
    pub fn remove(&self, store: &mut EntityStore, id: ComponentTypeId, entity: EntityId) -> bool {
        self.descriptor(id).remove(store, entity)
    }

    pub fn has(&self, store: &EntityStore, id: ComponentTypeId, entity: EntityId) -> bool {
        self.descriptor(id).has(store, entity)
    }

    pub fn get<'s>(
        &self,
        store: &'s EntityStore,
        id: ComponentTypeId,
        entity: EntityId,
    ) -> Option<&'s dyn Any> {
        self.descriptor(id).get(store, entity)
    }

    pub fn get_mut<'s>(
        &self,
        store: &'s mut EntityStore,
        id: ComponentTypeId,
        entity: EntityId,
    ) -> Option<&'s mut dyn Any> {
        self.descriptor(id).get_mut(store, entity)
    }
}

#[track_caller]
fn check_supported<T>(result: Result<T, EcsError>) -> Result<T, EcsError> {
    match result {
        Err(EcsError::Unsupported {
            component,
            capability,
        }) => panic!("component '{component}' does not support {capability}"),
        other => other,
    }
}

#[track_caller]
fn expect_supported<T>(result: Result<T, EcsError>) -> T {
    match check_supported(result) {
        Ok(value) => value,
        Err(e) => panic!("{e}"),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
