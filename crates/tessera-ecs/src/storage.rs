//! Entity store: the allocator plus one sparse-set column per component type.
//!
//! Each [`Column`] keeps its values densely packed next to the owning entity
//! handles, with a sparse slot table indexed by [`EntityId::index`] pointing
//! into the dense arrays. Removal swaps the last element into the hole, so
//! iteration order is insertion order only until the first removal.
//!
//! The store is strongly typed; the type-erased view over it lives in
//! [`ComponentRegistry`](crate::component::ComponentRegistry).

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::entity::{EntityAllocator, EntityId};
use crate::EcsError;

// ---------------------------------------------------------------------------
// Column
// ---------------------------------------------------------------------------

/// Sparse-set storage for a single component type.
#[derive(Debug)]
pub struct Column<T> {
    /// Indexed by `EntityId::index()`; `Some(dense_row)` when present.
    sparse: Vec<Option<usize>>,
    entities: Vec<EntityId>,
    values: Vec<T>,
}

impl<T> Column<T> {
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            entities: Vec::new(),
            values: Vec::new(),
        }
    }

    fn row(&self, entity: EntityId) -> Option<usize> {
        let row = (*self.sparse.get(entity.index() as usize)?)?;
        // A recycled slot may still point at the previous occupant's row.
        (self.entities[row] == entity).then_some(row)
    }

    /// Insert `value` for `entity`, overwriting any existing value.
    pub fn insert(&mut self, entity: EntityId, value: T) -> &mut T {
        if let Some(row) = self.row(entity) {
            self.values[row] = value;
            return &mut self.values[row];
        }
        let slot = entity.index() as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }
        if let Some(stale_row) = self.sparse[slot] {
            // Previous occupant of the slot was never removed from this column.
            let stale = self.entities[stale_row];
            self.remove(stale);
        }
        let row = self.values.len();
        self.sparse[slot] = Some(row);
        self.entities.push(entity);
        self.values.push(value);
        &mut self.values[row]
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let row = self.row(entity)?;
        self.sparse[entity.index() as usize] = None;
        let last = self.values.len() - 1;
        if row != last {
            let moved = self.entities[last];
            self.sparse[moved.index() as usize] = Some(row);
        }
        self.entities.swap_remove(row);
        Some(self.values.swap_remove(row))
    }

    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.row(entity).map(|row| &self.values[row])
    }

    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        let row = self.row(entity)?;
        Some(&mut self.values[row])
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.row(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.entities.iter().copied().zip(self.values.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.entities.iter().copied().zip(self.values.iter_mut())
    }
}

impl<T> Default for Column<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Object-safe view of a [`Column`] used by the store for whole-entity
/// operations (despawn) that do not know the component type.
trait AnyColumn {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn drop_entity(&mut self, entity: EntityId) -> bool;
}

impl<T: 'static> AnyColumn for Column<T> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn drop_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }
}

// ---------------------------------------------------------------------------
// EntityStore
// ---------------------------------------------------------------------------

/// Owns every entity and every component value of a world.
#[derive(Default)]
pub struct EntityStore {
    allocator: EntityAllocator,
    columns: HashMap<TypeId, Box<dyn AnyColumn>>,
}

impl std::fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStore")
            .field("entity_count", &self.allocator.alive_count())
            .field("column_count", &self.columns.len())
            .finish()
    }
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an entity with no components.
    pub fn spawn(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    /// Destroy `entity` and drop all of its components.
    pub fn despawn(&mut self, entity: EntityId) -> Result<(), EcsError> {
        if !self.allocator.deallocate(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        for column in self.columns.values_mut() {
            column.drop_entity(entity);
        }
        Ok(())
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.allocator.is_alive(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.allocator.alive_count()
    }

    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.allocator.iter_alive()
    }

    fn column<T: 'static>(&self) -> Option<&Column<T>> {
        self.columns
            .get(&TypeId::of::<T>())
            .and_then(|c| c.as_any().downcast_ref::<Column<T>>())
    }

    fn column_mut<T: 'static>(&mut self) -> Option<&mut Column<T>> {
        self.columns
            .get_mut(&TypeId::of::<T>())
            .and_then(|c| c.as_any_mut().downcast_mut::<Column<T>>())
    }

    fn column_or_create<T: 'static>(&mut self) -> &mut Column<T> {
        self.columns
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(Column::<T>::new()))
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .expect("column registered under a foreign TypeId")
    }

    /// Attach `value` to `entity`, replacing any previous value of that type.
    pub fn insert<T: 'static>(&mut self, entity: EntityId, value: T) -> Result<&mut T, EcsError> {
        if !self.allocator.is_alive(entity) {
            return Err(EcsError::StaleEntity(entity));
        }
        Ok(self.column_or_create::<T>().insert(entity, value))
    }

    /// Detach and return the `T` on `entity`, if any.
    pub fn remove<T: 'static>(&mut self, entity: EntityId) -> Option<T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.column_mut::<T>()?.remove(entity)
    }

    pub fn get<T: 'static>(&self, entity: EntityId) -> Option<&T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.column::<T>()?.get(entity)
    }

    pub fn get_mut<T: 'static>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.allocator.is_alive(entity) {
            return None;
        }
        self.column_mut::<T>()?.get_mut(entity)
    }

    pub fn has<T: 'static>(&self, entity: EntityId) -> bool {
        self.get::<T>(entity).is_some()
    }

    /// All `(entity, &T)` pairs, in column order.
    pub fn iter<T: 'static>(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.column::<T>().into_iter().flat_map(|c| c.iter())
    }

    pub fn iter_mut<T: 'static>(&mut self) -> impl Iterator<Item = (EntityId, &mut T)> {
        self.column_mut::<T>().into_iter().flat_map(|c| c.iter_mut())
    }

    /// Number of entities carrying a `T`.
    pub fn count<T: 'static>(&self) -> usize {
        self.column::<T>().map_or(0, Column::len)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
