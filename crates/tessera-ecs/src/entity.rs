//! Entity handles and their allocator.
//!
//! An [`EntityId`] packs a *generation* in the high 32 bits and a slot
//! *index* in the low 32 bits. Recycling a slot bumps its generation, so a
//! handle that outlived its entity never aliases the slot's next occupant.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity handle.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// Slot index (low 32 bits). Used by column storage as the sparse key.
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({}v{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s and recycles freed slots.
///
/// Freed slots are reused first-in first-out, which spreads generation
/// bumps across the whole slot range.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation of every slot ever allocated.
    generations: Vec<u32>,
    alive: Vec<bool>,
    free: VecDeque<u32>,
    live_count: usize,
}

impl EntityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a handle, reusing the oldest freed slot when one exists.
    pub fn allocate(&mut self) -> EntityId {
        self.live_count += 1;
        match self.free.pop_front() {
            Some(index) => {
                self.alive[index as usize] = true;
                EntityId::new(index, self.generations[index as usize])
            }
            None => {
                let index = self.generations.len() as u32;
                self.generations.push(0);
                self.alive.push(true);
                EntityId::new(index, 0)
            }
        }
    }

    /// Free `id`'s slot and bump its generation.
    ///
    /// Returns `false` when `id` is stale or was never allocated.
    pub fn deallocate(&mut self, id: EntityId) -> bool {
        if !self.is_alive(id) {
            return false;
        }
        let slot = id.index() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free.push_back(id.index());
        self.live_count -= 1;
        true
    }

    pub fn is_alive(&self, id: EntityId) -> bool {
        let slot = id.index() as usize;
        slot < self.generations.len()
            && self.alive[slot]
            && self.generations[slot] == id.generation()
    }

    pub fn alive_count(&self) -> usize {
        self.live_count
    }

    /// Live handles in slot order.
    pub fn iter_alive(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.alive
            .iter()
            .enumerate()
            .filter(|(_, &alive)| alive)
            .map(|(slot, _)| EntityId::new(slot as u32, self.generations[slot]))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_slots_are_distinct() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_ne!(a.index(), b.index());
        assert_eq!(alloc.alive_count(), 2);
    }

    #[test]
    fn recycled_slot_gets_new_generation() {
        let mut alloc = EntityAllocator::new();
        let first = alloc.allocate();
        assert!(alloc.deallocate(first));
        let second = alloc.allocate();
        assert_eq!(second.index(), first.index());
        assert_eq!(second.generation(), first.generation() + 1);
        assert!(!alloc.is_alive(first));
        assert!(alloc.is_alive(second));
    }

    #[test]
    fn stale_handle_cannot_be_freed_twice() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        assert!(alloc.deallocate(e));
        assert!(!alloc.deallocate(e));
        assert_eq!(alloc.alive_count(), 0);
    }

    #[test]
    fn iter_alive_skips_freed_slots() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        let c = alloc.allocate();
        alloc.deallocate(b);
        let live: Vec<_> = alloc.iter_alive().collect();
        assert_eq!(live, vec![a, c]);
    }

    #[test]
    fn raw_round_trip_preserves_fields() {
        let id = EntityId::new(9, 3);
        assert_eq!(EntityId::from_raw(id.to_raw()), id);
        assert_eq!(format!("{id}"), "9v3");
    }
}
