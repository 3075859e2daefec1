//! Entity identifiers and allocation.
//!
//! An [`EntityId`] is a 64-bit handle that packs a *generation* counter in the
//! high 32 bits and a slot *index* in the low 32 bits. Releasing an entity
//! bumps the generation of its slot, so a handle kept by a clock event or a
//! behavior after the entity was removed can never alias a newer entity that
//! happens to reuse the slot.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// A generational entity identifier.
///
/// Layout: `[generation: u32 | index: u32]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Construct an `EntityId` from a slot index and generation.
    #[inline]
    pub fn new(index: u32, generation: u32) -> Self {
        Self((generation as u64) << 32 | index as u64)
    }

    /// The slot index (low 32 bits).
    #[inline]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The generation (high 32 bits).
    #[inline]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Raw `u64` representation, used for hashing world state.
    #[inline]
    pub fn to_raw(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId(#{}.{})", self.index(), self.generation())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index(), self.generation())
    }
}

// ---------------------------------------------------------------------------
// EntityAllocator
// ---------------------------------------------------------------------------

/// Hands out [`EntityId`]s and recycles released slots.
///
/// Released slots go to the back of a FIFO queue so that a slot is not reused
/// immediately after release.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation of every slot ever handed out.
    generations: Vec<u32>,
    /// Whether the slot currently holds a live entity.
    live: Vec<bool>,
    /// Released slots awaiting reuse.
    free: VecDeque<u32>,
    /// Number of live entities.
    live_count: usize,
}

impl EntityAllocator {
    /// Create an empty allocator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh [`EntityId`], reusing the oldest released slot if any.
    pub fn allocate(&mut self) -> EntityId {
        self.live_count += 1;
        if let Some(index) = self.free.pop_front() {
            self.live[index as usize] = true;
            return EntityId::new(index, self.generations[index as usize]);
        }
        let index = self.generations.len() as u32;
        self.generations.push(0);
        self.live.push(true);
        EntityId::new(index, 0)
    }

    /// Release `id`, making every outstanding copy of it stale.
    ///
    /// Returns `false` when `id` was already stale.
    pub fn release(&mut self, id: EntityId) -> bool {
        if !self.is_live(id) {
            return false;
        }
        let idx = id.index() as usize;
        self.live[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free.push_back(id.index());
        self.live_count -= 1;
        true
    }

    /// Whether `id` names a live entity of the current generation.
    pub fn is_live(&self, id: EntityId) -> bool {
        let idx = id.index() as usize;
        idx < self.generations.len() && self.live[idx] && self.generations[idx] == id.generation()
    }

    /// Number of live entities.
    pub fn live_count(&self) -> usize {
        self.live_count
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
