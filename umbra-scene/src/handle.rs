//! Generational handles into arena-owned tables.
//!
//! A handle stays valid while its slot is occupied; replacing the value keeps the
//! handle, removing it bumps the slot generation so stale handles miss.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Marker for mesh handles.
#[derive(Debug)]
pub enum MeshAsset {}
/// Marker for texture handles.
#[derive(Debug)]
pub enum TextureAsset {}
/// Marker for bone-animated model handles.
#[derive(Debug)]
pub enum ModelAsset {}

pub type MeshHandle = Handle<MeshAsset>;
pub type TextureHandle = Handle<TextureAsset>;
pub type ModelHandle = Handle<ModelAsset>;

pub struct Handle<K> {
    index: u32,
    generation: u32,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation, _kind: PhantomData }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<K> Eq for Handle<K> {}

impl<K> Hash for Handle<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<K> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({}v{})", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot arena with free-list reuse.
pub struct Arena<K, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    _kind: PhantomData<fn() -> K>,
}

impl<K, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), _kind: PhantomData }
    }
}

impl<K, T> Arena<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, value: T) -> Handle<K> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return Handle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, value: Some(value) });
        Handle::new(index, 0)
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_mut())
    }

    /// Swap in new data behind a live handle. Returns the previous value.
    pub fn replace(&mut self, handle: Handle<K>, value: T) -> Option<T> {
        let slot = self.get_mut(handle)?;
        Some(std::mem::replace(slot, value))
    }

    pub fn remove(&mut self, handle: Handle<K>) -> Option<T> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(value)
    }

    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.get(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            s.value.as_ref().map(|v| (Handle::new(i as u32, s.generation), v))
        })
    }
}

/// Arena with names interned to handles. Inserting under an existing name rebinds
/// the data and returns the same handle, so holders of that handle see the new data.
pub struct NamedArena<K, T> {
    arena: Arena<K, T>,
    names: HashMap<String, Handle<K>>,
}

impl<K, T> Default for NamedArena<K, T> {
    fn default() -> Self {
        Self { arena: Arena::default(), names: HashMap::new() }
    }
}

impl<K, T> NamedArena<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: T) -> Handle<K> {
        let existing = self.names.get(name).copied().filter(|h| self.arena.contains(*h));
        if let Some(handle) = existing {
            self.arena.replace(handle, value);
            return handle;
        }
        let handle = self.arena.insert(value);
        self.names.insert(name.to_string(), handle);
        handle
    }

    pub fn handle(&self, name: &str) -> Option<Handle<K>> {
        self.names.get(name).copied()
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&T> {
        self.arena.get(handle)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.handle(name).and_then(|h| self.arena.get(h))
    }

    pub fn remove(&mut self, name: &str) -> Option<T> {
        let handle = self.names.remove(name)?;
        self.arena.remove(handle)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removed_handle_goes_stale() {
        let mut arena: Arena<MeshAsset, u32> = Arena::new();
        let a = arena.insert(1);
        assert_eq!(arena.remove(a), Some(1));
        let b = arena.insert(2);
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert_eq!(arena.get(a), None);
        assert_eq!(arena.get(b), Some(&2));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn rebinding_a_name_keeps_the_handle() {
        let mut table: NamedArena<TextureAsset, &str> = NamedArena::new();
        let first = table.insert("brick", "old");
        let second = table.insert("brick", "new");
        assert_eq!(first, second);
        assert_eq!(table.get(first), Some(&"new"));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn removing_a_name_invalidates_its_handle() {
        let mut table: NamedArena<ModelAsset, u8> = NamedArena::new();
        let h = table.insert("walker", 7);
        assert_eq!(table.remove("walker"), Some(7));
        assert!(table.get(h).is_none());
        assert!(table.handle("walker").is_none());
    }
}
