//! Sparse per-particle storage for influencer-private data.
//!
//! Slot `i` belongs to the influencer at pipeline position `i`. Values are
//! type-erased; a read at an empty, missing or mistyped slot is simply "no
//! data". The backing array only grows and is sized lazily on first use.

use std::any::Any;

pub struct DataSlots {
    slots: Vec<Option<Box<dyn Any>>>,
    /// Initial capacity reserved on first use
    default_size: usize,
}

impl DataSlots {
    pub fn new(default_size: usize) -> Self {
        Self {
            slots: Vec::new(),
            default_size,
        }
    }

    /// Number of slots currently allocated (occupied or not)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Make sure `slot` is addressable.
    pub fn reserve(&mut self, slot: usize) {
        if self.slots.is_empty() {
            let size = self.default_size.max(slot + 1);
            self.slots.resize_with(size, || None);
        } else if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
    }

    pub fn has(&self, slot: usize) -> bool {
        matches!(self.slots.get(slot), Some(Some(_)))
    }

    pub fn insert<T: Any>(&mut self, slot: usize, value: T) {
        self.reserve(slot);
        self.slots[slot] = Some(Box::new(value));
    }

    pub fn get<T: Any>(&self, slot: usize) -> Option<&T> {
        self.slots.get(slot)?.as_ref()?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, slot: usize) -> Option<&mut T> {
        self.slots.get_mut(slot)?.as_mut()?.downcast_mut::<T>()
    }

    /// Returns the slot's value, creating it when absent or of another type.
    pub fn get_or_insert_with<T: Any>(&mut self, slot: usize, create: impl FnOnce() -> T) -> &mut T {
        if self.get::<T>(slot).is_none() {
            self.insert(slot, create());
        }
        self.slots[slot]
            .as_mut()
            .and_then(|b| b.downcast_mut::<T>())
            .unwrap_or_else(|| unreachable!("slot {slot} was just filled"))
    }

    /// Clear one slot without moving any other.
    pub fn remove(&mut self, slot: usize) -> Option<Box<dyn Any>> {
        self.slots.get_mut(slot)?.take()
    }

    /// Move the contents of `from` into `to`, leaving `from` empty.
    /// An empty source empties the destination.
    pub fn move_slot(&mut self, from: usize, to: usize) {
        match self.remove(from) {
            Some(value) => {
                self.reserve(to);
                self.slots[to] = Some(value);
            }
            None => {
                self.remove(to);
            }
        }
    }

    /// Open an empty slot at `at`, shifting `at..` up by one.
    pub fn shift_up(&mut self, at: usize, count: usize) {
        for i in (at..count).rev() {
            self.move_slot(i, i + 1);
        }
    }

    /// Drop slot `at` and shift `at + 1..count` down by one.
    pub fn shift_down(&mut self, at: usize, count: usize) {
        self.remove(at);
        for i in at..count.saturating_sub(1) {
            self.move_slot(i + 1, i);
        }
    }

    /// Empty every slot, keeping the allocation.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }
}

impl std::fmt::Debug for DataSlots {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let occupied: Vec<usize> = (0..self.slots.len()).filter(|i| self.has(*i)).collect();
        f.debug_struct("DataSlots")
            .field("len", &self.slots.len())
            .field("occupied", &occupied)
            .finish()
    }
}
