//! Slot arena holding the rows of a table
//!
//! Slots live in a [`SegmentedArray`], so a stored row never moves when the
//! pool grows. Freed slots go on a free list and are reused; every reuse bumps
//! the slot generation so that old [`RowId`]s stop resolving.

use crate::config::SegmentSizing;
use crate::containers::SegmentedArray;
use crate::types::Value;

use super::row::RowId;

/// Stored row
#[derive(Debug, Clone)]
pub(crate) struct Raw {
    pub(crate) values: Vec<Value>,
    /// Current position in the table; only maintained with `keep_row_number`
    pub(crate) number: usize,
}

impl Raw {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self { values, number: 0 }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    raw: Option<Raw>,
}

#[derive(Debug, Clone)]
pub(crate) struct RawPool {
    slots: SegmentedArray<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl RawPool {
    pub(crate) fn new(sizing: SegmentSizing) -> Self {
        Self {
            slots: SegmentedArray::with_sizing(sizing),
            free: Vec::new(),
            live: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }

    /// Room for `capacity` rows without growing the slot array
    pub(crate) fn reserve(&mut self, capacity: usize) {
        self.slots.reserve(capacity);
    }

    pub(crate) fn allocate(&mut self, raw: Raw) -> RowId {
        self.live += 1;
        if let Some(slot_index) = self.free.pop() {
            let slot = &mut self.slots[slot_index as usize];
            slot.raw = Some(raw);
            return RowId::new(slot_index, slot.generation);
        }
        let slot_index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            raw: Some(raw),
        });
        RowId::new(slot_index, 0)
    }

    pub(crate) fn free(&mut self, id: RowId) -> Option<Raw> {
        let slot = self.slots.get_mut(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        let raw = slot.raw.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.slot());
        self.live -= 1;
        Some(raw)
    }

    pub(crate) fn get(&self, id: RowId) -> Option<&Raw> {
        let slot = self.slots.get(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.raw.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: RowId) -> Option<&mut Raw> {
        let slot = self.slots.get_mut(id.slot() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.raw.as_mut()
    }

    pub(crate) fn contains(&self, id: RowId) -> bool {
        self.get(id).is_some()
    }

    /// Values of a live row. Index code only holds ids of live rows.
    pub(crate) fn values(&self, id: RowId) -> &[Value] {
        match self.get(id) {
            Some(raw) => raw.values.as_slice(),
            None => &[],
        }
    }

    pub(crate) fn clear(&mut self) {
        for slot_index in 0..self.slots.len() {
            let slot = &mut self.slots[slot_index];
            if slot.raw.take().is_some() {
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(slot_index as u32);
            }
        }
        self.live = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_free() {
        let mut pool = RawPool::new(SegmentSizing::constant(2));
        let a = pool.allocate(Raw::new(vec![Value::Int64(1)]));
        let b = pool.allocate(Raw::new(vec![Value::Int64(2)]));
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.values(b), &[Value::Int64(2)]);

        let raw = pool.free(a).unwrap();
        assert_eq!(raw.values, vec![Value::Int64(1)]);
        assert!(!pool.contains(a));
        assert!(pool.free(a).is_none());

        let c = pool.allocate(Raw::new(vec![Value::Int64(3)]));
        assert_eq!(c.slot(), a.slot());
        assert_ne!(c, a);
        assert!(pool.get(a).is_none());
        assert_eq!(pool.values(c), &[Value::Int64(3)]);
    }

    #[test]
    fn test_clear_invalidates_ids() {
        let mut pool = RawPool::new(SegmentSizing::default());
        let ids: Vec<_> = (0..10)
            .map(|i| pool.allocate(Raw::new(vec![Value::Int32(i)])))
            .collect();
        pool.clear();
        assert_eq!(pool.len(), 0);
        assert!(ids.iter().all(|id| !pool.contains(*id)));

        pool.reserve(10);
        let reused = pool.allocate(Raw::new(Vec::new()));
        assert!(ids.iter().any(|id| id.slot() == reused.slot()));
        assert!(!ids.contains(&reused));
    }
}
