//! Segmented array
//!
//! Items live in separately allocated segments. Growing the array only
//! allocates a new segment, so an item never moves while it stays at the
//! same index: references taken before a `push` remain valid addresses.
//!
//! Segment lengths follow a [`SegmentSizing`] policy:
//! - `Constant`: all segments hold `2^k` items.
//! - `Sqrt`: segment `s` holds `2^(floor(log2((2s + 4) / 3)) + k)` items, so
//!   `n` items need about `2 * sqrt(n / 2^k)` segments.

use std::fmt;
use std::ops::{Index, IndexMut};

use crate::config::SegmentSizing;

/// Number of significant bits of `value`
fn bit_width(value: usize) -> u32 {
    usize::BITS - value.leading_zeros()
}

impl SegmentSizing {
    /// Split an item index into (segment index, index inside segment)
    pub fn locate(&self, index: usize) -> (usize, usize) {
        match *self {
            SegmentSizing::Constant { log_segment_len } => {
                let mask = (1usize << log_segment_len) - 1;
                (index >> log_segment_len, index & mask)
            }
            SegmentSizing::Sqrt { log_initial_len } => {
                let index1 = (index >> log_initial_len) + 1;
                let index2 = index & ((1usize << log_initial_len) - 1);
                let log_seg_len = bit_width(index1) / 2;
                let seg_item_index1 = index1 & ((1usize << log_seg_len) - 1);
                let seg_index = (index1 >> log_seg_len) + (1usize << log_seg_len) - 2;
                (seg_index, (seg_item_index1 << log_initial_len) + index2)
            }
        }
    }

    /// Number of items segment `seg_index` holds
    pub fn segment_len(&self, seg_index: usize) -> usize {
        match *self {
            SegmentSizing::Constant { log_segment_len } => 1usize << log_segment_len,
            SegmentSizing::Sqrt { log_initial_len } => {
                let log_seg_len = bit_width((seg_index * 2 + 4) / 3) - 1;
                1usize << (log_seg_len + log_initial_len)
            }
        }
    }
}

/// Growable array whose items never move on growth
pub struct SegmentedArray<T> {
    /// Every segment is allocated with exactly `sizing.segment_len(s)`
    /// capacity and never pushed past it.
    segments: Vec<Vec<T>>,
    len: usize,
    capacity: usize,
    sizing: SegmentSizing,
}

pub type Iter<'a, T> = std::iter::Flatten<std::slice::Iter<'a, Vec<T>>>;
pub type IterMut<'a, T> = std::iter::Flatten<std::slice::IterMut<'a, Vec<T>>>;

impl<T> SegmentedArray<T> {
    pub fn new() -> Self {
        Self::with_sizing(SegmentSizing::default())
    }

    pub fn with_sizing(sizing: SegmentSizing) -> Self {
        Self {
            segments: Vec::new(),
            len: 0,
            capacity: 0,
            sizing,
        }
    }

    pub fn sizing(&self) -> SegmentSizing {
        self.sizing
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Items that fit without allocating a new segment
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    fn add_segment(&mut self) {
        let seg_len = self.sizing.segment_len(self.segments.len());
        self.segments.push(Vec::with_capacity(seg_len));
        self.capacity += seg_len;
    }

    /// Make room for at least `capacity` items in total
    pub fn reserve(&mut self, capacity: usize) {
        while self.capacity < capacity {
            self.add_segment();
        }
    }

    pub fn push(&mut self, item: T) {
        let (seg_index, _) = self.sizing.locate(self.len);
        while seg_index >= self.segments.len() {
            self.add_segment();
        }
        self.segments[seg_index].push(item);
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        let (seg_index, _) = self.sizing.locate(self.len - 1);
        let item = self.segments[seg_index].pop();
        self.len -= 1;
        item
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        let (seg_index, seg_item_index) = self.sizing.locate(index);
        self.segments[seg_index].get(seg_item_index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.len {
            return None;
        }
        let (seg_index, seg_item_index) = self.sizing.locate(index);
        self.segments[seg_index].get_mut(seg_item_index)
    }

    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|index| self.get(index))
    }

    /// Swap two items, possibly in different segments
    pub fn swap(&mut self, a: usize, b: usize) {
        assert!(
            a < self.len && b < self.len,
            "swap indices ({}, {}) out of bounds for length {}",
            a,
            b,
            self.len
        );
        if a == b {
            return;
        }
        let (seg_a, item_a) = self.sizing.locate(a);
        let (seg_b, item_b) = self.sizing.locate(b);
        if seg_a == seg_b {
            self.segments[seg_a].swap(item_a, item_b);
            return;
        }
        let (low, high, low_item, high_item) = if seg_a < seg_b {
            (seg_a, seg_b, item_a, item_b)
        } else {
            (seg_b, seg_a, item_b, item_a)
        };
        let (head, tail) = self.segments.split_at_mut(high);
        std::mem::swap(&mut head[low][low_item], &mut tail[0][high_item]);
    }

    /// Insert at `index`, shifting later items towards the end
    pub fn insert(&mut self, index: usize, item: T) {
        assert!(
            index <= self.len,
            "insertion index (is {}) should be <= len (is {})",
            index,
            self.len
        );
        self.push(item);
        let mut i = self.len - 1;
        while i > index {
            self.swap(i, i - 1);
            i -= 1;
        }
    }

    /// Remove at `index`, shifting later items towards the front
    pub fn remove(&mut self, index: usize) -> T {
        assert!(
            index < self.len,
            "removal index (is {}) should be < len (is {})",
            index,
            self.len
        );
        for i in index..self.len - 1 {
            self.swap(i, i + 1);
        }
        match self.pop() {
            Some(item) => item,
            None => unreachable!("array is not empty"),
        }
    }

    /// Remove the item at `index`, replacing it with the last item
    pub fn swap_remove(&mut self, index: usize) -> T {
        let last = self.len.saturating_sub(1);
        self.swap(index, last);
        match self.pop() {
            Some(item) => item,
            None => unreachable!("array is not empty"),
        }
    }

    pub fn truncate(&mut self, len: usize) {
        while self.len > len {
            self.pop();
        }
    }

    /// Remove all items, keeping allocated segments
    pub fn clear(&mut self) {
        for segment in &mut self.segments {
            segment.clear();
        }
        self.len = 0;
    }

    /// Release segments that hold no items
    pub fn shrink_to_fit(&mut self) {
        while let Some(segment) = self.segments.last() {
            if !segment.is_empty() {
                break;
            }
            let seg_len = self.sizing.segment_len(self.segments.len() - 1);
            self.segments.pop();
            self.capacity -= seg_len;
        }
        self.segments.shrink_to_fit();
    }

    pub fn iter(&self) -> Iter<'_, T> {
        self.segments.iter().flatten()
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        self.segments.iter_mut().flatten()
    }

    /// Keep only the items for which `keep` returns true, preserving order
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, mut keep: F) {
        let mut kept = 0;
        for i in 0..self.len {
            let keep_item = match self.get(i) {
                Some(item) => keep(item),
                None => false,
            };
            if keep_item {
                self.swap(kept, i);
                kept += 1;
            }
        }
        self.truncate(kept);
    }
}

impl<T> Default for SegmentedArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for SegmentedArray<T> {
    fn clone(&self) -> Self {
        // Rebuilt item by item so every segment gets its full capacity back.
        let mut array = Self::with_sizing(self.sizing);
        array.reserve(self.len);
        array.extend(self.iter().cloned());
        array
    }
}

impl<T: fmt::Debug> fmt::Debug for SegmentedArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for SegmentedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T> Index<usize> for SegmentedArray<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        let len = self.len;
        match self.get(index) {
            Some(item) => item,
            None => panic!("index out of bounds: the len is {} but the index is {}", len, index),
        }
    }
}

impl<T> IndexMut<usize> for SegmentedArray<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        let len = self.len;
        match self.get_mut(index) {
            Some(item) => item,
            None => panic!("index out of bounds: the len is {} but the index is {}", len, index),
        }
    }
}

impl<T> Extend<T> for SegmentedArray<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<T> FromIterator<T> for SegmentedArray<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<'a, T> IntoIterator for &'a SegmentedArray<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_constant_locate() {
        let sizing = SegmentSizing::constant(2);
        assert_eq!(sizing.locate(0), (0, 0));
        assert_eq!(sizing.locate(3), (0, 3));
        assert_eq!(sizing.locate(4), (1, 0));
        assert_eq!(sizing.locate(9), (2, 1));
        assert_eq!(sizing.segment_len(7), 4);
    }

    #[test]
    fn test_sqrt_segments_cover_indexes() {
        for k in 0..4 {
            let sizing = SegmentSizing::sqrt(k);
            let mut expected = (0usize, 0usize);
            for index in 0..5000 {
                assert_eq!(sizing.locate(index), expected, "k={} index={}", k, index);
                expected.1 += 1;
                if expected.1 == sizing.segment_len(expected.0) {
                    expected = (expected.0 + 1, 0);
                }
            }
        }
        let sizing = SegmentSizing::sqrt(0);
        let lens: Vec<_> = (0..8).map(|s| sizing.segment_len(s)).collect();
        assert_eq!(lens, [1, 2, 2, 2, 4, 4, 4, 4]);
    }

    #[test]
    fn test_items_do_not_move() {
        for sizing in [SegmentSizing::constant(3), SegmentSizing::sqrt(1)] {
            let mut array = SegmentedArray::with_sizing(sizing);
            array.push(String::from("first"));
            let address = &array[0] as *const String;
            for i in 0..1000 {
                array.push(i.to_string());
            }
            assert_eq!(&array[0] as *const String, address);
            assert_eq!(array[0], "first");
            assert_eq!(array.len(), 1001);
        }
    }

    #[test]
    fn test_matches_vec_under_random_edits() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for sizing in [SegmentSizing::constant(2), SegmentSizing::sqrt(0), SegmentSizing::sqrt(2)] {
            let mut array = SegmentedArray::with_sizing(sizing);
            let mut model = Vec::new();
            for step in 0..3000u32 {
                match rng.gen_range(0..6) {
                    0 | 1 => {
                        array.push(step);
                        model.push(step);
                    }
                    2 => assert_eq!(array.pop(), model.pop()),
                    3 => {
                        let index = rng.gen_range(0..=model.len());
                        array.insert(index, step);
                        model.insert(index, step);
                    }
                    4 if !model.is_empty() => {
                        let index = rng.gen_range(0..model.len());
                        assert_eq!(array.remove(index), model.remove(index));
                    }
                    _ if !model.is_empty() => {
                        let index = rng.gen_range(0..model.len());
                        array[index] = step;
                        model[index] = step;
                    }
                    _ => {}
                }
                assert_eq!(array.len(), model.len());
            }
            assert!(array.iter().eq(model.iter()));
            assert!(array.capacity() >= array.len());
        }
    }

    #[test]
    fn test_reserve_and_shrink() {
        let mut array: SegmentedArray<u8> = SegmentedArray::with_sizing(SegmentSizing::constant(3));
        array.reserve(20);
        assert_eq!(array.capacity(), 24);
        assert_eq!(array.segment_count(), 3);
        array.extend(0..10);
        array.shrink_to_fit();
        assert_eq!(array.segment_count(), 2);
        array.clear();
        assert!(array.is_empty());
        array.shrink_to_fit();
        assert_eq!(array.capacity(), 0);
    }

    #[test]
    fn test_retain_swap_remove_clone() {
        let mut array: SegmentedArray<i32> = (0..50).collect();
        array.retain(|v| v % 3 == 0);
        let expected: Vec<i32> = (0..50).filter(|v| v % 3 == 0).collect();
        assert!(array.iter().eq(expected.iter()));

        assert_eq!(array.swap_remove(0), 0);
        assert_eq!(array[0], 48);

        let copy = array.clone();
        assert_eq!(copy, array);
        assert_eq!(format!("{:?}", SegmentedArray::from_iter([1, 2])), "[1, 2]");
        assert_eq!(array.first(), Some(&48));
        assert_eq!(array.last(), Some(&45));
    }

    #[test]
    #[should_panic(expected = "index out of bounds")]
    fn test_index_out_of_bounds() {
        let array: SegmentedArray<i32> = SegmentedArray::new();
        let _ = array[0];
    }
}
