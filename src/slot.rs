//! Slot storage and the intrusive free-list allocator.
//!
//! Layout of a table with capacity `n` (always a power of two):
//!
//! - `slots[0]` is the free-list sentinel and never holds an entry;
//! - `slots[1..=n]` are entry slots, each either free or used.
//!
//! A used slot holds `next` (`0` ends the chain, anything else is the index of
//! the next node of the same home chain), the key and the value.
//!
//! A free slot (and the sentinel) holds `prev`, a plain index, and `next`,
//! stored as `-(successor + 1)`. Together the free slots and the sentinel form
//! a single circular doubly linked list anchored at index 0.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ops::Index;
use core::ops::IndexMut;

use crate::error::Error;
use crate::link::Link;
use crate::logging::trace;

/// One slot of the table.
///
/// `next` carries the occupancy tag in its sign: never negative in a used
/// slot, always negative in a free one.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Slot<K, V, L> {
    Free { prev: L, next: L },
    Used { next: L, key: K, value: V },
}

impl<K, V, L: Link> Slot<K, V, L> {
    #[inline(always)]
    pub(crate) fn is_free(&self) -> bool {
        matches!(self, Slot::Free { .. })
    }

    /// The `next` link of either shape.
    #[inline(always)]
    pub(crate) fn raw_next(&self) -> L {
        match self {
            Slot::Free { next, .. } | Slot::Used { next, .. } => *next,
        }
    }

    #[inline(always)]
    pub(crate) fn chain_next(&self) -> L {
        match self {
            Slot::Used { next, .. } => *next,
            Slot::Free { .. } => unreachable!("free slot inside a home chain"),
        }
    }

    #[inline(always)]
    pub(crate) fn set_chain_next(&mut self, link: L) {
        match self {
            Slot::Used { next, .. } => *next = link,
            Slot::Free { .. } => unreachable!("free slot inside a home chain"),
        }
    }

    #[inline(always)]
    pub(crate) fn key(&self) -> &K {
        match self {
            Slot::Used { key, .. } => key,
            Slot::Free { .. } => unreachable!("reading the key of a free slot"),
        }
    }

    #[inline(always)]
    pub(crate) fn value(&self) -> &V {
        match self {
            Slot::Used { value, .. } => value,
            Slot::Free { .. } => unreachable!("reading the value of a free slot"),
        }
    }

    #[inline(always)]
    pub(crate) fn value_mut(&mut self) -> &mut V {
        match self {
            Slot::Used { value, .. } => value,
            Slot::Free { .. } => unreachable!("reading the value of a free slot"),
        }
    }

    #[inline(always)]
    fn free_links(&self) -> (L, L) {
        match self {
            Slot::Free { prev, next } => (*prev, *next),
            Slot::Used { .. } => unreachable!("used slot on the free list"),
        }
    }

    #[inline(always)]
    fn set_prev(&mut self, link: L) {
        match self {
            Slot::Free { prev, .. } => *prev = link,
            Slot::Used { .. } => unreachable!("used slot on the free list"),
        }
    }

    #[inline(always)]
    fn set_free_next(&mut self, link: L) {
        match self {
            Slot::Free { next, .. } => *next = link,
            Slot::Used { .. } => unreachable!("used slot on the free list"),
        }
    }
}

/// The single bulk allocation backing a table: sentinel plus `capacity`
/// slots, with the free list threaded through it.
#[derive(Clone)]
pub(crate) struct SlotArray<K, V, L> {
    slots: Box<[Slot<K, V, L>]>,
}

impl<K, V, L: Link> SlotArray<K, V, L> {
    /// Allocates `capacity` free slots plus the sentinel.
    ///
    /// `capacity` must be a power of two; it is rejected if the link type
    /// cannot address it.
    pub(crate) fn allocate(capacity: usize) -> Result<Self, Error> {
        debug_assert!(capacity.is_power_of_two());

        if capacity > L::MAX_CAPACITY {
            return Err(Error::CapacityTooLarge {
                requested: capacity,
                max: L::MAX_CAPACITY,
                link: L::NAME,
            });
        }

        trace!(
            "allocating capacity {capacity}, link type {}, slot size {} bytes",
            L::NAME,
            core::mem::size_of::<Slot<K, V, L>>()
        );

        let slots = (0..=capacity)
            .map(|index| Self::initial_slot(index, capacity))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Ok(Self { slots })
    }

    /// Returns every slot to the free list without reallocating.
    pub(crate) fn reset(&mut self) {
        let capacity = self.capacity();
        for (index, slot) in self.slots.iter_mut().enumerate() {
            *slot = Self::initial_slot(index, capacity);
        }
    }

    /// Slot `index` of a freshly allocated array: every slot sits on the
    /// free list in index order.
    #[inline(always)]
    fn initial_slot(index: usize, capacity: usize) -> Slot<K, V, L> {
        let prev = if index == 0 { capacity } else { index - 1 };
        let next = if index == capacity { 0 } else { index + 1 };

        Slot::Free {
            prev: L::from_index(prev),
            next: L::encode_free(next),
        }
    }

    #[inline(always)]
    pub(crate) fn capacity(&self) -> usize {
        self.slots.len() - 1
    }

    /// All slots, sentinel included.
    #[inline(always)]
    pub(crate) fn as_slice(&self) -> &[Slot<K, V, L>] {
        &self.slots
    }

    /// The entry slots, sentinel excluded.
    #[inline(always)]
    pub(crate) fn entries(&self) -> &[Slot<K, V, L>] {
        &self.slots[1..]
    }

    #[inline(always)]
    pub(crate) fn entries_mut(&mut self) -> &mut [Slot<K, V, L>] {
        &mut self.slots[1..]
    }

    /// Index of the first free slot after the sentinel, `0` if none is left.
    #[inline(always)]
    pub(crate) fn first_free(&self) -> usize {
        self.slots[0].raw_next().decode_free()
    }

    /// Takes the first free slot off the free list and returns its index.
    ///
    /// The slot keeps its free shape until the caller overwrites it. Callers
    /// must have established that a free slot exists: an empty free list here
    /// means the table's bookkeeping is broken.
    #[inline]
    pub(crate) fn acquire(&mut self) -> usize {
        let first = self.first_free();
        assert_ne!(first, 0, "acquiring a slot from an exhausted free list");

        let (_, next) = self.slots[first].free_links();
        self.slots[next.decode_free()].set_prev(L::NULL);
        self.slots[0].set_free_next(next);

        trace!("  acquired free slot #{first}");
        first
    }

    /// Removes the specific free slot `index` from the free list.
    #[inline]
    pub(crate) fn unlink(&mut self, index: usize) {
        let (prev, next) = self.slots[index].free_links();
        self.slots[prev.index()].set_free_next(next);
        self.slots[next.decode_free()].set_prev(prev);
    }

    /// Puts slot `index` back on the free list, right after the sentinel.
    ///
    /// Releasing a slot that is already free corrupts the list.
    #[inline]
    pub(crate) fn release(&mut self, index: usize) {
        debug_assert!(index > 0 && index <= self.capacity());
        debug_assert!(!self.slots[index].is_free());

        let first = self.first_free();
        self.slots[first].set_prev(L::from_index(index));
        self.slots[index] = Slot::Free {
            prev: L::NULL,
            next: L::encode_free(first),
        };
        self.slots[0].set_free_next(L::encode_free(index));
    }
}

impl<K, V, L> Index<usize> for SlotArray<K, V, L> {
    type Output = Slot<K, V, L>;

    #[inline(always)]
    fn index(&self, index: usize) -> &Self::Output {
        &self.slots[index]
    }
}

impl<K, V, L> IndexMut<usize> for SlotArray<K, V, L> {
    #[inline(always)]
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.slots[index]
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    type Slots = SlotArray<u64, u64, i32>;

    fn free_list_forward(slots: &Slots) -> Vec<usize> {
        let mut order = Vec::new();
        let mut index = slots.first_free();
        while index != 0 {
            order.push(index);
            index = slots[index].raw_next().decode_free();
        }
        order
    }

    fn free_list_backward(slots: &Slots) -> Vec<usize> {
        let mut order = Vec::new();
        let (mut index, _) = slots[0].free_links();
        while index != 0 {
            order.push(index.index());
            index = slots[index.index()].free_links().0;
        }
        order.reverse();
        order
    }

    #[test]
    fn allocate_threads_every_slot() {
        let slots = Slots::allocate(8).unwrap();
        assert_eq!(slots.capacity(), 8);
        assert_eq!(free_list_forward(&slots), (1..=8).collect::<Vec<_>>());
        assert_eq!(free_list_backward(&slots), (1..=8).collect::<Vec<_>>());
    }

    #[test]
    fn allocate_rejects_unaddressable_capacity() {
        let err = SlotArray::<u32, u32, i16>::allocate(1 << 15)
            .err()
            .expect("capacity should be rejected");
        assert_eq!(
            err,
            Error::CapacityTooLarge {
                requested: 1 << 15,
                max: 1 << 14,
                link: "i16",
            }
        );
        assert!(SlotArray::<u32, u32, i16>::allocate(1 << 14).is_ok());
    }

    #[test]
    fn acquire_and_release_are_lifo() {
        let mut slots = Slots::allocate(4).unwrap();

        assert_eq!(slots.acquire(), 1);
        assert_eq!(slots.acquire(), 2);
        slots[1] = Slot::Used { next: 0, key: 1, value: 10 };
        slots[2] = Slot::Used { next: 0, key: 2, value: 20 };

        slots.release(1);
        assert_eq!(free_list_forward(&slots), [1, 3, 4]);
        assert_eq!(free_list_backward(&slots), [1, 3, 4]);
        assert_eq!(slots.acquire(), 1);
    }

    #[test]
    fn exhausting_and_refilling() {
        let mut slots = Slots::allocate(2).unwrap();
        for expected in 1..=2 {
            let index = slots.acquire();
            assert_eq!(index, expected);
            slots[index] = Slot::Used { next: 0, key: index as u64, value: 0 };
        }
        assert_eq!(slots.first_free(), 0);
        assert_eq!(slots[0].free_links(), (0, -1));

        slots.release(2);
        assert_eq!(free_list_forward(&slots), [2]);
        assert_eq!(free_list_backward(&slots), [2]);
    }

    #[test]
    #[should_panic(expected = "exhausted free list")]
    fn acquire_from_empty_list_is_fatal() {
        let mut slots = Slots::allocate(1).unwrap();
        let index = slots.acquire();
        slots[index] = Slot::Used { next: 0, key: 0, value: 0 };
        slots.acquire();
    }

    #[test]
    fn unlink_from_the_middle() {
        let mut slots = Slots::allocate(4).unwrap();
        slots.unlink(3);
        slots[3] = Slot::Used { next: 0, key: 3, value: 0 };
        assert_eq!(free_list_forward(&slots), [1, 2, 4]);
        assert_eq!(free_list_backward(&slots), [1, 2, 4]);
    }

    #[test]
    fn reset_restores_initial_order() {
        let mut slots = Slots::allocate(4).unwrap();
        let index = slots.acquire();
        slots[index] = Slot::Used { next: 0, key: 0, value: 0 };
        slots.reset();
        assert_eq!(free_list_forward(&slots), [1, 2, 3, 4]);
        assert!(slots.entries().iter().all(Slot::is_free));
    }
}
