//! Consistency checking for [`ScatterTable`].
//!
//! [`ScatterTable::check`] rebuilds every structural fact about the table
//! from a direct scan of its slots and compares it with what the table
//! believes. It is `O(capacity)` and allocates; use it in tests and
//! diagnostics, not on a hot path.

use alloc::vec;
use core::hash::BuildHasher;
use core::hash::Hash;

use hashbrown::HashSet;

use crate::link::CapacityPolicy;
use crate::link::Link;
use crate::logging::trace;
use crate::scatter_table::ScatterTable;
use crate::slot::Slot;

/// Direction in which the free list is walked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Following `next` links.
    Forward,
    /// Following `prev` links.
    Backward,
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Direction::Forward => f.write_str("forward"),
            Direction::Backward => f.write_str("backward"),
        }
    }
}

/// A broken invariant found by [`ScatterTable::check`].
///
/// Slot indices are 1-based; slot 0 is the free-list sentinel.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inconsistency {
    /// The capacity is not a power of two, or the slot array does not have
    /// `capacity + 1` slots.
    #[error("capacity {capacity} does not match a slot array of {slots} slots")]
    BadCapacity {
        /// Capacity the table reports.
        capacity: usize,
        /// Length of the slot array, sentinel included.
        slots: usize,
    },

    /// The sentinel holds an entry.
    #[error("the free-list sentinel is occupied")]
    SentinelOccupied,

    /// A slot's `next` sign does not match its shape, or a link is out of
    /// range.
    #[error("slot #{index} has a malformed link")]
    BadLink {
        /// Offending slot.
        index: usize,
    },

    /// The entry count does not match the number of used slots.
    #[error("table reports {len} entries but {used} slots are used")]
    CountMismatch {
        /// Count the table reports.
        len: usize,
        /// Used slots found by scanning.
        used: usize,
    },

    /// Iteration did not produce exactly the used slots.
    #[error("iteration produced {visited} entries, expected {len}")]
    IterationMismatch {
        /// Entries the iterator produced.
        visited: usize,
        /// Entries expected.
        len: usize,
    },

    /// The free list is not a single cycle through the sentinel covering
    /// every free slot.
    #[error("free list broken at slot #{index} walking {direction}")]
    BrokenFreeList {
        /// Walk direction that found the problem.
        direction: Direction,
        /// Slot at which the walk went wrong.
        index: usize,
    },

    /// A chain links to a free slot.
    #[error("chain at #{head} links to free slot #{index}")]
    ChainThroughFreeSlot {
        /// Home address of the chain.
        head: usize,
        /// Free slot reached.
        index: usize,
    },

    /// A slot is reachable from two chains, or twice from one.
    #[error("slot #{index} is shared by chains or loops back into its chain at #{head}")]
    SharedSlot {
        /// Home address of the chain that reached the slot a second time.
        head: usize,
        /// Slot visited twice.
        index: usize,
    },

    /// A chain contains an entry whose home address differs from the chain's.
    #[error("slot #{index} on the chain at #{head} has home address #{home}")]
    ForeignMember {
        /// Home address of the chain.
        head: usize,
        /// Offending slot.
        index: usize,
        /// That entry's actual home address.
        home: usize,
    },

    /// A used slot is not on any chain.
    #[error("slot #{index} is used but unreachable from its home address #{home}")]
    Unreachable {
        /// Offending slot.
        index: usize,
        /// That entry's home address.
        home: usize,
    },

    /// The same key is stored twice.
    #[error("slot #{index} holds a duplicate key")]
    DuplicateKey {
        /// Second slot holding the key.
        index: usize,
    },
}

impl<K, V, S, P, L> ScatterTable<K, V, S, P, L>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
    P: CapacityPolicy,
    L: Link,
{
    /// Validates every structural invariant of the table.
    ///
    /// Checks that the entry count matches the used slots, that iteration
    /// visits exactly those slots, that the free list is a single cycle
    /// through the sentinel consistent in both directions, that every chain
    /// is a simple list whose members all share the head's home address,
    /// that chains are disjoint and cover every entry, and that keys are
    /// unique.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scatter_table::ScatterTable;
    ///
    /// let mut table: ScatterTable<u32, u32> = ScatterTable::new();
    /// for k in 0..100 {
    ///     table.put(k, k).unwrap();
    /// }
    /// table.check().unwrap();
    /// ```
    #[cold]
    pub fn check(&self) -> Result<(), Inconsistency> {
        let slots = self.slots().as_slice();
        let capacity = self.capacity();

        if !capacity.is_power_of_two() || slots.len() != capacity + 1 {
            return Err(Inconsistency::BadCapacity {
                capacity,
                slots: slots.len(),
            });
        }

        // Sort slots into used and free, validating sign tags on the way.
        let mut used = vec![false; capacity + 1];
        let mut used_count = 0;
        for (index, slot) in slots.iter().enumerate() {
            match slot {
                Slot::Free { prev, next } => {
                    if !next.is_negative()
                        || prev.is_negative()
                        || prev.index() > capacity
                        || next.decode_free() > capacity
                    {
                        return Err(Inconsistency::BadLink { index });
                    }
                }
                Slot::Used { next, .. } => {
                    if index == 0 {
                        return Err(Inconsistency::SentinelOccupied);
                    }
                    if next.is_negative() || next.index() > capacity {
                        return Err(Inconsistency::BadLink { index });
                    }
                    used[index] = true;
                    used_count += 1;
                }
            }
        }

        if used_count != self.len() {
            return Err(Inconsistency::CountMismatch {
                len: self.len(),
                used: used_count,
            });
        }

        let visited = self.iter().count();
        if visited != self.len() {
            return Err(Inconsistency::IterationMismatch {
                visited,
                len: self.len(),
            });
        }

        let free_count = capacity - used_count;
        trace!("check: validating free list ({free_count} slot(s))");
        check_free_list(slots, &used, free_count, Direction::Forward)?;
        check_free_list(slots, &used, free_count, Direction::Backward)?;

        // Every used slot must sit on exactly one chain, the one rooted at
        // its home address.
        let mut claimed = vec![false; capacity + 1];
        let mut chains = 0;
        for head in 1..=capacity {
            if !used[head] || self.home_address(slots[head].key()) != head {
                continue;
            }
            chains += 1;

            let mut index = head;
            loop {
                if !used[index] {
                    return Err(Inconsistency::ChainThroughFreeSlot { head, index });
                }
                if claimed[index] {
                    return Err(Inconsistency::SharedSlot { head, index });
                }
                claimed[index] = true;

                let home = self.home_address(slots[index].key());
                if home != head {
                    return Err(Inconsistency::ForeignMember { head, index, home });
                }

                let next = slots[index].chain_next();
                if next == L::NULL {
                    break;
                }
                index = next.index();
            }
        }
        trace!("check: {chains} chain(s) for {} key(s)", self.len());

        let mut keys = HashSet::with_capacity(self.len());
        for index in 1..=capacity {
            if !used[index] {
                continue;
            }
            let key = slots[index].key();
            if !claimed[index] {
                return Err(Inconsistency::Unreachable {
                    index,
                    home: self.home_address(key),
                });
            }
            if !keys.insert(key) {
                return Err(Inconsistency::DuplicateKey { index });
            }
        }

        Ok(())
    }
}

/// Walks the free list from the sentinel in `direction`, expecting to visit
/// every free slot exactly once and return to the sentinel.
fn check_free_list<K, V, L: Link>(
    slots: &[Slot<K, V, L>],
    used: &[bool],
    free_count: usize,
    direction: Direction,
) -> Result<(), Inconsistency> {
    let broken = |index| Inconsistency::BrokenFreeList { direction, index };

    let links = |index: usize| match slots[index] {
        Slot::Free { prev, next } => Some((prev.index(), next.decode_free())),
        Slot::Used { .. } => None,
    };
    let step = |index: usize| {
        links(index).map(|(prev, next)| match direction {
            Direction::Forward => next,
            Direction::Backward => prev,
        })
    };

    let mut seen = vec![false; slots.len()];
    let mut index = 0;
    for _ in 0..free_count {
        let Some(following) = step(index) else {
            return Err(broken(index));
        };
        if following == 0 || used[following] || seen[following] {
            return Err(broken(following));
        }

        // The link back must point at where we came from.
        let back = links(following).map(|(prev, next)| match direction {
            Direction::Forward => prev,
            Direction::Backward => next,
        });
        if back != Some(index) {
            return Err(broken(following));
        }

        seen[following] = true;
        index = following;
    }

    if step(index) != Some(0) {
        return Err(broken(index));
    }

    Ok(())
}
