use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::marker::PhantomData;

use crate::error::Error;
use crate::hashing::DefaultHashBuilder;
use crate::link::CapacityPolicy;
use crate::link::Fixed;
use crate::link::Growable;
use crate::link::Link;
use crate::logging::debug;
use crate::logging::trace;
use crate::slot::Slot;
use crate::slot::SlotArray;

/// A [`ScatterTable`] that never reallocates.
pub type FixedScatterTable<K, V, S = DefaultHashBuilder, L = i32> = ScatterTable<K, V, S, Fixed, L>;

/// Outcome of a single insertion attempt.
enum Insert {
    /// The key lives at this slot index.
    Stored(usize),
    /// A new slot was needed and none is free.
    Full,
}

/// A hash table using chained scatter without coalescing.
///
/// Entries live in a single array of `capacity + 1` slots. Every key has a
/// *home address* derived from its hash, and all keys sharing a home address
/// form one singly linked chain whose head always sits in the home slot
/// itself. When a new chain needs a home slot that is borrowed by a node of
/// another chain, that node is moved elsewhere instead of letting the chains
/// merge. Unused slots form a circular free list threaded through the same
/// array, so `get`, `put` and `remove` never allocate and stay fast at a
/// 100% load factor.
///
/// Keys and values are `Copy`: entries are relocated by copying them whole.
///
/// # Type parameters
///
/// - `S` hashes keys, see [`hashing`](crate::hashing).
/// - `P` is [`Growable`] (capacity doubles when full) or [`Fixed`] (a full
///   table rejects new keys).
/// - `L` is the signed integer width of slot links; it bounds
///   [`max_capacity`](Self::max_capacity).
///
/// # Examples
///
/// ```rust
/// use scatter_table::ScatterTable;
///
/// let mut orders: ScatterTable<u64, u32> = ScatterTable::new();
/// orders.put(1001, 7).unwrap();
/// orders.put(1002, 9).unwrap();
///
/// assert_eq!(orders.get(&1001), Some(&7));
/// assert_eq!(orders.remove_and_get(&1002), Some(9));
/// assert_eq!(orders.len(), 1);
/// ```
pub struct ScatterTable<K, V, S = DefaultHashBuilder, P = Growable, L = i32> {
    pub(crate) slots: SlotArray<K, V, L>,
    pub(crate) len: usize,
    capacity_mask: usize,
    hash_builder: S,
    _policy: PhantomData<P>,
}

impl<K, V, S, P, L> Debug for ScatterTable<K, V, S, P, L>
where
    K: Debug,
    V: Debug,
    L: Link,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, S, P, L> Clone for ScatterTable<K, V, S, P, L>
where
    K: Clone,
    V: Clone,
    S: Clone,
    L: Clone,
{
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            len: self.len,
            capacity_mask: self.capacity_mask,
            hash_builder: self.hash_builder.clone(),
            _policy: PhantomData,
        }
    }
}

impl<K, V, S, P, L> Default for ScatterTable<K, V, S, P, L>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher + Default,
    P: CapacityPolicy,
    L: Link,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, P, L> ScatterTable<K, V, S, P, L>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher + Default,
    P: CapacityPolicy,
    L: Link,
{
    /// Creates a table with capacity 1 and the default hash builder.
    pub fn new() -> Self {
        Self::with_hasher(S::default())
    }

    /// Creates a table with room for at least `capacity` entries.
    ///
    /// The capacity is rounded up to the next power of two.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityTooLarge`] if the rounded capacity exceeds
    /// [`max_capacity`](Self::max_capacity).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scatter_table::ScatterTable;
    ///
    /// let table: ScatterTable<u32, u32> = ScatterTable::with_capacity(100).unwrap();
    /// assert_eq!(table.capacity(), 128);
    /// ```
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::with_capacity_and_hasher(capacity, S::default())
    }
}

impl<K, V, S, P, L> ScatterTable<K, V, S, P, L>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
    P: CapacityPolicy,
    L: Link,
{
    /// Creates a table with capacity 1 using `hash_builder` to hash keys.
    pub fn with_hasher(hash_builder: S) -> Self {
        match Self::with_capacity_and_hasher(1, hash_builder) {
            Ok(table) => table,
            Err(_) => unreachable!("every link type can address one slot"),
        }
    }

    /// Creates a table with room for at least `capacity` entries, using
    /// `hash_builder` to hash keys.
    ///
    /// # Errors
    ///
    /// [`Error::CapacityTooLarge`] if the rounded capacity exceeds
    /// [`max_capacity`](Self::max_capacity).
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Result<Self, Error> {
        let capacity = round_capacity::<L>(capacity)?;

        Ok(Self {
            slots: SlotArray::allocate(capacity)?,
            len: 0,
            capacity_mask: capacity - 1,
            hash_builder,
            _policy: PhantomData,
        })
    }

    /// Largest capacity a table with link type `L` can reach.
    ///
    /// ```rust
    /// use scatter_table::ScatterTable;
    /// use scatter_table::hashing::DefaultHashBuilder;
    /// use scatter_table::link::Growable;
    ///
    /// type Narrow = ScatterTable<u32, u32, DefaultHashBuilder, Growable, i16>;
    /// assert_eq!(Narrow::max_capacity(), 16384);
    /// ```
    pub const fn max_capacity() -> usize {
        L::MAX_CAPACITY
    }

    /// Returns `true` if this table rejects new keys once full instead of
    /// growing.
    pub const fn is_fixed_capacity() -> bool {
        P::FIXED
    }

    /// Returns the number of entries in the table.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the table holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of entry slots, always a power of two.
    ///
    /// A table can hold exactly this many entries.
    pub fn capacity(&self) -> usize {
        self.capacity_mask + 1
    }

    /// Returns a reference to the table's hash builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    #[inline(always)]
    pub(crate) fn home_address(&self, key: &K) -> usize {
        (self.hash_builder.hash_one(key) as usize & self.capacity_mask) + 1
    }

    /// Slot index of `key`, if present.
    #[inline]
    fn find(&self, key: &K) -> Option<usize> {
        let mut index = self.home_address(key);

        // The home slot may be free; past it the walk only visits used slots.
        if self.slots[index].is_free() {
            return None;
        }

        loop {
            let slot = &self.slots[index];
            if slot.key() == key {
                return Some(index);
            }

            let next = slot.chain_next();
            if next == L::NULL {
                return None;
            }
            index = next.index();
        }
    }

    /// Returns a reference to the value stored for `key`.
    ///
    /// The reference is invalidated by any mutating call: entries move when
    /// other keys are inserted or removed.
    #[inline]
    pub fn get(&self, key: &K) -> Option<&V> {
        self.find(key).map(|index| self.slots[index].value())
    }

    /// Returns a mutable reference to the value stored for `key`.
    #[inline]
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let index = self.find(key)?;
        Some(self.slots[index].value_mut())
    }

    /// Returns `true` if the table contains `key`.
    #[inline]
    pub fn contains_key(&self, key: &K) -> bool {
        self.find(key).is_some()
    }

    /// Inserts `key` with `value`, or overwrites the value if `key` is
    /// already present. Returns a reference to the stored value.
    ///
    /// A growable table that is full doubles its capacity and retries.
    ///
    /// # Errors
    ///
    /// - [`Error::CapacityExhausted`] if a fixed table is full and `key` is
    ///   new.
    /// - [`Error::CapacityTooLarge`] if a growable table is full and doubling
    ///   would exceed [`max_capacity`](Self::max_capacity).
    ///
    /// The table is unchanged when an error is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scatter_table::Error;
    /// use scatter_table::FixedScatterTable;
    ///
    /// let mut table: FixedScatterTable<u32, u32> = FixedScatterTable::with_capacity(2).unwrap();
    /// table.put(1, 10).unwrap();
    /// table.put(2, 20).unwrap();
    ///
    /// assert_eq!(table.put(3, 30), Err(Error::CapacityExhausted { capacity: 2 }));
    /// assert_eq!(table.put(2, 21), Ok(&mut 21));
    /// ```
    #[inline]
    pub fn put(&mut self, key: K, value: V) -> Result<&mut V, Error> {
        let index = loop {
            match self.insert(key, value) {
                Insert::Stored(index) => break index,
                Insert::Full => self.grow()?,
            }
        };

        Ok(self.slots[index].value_mut())
    }

    fn insert(&mut self, key: K, value: V) -> Insert {
        let home = self.home_address(&key);

        match &self.slots[home] {
            Slot::Free { .. } => {
                trace!("put: populating free home slot #{home}");
                self.slots.unlink(home);
                self.occupy(home, key, value);
                Insert::Stored(home)
            }
            Slot::Used { key: occupant, .. } => {
                let occupant_home = self.home_address(occupant);
                if occupant_home == home {
                    self.insert_into_chain(home, key, value)
                } else {
                    self.displace_and_insert(home, occupant_home, key, value)
                }
            }
        }
    }

    /// `head` starts the home chain of `key`: update in place or append.
    fn insert_into_chain(&mut self, head: usize, key: K, value: V) -> Insert {
        let mut tail = head;
        loop {
            let slot = &mut self.slots[tail];
            if *slot.key() == key {
                trace!("put: updating existing entry in slot #{tail}");
                *slot.value_mut() = value;
                return Insert::Stored(tail);
            }

            let next = slot.chain_next();
            if next == L::NULL {
                break;
            }
            tail = next.index();
        }

        if self.len == self.capacity() {
            return Insert::Full;
        }

        let index = self.slots.acquire();
        trace!("put: appending slot #{index} to the chain at #{head}");
        self.slots[tail].set_chain_next(L::from_index(index));
        self.occupy(index, key, value);

        Insert::Stored(index)
    }

    /// Slot `home` holds a node of the chain rooted at `occupant_home`. Moves
    /// that node to a free slot so `key` can start its own chain at `home`.
    fn displace_and_insert(&mut self, home: usize, occupant_home: usize, key: K, value: V) -> Insert {
        if self.len == self.capacity() {
            return Insert::Full;
        }

        let spare = self.slots.acquire();
        trace!("put: displacing #{home} -> #{spare} (chain at #{occupant_home})");

        // The moved node keeps its own `next`.
        self.slots[spare] = self.slots[home];

        let mut pred = occupant_home;
        loop {
            let next = self.slots[pred].chain_next();
            debug_assert!(next != L::NULL, "displaced node is not on its home chain");
            if next.index() == home {
                break;
            }
            pred = next.index();
        }
        self.slots[pred].set_chain_next(L::from_index(spare));

        self.occupy(home, key, value);
        Insert::Stored(home)
    }

    #[inline(always)]
    fn occupy(&mut self, index: usize, key: K, value: V) {
        self.slots[index] = Slot::Used {
            next: L::NULL,
            key,
            value,
        };
        self.len += 1;
    }

    #[cold]
    fn grow(&mut self) -> Result<(), Error> {
        if P::FIXED {
            return Err(Error::CapacityExhausted {
                capacity: self.capacity(),
            });
        }

        let capacity = self.capacity().checked_mul(2).ok_or(Error::CapacityTooLarge {
            requested: usize::MAX,
            max: L::MAX_CAPACITY,
            link: L::NAME,
        })?;
        self.resize(capacity)
    }

    /// Rebuilds the table with `capacity` slots by reinserting every entry in
    /// slot order.
    fn resize(&mut self, capacity: usize) -> Result<(), Error> {
        debug_assert!(capacity.is_power_of_two());
        debug_assert!(capacity >= self.len);
        debug_assert_ne!(capacity, self.capacity());

        let slots = SlotArray::allocate(capacity)?;

        debug!("rehashing {} -> {capacity} ({} entries)", self.capacity(), self.len);

        let old = core::mem::replace(&mut self.slots, slots);
        let len = core::mem::replace(&mut self.len, 0);
        self.capacity_mask = capacity - 1;

        for slot in old.entries() {
            if let Slot::Used { key, value, .. } = *slot {
                match self.insert(key, value) {
                    Insert::Stored(_) => {}
                    Insert::Full => unreachable!("rehash target smaller than the entry count"),
                }
            }
        }
        debug_assert_eq!(self.len, len);

        Ok(())
    }

    /// Removes `key` from the table. Returns `true` if it was present.
    #[inline]
    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_and_get(key).is_some()
    }

    /// Removes `key` from the table and returns its value, or `None` if it
    /// was not present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scatter_table::ScatterTable;
    ///
    /// let mut table: ScatterTable<u32, u64> = ScatterTable::new();
    /// table.put(5, 500).unwrap();
    ///
    /// assert_eq!(table.remove_and_get(&5), Some(500));
    /// assert_eq!(table.remove_and_get(&5), None);
    /// ```
    pub fn remove_and_get(&mut self, key: &K) -> Option<V> {
        let home = self.home_address(key);
        if self.slots[home].is_free() {
            return None;
        }

        let mut pred = home;
        let mut index = home;
        loop {
            let slot = &self.slots[index];
            let next = slot.chain_next();

            if slot.key() == key {
                let value = *slot.value();

                // Pull the successor into this slot so the chain head stays
                // anchored at its home address.
                let vacated = if next != L::NULL {
                    let successor = next.index();
                    trace!("remove: displacing #{successor} -> #{index}");
                    self.slots[index] = self.slots[successor];
                    successor
                } else {
                    if index != pred {
                        self.slots[pred].set_chain_next(L::NULL);
                    }
                    index
                };

                self.slots.release(vacated);
                self.len -= 1;
                return Some(value);
            }

            if next == L::NULL {
                return None;
            }
            pred = index;
            index = next.index();
        }
    }

    /// Removes every entry, keeping the allocated capacity.
    pub fn clear(&mut self) {
        self.slots.reset();
        self.len = 0;
    }
}

impl<K, V, S, L> ScatterTable<K, V, S, Growable, L>
where
    K: Hash + Eq + Copy,
    V: Copy,
    S: BuildHasher,
    L: Link,
{
    /// Rebuilds the table with the smallest power-of-two capacity that holds
    /// `count` entries and returns the new capacity.
    ///
    /// Typically used with `count == len()` to compact after bulk removals.
    /// Nothing happens if the capacity would not change.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if `count` is less than [`len`](Self::len).
    /// - [`Error::CapacityTooLarge`] if the new capacity exceeds
    ///   [`max_capacity`](Self::max_capacity).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use scatter_table::ScatterTable;
    ///
    /// let mut table: ScatterTable<u32, u32> = ScatterTable::with_capacity(1024).unwrap();
    /// for k in 0..100 {
    ///     table.put(k, k * 10).unwrap();
    /// }
    ///
    /// assert_eq!(table.rehash(table.len()), Ok(128));
    /// assert_eq!(table.get(&42), Some(&420));
    /// ```
    pub fn rehash(&mut self, count: usize) -> Result<usize, Error> {
        if count < self.len {
            return Err(Error::InvalidInput {
                requested: count,
                len: self.len,
            });
        }

        let capacity = round_capacity::<L>(count)?;
        if capacity != self.capacity() {
            self.resize(capacity)?;
        }

        Ok(self.capacity())
    }
}

impl<K, V, S, P, L: Link> ScatterTable<K, V, S, P, L> {
    /// Returns an iterator over the entries in slot order.
    ///
    /// The order carries no meaning and changes as entries move.
    pub fn iter(&self) -> Iter<'_, K, V, L> {
        Iter {
            slots: self.slots.entries().iter(),
            remaining: self.len,
        }
    }

    /// Returns an iterator over the entries that allows modifying values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V, L> {
        IterMut {
            remaining: self.len,
            slots: self.slots.entries_mut().iter_mut(),
        }
    }

    pub(crate) fn slots(&self) -> &SlotArray<K, V, L> {
        &self.slots
    }
}

/// Smallest power of two `>= max(count, 1)`, if the link type can address it.
fn round_capacity<L: Link>(count: usize) -> Result<usize, Error> {
    let too_large = Error::CapacityTooLarge {
        requested: count,
        max: L::MAX_CAPACITY,
        link: L::NAME,
    };

    match count.max(1).checked_next_power_of_two() {
        Some(capacity) if capacity <= L::MAX_CAPACITY => Ok(capacity),
        _ => Err(too_large),
    }
}

/// An iterator over the entries of a [`ScatterTable`].
///
/// Created by [`ScatterTable::iter`].
pub struct Iter<'a, K, V, L> {
    slots: core::slice::Iter<'a, Slot<K, V, L>>,
    remaining: usize,
}

impl<'a, K, V, L> Iterator for Iter<'a, K, V, L> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for slot in self.slots.by_ref() {
            if let Slot::Used { key, value, .. } = slot {
                self.remaining -= 1;
                return Some((key, value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, L> ExactSizeIterator for Iter<'_, K, V, L> {}

impl<K, V, L> FusedIterator for Iter<'_, K, V, L> {}

/// A mutable iterator over the entries of a [`ScatterTable`].
///
/// Created by [`ScatterTable::iter_mut`].
pub struct IterMut<'a, K, V, L> {
    slots: core::slice::IterMut<'a, Slot<K, V, L>>,
    remaining: usize,
}

impl<'a, K, V, L> Iterator for IterMut<'a, K, V, L> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        for slot in self.slots.by_ref() {
            if let Slot::Used { key, value, .. } = slot {
                self.remaining -= 1;
                return Some((&*key, value));
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, L> ExactSizeIterator for IterMut<'_, K, V, L> {}

impl<K, V, L> FusedIterator for IterMut<'_, K, V, L> {}

impl<'a, K, V, S, P, L: Link> IntoIterator for &'a ScatterTable<K, V, S, P, L> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, P, L: Link> IntoIterator for &'a mut ScatterTable<K, V, S, P, L> {
    type Item = (&'a K, &'a mut V);
    type IntoIter = IterMut<'a, K, V, L>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
