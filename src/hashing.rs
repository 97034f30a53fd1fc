//! Hash builders for [`ScatterTable`](crate::ScatterTable).
//!
//! The table only needs a [`BuildHasher`](core::hash::BuildHasher); the
//! statistical quality of the hash is the caller's concern. A constant hash
//! is still correct, it just degrades every operation to a walk of a single
//! chain.

use core::hash::BuildHasherDefault;
use core::hash::Hasher;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hash builder used when none is specified.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hash builder used when none is specified.
        pub type DefaultHashBuilder = std::hash::RandomState;
    } else {
        /// The hash builder used when none is specified.
        pub type DefaultHashBuilder = IdentityHashBuilder;
    }
}

/// A hasher that passes integral keys through unchanged.
///
/// Order tokens, order ids and instrument ids are typically already well
/// spread, so hashing them again only costs latency. A single integer write
/// yields that integer; multiple writes (tuples, structs, byte slices) are
/// folded together.
///
/// # Examples
///
/// ```rust
/// use core::hash::BuildHasher;
///
/// use scatter_table::hashing::IdentityHashBuilder;
///
/// let builder = IdentityHashBuilder::default();
/// assert_eq!(builder.hash_one(42u64), 42);
/// assert_eq!(builder.hash_one(7i32), 7);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityHasher {
    state: u64,
}

/// [`BuildHasher`](core::hash::BuildHasher) for [`IdentityHasher`].
pub type IdentityHashBuilder = BuildHasherDefault<IdentityHasher>;

impl IdentityHasher {
    #[inline(always)]
    fn fold(&mut self, word: u64) {
        self.state = self.state.rotate_left(5) ^ word;
    }
}

impl Hasher for IdentityHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for chunk in bytes.chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            self.fold(u64::from_le_bytes(word));
        }
    }

    #[inline]
    fn write_u8(&mut self, n: u8) {
        self.fold(n as u64);
    }

    #[inline]
    fn write_u16(&mut self, n: u16) {
        self.fold(n as u64);
    }

    #[inline]
    fn write_u32(&mut self, n: u32) {
        self.fold(n as u64);
    }

    #[inline]
    fn write_u64(&mut self, n: u64) {
        self.fold(n);
    }

    #[inline]
    fn write_usize(&mut self, n: usize) {
        self.fold(n as u64);
    }
}

#[cfg(test)]
mod tests {
    use core::hash::BuildHasher;

    use super::*;

    #[test]
    fn integers_hash_to_themselves() {
        let builder = IdentityHashBuilder::default();
        assert_eq!(builder.hash_one(0u64), 0);
        assert_eq!(builder.hash_one(0xdead_beefu32), 0xdead_beef);
        assert_eq!(builder.hash_one(513usize), 513);
        assert_eq!(builder.hash_one(9u16), 9);
    }

    #[test]
    fn composite_keys_mix_all_fields() {
        let builder = IdentityHashBuilder::default();
        assert_ne!(builder.hash_one((1u32, 2u32)), builder.hash_one((2u32, 1u32)));
        assert_ne!(builder.hash_one("abc"), builder.hash_one("abd"));
    }
}
