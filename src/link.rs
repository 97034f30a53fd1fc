//! Link widths and capacity policies.
//!
//! Slot indices are stored in a signed integer of configurable width. Within
//! an occupied slot the link is the index of the next chain node (`0` ends the
//! chain); within a free slot the forward link is stored as
//! `-(successor + 1)`, so every link in the table lies in
//! `[-(capacity + 1), capacity]`.

use core::fmt::Debug;

mod sealed {
    pub trait Sealed {}
}

/// A signed integer type used for slot links.
///
/// Narrower links make slots smaller at the cost of a lower
/// [`MAX_CAPACITY`](Link::MAX_CAPACITY). Implemented for `i16`, `i32` and
/// `i64`; the trait is sealed.
pub trait Link: Copy + Eq + Debug + sealed::Sealed {
    /// The chain terminator, and the index of the free-list sentinel.
    const NULL: Self;

    /// Largest power-of-two capacity this link type can address.
    const MAX_CAPACITY: usize;

    /// Type name, used in error messages.
    const NAME: &'static str;

    #[doc(hidden)]
    fn from_index(index: usize) -> Self;

    #[doc(hidden)]
    fn index(self) -> usize;

    #[doc(hidden)]
    fn encode_free(index: usize) -> Self;

    #[doc(hidden)]
    fn decode_free(self) -> usize;

    #[doc(hidden)]
    fn is_negative(self) -> bool;
}

macro_rules! impl_link {
    ($($t:ty),*) => {$(
        impl sealed::Sealed for $t {}

        impl Link for $t {
            const NULL: Self = 0;

            const MAX_CAPACITY: usize = {
                // One bit for the sign, one to keep `-(capacity + 1)` in range.
                let bits = <$t>::BITS - 2;
                if bits >= usize::BITS {
                    1 << (usize::BITS - 1)
                } else {
                    1 << bits
                }
            };

            const NAME: &'static str = stringify!($t);

            #[inline(always)]
            fn from_index(index: usize) -> Self {
                debug_assert!(index <= Self::MAX_CAPACITY);
                index as $t
            }

            #[inline(always)]
            fn index(self) -> usize {
                debug_assert!(self >= 0, "link {} is not an index", self);
                self as usize
            }

            #[inline(always)]
            fn encode_free(index: usize) -> Self {
                debug_assert!(index <= Self::MAX_CAPACITY);
                -(index as $t) - 1
            }

            #[inline(always)]
            fn decode_free(self) -> usize {
                debug_assert!(self < 0, "link {} is not a free-list link", self);
                (-(self + 1)) as usize
            }

            #[inline(always)]
            fn is_negative(self) -> bool {
                self < 0
            }
        }
    )*};
}

impl_link!(i16, i32, i64);

/// Whether a table may reallocate when it runs out of free slots.
///
/// Implemented by [`Growable`] and [`Fixed`]; the trait is sealed.
pub trait CapacityPolicy: sealed::Sealed {
    /// `true` if a full table rejects new keys instead of growing.
    const FIXED: bool;
}

/// Capacity doubles (with a full rehash) whenever a new key finds no free
/// slot. Tables with this policy also expose
/// [`rehash`](crate::ScatterTable::rehash).
#[derive(Debug, Clone, Copy)]
pub enum Growable {}

/// Capacity is set at construction; inserting a new key into a full table
/// returns [`Error::CapacityExhausted`](crate::Error::CapacityExhausted).
#[derive(Debug, Clone, Copy)]
pub enum Fixed {}

impl sealed::Sealed for Growable {}
impl sealed::Sealed for Fixed {}

impl CapacityPolicy for Growable {
    const FIXED: bool = false;
}

impl CapacityPolicy for Fixed {
    const FIXED: bool = true;
}
