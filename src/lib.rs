#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod logging;

mod check;
mod error;
mod slot;

pub mod hashing;

pub mod link;

/// The chained-scatter table and its iterators.
pub mod scatter_table;

#[cfg(feature = "stats")]
mod stats;

pub use check::Direction;
pub use check::Inconsistency;
pub use error::Error;
pub use hashing::DefaultHashBuilder;
pub use link::CapacityPolicy;
pub use link::Fixed;
pub use link::Growable;
pub use link::Link;
pub use scatter_table::FixedScatterTable;
pub use scatter_table::Iter;
pub use scatter_table::IterMut;
pub use scatter_table::ScatterTable;
#[cfg(feature = "stats")]
pub use stats::ChainStats;
