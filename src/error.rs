/// Errors returned by fallible [`ScatterTable`] operations.
///
/// Every error is raised before the table is modified, so a failed call
/// leaves the table exactly as it was.
///
/// [`ScatterTable`]: crate::ScatterTable
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A fixed-capacity table has no free slot left for a new key.
    ///
    /// Updating a key that is already present never raises this.
    #[error("cannot grow a fixed-capacity ({capacity}) table")]
    CapacityExhausted {
        /// Capacity of the table that rejected the insert.
        capacity: usize,
    },

    /// The requested (or grown) capacity cannot be addressed by the table's
    /// link type.
    #[error("capacity {requested} is larger than the max supported {max} for link type `{link}`")]
    CapacityTooLarge {
        /// Number of slots that was asked for.
        requested: usize,
        /// Largest capacity the link type can address.
        max: usize,
        /// Name of the link type.
        link: &'static str,
    },

    /// A rehash was requested below the number of live entries.
    #[error("cannot rehash to {requested} slots while holding {len} entries")]
    InvalidInput {
        /// Rehash target passed by the caller.
        requested: usize,
        /// Live entries at the time of the call.
        len: usize,
    },
}
