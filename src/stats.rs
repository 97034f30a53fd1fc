use alloc::vec;
use alloc::vec::Vec;
use core::hash::BuildHasher;
use core::hash::Hash;

use crate::link::CapacityPolicy;
use crate::link::Link;
use crate::scatter_table::ScatterTable;

/// Chain-length statistics for a [`ScatterTable`].
///
/// Requires the `stats` feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainStats {
    /// Number of entries in the table
    pub len: usize,
    /// Number of entry slots
    pub capacity: usize,
    /// Number of non-empty home chains
    pub chains: usize,
    /// Length of the longest home chain
    pub longest_chain: usize,
    /// Entries stored outside their home slot
    pub displaced: usize,
    /// `histogram[n]` is the number of chains of length `n + 1`
    pub histogram: Vec<usize>,
    /// Load factor (len / capacity)
    pub load_factor: f64,
}

impl ChainStats {
    /// Average number of slots a successful lookup visits.
    pub fn mean_probe_length(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }

        // A chain of length n costs 1 + 2 + ... + n over its n keys.
        let total: usize = self
            .histogram
            .iter()
            .enumerate()
            .map(|(i, &count)| count * (i + 1) * (i + 2) / 2)
            .sum();
        total as f64 / self.len as f64
    }

    /// Pretty-print the statistics and a chain-length histogram.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Scatter Table Chain Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor)",
            self.len,
            self.capacity,
            self.load_factor * 100.0
        );
        println!(
            "Chains: {} (longest {}, {:.3} slots per lookup)",
            self.chains,
            self.longest_chain,
            self.mean_probe_length()
        );
        println!(
            "Displaced: {} entries ({:.02}%)",
            self.displaced,
            if self.len == 0 {
                0.0
            } else {
                self.displaced as f64 / self.len as f64 * 100.0
            }
        );

        let max = self.histogram.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("chain histogram: empty");
            return;
        }

        let max_bar = 60usize;
        println!("chain histogram ({} chains):", self.chains);
        for (i, &count) in self.histogram.iter().enumerate() {
            let width = (count * max_bar).div_ceil(max);
            println!("{:>3} | {} ({})", i + 1, "█".repeat(width), count);
        }
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
    /// Collects chain-length statistics by walking every home chain.
    ///
    /// Requires the `stats` feature.
    pub fn chain_stats(&self) -> ChainStats {
        let capacity = self.capacity();
        let mut histogram = vec![];
        let mut chains = 0;
        let mut displaced = 0;

        for head in 1..=capacity {
            let slot = &self.slots()[head];
            if slot.is_free() {
                continue;
            }
            if self.home_address(slot.key()) != head {
                displaced += 1;
                continue;
            }

            chains += 1;
            let mut length = 1;
            let mut next = slot.chain_next();
            while next != L::NULL {
                length += 1;
                next = self.slots()[next.index()].chain_next();
            }

            if histogram.len() < length {
                histogram.resize(length, 0);
            }
            histogram[length - 1] += 1;
        }

        ChainStats {
            len: self.len(),
            capacity,
            chains,
            longest_chain: histogram.len(),
            displaced,
            histogram,
            load_factor: self.len() as f64 / capacity as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::FixedScatterTable;
    use crate::hashing::IdentityHashBuilder;

    #[test]
    fn empty_table_has_no_chains() {
        let table: FixedScatterTable<u64, u64, IdentityHashBuilder> =
            FixedScatterTable::with_capacity(8).unwrap();
        let stats = table.chain_stats();
        assert_eq!(stats.chains, 0);
        assert_eq!(stats.longest_chain, 0);
        assert!(stats.histogram.is_empty());
        assert_eq!(stats.mean_probe_length(), 0.0);
    }

    #[test]
    fn counts_chains_and_displacements() {
        // Capacity 8, identity hash: key k has home (k & 7) + 1.
        let mut table: FixedScatterTable<u64, u64, IdentityHashBuilder> =
            FixedScatterTable::with_capacity(8).unwrap();
        for k in [1u64, 9, 17, 0, 4] {
            table.put(k, k).unwrap();
        }

        let stats = table.chain_stats();
        assert_eq!(stats.len, 5);
        assert_eq!(stats.capacity, 8);
        // Chains at #1 (0), #2 (1, 9, 17) and #5 (4).
        assert_eq!(stats.chains, 3);
        assert_eq!(stats.longest_chain, 3);
        assert_eq!(stats.histogram, [2, 0, 1]);
        assert_eq!(stats.displaced, 2);
        assert_eq!(stats.load_factor, 5.0 / 8.0);
        assert_eq!(stats.mean_probe_length(), (1.0 + 1.0 + 6.0) / 5.0);
    }
}
