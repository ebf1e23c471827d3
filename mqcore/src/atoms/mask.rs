use std::collections::HashSet;

use auto_enums::auto_enum;
use bit_set::BitSet;
use log::trace;

/// Membership predicate over the atom index space.
///
/// The representation is chosen once, at construction, from the estimated fill
/// ratio `count / (max + 1)`: at or above the density threshold a bit set is
/// used, below it a hash set. Enumeration is always in ascending order.
#[derive(Debug, Clone)]
pub enum Mask {
    Empty,
    Singleton(u32),
    /// Every atom of `0..n`.
    All(usize),
    Dense { bits: BitSet, count: usize },
    Sparse { set: HashSet<u32>, sorted: Vec<u32> },
}

impl Mask {
    pub fn all(atom_count: usize) -> Self {
        if atom_count == 0 {
            Mask::Empty
        } else {
            Mask::All(atom_count)
        }
    }

    /// Build a mask from indices in any order, possibly repeated.
    pub fn from_indices(indices: impl IntoIterator<Item = u32>, density_threshold: f64) -> Self {
        let mut sorted: Vec<u32> = indices.into_iter().collect();
        sorted.sort_unstable();
        sorted.dedup();
        Self::from_sorted(sorted, density_threshold)
    }

    /// Build a mask from ascending, duplicate-free indices.
    pub fn from_sorted(sorted: Vec<u32>, density_threshold: f64) -> Self {
        debug_assert!(sorted.windows(2).all(|w| w[0] < w[1]));

        match sorted.as_slice() {
            [] => Mask::Empty,
            [single] => Mask::Singleton(*single),
            [.., last] => {
                let count = sorted.len();
                let density = count as f64 / (*last as f64 + 1.0);
                if density >= density_threshold {
                    trace!("Dense mask: {count} atoms, density {density:.3}");
                    let mut bits = BitSet::with_capacity(*last as usize + 1);
                    for &i in &sorted {
                        bits.insert(i as usize);
                    }
                    Mask::Dense { bits, count }
                } else {
                    trace!("Sparse mask: {count} atoms, density {density:.3}");
                    Mask::Sparse {
                        set: sorted.iter().copied().collect(),
                        sorted,
                    }
                }
            }
        }
    }

    pub fn has(&self, index: u32) -> bool {
        match self {
            Mask::Empty => false,
            Mask::Singleton(i) => *i == index,
            Mask::All(n) => (index as usize) < *n,
            Mask::Dense { bits, .. } => bits.contains(index as usize),
            Mask::Sparse { set, .. } => set.contains(&index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Mask::Empty => 0,
            Mask::Singleton(_) => 1,
            Mask::All(n) => *n,
            Mask::Dense { count, .. } => *count,
            Mask::Sparse { sorted, .. } => sorted.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Members in ascending order.
    #[auto_enum(Iterator)]
    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        match self {
            Mask::Empty => std::iter::empty(),
            Mask::Singleton(i) => std::iter::once(*i),
            Mask::All(n) => 0..*n as u32,
            Mask::Dense { bits, .. } => bits.iter().map(|i| i as u32),
            Mask::Sparse { sorted, .. } => sorted.iter().copied(),
        }
    }

    pub fn is_dense(&self) -> bool {
        matches!(self, Mask::Dense { .. } | Mask::All(_))
    }
}
