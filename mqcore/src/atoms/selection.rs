use std::collections::HashMap;

use smallvec::SmallVec;

use crate::atoms::{mask::Mask, set::AtomSet};

/// Ordered sequence of atom sets; the result of a query.
///
/// Order reflects generation order unless a combinator re-sorts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomSelection {
    sets: Vec<AtomSet>,
}

impl AtomSelection {
    pub fn new(sets: Vec<AtomSet>) -> Self {
        Self { sets }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn linear_builder() -> LinearBuilder {
        LinearBuilder::default()
    }

    pub fn unique_builder() -> UniqueBuilder {
        UniqueBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sets(&self) -> &[AtomSet] {
        &self.sets
    }

    pub fn get(&self, index: usize) -> Option<&AtomSet> {
        self.sets.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AtomSet> {
        self.sets.iter()
    }

    pub fn into_sets(self) -> Vec<AtomSet> {
        self.sets
    }

    /// Every member atom, ascending and without duplicates.
    pub fn to_indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self
            .sets
            .iter()
            .flat_map(|s| s.indices().iter().copied())
            .collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Mask over every member atom.
    pub fn get_mask(&self, density_threshold: f64) -> Mask {
        match self.sets.as_slice() {
            [] => Mask::Empty,
            [single] => single.to_mask(density_threshold),
            _ => Mask::from_sorted(self.to_indices(), density_threshold),
        }
    }

    /// All members collapsed into one set.
    pub fn union_all(&self) -> Option<AtomSet> {
        match self.sets.as_slice() {
            [single] => Some(single.clone()),
            sets => AtomSet::union_many(sets),
        }
    }
}

impl FromIterator<AtomSet> for AtomSelection {
    fn from_iter<I: IntoIterator<Item = AtomSet>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AtomSelection {
    type Item = &'a AtomSet;
    type IntoIter = std::slice::Iter<'a, AtomSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.sets.iter()
    }
}

/// Collects atom sets in insertion order, duplicates included.
#[derive(Debug, Default)]
pub struct LinearBuilder {
    sets: Vec<AtomSet>,
}

impl LinearBuilder {
    pub fn add(&mut self, set: AtomSet) {
        self.sets.push(set);
    }

    /// Add the set of `indices` unless it is empty.
    pub fn add_indices(&mut self, indices: Vec<u32>) {
        if let Some(set) = AtomSet::from_unsorted(indices) {
            self.sets.push(set);
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn build(self) -> AtomSelection {
        AtomSelection::new(self.sets)
    }
}

/// Collects atom sets in insertion order, dropping structural duplicates.
#[derive(Debug, Default)]
pub struct UniqueBuilder {
    seen: AtomSelectionSet,
    sets: Vec<AtomSet>,
}

impl UniqueBuilder {
    /// Returns `false` when an equal set was already added.
    pub fn add(&mut self, set: AtomSet) -> bool {
        if !self.seen.add(&set) {
            return false;
        }
        self.sets.push(set);
        true
    }

    pub fn add_indices(&mut self, indices: Vec<u32>) -> bool {
        match AtomSet::from_unsorted(indices) {
            Some(set) => self.add(set),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn build(self) -> AtomSelection {
        AtomSelection::new(self.sets)
    }
}

/// Membership index over atom sets, bucketed by hash code.
///
/// Sets sharing a hash code are compared structurally within their bucket.
#[derive(Debug, Default)]
pub struct AtomSelectionSet {
    buckets: HashMap<u32, SmallVec<AtomSet, 1>>,
    len: usize,
}

impl AtomSelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_selection(selection: &AtomSelection) -> Self {
        let mut set = Self::new();
        for s in selection {
            set.add(s);
        }
        set
    }

    /// Returns `false` when an equal set is already present.
    pub fn add(&mut self, set: &AtomSet) -> bool {
        let bucket = self.buckets.entry(set.hash_code()).or_default();
        if bucket.iter().any(|s| s == set) {
            return false;
        }
        bucket.push(set.clone());
        self.len += 1;
        true
    }

    pub fn contains(&self, set: &AtomSet) -> bool {
        self.buckets
            .get(&set.hash_code())
            .is_some_and(|bucket| bucket.iter().any(|s| s == set))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
