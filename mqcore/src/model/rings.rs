use std::collections::{HashMap, HashSet, VecDeque};

use bit_set::BitSet;

use crate::model::bonds::{BondFlags, BondGraph};

#[derive(Debug, Clone, PartialEq)]
pub struct Ring {
    /// Atoms in cycle order.
    pub atoms: Vec<u32>,
    pub fingerprint: String,
    pub aromatic: bool,
}

impl Ring {
    /// Atoms in ascending order.
    pub fn sorted_atoms(&self) -> Vec<u32> {
        let mut atoms = self.atoms.clone();
        atoms.sort_unstable();
        atoms
    }
}

/// Canonical fingerprint of a ring given the element symbols along its cycle.
///
/// The fingerprint is the lexicographically smallest rotation of the cycle,
/// read in either direction, joined with `-`; it does not depend on where the
/// cycle starts nor on its orientation.
pub fn canonical_fingerprint<S: AsRef<str>>(elements: &[S]) -> String {
    let n = elements.len();
    let labels: Vec<String> = elements
        .iter()
        .map(|e| e.as_ref().trim().to_ascii_uppercase())
        .collect();
    let mut best: Option<Vec<&str>> = None;

    for start in 0..n {
        for forward in [true, false] {
            let candidate: Vec<&str> = (0..n)
                .map(|k| {
                    let i = if forward { (start + k) % n } else { (start + n - k) % n };
                    labels[i].as_str()
                })
                .collect();
            if best.as_ref().is_none_or(|b| candidate < *b) {
                best = Some(candidate);
            }
        }
    }
    best.map(|b| b.join("-")).unwrap_or_default()
}

/// Smallest rings through every bond of a structure.
#[derive(Debug, Clone, Default)]
pub struct RingCollection {
    rings: Vec<Ring>,
    by_fingerprint: HashMap<String, Vec<usize>>,
    in_ring: BitSet,
}

impl RingCollection {
    /// Collect, for every bond, the smallest ring of at most `max_size` atoms
    /// running through it. Rings found from several bonds are kept once.
    pub fn find<'a>(
        bonds: &BondGraph,
        element_of: impl Fn(u32) -> &'a str,
        max_size: usize,
    ) -> Self {
        let mut collection = RingCollection::default();
        let mut seen: HashSet<Vec<u32>> = HashSet::new();

        for bond in bonds.iter() {
            let Some(cycle) = smallest_cycle(bonds, bond.a, bond.b, max_size) else {
                continue;
            };

            let mut key = cycle.clone();
            key.sort_unstable();
            if !seen.insert(key) {
                continue;
            }

            let aromatic = (0..cycle.len()).all(|k| {
                let (a, b) = (cycle[k], cycle[(k + 1) % cycle.len()]);
                bonds
                    .bond_between(a, b)
                    .is_some_and(|bond| bond.flags.contains(BondFlags::AROMATIC))
            });
            let elements: Vec<&str> = cycle.iter().map(|&a| element_of(a)).collect();
            let fingerprint = canonical_fingerprint(&elements);

            for &atom in &cycle {
                collection.in_ring.insert(atom as usize);
            }
            collection
                .by_fingerprint
                .entry(fingerprint.clone())
                .or_default()
                .push(collection.rings.len());
            collection.rings.push(Ring {
                atoms: cycle,
                fingerprint,
                aromatic,
            });
        }
        collection
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    pub fn len(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn with_fingerprint(&self, fingerprint: &str) -> impl Iterator<Item = &Ring> {
        self.by_fingerprint
            .get(fingerprint)
            .into_iter()
            .flatten()
            .map(|&i| &self.rings[i])
    }

    pub fn is_in_ring(&self, atom: u32) -> bool {
        self.in_ring.contains(atom as usize)
    }
}

/// Shortest cycle containing the bond `a`-`b`: breadth-first search from `a`
/// to `b` that never walks the bond itself.
fn smallest_cycle(bonds: &BondGraph, a: u32, b: u32, max_size: usize) -> Option<Vec<u32>> {
    if max_size < 3 {
        return None;
    }

    let mut parent: HashMap<u32, u32> = HashMap::new();
    let mut queue = VecDeque::new();
    parent.insert(a, a);
    queue.push_back((a, 1usize));

    while let Some((atom, depth)) = queue.pop_front() {
        if depth >= max_size {
            continue;
        }
        for next in bonds.neighbors(atom) {
            if atom == a && next == b {
                continue;
            }
            if parent.contains_key(&next) {
                continue;
            }
            parent.insert(next, atom);
            if next == b {
                let mut cycle = vec![b];
                let mut current = b;
                while current != a {
                    current = parent[&current];
                    cycle.push(current);
                }
                cycle.reverse();
                return Some(cycle);
            }
            queue.push_back((next, depth + 1));
        }
    }
    None
}
