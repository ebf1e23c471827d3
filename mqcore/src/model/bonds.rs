use bitflags::bitflags;
use nalgebra::Point3;
use petgraph::{
    graph::{NodeIndex, UnGraph},
    visit::EdgeRef,
};

use crate::model::{elements, lookup::GridLookup};

bitflags! {
    /// Flags qualifying a bond.
    #[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Debug)]
    pub struct BondFlags: u8 {
        /// Shared-electron bond between two atoms.
        const COVALENT = 1 << 0;

        /// Bond part of an aromatic system.
        const AROMATIC = 1 << 1;

        /// Sulfur-sulfur bridge.
        const DISULFIDE = 1 << 2;

        /// Bond deduced from inter-atomic distances rather than read from the input.
        const INFERRED = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub order: u8,
    pub flags: BondFlags,
}

impl Bond {
    pub fn covalent(order: u8) -> Self {
        Self {
            order,
            flags: BondFlags::COVALENT,
        }
    }
}

/// A bond seen from one of its ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BondRef {
    pub a: u32,
    pub b: u32,
    pub bond: Bond,
}

/// Undirected bond graph; node `i` is atom `i`.
#[derive(Debug, Clone)]
pub struct BondGraph {
    graph: UnGraph<(), Bond, u32>,
}

impl BondGraph {
    pub fn from_bonds(atom_count: usize, bonds: impl IntoIterator<Item = (u32, u32, Bond)>) -> Self {
        let mut graph = UnGraph::with_capacity(atom_count, atom_count);
        for _ in 0..atom_count {
            graph.add_node(());
        }
        for (a, b, bond) in bonds {
            if a != b && graph.find_edge(NodeIndex::new(a as usize), NodeIndex::new(b as usize)).is_none() {
                graph.add_edge(NodeIndex::new(a as usize), NodeIndex::new(b as usize), bond);
            }
        }
        Self { graph }
    }

    /// Infer covalent bonds from distances: two atoms are bonded when they are
    /// closer than the sum of their covalent radii plus `tolerance`.
    pub fn infer(
        positions: &[Point3<f64>],
        symbols: &[&str],
        lookup: &GridLookup,
        tolerance: f64,
    ) -> Self {
        let max_radius = symbols
            .iter()
            .map(|e| elements::covalent_radius(e))
            .fold(0.0_f64, f64::max);

        let mut bonds = Vec::new();
        for (i, position) in positions.iter().enumerate() {
            let element_i = symbols[i];
            if elements::is_metal(element_i) {
                continue;
            }
            let radius_i = elements::covalent_radius(element_i);
            for j in lookup.query(position, radius_i + max_radius + tolerance) {
                let j_usize = j as usize;
                if j_usize <= i {
                    continue;
                }
                let element_j = symbols[j_usize];
                if elements::is_metal(element_j)
                    || (elements::is_hydrogen(element_i) && elements::is_hydrogen(element_j))
                {
                    continue;
                }

                let d = nalgebra::distance(position, &positions[j_usize]);
                let limit = radius_i + elements::covalent_radius(element_j) + tolerance;
                if d > 0.4 && d <= limit {
                    let mut flags = BondFlags::COVALENT | BondFlags::INFERRED;
                    if element_i.eq_ignore_ascii_case("S") && element_j.eq_ignore_ascii_case("S") {
                        flags |= BondFlags::DISULFIDE;
                    }
                    bonds.push((i as u32, j, Bond { order: 1, flags }));
                }
            }
        }
        Self::from_bonds(positions.len(), bonds)
    }

    pub fn bond_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn degree(&self, atom: u32) -> usize {
        self.graph.edges(NodeIndex::new(atom as usize)).count()
    }

    /// Bonds incident to `atom`, oriented so that `a == atom`.
    pub fn bonds_of(&self, atom: u32) -> impl Iterator<Item = BondRef> + '_ {
        let node = NodeIndex::new(atom as usize);
        self.graph.edges(node).map(move |edge| {
            let other = if edge.source() == node {
                edge.target()
            } else {
                edge.source()
            };
            BondRef {
                a: atom,
                b: other.index() as u32,
                bond: *edge.weight(),
            }
        })
    }

    pub fn neighbors(&self, atom: u32) -> impl Iterator<Item = u32> + '_ {
        self.bonds_of(atom).map(|r| r.b)
    }

    pub fn bond_between(&self, a: u32, b: u32) -> Option<Bond> {
        self.graph
            .find_edge(NodeIndex::new(a as usize), NodeIndex::new(b as usize))
            .map(|e| self.graph[e])
    }

    /// Every bond once, with `a < b`.
    pub fn iter(&self) -> impl Iterator<Item = BondRef> + '_ {
        self.graph.edge_references().map(|edge| {
            let (a, b) = (edge.source().index() as u32, edge.target().index() as u32);
            BondRef {
                a: a.min(b),
                b: a.max(b),
                bond: *edge.weight(),
            }
        })
    }
}
