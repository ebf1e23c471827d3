//! Read-only molecular model.
//!
//! The model is a four-level hierarchy (entity, chain, residue, atom) stored as
//! tables with contiguous index ranges, plus atom-level columns. Columns are
//! indexed by *data row*: the reader keeps every row of the input, including
//! alternate locations, while only one row per physical atom becomes an atom.
//! [`Model::row_of`] maps an atom index to its data row.
//!
//! Derived structures (bond graph, spatial lookup, rings, connected components,
//! residue index of each atom) are computed on first request and memoized.
use std::ops::Range;

use log::debug;
use nalgebra::Point3;
use once_cell::unsync::OnceCell;
use petgraph::unionfind::UnionFind;
use strum::{Display, EnumIs, EnumString};

use crate::base::config::RuntimeConfig;

pub mod bonds;
pub mod builder;
pub mod elements;
pub mod lookup;
pub mod rings;

use bonds::{Bond, BondGraph};
use lookup::GridLookup;
use rings::RingCollection;

/// Kind of a molecular entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIs)]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum EntityType {
    Polymer,
    NonPolymer,
    Branched,
    Water,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: String,
    pub entity_type: EntityType,
    pub chains: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    pub label_asym_id: String,
    pub auth_asym_id: String,
    pub entity: usize,
    pub residues: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Residue {
    pub label_comp_id: String,
    pub label_seq_id: i32,
    pub auth_seq_id: i32,
    pub chain: usize,
    pub atoms: Range<usize>,
}

/// Atom-level columns, indexed by data row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtomColumns {
    pub id: Vec<i64>,
    pub type_symbol: Vec<String>,
    pub label_atom_id: Vec<String>,
    pub label_alt_id: Vec<Option<char>>,
    pub b_iso_or_equiv: Vec<f64>,
    pub occupancy: Vec<f64>,
}

impl AtomColumns {
    pub fn len(&self) -> usize {
        self.id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
    }
}

#[derive(Debug)]
pub struct Model {
    pub(crate) entities: Vec<Entity>,
    pub(crate) chains: Vec<Chain>,
    pub(crate) residues: Vec<Residue>,
    pub(crate) columns: AtomColumns,
    pub(crate) atom_rows: Vec<u32>,
    pub(crate) positions: Vec<Point3<f64>>,
    pub(crate) explicit_bonds: Option<Vec<(u32, u32, Bond)>>,
    pub(crate) config: RuntimeConfig,

    residue_index: OnceCell<Vec<u32>>,
    lookup: OnceCell<GridLookup>,
    bonds: OnceCell<BondGraph>,
    rings: OnceCell<RingCollection>,
    components: OnceCell<Vec<u32>>,
}

impl Model {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        entities: Vec<Entity>,
        chains: Vec<Chain>,
        residues: Vec<Residue>,
        columns: AtomColumns,
        atom_rows: Vec<u32>,
        positions: Vec<Point3<f64>>,
        explicit_bonds: Option<Vec<(u32, u32, Bond)>>,
        config: RuntimeConfig,
    ) -> Self {
        Self {
            entities,
            chains,
            residues,
            columns,
            atom_rows,
            positions,
            explicit_bonds,
            config,
            residue_index: OnceCell::new(),
            lookup: OnceCell::new(),
            bonds: OnceCell::new(),
            rings: OnceCell::new(),
            components: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn atom_count(&self) -> usize {
        self.atom_rows.len()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn residues(&self) -> &[Residue] {
        &self.residues
    }

    pub fn columns(&self) -> &AtomColumns {
        &self.columns
    }

    /// Data row of an atom.
    pub fn row_of(&self, atom: u32) -> usize {
        self.atom_rows[atom as usize] as usize
    }

    pub fn position(&self, atom: u32) -> &Point3<f64> {
        &self.positions[atom as usize]
    }

    pub fn positions(&self) -> &[Point3<f64>] {
        &self.positions
    }

    pub fn element(&self, atom: u32) -> &str {
        &self.columns.type_symbol[self.row_of(atom)]
    }

    pub fn atom_name(&self, atom: u32) -> &str {
        &self.columns.label_atom_id[self.row_of(atom)]
    }

    /// Residue containing `atom`.
    pub fn residue_of(&self, atom: u32) -> usize {
        let index = self.residue_index.get_or_init(|| {
            let mut index = vec![0u32; self.atom_count()];
            for (r, residue) in self.residues.iter().enumerate() {
                for atom in residue.atoms.clone() {
                    index[atom] = r as u32;
                }
            }
            index
        });
        index[atom as usize] as usize
    }

    pub fn chain_of(&self, atom: u32) -> usize {
        self.residues[self.residue_of(atom)].chain
    }

    pub fn entity_of(&self, atom: u32) -> usize {
        self.chains[self.chain_of(atom)].entity
    }

    /// First atom of an entity, if it has any.
    pub fn first_atom_of_entity(&self, entity: usize) -> Option<u32> {
        let chains = &self.entities[entity].chains;
        self.chains[chains.clone()]
            .iter()
            .find_map(|c| self.first_atom_of_residues(c.residues.clone()))
    }

    pub fn first_atom_of_chain(&self, chain: usize) -> Option<u32> {
        self.first_atom_of_residues(self.chains[chain].residues.clone())
    }

    fn first_atom_of_residues(&self, residues: Range<usize>) -> Option<u32> {
        self.residues[residues]
            .iter()
            .find(|r| !r.atoms.is_empty())
            .map(|r| r.atoms.start as u32)
    }

    /// Spatial grid over atom positions.
    pub fn lookup(&self) -> &GridLookup {
        self.lookup.get_or_init(|| {
            let lookup = GridLookup::from_points(&self.positions, self.config.lookup_cell_size);
            debug!(
                "Built spatial lookup over {} atoms ({} cells)",
                lookup.len(),
                lookup.cell_count()
            );
            lookup
        })
    }

    /// Bond graph: the explicit bonds of the input when present, inferred
    /// from covalent radii otherwise.
    pub fn bonds(&self) -> &BondGraph {
        self.bonds.get_or_init(|| {
            let graph = match &self.explicit_bonds {
                Some(bonds) => BondGraph::from_bonds(self.atom_count(), bonds.iter().copied()),
                None => {
                    let symbols: Vec<&str> =
                        (0..self.atom_count() as u32).map(|a| self.element(a)).collect();
                    BondGraph::infer(
                        &self.positions,
                        &symbols,
                        self.lookup(),
                        self.config.bond_tolerance,
                    )
                }
            };
            debug!("Computed bond graph with {} bonds", graph.bond_count());
            graph
        })
    }

    pub fn rings(&self) -> &RingCollection {
        self.rings.get_or_init(|| {
            let rings =
                RingCollection::find(self.bonds(), |a| self.element(a), self.config.max_ring_size);
            debug!("Collected {} rings", rings.len());
            rings
        })
    }

    /// Connected component label of `atom`: the smallest atom index of its
    /// component.
    pub fn component_of(&self, atom: u32) -> u32 {
        let labels = self.components.get_or_init(|| {
            let n = self.atom_count();
            let mut union_find = UnionFind::<u32>::new(n);
            for bond in self.bonds().iter() {
                union_find.union(bond.a, bond.b);
            }

            let mut smallest: Vec<u32> = (0..n as u32).collect();
            for a in 0..n as u32 {
                let root = union_find.find(a) as usize;
                smallest[root] = smallest[root].min(a);
            }
            (0..n as u32)
                .map(|a| smallest[union_find.find(a) as usize])
                .collect()
        });
        labels[atom as usize]
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::tests_utils::{peptide, water_box};

    #[test]
    fn entity_types_use_kebab_case() {
        assert_eq!(EntityType::NonPolymer.to_string(), "non-polymer");
        assert_eq!(EntityType::from_str("Non-Polymer").unwrap(), EntityType::NonPolymer);
        assert!(EntityType::from_str("solvent").is_err());
    }

    #[test]
    fn hierarchy_lookups_agree() {
        let model = peptide();
        for (r, residue) in model.residues().iter().enumerate() {
            for atom in residue.atoms.clone() {
                assert_eq!(model.residue_of(atom as u32), r);
                assert_eq!(model.chain_of(atom as u32), residue.chain);
            }
        }
        assert_eq!(model.first_atom_of_entity(0), Some(0));
    }

    #[test]
    fn components_of_separate_waters() {
        let model = water_box(3);
        // Each water is O, H, H.
        assert_eq!(model.component_of(0), 0);
        assert_eq!(model.component_of(2), 0);
        assert_eq!(model.component_of(3), 3);
        assert_eq!(model.component_of(8), 6);
    }
}
