use log::debug;
use nalgebra::Point3;

use crate::{
    base::config::RuntimeConfig,
    model::{AtomColumns, Chain, Entity, EntityType, Model, Residue, bonds::Bond, elements},
    utils::error::{MqError, MqResult},
};

/// One data row of the atom table.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomSpec {
    pub id: i64,
    pub type_symbol: String,
    pub label_atom_id: String,
    pub alt_id: Option<char>,
    pub position: Point3<f64>,
    pub b_iso_or_equiv: f64,
    pub occupancy: f64,
}

impl AtomSpec {
    pub fn new(id: i64, type_symbol: &str, label_atom_id: &str, position: [f64; 3]) -> Self {
        Self {
            id,
            type_symbol: elements::normalize(type_symbol),
            label_atom_id: label_atom_id.to_string(),
            alt_id: None,
            position: Point3::from(position),
            b_iso_or_equiv: 0.0,
            occupancy: 1.0,
        }
    }

    pub fn alt(mut self, alt_id: char) -> Self {
        self.alt_id = Some(alt_id);
        self
    }

    pub fn b_factor(mut self, value: f64) -> Self {
        self.b_iso_or_equiv = value;
        self
    }

    pub fn occupancy(mut self, value: f64) -> Self {
        self.occupancy = value;
        self
    }
}

/// Incremental construction of a [`Model`], in hierarchy order.
///
/// Every chain belongs to the last entity declared, every residue to the last
/// chain and every atom to the last residue. Structural mistakes are reported
/// by [`ModelBuilder::build`].
#[derive(Debug, Default)]
pub struct ModelBuilder {
    entities: Vec<Entity>,
    chains: Vec<Chain>,
    residues: Vec<Residue>,
    columns: AtomColumns,
    atom_rows: Vec<u32>,
    positions: Vec<Point3<f64>>,
    bonds: Option<Vec<(u32, u32, Bond)>>,
    config: RuntimeConfig,
    error: Option<String>,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: RuntimeConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Builder configured from the file at [`RuntimeConfig::default_path`],
    /// or with the defaults when there is none.
    pub fn from_env() -> MqResult<Self> {
        Ok(Self::with_config(RuntimeConfig::load_or_default()?))
    }

    fn fail(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    pub fn entity(&mut self, id: &str, entity_type: EntityType) -> &mut Self {
        let start = self.chains.len();
        self.entities.push(Entity {
            id: id.to_string(),
            entity_type,
            chains: start..start,
        });
        self
    }

    pub fn chain(&mut self, label_asym_id: &str, auth_asym_id: &str) -> &mut Self {
        let Some(entity) = self.entities.len().checked_sub(1) else {
            self.fail(format!("chain `{label_asym_id}` declared before any entity"));
            return self;
        };

        let start = self.residues.len();
        self.chains.push(Chain {
            label_asym_id: label_asym_id.to_string(),
            auth_asym_id: auth_asym_id.to_string(),
            entity,
            residues: start..start,
        });
        self.entities[entity].chains.end = self.chains.len();
        self
    }

    pub fn residue(&mut self, label_comp_id: &str, label_seq_id: i32, auth_seq_id: i32) -> &mut Self {
        let Some(chain) = self.chains.len().checked_sub(1) else {
            self.fail(format!("residue `{label_comp_id}` declared before any chain"));
            return self;
        };

        let start = self.atom_rows.len();
        self.residues.push(Residue {
            label_comp_id: label_comp_id.to_string(),
            label_seq_id,
            auth_seq_id,
            chain,
            atoms: start..start,
        });
        self.chains[chain].residues.end = self.residues.len();
        self
    }

    /// Append a data row. Alternate locations after the first one of the same
    /// atom name in the current residue are kept as rows but do not become atoms.
    pub fn atom(&mut self, spec: AtomSpec) -> &mut Self {
        let Some(residue) = self.residues.len().checked_sub(1) else {
            self.fail(format!("atom {} declared before any residue", spec.id));
            return self;
        };
        if !spec.position.coords.iter().all(|c| c.is_finite()) {
            self.fail(format!("atom {} has a non-finite position", spec.id));
            return self;
        }

        let row = self.columns.len() as u32;
        let is_alternate = spec.alt_id.is_some()
            && self.residues[residue]
                .atoms
                .clone()
                .any(|a| self.columns.label_atom_id[self.atom_rows[a] as usize] == spec.label_atom_id);

        self.columns.id.push(spec.id);
        self.columns.type_symbol.push(spec.type_symbol);
        self.columns.label_atom_id.push(spec.label_atom_id);
        self.columns.label_alt_id.push(spec.alt_id);
        self.columns.b_iso_or_equiv.push(spec.b_iso_or_equiv);
        self.columns.occupancy.push(spec.occupancy);

        if !is_alternate {
            self.atom_rows.push(row);
            self.positions.push(spec.position);
            self.residues[residue].atoms.end = self.atom_rows.len();
        }
        self
    }

    /// Declare an explicit bond between two atom indices. Once any bond is
    /// declared, bonds are no longer inferred from distances.
    pub fn bond(&mut self, a: u32, b: u32, bond: Bond) -> &mut Self {
        self.bonds.get_or_insert_with(Vec::new).push((a, b, bond));
        self
    }

    pub fn build(self) -> MqResult<Model> {
        if let Some(error) = self.error {
            return Err(MqError::InvalidModel(error));
        }

        let atom_count = self.atom_rows.len();
        if let Some(bonds) = &self.bonds {
            if let Some((a, b, _)) = bonds
                .iter()
                .find(|(a, b, _)| *a as usize >= atom_count || *b as usize >= atom_count)
            {
                return Err(MqError::InvalidModel(format!(
                    "bond {a}-{b} references an atom outside 0..{atom_count}"
                )));
            }
        }

        debug!(
            "Built model: {} entities, {} chains, {} residues, {} atoms ({} rows)",
            self.entities.len(),
            self.chains.len(),
            self.residues.len(),
            atom_count,
            self.columns.len()
        );
        Ok(Model::from_parts(
            self.entities,
            self.chains,
            self.residues,
            self.columns,
            self.atom_rows,
            self.positions,
            self.bonds,
            self.config,
        ))
    }
}
