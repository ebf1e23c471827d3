//! Deterministic sample models for tests and benchmarks.
use crate::model::{
    EntityType, Model,
    builder::{AtomSpec, ModelBuilder},
};

/// Residues of the sample peptide with their atom names.
pub const PEPTIDE: &[(&str, &[&str])] = &[
    ("ALA", &["N", "CA", "C", "O", "CB"]),
    ("GLY", &["N", "CA", "C", "O"]),
    ("ALA", &["N", "CA", "C", "O", "CB"]),
    ("SER", &["N", "CA", "C", "O", "CB", "OG"]),
    (
        "PHE",
        &["N", "CA", "C", "O", "CB", "CG", "CD1", "CD2", "CE1", "CE2", "CZ"],
    ),
    ("ALA", &["N", "CA", "C", "O", "CB"]),
    ("LYS", &["N", "CA", "C", "O", "CB", "CG", "CD", "CE", "NZ"]),
];

/// Number of atoms in the sample peptide chain.
pub fn peptide_atom_count() -> usize {
    PEPTIDE.iter().map(|(_, names)| names.len()).sum()
}

fn element_of(atom_name: &str) -> &str {
    &atom_name[..1]
}

/// A seven-residue peptide (chain A), a benzene ligand (chain B) and three
/// isolated waters (chain W).
///
/// Peptide atoms lie on the x axis 1.3 Å apart, so every atom is bonded to its
/// predecessor and successor only. Atom ids start at 1 and follow atom order.
pub fn peptide() -> Model {
    let mut builder = ModelBuilder::new();
    let mut id = 1;

    builder.entity("1", EntityType::Polymer).chain("A", "A");
    for (seq, (comp_id, names)) in PEPTIDE.iter().enumerate() {
        builder.residue(comp_id, seq as i32 + 1, seq as i32 + 101);
        for name in names.iter() {
            let x = (id - 1) as f64 * 1.3;
            builder.atom(AtomSpec::new(id, element_of(name), name, [x, 0.0, 0.0]).b_factor(id as f64));
            id += 1;
        }
    }

    builder
        .entity("2", EntityType::NonPolymer)
        .chain("B", "A")
        .residue("BNZ", 1, 201);
    for (k, [x, y]) in hexagon(1.39).into_iter().enumerate() {
        let name = format!("C{}", k + 1);
        builder.atom(AtomSpec::new(id, "C", &name, [100.0 + x, y, 0.0]));
        id += 1;
    }

    builder.entity("3", EntityType::Water).chain("W", "W");
    for i in 0..3 {
        builder
            .residue("HOH", i + 1, 301 + i)
            .atom(AtomSpec::new(id, "O", "O", [0.0, 50.0 + 10.0 * i as f64, 0.0]).occupancy(0.5));
        id += 1;
    }

    builder.build().unwrap_or_else(|e| panic!("sample peptide is valid: {e}"))
}

/// `n` water molecules 10 Å apart along x.
pub fn water_box(n: usize) -> Model {
    let mut builder = ModelBuilder::new();
    builder.entity("1", EntityType::Water).chain("W", "W");
    for i in 0..n {
        let x = 10.0 * i as f64;
        let base = 3 * i as i64;
        builder
            .residue("HOH", i as i32 + 1, i as i32 + 1)
            .atom(AtomSpec::new(base + 1, "O", "O", [x, 0.0, 0.0]))
            .atom(AtomSpec::new(base + 2, "H", "H1", [x + 0.96, 0.0, 0.0]))
            .atom(AtomSpec::new(base + 3, "H", "H2", [x - 0.24, 0.93, 0.0]));
    }
    builder.build().unwrap_or_else(|e| panic!("sample waters are valid: {e}"))
}

/// A benzene and a pyridine 20 Å apart, as two ligand entities.
pub fn aromatics() -> Model {
    let mut builder = ModelBuilder::new();
    let mut id = 1;
    for (entity, (comp_id, center, ring_elements)) in [
        ("BNZ", 0.0, ["C", "C", "C", "C", "C", "C"]),
        ("PYR", 20.0, ["N", "C", "C", "C", "C", "C"]),
    ]
    .into_iter()
    .enumerate()
    {
        let chain = ["A", "B"][entity];
        builder
            .entity(&(entity + 1).to_string(), EntityType::NonPolymer)
            .chain(chain, chain)
            .residue(comp_id, 1, 1);
        for (k, [x, y]) in hexagon(1.39).into_iter().enumerate() {
            let element = ring_elements[k];
            let name = format!("{element}{}", k + 1);
            builder.atom(AtomSpec::new(id, element, &name, [center + x, y, 0.0]));
            id += 1;
        }
    }
    builder.build().unwrap_or_else(|e| panic!("sample aromatics are valid: {e}"))
}

/// Vertices of a regular hexagon of circumradius `r` centred at the origin.
fn hexagon(r: f64) -> [[f64; 2]; 6] {
    std::array::from_fn(|k| {
        let angle = std::f64::consts::PI / 3.0 * k as f64;
        [r * angle.cos(), r * angle.sin()]
    })
}
