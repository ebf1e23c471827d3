use std::rc::Rc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use mqcore::{
    atoms::Mask,
    model::{
        EntityType, Model,
        builder::{AtomSpec, ModelBuilder},
    },
    query::Query,
};
use mqlisp::expression::Expression;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const NAMES: [&str; 8] = ["N", "CA", "C", "O", "CB", "CG", "CD", "NE"];

/// A chain of `residues` residues of random size, laid out along a noisy helix.
fn build_model(residues: usize) -> Model {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    let mut builder = ModelBuilder::new();
    builder.entity("1", EntityType::Polymer).chain("A", "A");

    let mut id = 1;
    for r in 0..residues {
        let comp_id = ["ALA", "GLY", "LYS", "ARG"][rng.random_range(0..4)];
        builder.residue(comp_id, r as i32 + 1, r as i32 + 1);
        for name in &NAMES[..rng.random_range(4..=NAMES.len())] {
            let t = id as f64 * 0.4;
            let position = [
                8.0 * t.cos() + rng.random_range(-0.3..0.3),
                8.0 * t.sin() + rng.random_range(-0.3..0.3),
                0.5 * t,
            ];
            builder.atom(AtomSpec::new(id, &name[..1], name, position));
            id += 1;
        }
    }
    builder.build().unwrap_or_else(|e| panic!("benchmark model is valid: {e}"))
}

fn property(name: &str) -> Expression {
    Expression::symbol(format!("structure-query.atom-property.macromolecular.{name}"))
}

fn bench_atom_groups(c: &mut Criterion) {
    let model = Rc::new(build_model(2_000));

    let flat = Query::compile(&Expression::symbol("structure-query.generator.atom-groups")).unwrap();
    let by_residue = Query::compile(&Expression::apply_named(
        "structure-query.generator.atom-groups",
        [
            (
                "residue-test",
                Expression::apply("core.rel.eq", [property("label_comp_id"), Expression::from("LYS")]),
            ),
            ("group-by", property("residue-key")),
        ],
    ))
    .unwrap();
    let surroundings = Query::compile(&Expression::apply_named(
        "structure-query.modifier.include-surroundings",
        [
            ("0", Expression::symbol("structure-query.generator.atom-groups")),
            ("radius", Expression::from(3.0)),
        ],
    ))
    .unwrap();

    c.bench_function("atom_groups_flat", |b| {
        b.iter(|| black_box(flat.execute_selection(&model).unwrap()))
    });
    c.bench_function("atom_groups_by_residue", |b| {
        b.iter(|| black_box(by_residue.execute_selection(&model).unwrap()))
    });
    c.bench_function("include_surroundings", |b| {
        b.iter(|| black_box(surroundings.execute_selection(&model).unwrap()))
    });
}

fn bench_masks(c: &mut Criterion) {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    let sparse: Vec<u32> = (0..500).map(|_| rng.random_range(0..100_000)).collect();
    let dense: Vec<u32> = (0..50_000).map(|_| rng.random_range(0..100_000)).collect();

    c.bench_function("mask_sparse", |b| {
        b.iter(|| black_box(Mask::from_indices(sparse.iter().copied(), 1.0 / 12.0)))
    });
    c.bench_function("mask_dense", |b| {
        b.iter(|| black_box(Mask::from_indices(dense.iter().copied(), 1.0 / 12.0)))
    });
}

criterion_group!(benches, bench_atom_groups, bench_masks);
criterion_main!(benches);
