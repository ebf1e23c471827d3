use std::rc::Rc;

use mqcore::{
    atoms::AtomSelection,
    model::Model,
    query::Query,
    tests_utils::{peptide, peptide_atom_count},
};
use mqlisp::expression::Expression;

fn num(x: f64) -> Expression {
    Expression::from(x)
}

fn macromolecular(name: &str) -> Expression {
    Expression::symbol(format!("structure-query.atom-property.macromolecular.{name}"))
}

fn eq(a: Expression, b: Expression) -> Expression {
    Expression::apply("core.rel.eq", [a, b])
}

fn groups(args: Vec<(&str, Expression)>) -> Expression {
    Expression::apply_named("structure-query.generator.atom-groups", args)
}

fn residues() -> Expression {
    groups(vec![("group-by", macromolecular("residue-key"))])
}

fn chain_a_residues() -> Expression {
    groups(vec![
        ("chain-test", eq(macromolecular("label_asym_id"), Expression::from("A"))),
        ("group-by", macromolecular("residue-key")),
    ])
}

/// One singleton per atom whose id lies in `[lo, hi]`.
fn ids(lo: f64, hi: f64) -> Expression {
    groups(vec![(
        "atom-test",
        Expression::apply("core.rel.in-range", [macromolecular("id"), num(lo), num(hi)]),
    )])
}

fn waters() -> Expression {
    groups(vec![(
        "chain-test",
        eq(macromolecular("label_asym_id"), Expression::from("W")),
    )])
}

fn run(expr: &Expression, model: &Rc<Model>) -> Rc<AtomSelection> {
    Query::compile_selection(expr)
        .unwrap_or_else(|e| panic!("`{expr}` should compile: {e}"))
        .execute_selection(model)
        .unwrap_or_else(|e| panic!("`{expr}` should run: {e}"))
}

fn index_sets(selection: &AtomSelection) -> Vec<Vec<u32>> {
    selection.iter().map(|s| s.indices().to_vec()).collect()
}

fn range(lo: u32, hi: u32) -> Vec<u32> {
    (lo..=hi).collect()
}

#[test]
fn pick_residues_with_more_than_six_atoms() {
    let model = Rc::new(peptide());
    let expr = Expression::apply_named(
        "structure-query.filter.pick",
        [
            ("0", residues()),
            (
                "test",
                Expression::apply(
                    "core.rel.gr",
                    [Expression::symbol("structure-query.atom-set.atom-count"), num(6.0)],
                ),
            ),
        ],
    );
    let selection = run(&expr, &model);
    assert_eq!(index_sets(&selection), vec![range(20, 30), range(36, 44)]);
}

#[test]
fn intersect_of_id_ranges() {
    let model = Rc::new(peptide());
    let expr = Expression::apply(
        "structure-query.combinator.intersect",
        [ids(10.0, 20.0), ids(15.0, 30.0)],
    );
    let selection = run(&expr, &model);
    assert_eq!(selection.len(), 6);
    assert_eq!(selection.to_indices(), range(14, 19));
}

#[test]
fn merge_removes_duplicate_sets() {
    let model = Rc::new(peptide());
    let expr = Expression::apply(
        "structure-query.combinator.merge",
        [ids(1.0, 3.0), ids(2.0, 4.0)],
    );
    let selection = run(&expr, &model);
    assert_eq!(index_sets(&selection), vec![vec![0], vec![1], vec![2], vec![3]]);
}

#[test]
fn first_keeps_one_set() {
    let model = Rc::new(peptide());
    let expr = Expression::apply("structure-query.filter.first", [residues()]);
    assert_eq!(index_sets(&run(&expr, &model)), vec![range(0, 4)]);

    let none = Expression::apply(
        "structure-query.filter.first",
        [Expression::symbol("structure-query.generator.empty")],
    );
    assert!(run(&none, &model).is_empty());
}

fn cluster(args: Vec<(&str, Expression)>) -> Expression {
    let mut all = vec![("0", waters())];
    all.extend(args);
    Expression::apply_named("structure-query.modifier.cluster", all)
}

#[test]
fn cluster_honours_distance_bounds() {
    let model = Rc::new(peptide());
    // Waters sit 10 Å apart: atoms 51, 52 and 53.
    let near = run(&cluster(vec![("max-distance", num(10.5))]), &model);
    assert_eq!(index_sets(&near), vec![vec![51, 52], vec![52, 53]]);

    let far = run(&cluster(vec![("max-distance", num(25.0))]), &model);
    assert_eq!(
        index_sets(&far),
        vec![vec![51, 52], vec![51, 52, 53], vec![51, 53], vec![52, 53]]
    );

    let ring = run(
        &cluster(vec![("min-distance", num(15.0)), ("max-distance", num(25.0))]),
        &model,
    );
    assert_eq!(index_sets(&ring), vec![vec![51, 53]]);
}

#[test]
fn cluster_honours_size_bounds() {
    let model = Rc::new(peptide());
    let pairs = run(
        &cluster(vec![("max-distance", num(25.0)), ("max-size", num(2.0))]),
        &model,
    );
    assert_eq!(pairs.len(), 3);
    assert!(pairs.iter().all(|s| s.len() == 2));

    let triples = run(
        &cluster(vec![("max-distance", num(25.0)), ("min-size", num(3.0))]),
        &model,
    );
    assert_eq!(index_sets(&triples), vec![vec![51, 52, 53]]);

    let with_singletons = run(
        &cluster(vec![("max-distance", num(5.0)), ("min-size", num(1.0))]),
        &model,
    );
    assert_eq!(index_sets(&with_singletons), vec![vec![51], vec![52], vec![53]]);
}

fn surroundings(radius: f64, whole: bool) -> Expression {
    Expression::apply_named(
        "structure-query.modifier.include-surroundings",
        [
            ("0", ids(1.0, 1.0)),
            ("radius", num(radius)),
            ("as-whole-residues", Expression::from(whole)),
        ],
    )
}

#[test]
fn include_surroundings_by_atom_and_residue() {
    let model = Rc::new(peptide());
    assert_eq!(index_sets(&run(&surroundings(1.5, false), &model)), vec![vec![0, 1]]);
    assert_eq!(index_sets(&run(&surroundings(1.5, true), &model)), vec![range(0, 4)]);
    // Reaches the first atom of the glycine, which pulls in the whole residue.
    assert_eq!(index_sets(&run(&surroundings(7.0, true), &model)), vec![range(0, 8)]);
}

#[test]
fn include_connected_walks_bond_layers() {
    let model = Rc::new(peptide());
    let connected = |args: Vec<(&str, Expression)>| {
        let mut all = vec![("0", ids(1.0, 1.0))];
        all.extend(args);
        Expression::apply_named("structure-query.modifier.include-connected", all)
    };

    assert_eq!(index_sets(&run(&connected(vec![]), &model)), vec![vec![0, 1]]);
    assert_eq!(
        index_sets(&run(&connected(vec![("layer-count", num(2.0))]), &model)),
        vec![vec![0, 1, 2]]
    );
    assert_eq!(
        index_sets(&run(&connected(vec![("bond-test", Expression::from(false))]), &model)),
        vec![vec![0]]
    );
    let single_bonds = connected(vec![(
        "bond-test",
        eq(Expression::symbol("structure-query.bond-property.order"), num(1.0)),
    )]);
    assert_eq!(index_sets(&run(&single_bonds, &model)), vec![vec![0, 1]]);
    assert_eq!(
        index_sets(&run(&connected(vec![("as-whole-residues", Expression::from(true))]), &model)),
        vec![range(0, 8)]
    );
}

#[test]
fn union_by_glues_touched_sets() {
    let model = Rc::new(peptide());
    let by_residue = |source: Expression| {
        Expression::apply_named(
            "structure-query.modifier.union-by",
            [("0", source), ("by", residues())],
        )
    };

    assert_eq!(
        index_sets(&run(&by_residue(ids(5.0, 6.0)), &model)),
        vec![range(0, 4), range(5, 8)]
    );
    let spanning = Expression::apply("structure-query.modifier.union", [ids(5.0, 6.0)]);
    assert_eq!(index_sets(&run(&by_residue(spanning), &model)), vec![range(0, 8)]);
}

#[test]
fn intersect_and_except_by() {
    let model = Rc::new(peptide());
    let intersected = Expression::apply_named(
        "structure-query.modifier.intersect-by",
        [("0", residues()), ("by", ids(4.0, 7.0))],
    );
    assert_eq!(index_sets(&run(&intersected, &model)), vec![vec![3, 4], vec![5, 6]]);

    let excepted = Expression::apply_named(
        "structure-query.modifier.except-by",
        [("0", residues()), ("by", ids(4.0, 7.0))],
    );
    let selection = run(&excepted, &model);
    assert_eq!(selection.len(), model.residues().len());
    assert_eq!(index_sets(&selection)[..2], [vec![0, 1, 2], vec![7, 8]]);
}

#[test]
fn expand_property_broadcasts_values() {
    let model = Rc::new(peptide());
    let expand = |property: &str| {
        Expression::apply_named(
            "structure-query.modifier.expand-property",
            [("0", ids(1.0, 1.0)), ("property", macromolecular(property))],
        )
    };

    assert_eq!(index_sets(&run(&expand("residue-key"), &model)), vec![range(0, 4)]);

    let alanines: Vec<u32> = [range(0, 4), range(9, 13), range(31, 35)].concat();
    assert_eq!(index_sets(&run(&expand("label_comp_id"), &model)), vec![alanines]);
}

#[test]
fn within_radius_of_a_target() {
    let model = Rc::new(peptide());
    let within = |radius: f64, invert: bool| {
        Expression::apply_named(
            "structure-query.filter.within",
            [
                ("0", residues()),
                ("target", ids(1.0, 1.0)),
                ("max-radius", num(radius)),
                ("invert", Expression::from(invert)),
            ],
        )
    };

    assert_eq!(index_sets(&run(&within(3.0, false), &model)), vec![range(0, 4)]);
    assert_eq!(
        index_sets(&run(&within(7.0, false), &model)),
        vec![range(0, 4), range(5, 8)]
    );
    assert_eq!(run(&within(7.0, true), &model).len(), model.residues().len() - 2);
}

#[test]
fn is_connected_to_a_residue() {
    let model = Rc::new(peptide());
    let glycine = groups(vec![
        ("residue-test", eq(macromolecular("label_comp_id"), Expression::from("GLY"))),
        ("group-by", macromolecular("residue-key")),
    ]);
    let connected = |disjunct: bool| {
        Expression::apply_named(
            "structure-query.filter.is-connected-to",
            [
                ("0", residues()),
                ("target", glycine.clone()),
                ("disjunct", Expression::from(disjunct)),
            ],
        )
    };

    assert_eq!(
        index_sets(&run(&connected(true), &model)),
        vec![range(0, 4), range(9, 13)]
    );
    assert_eq!(run(&connected(false), &model).len(), 3);
}

#[test]
fn with_same_atom_properties_as_alanine() {
    let model = Rc::new(peptide());
    let expr = Expression::apply_named(
        "structure-query.filter.with-same-atom-properties",
        [
            ("0", chain_a_residues()),
            ("source", ids(1.0, 5.0)),
            ("property", macromolecular("label_atom_id")),
        ],
    );
    let sizes: Vec<usize> = run(&expr, &model).iter().map(|s| s.len()).collect();
    // ALA, GLY, ALA, ALA: every other residue carries a side-chain atom past CB.
    assert_eq!(sizes, vec![5, 4, 5, 5]);
}

#[test]
fn query_each_runs_inside_every_set() {
    let model = Rc::new(peptide());
    let alpha_carbons = groups(vec![(
        "atom-test",
        eq(
            macromolecular("label_atom_id"),
            Expression::apply("structure-query.type.atom-name", [Expression::from("ca")]),
        ),
    )]);
    let expr = Expression::apply_named(
        "structure-query.modifier.query-each",
        [("0", chain_a_residues()), ("query", alpha_carbons)],
    );
    assert_eq!(
        run(&expr, &model).to_indices(),
        vec![1, 6, 10, 15, 21, 32, 37]
    );
}

#[test]
fn count_query_counts_inside_the_current_set() {
    let model = Rc::new(peptide());
    let oxygens = groups(vec![(
        "atom-test",
        eq(
            Expression::symbol("structure-query.atom-property.core.element-symbol"),
            Expression::apply("structure-query.type.element-symbol", [Expression::from("O")]),
        ),
    )]);
    let expr = Expression::apply_named(
        "structure-query.filter.pick",
        [
            ("0", residues()),
            (
                "test",
                Expression::apply(
                    "core.rel.gre",
                    [
                        Expression::apply("structure-query.atom-set.count-query", [oxygens]),
                        num(2.0),
                    ],
                ),
            ),
        ],
    );
    // Only the serine carries two oxygens.
    assert_eq!(index_sets(&run(&expr, &model)), vec![range(14, 19)]);
}

#[test]
fn reduce_folds_the_atoms_of_a_set() {
    let model = Rc::new(peptide());
    // B-factors of the sample peptide equal atom ids.
    let b_factor_sum = Expression::apply_named(
        "structure-query.atom-set.reduce",
        [
            ("initial", num(0.0)),
            (
                "value",
                Expression::apply(
                    "core.math.add",
                    [
                        Expression::symbol("structure-query.slot.accumulator"),
                        macromolecular("B_iso_or_equiv"),
                    ],
                ),
            ),
        ],
    );
    let expr = Expression::apply_named(
        "structure-query.filter.pick",
        [
            ("0", chain_a_residues()),
            ("test", Expression::apply("core.rel.gr", [b_factor_sum, num(200.0)])),
        ],
    );
    assert_eq!(index_sets(&run(&expr, &model)), vec![range(20, 30), range(36, 44)]);
}

#[test]
fn distance_cluster_pairs_sets_across_selections() {
    let model = Rc::new(peptide());
    let row = |a: f64, b: f64| Expression::apply("core.type.list", [num(a), num(b)]);
    let expr = Expression::apply_named(
        "structure-query.combinator.distance-cluster",
        [
            (
                "matrix",
                Expression::apply("core.type.list", [row(0.0, 10.5), row(9.5, 0.0)]),
            ),
            (
                "selections",
                Expression::apply("core.type.list", [waters(), waters()]),
            ),
        ],
    );
    assert_eq!(index_sets(&run(&expr, &model)), vec![vec![51, 52], vec![52, 53]]);
}

#[test]
fn distance_cluster_rejects_malformed_matrices() {
    let model = Rc::new(peptide());
    let expr = Expression::apply_named(
        "structure-query.combinator.distance-cluster",
        [
            (
                "matrix",
                Expression::apply(
                    "core.type.list",
                    [Expression::apply("core.type.list", [num(0.0), num(1.0)])],
                ),
            ),
            (
                "selections",
                Expression::apply("core.type.list", [waters(), waters()]),
            ),
        ],
    );
    let err = Query::compile_selection(&expr)
        .unwrap()
        .execute_selection(&model)
        .unwrap_err();
    assert!(matches!(
        err,
        mqcore::utils::error::MqError::Lang(mqlisp::utils::Error::InvalidArgument { .. })
    ));
}

#[test]
fn query_in_selection_restricts_generators() {
    let model = Rc::new(peptide());
    let expr = Expression::apply_named(
        "structure-query.generator.query-in-selection",
        [("0", residues()), ("selection", ids(1.0, 7.0))],
    );
    // Residues are cut down to the atoms the restricted view can see.
    assert_eq!(index_sets(&run(&expr, &model)), vec![range(0, 4), vec![5, 6]]);
}

#[test]
fn flat_atom_walk_covers_the_model() {
    let model = Rc::new(peptide());
    let selection = run(&groups(vec![]), &model);
    assert_eq!(selection.to_indices().len(), model.atom_count());
    assert_eq!(model.atom_count(), peptide_atom_count() + 9);
}
