use std::rc::Rc;

use mqcore::{
    library::{ATOM_SELECTION, library},
    query::Query,
    runtime::{Environment, SlotKind, Value},
    tests_utils::{peptide, water_box},
    utils::error::MqError,
};
use mqlisp::{
    expression::{Args, Expression},
    types::{CORE_NAMESPACE, Type},
    utils::Error,
    wire::ExpressionDocument,
};

fn num(x: f64) -> Expression {
    Expression::from(x)
}

fn residues() -> Expression {
    Expression::apply_named(
        "structure-query.generator.atom-groups",
        [(
            "group-by",
            Expression::symbol("structure-query.atom-property.macromolecular.residue-key"),
        )],
    )
}

fn pick(test: Expression) -> Expression {
    Expression::apply_named("structure-query.filter.pick", [("0", residues()), ("test", test)])
}

fn reduce(initial: Expression, value: Expression) -> Expression {
    Expression::apply_named(
        "structure-query.atom-set.reduce",
        [("initial", initial), ("value", value)],
    )
}

fn lang_error(err: MqError) -> Error {
    match err {
        MqError::Lang(err) => err,
        other => panic!("expected a language error, found {other}"),
    }
}

#[test]
fn nested_iteration_over_the_same_slot_fails() {
    let model = Rc::new(peptide());
    let nested = reduce(num(0.0), reduce(num(0.0), num(1.0)));
    let query = Query::compile(&pick(Expression::apply("core.rel.gr", [nested, num(0.0)]))).unwrap();

    let mut env = Environment::for_model(model).unwrap();
    let err = lang_error(query.execute_with(&mut env).unwrap_err());
    assert_eq!(err, Error::SlotLocked { slot: "atom" });

    // Every guard was dropped while the error unwound.
    for kind in [SlotKind::Atom, SlotKind::AtomSet, SlotKind::Bond, SlotKind::Accumulator] {
        assert!(!env.slots().is_locked(kind), "{kind:?} still locked");
    }
    assert!(query.execute_with(&mut env).unwrap_err().to_string().contains("already locked"));
}

#[test]
fn sibling_iterations_reuse_a_slot() {
    let model = Rc::new(peptide());
    let atoms = reduce(
        num(0.0),
        Expression::apply(
            "core.math.add",
            [Expression::symbol("structure-query.slot.accumulator"), num(1.0)],
        ),
    );
    // Two reductions side by side lock the same slots one after the other.
    let test = Expression::apply(
        "core.rel.eq",
        [atoms.clone(), Expression::symbol("structure-query.atom-set.atom-count")],
    );
    let both = Expression::apply("core.logic.and", [test, Expression::apply("core.rel.gr", [atoms, num(0.0)])]);
    let selection = Query::compile(&pick(both)).unwrap().execute_selection(&model).unwrap();
    assert_eq!(selection.len(), model.residues().len());
}

#[test]
fn properties_need_an_iteration() {
    let model = Rc::new(peptide());
    let id = Expression::symbol("structure-query.atom-property.macromolecular.id");
    let err = lang_error(Query::compile(&id).unwrap().execute(&model).unwrap_err());
    assert!(err.is_slot_empty());

    let order = Expression::symbol("structure-query.bond-property.order");
    let err = lang_error(Query::compile(&order).unwrap().execute(&model).unwrap_err());
    assert_eq!(err, Error::SlotEmpty { slot: "bond" });
}

#[test]
fn constant_queries_fold() {
    let model = Rc::new(water_box(2));
    let arithmetic = Expression::apply(
        "core.math.add",
        [num(1.0), Expression::apply("core.math.mult", [num(2.0), num(3.0)])],
    );
    let query = Query::compile(&arithmetic).unwrap();
    assert!(query.is_const());
    assert_eq!(query.result_type(), &Type::NUM);
    assert_eq!(query.execute(&model).unwrap(), Value::Num(7.0));

    let selection = Query::compile(&residues()).unwrap();
    assert!(!selection.is_const());
}

#[test]
fn folding_errors_surface_at_compile_time() {
    let expr = Expression::apply("core.type.num", [Expression::from("twelve")]);
    let err = lang_error(Query::compile(&expr).unwrap_err());
    assert!(err.is_invalid_argument());
}

#[test]
fn checker_rejects_ill_typed_queries() {
    let not_a_selection = Expression::apply("structure-query.filter.first", [num(1.0)]);
    assert!(lang_error(Query::compile(&not_a_selection).unwrap_err()).is_type_mismatch());

    let unknown = Expression::symbol("structure-query.generator.everything");
    assert!(lang_error(Query::compile(&unknown).unwrap_err()).is_unknown_symbol());

    let number = Expression::apply("core.math.add", [num(1.0), num(2.0)]);
    assert!(lang_error(Query::compile_selection(&number).unwrap_err()).is_result_type_mismatch());
}

#[test]
fn dynamic_heads_resolve_at_call_time() {
    let model = Rc::new(water_box(1));
    let dispatch = |choose_add: bool| {
        Expression::apply_dynamic(
            Expression::apply(
                "core.ctrl.if",
                [
                    Expression::from(choose_add),
                    Expression::from("core.math.add"),
                    Expression::from("core.math.mult"),
                ],
            ),
            Some(Args::List(vec![num(2.0), num(3.0)])),
        )
    };

    let add = Query::compile(&dispatch(true)).unwrap();
    assert_eq!(add.result_type(), &Type::Any);
    assert_eq!(add.execute(&model).unwrap(), Value::Num(5.0));
    assert_eq!(Query::compile(&dispatch(false)).unwrap().execute(&model).unwrap(), Value::Num(6.0));

    let missing = Expression::apply_dynamic(
        Expression::apply("core.str.concat", [Expression::from("core.math."), Expression::from("nope")]),
        None,
    );
    let err = lang_error(Query::compile(&missing).unwrap().execute(&model).unwrap_err());
    assert!(err.is_symbol_not_found());

    let numeric = Expression::apply_dynamic(Expression::apply("core.math.abs", [num(-1.0)]), None);
    let err = lang_error(Query::compile(&numeric).unwrap().execute(&model).unwrap_err());
    assert!(err.is_not_a_symbol());
}

#[test]
fn dynamic_heads_receive_argument_defaults() {
    let model = Rc::new(peptide());
    let args = || {
        Args::Dictionary(
            [
                ("0", Expression::symbol("structure-query.generator.atom-groups")),
                ("target", Expression::symbol("structure-query.generator.atom-groups")),
                ("max-radius", num(2.0)),
            ]
            .into_iter()
            .map(|(k, e)| (k.to_string(), e))
            .collect(),
        )
    };
    let head = Expression::apply("core.type.str", [Expression::from("structure-query.filter.within")]);

    let dynamic = Query::compile(&Expression::apply_dynamic(head, Some(args())))
        .unwrap()
        .execute(&model)
        .unwrap()
        .into_selection()
        .unwrap();
    let direct = Query::compile_selection(&Expression::apply_dynamic(
        Expression::from("structure-query.filter.within"),
        Some(args()),
    ))
    .unwrap()
    .execute_selection(&model)
    .unwrap();
    assert_eq!(dynamic, direct);
    assert_eq!(dynamic.len(), model.atom_count());
}

#[test]
fn function_values_evaluate_in_the_caller_context() {
    let model = Rc::new(peptide());
    let size = Expression::apply(
        "core.ctrl.eval",
        [Expression::apply(
            "core.ctrl.fn",
            [Expression::symbol("structure-query.atom-set.atom-count")],
        )],
    );
    let selection = Query::compile(&pick(Expression::apply("core.rel.gr", [size, num(6.0)])))
        .unwrap()
        .execute_selection(&model)
        .unwrap();
    assert_eq!(selection.iter().map(|s| s.len()).collect::<Vec<_>>(), vec![11, 9]);
}

#[test]
fn documents_compile_like_expressions() {
    let model = Rc::new(peptide());
    let expr = pick(Expression::apply(
        "core.rel.gr",
        [Expression::symbol("structure-query.atom-set.atom-count"), num(6.0)],
    ));
    let json = ExpressionDocument::new(expr.clone())
        .with_source("residues with more than six atoms")
        .to_json()
        .unwrap();

    let from_json = Query::from_json(&json).unwrap().execute_selection(&model).unwrap();
    let direct = Query::compile(&expr).unwrap().execute_selection(&model).unwrap();
    assert_eq!(from_json, direct);

    let future = r#"{"version":"1.0.0","expression":true}"#;
    assert!(lang_error(Query::from_json(future).unwrap_err()).is_incompatible_version());
}

/// Whether a runtime value inhabits `ty`.
fn inhabits(value: &Value, ty: &Type) -> bool {
    match ty {
        Type::Any => true,
        Type::AnyValue => matches!(value, Value::Bool(_) | Value::Num(_) | Value::Str(_)),
        Type::Value { namespace, name } if *namespace == CORE_NAMESPACE => {
            value.kind() == *name
        }
        Type::Value { name, .. } if ty == &ATOM_SELECTION => value.kind() == *name,
        Type::Value { .. } => value.is_str() || value.is_atom_set(),
        Type::Container { name, child, .. } => match (*name, value) {
            ("List", Value::List(items)) => items.iter().all(|item| inhabits(item, child)),
            ("Set", Value::Set(items)) => items.iter().all(|key| inhabits(&key.to_value(), child)),
            ("Fn", Value::Fn(_)) => true,
            _ => false,
        },
        Type::Union(members) => members.iter().any(|member| inhabits(value, member)),
        Type::Variable { bound, .. } => inhabits(value, bound),
    }
}

#[test]
fn inferred_types_describe_runtime_values() {
    let model = Rc::new(peptide());
    let queries = [
        residues(),
        Expression::apply("core.type.list", [num(1.0), num(2.0)]),
        Expression::apply("core.type.set", [Expression::from("CA"), Expression::from("CB")]),
        Expression::apply("core.ctrl.if", [Expression::from(false), num(1.0), Expression::from("one")]),
        Expression::apply("structure-query.type.element-symbol", [Expression::from("fe")]),
        Expression::apply("structure-query.type.entity-type", [Expression::from("WATER")]),
        Expression::apply("core.ctrl.fn", [num(1.0)]),
        Expression::apply("core.str.concat", [Expression::from("A"), num(1.0), Expression::from(true)]),
        Expression::apply("structure-query.modifier.union", [residues()]),
        Expression::symbol("structure-query.generator.rings"),
        pick(Expression::from(true)),
    ];

    for expr in &queries {
        let query = Query::compile(expr).unwrap();
        let value = query.execute(&model).unwrap();
        assert!(
            inhabits(&value, query.result_type()),
            "`{expr}` produced {} for type {}",
            value.kind(),
            query.result_type()
        );
    }
}

#[test]
fn every_symbol_resolves_to_an_implementation() {
    let library = library().unwrap();
    assert!(library.symbols().len() > 70);
    for (symbol_ref, symbol) in library.symbols().iter() {
        assert!(!symbol.name.contains('.'), "`{}`", symbol.id);
        let (resolved, _) = library.resolve(&symbol.id).unwrap();
        assert_eq!(resolved, symbol_ref);
    }
}
