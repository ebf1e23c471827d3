use mqlisp::{
    expression::{Args, Expression, Literal},
    wire::ExpressionDocument,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

const HEADS: [&str; 5] = [
    "core.math.add",
    "core.rel.eq",
    "structure-query.filter.pick",
    "structure-query.generator.atom-groups",
    "structure-query.atom-property.macromolecular.label_comp_id",
];

/// Any finite double, drawn from its bit pattern.
fn random_finite(rng: &mut impl Rng) -> f64 {
    loop {
        let value = f64::from_bits(rng.random());
        if value.is_finite() {
            return value;
        }
    }
}

fn random_expression(budget: usize, rng: &mut impl Rng) -> Expression {
    if budget == 0 || rng.random_bool(0.3) {
        return match rng.random_range(0..=2) {
            0 => Expression::from(rng.random_bool(0.5)),
            1 => Expression::from(random_finite(rng)),
            _ => Expression::from(format!("s{}", rng.random_range(0..100))),
        };
    }

    let head = HEADS[rng.random_range(0..HEADS.len())];
    let arity = rng.random_range(0..4);
    match rng.random_range(0..=3) {
        0 => Expression::symbol(head),
        1 => Expression::apply(head, (0..arity).map(|_| random_expression(budget - 1, rng))),
        2 => Expression::apply_named(
            head,
            (0..arity).map(|i| {
                let key = if i == 0 { "0".to_string() } else { format!("arg-{i}") };
                (key, random_expression(budget - 1, rng))
            }),
        ),
        _ => Expression::apply_dynamic(
            random_expression(budget - 1, rng),
            Some(Args::List(
                (0..arity).map(|_| random_expression(budget - 1, rng)).collect(),
            )),
        ),
    }
}

#[test]
fn random_documents_survive_json() {
    let mut rng = ChaCha20Rng::seed_from_u64(0x42);
    for _ in 0..200 {
        let expr = random_expression(5, &mut rng);
        let document = ExpressionDocument::new(expr.clone()).with_source(expr.to_string());
        let json = document.to_json().unwrap();
        let decoded = ExpressionDocument::from_json(&json).unwrap();
        assert_eq!(decoded, document, "round trip changed {json}");
    }
}

#[test]
fn numbers_survive_json_bit_for_bit() {
    let mut rng = ChaCha20Rng::seed_from_u64(0xf10a7);
    let numbers = (0..2_000)
        .map(|_| random_finite(&mut rng))
        .chain((0..2_000).map(|i| i as f64 * 0.001 + 0.1 * 0.2))
        .chain([0.0, f64::MIN_POSITIVE, f64::MAX, f64::MIN, 5e-324]);
    for value in numbers {
        let document = ExpressionDocument::new(Expression::apply("core.math.add", [value.into()]));
        let decoded = ExpressionDocument::from_json(&document.to_json().unwrap()).unwrap();
        let Expression::Apply(apply) = &decoded.expression else {
            panic!("decoded a literal for {value:e}");
        };
        let Some(Args::List(items)) = &apply.args else {
            panic!("lost the arguments of {value:e}");
        };
        match &items[0] {
            Expression::Literal(Literal::Number(n)) => {
                assert_eq!(n.to_bits(), value.to_bits(), "{value:e} came back as {n:e}")
            }
            other => panic!("{value:e} came back as {other:?}"),
        }
    }
}

#[test]
fn pretty_and_compact_forms_decode_identically() {
    let mut rng = ChaCha20Rng::seed_from_u64(7);
    let document = ExpressionDocument::new(random_expression(4, &mut rng));
    let compact = ExpressionDocument::from_json(&document.to_json().unwrap()).unwrap();
    let pretty = ExpressionDocument::from_json(&document.to_json_pretty().unwrap()).unwrap();
    assert_eq!(compact, pretty);
}

#[test]
fn hand_written_document_decodes() {
    let json = r#"{
        "version": "0.1.0",
        "expression": {
            "head": "structure-query.generator.atom-groups",
            "args": {
                "residue-test": {
                    "head": "core.rel.eq",
                    "args": [
                        { "head": "structure-query.atom-property.macromolecular.label_comp_id" },
                        "ALA"
                    ]
                }
            }
        }
    }"#;
    let document = ExpressionDocument::from_json(json).unwrap();
    assert_eq!(
        document.expression,
        Expression::apply_named(
            "structure-query.generator.atom-groups",
            [(
                "residue-test",
                Expression::apply(
                    "core.rel.eq",
                    [
                        Expression::symbol("structure-query.atom-property.macromolecular.label_comp_id"),
                        "ALA".into()
                    ]
                )
            )]
        )
    );
}
