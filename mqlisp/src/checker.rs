//! Unification-based type checker.
//!
//! Checking is a recursive descent over the expression. Every application gets
//! a fresh set of type-variable bindings which is threaded by value through
//! its argument checks: a failed attempt never leaks partial bindings into a
//! sibling attempt.
use std::collections::{BTreeMap, BTreeSet};

use log::trace;

use crate::{
    expression::{Apply, Args, Expression, Literal},
    symbol::{Argument, Arguments, Symbol},
    table::SymbolTable,
    types::Type,
    utils::{Error, Result},
};

/// Type-variable bindings of a single application.
pub type Bindings = BTreeMap<&'static str, Type>;

/// Check `expr` against `table` and verify that its type fits `expected`.
///
/// Returns the inferred type of the expression.
pub fn type_check(table: &SymbolTable, expr: &Expression, expected: &Type) -> Result<Type> {
    let found = infer(table, expr)?;
    match assign(&found, expected, Bindings::new()) {
        Some(_) => {
            trace!("Type checked `{expr}` as `{found}`");
            Ok(found)
        }
        None => Err(Error::ResultTypeMismatch {
            expected: expected.clone(),
            found,
        }),
    }
}

/// Infer the type of `expr`, checking every application on the way.
pub fn infer(table: &SymbolTable, expr: &Expression) -> Result<Type> {
    match expr {
        Expression::Literal(literal) => Ok(literal.type_of()),
        Expression::Apply(Apply { head, args }) => match head.as_ref() {
            Expression::Literal(Literal::String(id)) => {
                let symbol = table
                    .get(id)
                    .ok_or_else(|| Error::UnknownSymbol { id: id.clone() })?;
                let bindings = check_arguments(table, symbol, args.as_ref())?;
                Ok(resolve(&symbol.return_type, &bindings))
            }
            Expression::Literal(other) => Err(Error::UnknownSymbol {
                id: other.to_string(),
            }),
            dynamic => {
                // The symbol is only known at runtime; check the pieces, trust the result.
                infer(table, dynamic)?;
                if let Some(args) = args {
                    for (_, arg) in args.entries() {
                        infer(table, arg)?;
                    }
                }
                Ok(Type::Any)
            }
        },
    }
}

fn check_arguments(table: &SymbolTable, symbol: &Symbol, args: Option<&Args>) -> Result<Bindings> {
    let supplied = args.map_or(0, Args::len);
    match &symbol.arguments {
        Arguments::None => {
            if supplied > 0 {
                return Err(Error::UnexpectedArguments {
                    symbol: symbol.id.clone(),
                    count: supplied,
                });
            }
            Ok(Bindings::new())
        }
        Arguments::List { element, non_empty } => {
            let positional = positional_entries(symbol, args)?;
            if *non_empty && positional.is_empty() {
                return Err(Error::EmptyArgumentList {
                    symbol: symbol.id.clone(),
                });
            }

            positional
                .into_iter()
                .try_fold(Bindings::new(), |bindings, (index, arg)| {
                    check_argument(table, symbol, &index.to_string(), element, arg, bindings)
                })
        }
        Arguments::Dictionary(params) => {
            let entries = args.map(Args::entries).unwrap_or_default();
            let rest = symbol.arguments.rest_parameter();
            let mut seen = BTreeSet::new();
            let mut bindings = Bindings::new();

            for (key, arg) in &entries {
                let param: &Argument = match params.get(key.as_str()) {
                    Some(param) => {
                        seen.insert(key.clone());
                        param
                    }
                    None => match (key.parse::<usize>(), rest) {
                        (Ok(index), Some((rest_index, rest_param))) if index >= rest_index => {
                            seen.insert(rest_index.to_string());
                            rest_param
                        }
                        (Ok(_), _) => {
                            return Err(Error::TooManyArguments {
                                symbol: symbol.id.clone(),
                                max: params.keys().filter(|k| k.parse::<usize>().is_ok()).count(),
                                count: entries
                                    .iter()
                                    .filter(|(k, _)| k.parse::<usize>().is_ok())
                                    .count(),
                            });
                        }
                        (Err(_), _) => {
                            return Err(Error::UnknownArgument {
                                symbol: symbol.id.clone(),
                                argument: key.clone(),
                            });
                        }
                    },
                };
                bindings = check_argument(table, symbol, key, &param.ty, arg, bindings)?;
            }

            for (key, param) in params {
                if !param.is_optional && !param.is_rest && !seen.contains(*key) {
                    return Err(Error::MissingArgument {
                        symbol: symbol.id.clone(),
                        argument: key.to_string(),
                    });
                }
            }
            Ok(bindings)
        }
    }
}

/// Positional view of the arguments of a list-shaped symbol, in index order.
fn positional_entries<'a>(
    symbol: &Symbol,
    args: Option<&'a Args>,
) -> Result<Vec<(usize, &'a Expression)>> {
    match args {
        None => Ok(Vec::new()),
        Some(Args::List(items)) => Ok(items.iter().enumerate().collect()),
        Some(Args::Dictionary(items)) => {
            let mut positional = items
                .iter()
                .map(|(key, arg)| {
                    key.parse::<usize>()
                        .map(|i| (i, arg))
                        .map_err(|_| Error::UnknownArgument {
                            symbol: symbol.id.clone(),
                            argument: key.clone(),
                        })
                })
                .collect::<Result<Vec<_>>>()?;
            positional.sort_by_key(|(i, _)| *i);
            Ok(positional)
        }
    }
}

fn check_argument(
    table: &SymbolTable,
    symbol: &Symbol,
    argument: &str,
    declared: &Type,
    arg: &Expression,
    bindings: Bindings,
) -> Result<Bindings> {
    let found = infer(table, arg)?;
    match assign(&found, declared, bindings.clone()) {
        Some(bindings) => Ok(bindings),
        None => Err(Error::TypeMismatch {
            symbol: symbol.id.clone(),
            argument: argument.to_string(),
            expected: resolve(declared, &bindings),
            found,
        }),
    }
}

/// Try to assign a value of type `src` to a slot of type `dst`.
///
/// Returns the extended bindings on success. Type variables in `dst` are bound
/// to the first type they meet; constraint variables then require every later
/// sighting to be assignable to that binding, plain variables widen to a union.
pub fn assign(src: &Type, dst: &Type, bindings: Bindings) -> Option<Bindings> {
    match (src, dst) {
        (_, Type::Any) | (Type::Any, _) => Some(bindings),
        (
            _,
            Type::Variable {
                name,
                bound,
                is_constraint,
            },
        ) => {
            let Some(previous) = bindings.get(name).cloned() else {
                let mut bindings = assign(src, bound, bindings)?;
                bindings.insert(*name, src.clone());
                return Some(bindings);
            };

            if *is_constraint {
                return assign(src, &previous, bindings);
            }
            if let Some(bindings) = assign(src, &previous, bindings.clone()) {
                return Some(bindings);
            }
            let mut bindings = assign(src, bound, bindings)?;
            bindings.insert(*name, Type::union([previous, src.clone()]));
            Some(bindings)
        }
        (Type::Variable { bound, .. }, _) => assign(bound, dst, bindings),
        (Type::Union(members), _) => members
            .iter()
            .try_fold(bindings, |bindings, member| assign(member, dst, bindings)),
        (_, Type::Union(members)) => members
            .iter()
            .find_map(|member| assign(src, member, bindings.clone())),
        (Type::Value { .. } | Type::AnyValue, Type::AnyValue) => Some(bindings),
        (
            Type::Value {
                namespace: src_ns,
                name: src_name,
            },
            Type::Value {
                namespace: dst_ns,
                name: dst_name,
            },
        ) if src_ns == dst_ns && src_name == dst_name => Some(bindings),
        (
            Type::Container {
                namespace: src_ns,
                name: src_name,
                child: src_child,
            },
            Type::Container {
                namespace: dst_ns,
                name: dst_name,
                child: dst_child,
            },
        ) if src_ns == dst_ns && src_name == dst_name => assign(src_child, dst_child, bindings),
        _ => None,
    }
}

/// Substitute bound variables in `ty`; unbound variables become their bound.
pub fn resolve(ty: &Type, bindings: &Bindings) -> Type {
    match ty {
        Type::Variable { name, bound, .. } => match bindings.get(name) {
            Some(bound_to) => bound_to.clone(),
            None => resolve(bound, bindings),
        },
        Type::Container {
            namespace,
            name,
            child,
        } => Type::container(namespace, name, resolve(child, bindings)),
        Type::Union(members) => Type::union(members.iter().map(|m| resolve(m, bindings))),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{symbol::Argument, table::SymbolTree};

    const ELEMENT: Type = Type::value("Structure", "ElementSymbol");

    fn table() -> SymbolTable {
        let v = || Type::constraint("V", Type::AnyValue);
        let t = || Type::variable("T", Type::AnyValue);
        let roots: Vec<SymbolTree<()>> = vec![SymbolTree::namespace(
            "core",
            [
                SymbolTree::namespace(
                    "rel",
                    [SymbolTree::leaf(
                        Symbol::new(
                            "eq",
                            Arguments::dictionary([("0", Argument::new(v())), ("1", Argument::new(v()))]),
                            Type::BOOL,
                        ),
                        (),
                    )],
                ),
                SymbolTree::namespace(
                    "math",
                    [SymbolTree::leaf(
                        Symbol::new("add", Arguments::non_empty_list(Type::NUM), Type::NUM),
                        (),
                    )],
                ),
                SymbolTree::namespace(
                    "type",
                    [
                        SymbolTree::leaf(
                            Symbol::new("list", Arguments::list(t()), Type::list(t())),
                            (),
                        ),
                        SymbolTree::leaf(
                            Symbol::new("element", Arguments::list(Type::STR), ELEMENT),
                            (),
                        ),
                    ],
                ),
                SymbolTree::namespace(
                    "set",
                    [SymbolTree::leaf(
                        Symbol::new(
                            "has",
                            Arguments::dictionary([
                                ("0", Argument::new(Type::set(v()))),
                                ("1", Argument::new(v())),
                            ]),
                            Type::BOOL,
                        ),
                        (),
                    )],
                ),
                SymbolTree::namespace(
                    "ctrl",
                    [SymbolTree::leaf(
                        Symbol::new(
                            "pick",
                            Arguments::dictionary([
                                ("0", Argument::new(Type::NUM)),
                                ("1", Argument::rest(Type::STR)),
                                ("strict", Argument::with_default(Type::BOOL, false)),
                            ]),
                            Type::STR,
                        ),
                        (),
                    )],
                ),
            ],
        )];
        SymbolTable::build(roots).unwrap().0
    }

    #[test]
    fn literals_infer_native_types() {
        let table = table();
        assert_eq!(type_check(&table, &1.5.into(), &Type::Any).unwrap(), Type::NUM);
        assert_eq!(type_check(&table, &"x".into(), &Type::AnyValue).unwrap(), Type::STR);
    }

    #[test]
    fn constraint_variable_rejects_second_type() {
        let table = table();
        let ok = Expression::apply("core.rel.eq", [1.into(), 2.into()]);
        assert_eq!(type_check(&table, &ok, &Type::BOOL).unwrap(), Type::BOOL);

        let bad = Expression::apply("core.rel.eq", [1.into(), "a".into()]);
        match type_check(&table, &bad, &Type::BOOL).unwrap_err() {
            Error::TypeMismatch {
                symbol,
                argument,
                expected,
                found,
            } => {
                assert_eq!(symbol, "core.rel.eq");
                assert_eq!(argument, "1");
                assert_eq!(expected, Type::NUM);
                assert_eq!(found, Type::STR);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn plain_variable_widens_into_union() {
        let table = table();
        let expr = Expression::apply("core.type.list", [1.into(), "a".into(), 2.into()]);
        assert_eq!(
            type_check(&table, &expr, &Type::Any).unwrap(),
            Type::list(Type::union([Type::NUM, Type::STR]))
        );
    }

    #[test]
    fn bindings_do_not_leak_between_applications() {
        let table = table();
        let expr = Expression::apply(
            "core.rel.eq",
            [
                Expression::apply("core.rel.eq", [1.into(), 2.into()]),
                Expression::apply("core.rel.eq", ["a".into(), "b".into()]),
            ],
        );
        assert!(type_check(&table, &expr, &Type::BOOL).is_ok());
    }

    #[test]
    fn variables_unify_through_containers() {
        let table = table();
        let numbers = Expression::apply("core.type.list", [1.into()]);
        let expr = Expression::apply("core.set.has", [numbers, "a".into()]);
        // `List` is not a `Set`.
        assert!(type_check(&table, &expr, &Type::BOOL).unwrap_err().is_type_mismatch());
    }

    #[test]
    fn nominal_values_do_not_mix() {
        let table = table();
        let element = Expression::apply("core.type.element", ["C".into()]);
        let expr = Expression::apply("core.math.add", [element]);
        let err = type_check(&table, &expr, &Type::NUM).unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn shape_errors() {
        let table = table();
        let empty = Expression::apply("core.math.add", []);
        assert!(type_check(&table, &empty, &Type::Any).unwrap_err().is_empty_argument_list());

        let unknown = Expression::apply_named("core.rel.eq", [("0", 1.into()), ("x", 2.into())]);
        assert!(type_check(&table, &unknown, &Type::Any).unwrap_err().is_unknown_argument());

        let missing = Expression::apply_named("core.rel.eq", [("0", Expression::from(1))]);
        assert_eq!(
            type_check(&table, &missing, &Type::Any).unwrap_err(),
            Error::MissingArgument {
                symbol: "core.rel.eq".into(),
                argument: "1".into()
            }
        );

        let too_many = Expression::apply("core.rel.eq", [1.into(), 2.into(), 3.into()]);
        assert!(type_check(&table, &too_many, &Type::Any).unwrap_err().is_too_many_arguments());

        let missing_symbol = Expression::symbol("core.rel.nope");
        assert!(type_check(&table, &missing_symbol, &Type::Any).unwrap_err().is_unknown_symbol());
    }

    #[test]
    fn rest_argument_absorbs_trailing_positionals() {
        let table = table();
        let expr = Expression::apply("core.ctrl.pick", [1.into(), "a".into(), "b".into(), "c".into()]);
        assert_eq!(type_check(&table, &expr, &Type::STR).unwrap(), Type::STR);

        let bad = Expression::apply("core.ctrl.pick", [1.into(), "a".into(), 3.into()]);
        assert!(type_check(&table, &bad, &Type::STR).unwrap_err().is_type_mismatch());
    }

    #[test]
    fn result_type_is_checked_against_expectation() {
        let table = table();
        let expr = Expression::apply("core.math.add", [1.into(), 2.into()]);
        assert_eq!(
            type_check(&table, &expr, &Type::BOOL).unwrap_err(),
            Error::ResultTypeMismatch {
                expected: Type::BOOL,
                found: Type::NUM
            }
        );
    }

    #[test]
    fn dynamic_heads_are_trusted() {
        let table = table();
        let head = Expression::apply("core.math.add", [1.into()]);
        let expr = Expression::apply_dynamic(head, Some(Args::List(vec![true.into()])));
        assert_eq!(type_check(&table, &expr, &Type::BOOL).unwrap(), Type::Any);
    }
}
