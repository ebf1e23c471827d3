//! The `core` namespace: primitive conversions, logic, control flow, relations,
//! arithmetic, strings, lists and sets.
//!
//! Everything here is static except `core.ctrl.fn` and `core.ctrl.eval`, which
//! need the compiled argument itself and the live context respectively.
use std::{collections::HashSet, rc::Rc};

use mqlisp::{
    compiler::CompiledArgs,
    runtime::ArgReader,
    symbol::{Argument, Arguments, Symbol},
    table::SymbolTree,
    types::Type,
    utils::{Error, Result},
};

use super::{Tree, contextual, pure};
use crate::runtime::{Environment, Value, ValueKey};

fn unary(ty: Type) -> Arguments {
    Arguments::dictionary([("0", Argument::new(ty))])
}

fn binary(ty: Type) -> Arguments {
    Arguments::dictionary([("0", Argument::new(ty.clone())), ("1", Argument::new(ty))])
}

fn nums(args: &mut dyn ArgReader<Value>) -> Result<Vec<f64>> {
    (0..args.len())
        .map(|i| args.required_at(i).and_then(|v| v.as_num()))
        .collect()
}

fn num_at(args: &mut dyn ArgReader<Value>, index: usize) -> Result<f64> {
    args.required_at(index)?.as_num()
}

pub(super) fn tree() -> Tree {
    SymbolTree::namespace(
        "core",
        [
            types(),
            logic(),
            ctrl(),
            rel(),
            math(),
            SymbolTree::namespace(
                "str",
                [pure(
                    Symbol::new("concat", Arguments::list(Type::AnyValue), Type::STR)
                        .describe("Concatenate the string forms of the arguments."),
                    concat,
                )],
            ),
            SymbolTree::namespace(
                "list",
                [pure(
                    Symbol::new(
                        "get-at",
                        Arguments::dictionary([
                            ("0", Argument::new(Type::list(Type::variable("T", Type::Any)))),
                            ("1", Argument::new(Type::NUM)),
                        ]),
                        Type::variable("T", Type::Any),
                    ),
                    get_at,
                )],
            ),
            sets(),
        ],
    )
    .described("Primitive values and pure operations.")
}

// core.type

fn types() -> Tree {
    let t_any = || Type::variable("T", Type::Any);
    let t_value = || Type::variable("T", Type::AnyValue);

    SymbolTree::namespace(
        "type",
        [
            pure(Symbol::new("bool", unary(Type::AnyValue), Type::BOOL), to_bool),
            pure(Symbol::new("num", unary(Type::AnyValue), Type::NUM), to_num),
            pure(Symbol::new("str", unary(Type::AnyValue), Type::STR), to_str),
            pure(
                Symbol::new("list", Arguments::list(t_any()), Type::list(t_any()))
                    .describe("List of the arguments, in order."),
                to_list,
            ),
            pure(
                Symbol::new("set", Arguments::list(t_value()), Type::set(t_value()))
                    .describe("Set of the arguments."),
                to_set,
            ),
        ],
    )
}

fn to_bool(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let value = args.required_at(0)?;
    let truthy = match &value {
        Value::Bool(b) => *b,
        Value::Num(n) => *n != 0.0 && !n.is_nan(),
        Value::Str(s) => !s.is_empty(),
        other => return other.as_bool().map(Value::Bool),
    };
    Ok(Value::Bool(truthy))
}

fn to_num(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let n = match args.required_at(0)? {
        Value::Num(n) => n,
        Value::Bool(b) => f64::from(u8::from(b)),
        Value::Str(s) => s.trim().parse::<f64>().map_err(|_| Error::InvalidArgument {
            argument: "0".to_string(),
            reason: format!("`{s}` is not a number"),
        })?,
        other => return other.as_num().map(Value::Num),
    };
    Ok(Value::Num(n))
}

fn to_str(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    match args.required_at(0)? {
        value @ Value::Str(_) => Ok(value),
        value => Ok(Value::str(&value.to_string())),
    }
}

fn to_list(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let items = (0..args.len())
        .map(|i| args.required_at(i))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::list(items))
}

fn to_set(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let keys = (0..args.len())
        .map(|i| args.required_at(i)?.key())
        .collect::<Result<HashSet<_>>>()?;
    Ok(Value::Set(Rc::new(keys)))
}

// core.logic

fn logic() -> Tree {
    SymbolTree::namespace(
        "logic",
        [
            pure(Symbol::new("not", unary(Type::BOOL), Type::BOOL), not),
            pure(
                Symbol::new("and", Arguments::non_empty_list(Type::BOOL), Type::BOOL)
                    .describe("Short-circuiting conjunction, evaluated left to right."),
                and,
            ),
            pure(
                Symbol::new("or", Arguments::non_empty_list(Type::BOOL), Type::BOOL)
                    .describe("Short-circuiting disjunction, evaluated left to right."),
                or,
            ),
        ],
    )
}

fn not(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    Ok(Value::Bool(!args.required_at(0)?.as_bool()?))
}

fn and(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    for i in 0..args.len() {
        if !args.required_at(i)?.as_bool()? {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

fn or(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    for i in 0..args.len() {
        if args.required_at(i)?.as_bool()? {
            return Ok(Value::Bool(true));
        }
    }
    Ok(Value::Bool(false))
}

// core.ctrl

fn ctrl() -> Tree {
    let t = || Type::variable("T", Type::Any);
    let a = || Type::variable("A", Type::Any);
    let b = || Type::variable("B", Type::Any);

    SymbolTree::namespace(
        "ctrl",
        [
            contextual(
                Symbol::new("eval", unary(Type::func(t())), t())
                    .describe("Evaluate a function value in the current context."),
                eval,
            ),
            contextual(
                Symbol::new("fn", unary(t()), Type::func(t()))
                    .describe("Wrap an expression, unevaluated, into a function value."),
                make_fn,
            ),
            pure(
                Symbol::new(
                    "if",
                    Arguments::dictionary([
                        ("0", Argument::new(Type::BOOL)),
                        ("1", Argument::new(a())),
                        ("2", Argument::new(b())),
                    ]),
                    Type::union([a(), b()]),
                )
                .describe("Evaluate the second argument if the first holds, the third otherwise."),
                if_then_else,
            ),
        ],
    )
}

fn eval(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let f = Rc::clone(args.eval_at(env, 0)?.as_fn()?);
    f.eval(env)
}

fn make_fn(_env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let body = args.at(0).ok_or_else(|| Error::MissingRuntimeArgument {
        argument: "0".to_string(),
    })?;
    Ok(Value::Fn(Rc::new(body.clone())))
}

fn if_then_else(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    if args.required_at(0)?.as_bool()? {
        args.required_at(1)
    } else {
        args.required_at(2)
    }
}

// core.rel

fn rel() -> Tree {
    let v = || Type::constraint("V", Type::AnyValue);
    let compare = |name: &'static str, f: fn(&mut dyn ArgReader<Value>) -> Result<Value>| {
        pure(Symbol::new(name, binary(Type::NUM), Type::BOOL), f)
    };

    SymbolTree::namespace(
        "rel",
        [
            pure(Symbol::new("eq", binary(v()), Type::BOOL), eq),
            pure(Symbol::new("neq", binary(v()), Type::BOOL), neq),
            compare("lt", |args| Ok(Value::Bool(num_at(args, 0)? < num_at(args, 1)?))),
            compare("lte", |args| Ok(Value::Bool(num_at(args, 0)? <= num_at(args, 1)?))),
            compare("gr", |args| Ok(Value::Bool(num_at(args, 0)? > num_at(args, 1)?))),
            compare("gre", |args| Ok(Value::Bool(num_at(args, 0)? >= num_at(args, 1)?))),
            pure(
                Symbol::new(
                    "in-range",
                    Arguments::dictionary([
                        ("0", Argument::new(Type::NUM).describe("Value")),
                        ("1", Argument::new(Type::NUM).describe("Minimum, inclusive")),
                        ("2", Argument::new(Type::NUM).describe("Maximum, inclusive")),
                    ]),
                    Type::BOOL,
                ),
                in_range,
            ),
        ],
    )
}

fn eq(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let (a, b) = (args.required_at(0)?, args.required_at(1)?);
    Ok(Value::Bool(a.equals(&b)))
}

fn neq(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let (a, b) = (args.required_at(0)?, args.required_at(1)?);
    Ok(Value::Bool(!a.equals(&b)))
}

fn in_range(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let (x, min, max) = (num_at(args, 0)?, num_at(args, 1)?, num_at(args, 2)?);
    Ok(Value::Bool(min <= x && x <= max))
}

// core.math

fn math() -> Tree {
    let variadic = |name: &'static str, f: fn(&mut dyn ArgReader<Value>) -> Result<Value>| {
        pure(Symbol::new(name, Arguments::non_empty_list(Type::NUM), Type::NUM), f)
    };
    let binary_op = |name: &'static str, f: fn(&mut dyn ArgReader<Value>) -> Result<Value>| {
        pure(Symbol::new(name, binary(Type::NUM), Type::NUM), f)
    };
    let unary_op = |name: &'static str, f: fn(&mut dyn ArgReader<Value>) -> Result<Value>| {
        pure(Symbol::new(name, unary(Type::NUM), Type::NUM), f)
    };

    SymbolTree::namespace(
        "math",
        [
            variadic("add", |args| Ok(Value::Num(nums(args)?.into_iter().sum()))),
            binary_op("sub", |args| Ok(Value::Num(num_at(args, 0)? - num_at(args, 1)?))),
            variadic("mult", |args| Ok(Value::Num(nums(args)?.into_iter().product()))),
            binary_op("div", |args| Ok(Value::Num(num_at(args, 0)? / num_at(args, 1)?))),
            binary_op("pow", |args| Ok(Value::Num(num_at(args, 0)?.powf(num_at(args, 1)?)))),
            binary_op("mod", |args| Ok(Value::Num(num_at(args, 0)? % num_at(args, 1)?))),
            variadic("min", |args| {
                Ok(Value::Num(nums(args)?.into_iter().fold(f64::INFINITY, f64::min)))
            }),
            variadic("max", |args| {
                Ok(Value::Num(nums(args)?.into_iter().fold(f64::NEG_INFINITY, f64::max)))
            }),
            unary_op("abs", |args| Ok(Value::Num(num_at(args, 0)?.abs()))),
            unary_op("sqrt", |args| Ok(Value::Num(num_at(args, 0)?.sqrt()))),
            unary_op("floor", |args| Ok(Value::Num(num_at(args, 0)?.floor()))),
            unary_op("ceil", |args| Ok(Value::Num(num_at(args, 0)?.ceil()))),
            unary_op("round", |args| Ok(Value::Num(num_at(args, 0)?.round()))),
        ],
    )
}

// core.str, core.list, core.set

fn concat(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let mut out = String::new();
    for i in 0..args.len() {
        out.push_str(&args.required_at(i)?.to_string());
    }
    Ok(Value::str(&out))
}

fn get_at(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let list = args.required_at(0)?;
    let index = num_at(args, 1)?;
    let items = list.as_list()?;
    if index < 0.0 || index.fract() != 0.0 || index as usize >= items.len() {
        return Err(Error::InvalidArgument {
            argument: "1".to_string(),
            reason: format!("index {index} is outside a list of {} items", items.len()),
        });
    }
    Ok(items[index as usize].clone())
}

fn sets() -> Tree {
    let v = || Type::constraint("V", Type::AnyValue);

    SymbolTree::namespace(
        "set",
        [
            pure(
                Symbol::new(
                    "has",
                    Arguments::dictionary([
                        ("0", Argument::new(Type::set(v()))),
                        ("1", Argument::new(v())),
                    ]),
                    Type::BOOL,
                )
                .describe("Whether the set contains the value."),
                has,
            ),
            pure(
                Symbol::new("is-subset", binary(Type::set(v())), Type::BOOL)
                    .describe("Whether the second set is a subset of the first."),
                is_subset,
            ),
        ],
    )
}

fn has(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let set = args.required_at(0)?;
    let key: ValueKey = args.required_at(1)?.key()?;
    Ok(Value::Bool(set.as_set()?.contains(&key)))
}

fn is_subset(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let (superset, subset) = (args.required_at(0)?, args.required_at(1)?);
    Ok(Value::Bool(subset.as_set()?.is_subset(superset.as_set()?)))
}
