//! `structure-query.atom-set`: properties of the atom set currently being
//! tested by `pick`, and the accumulator slot of `reduce`.
use mqlisp::{
    compiler::CompiledArgs,
    symbol::{Argument, Arguments, Symbol},
    table::SymbolTree,
    types::Type,
    utils::Result,
};

use super::{ATOM_SELECTION, Tree, argument, contextual};
use crate::runtime::{Environment, SlotKind, Value};

pub(super) fn tree() -> Tree {
    let a = || Type::variable("A", Type::Any);

    SymbolTree::namespace(
        "atom-set",
        [
            contextual(
                Symbol::new("atom-count", Arguments::None, Type::NUM)
                    .describe("Number of atoms in the current atom set."),
                atom_count,
            ),
            contextual(
                Symbol::new(
                    "count-query",
                    Arguments::dictionary([("0", Argument::new(ATOM_SELECTION))]),
                    Type::NUM,
                )
                .describe("Number of atom sets a query yields inside the current atom set."),
                count_query,
            ),
            contextual(
                Symbol::new(
                    "reduce",
                    Arguments::dictionary([
                        ("initial", Argument::new(a())),
                        (
                            "value",
                            Argument::new(a())
                                .describe("Next accumulator value; reads the previous one from the accumulator slot"),
                        ),
                    ]),
                    a(),
                )
                .describe("Fold the atoms of the current atom set into a single value."),
                reduce,
            ),
        ],
    )
}

pub(super) fn accumulator() -> Tree {
    contextual(
        Symbol::new("accumulator", Arguments::None, Type::Any)
            .describe("Accumulated value inside `reduce`."),
        |env, _| env.accumulator(),
    )
}

fn atom_count(env: &mut Environment, _args: &CompiledArgs<Environment>) -> Result<Value> {
    Ok(Value::Num(env.current_atom_set()?.len() as f64))
}

fn count_query(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let set = env.current_atom_set()?;
    let mut sub = env.restricted(set.to_mask(env.density_threshold()));
    let result = args.eval(&mut sub, "0")?;
    Ok(Value::Num(result.as_selection()?.len() as f64))
}

fn reduce(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let set = env.current_atom_set()?;
    let mut accumulated = args.eval(env, "initial")?;
    let value = argument(args, "value")?;

    let atom = env.lock(SlotKind::Atom)?;
    let slot = env.lock(SlotKind::Accumulator)?;
    for &a in set.indices() {
        atom.set_atom(a);
        slot.set_accumulator(accumulated);
        accumulated = value.eval(env)?;
    }
    Ok(accumulated)
}
