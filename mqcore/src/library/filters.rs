//! `structure-query.filter`: symbols keeping a subset of the atom sets of a selection.
use std::collections::HashSet;

use mqlisp::{
    compiler::CompiledArgs,
    symbol::{Argument, Arguments, Symbol},
    table::SymbolTree,
    types::Type,
    utils::Result,
};

use super::{ATOM_SELECTION, Tree, argument, contextual, flag, holds, num, selection};
use crate::{
    atoms::{AtomSelection, AtomSet},
    model::lookup::GridLookup,
    runtime::{Environment, SlotKind, Value, ValueKey},
};

fn source() -> (&'static str, Argument) {
    ("0", Argument::new(ATOM_SELECTION).describe("Selection to filter"))
}

pub(super) fn tree() -> Tree {
    SymbolTree::namespace(
        "filter",
        [
            contextual(
                Symbol::new(
                    "pick",
                    Arguments::dictionary([source(), ("test", Argument::new(Type::BOOL))]),
                    ATOM_SELECTION,
                )
                .describe("Keep the atom sets passing the test."),
                pick,
            ),
            contextual(
                Symbol::new("first", Arguments::dictionary([source()]), ATOM_SELECTION)
                    .describe("Keep only the first atom set."),
                first,
            ),
            contextual(
                Symbol::new(
                    "with-same-atom-properties",
                    Arguments::dictionary([
                        source(),
                        ("source", Argument::new(ATOM_SELECTION)),
                        ("property", Argument::new(Type::Any)),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Keep the atom sets whose property values all occur in `source`."),
                with_same_atom_properties,
            ),
            contextual(
                Symbol::new(
                    "within",
                    Arguments::dictionary([
                        source(),
                        ("target", Argument::new(ATOM_SELECTION)),
                        ("max-radius", Argument::new(Type::NUM)),
                        ("min-radius", Argument::with_default(Type::NUM, 0.0)),
                        ("invert", Argument::with_default(Type::BOOL, false)),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Keep the atom sets at a distance from some target set within the radii."),
                within,
            ),
            contextual(
                Symbol::new(
                    "is-connected-to",
                    Arguments::dictionary([
                        source(),
                        ("target", Argument::new(ATOM_SELECTION)),
                        ("bond-test", Argument::optional(Type::BOOL)),
                        (
                            "disjunct",
                            Argument::with_default(Type::BOOL, true)
                                .describe("Ignore bonds to target atoms inside the set itself"),
                        ),
                        ("invert", Argument::with_default(Type::BOOL, false)),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Keep the atom sets bonded to an atom of the target."),
                is_connected_to,
            ),
        ],
    )
}

fn pick(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let test = argument(args, "test")?;

    let guard = env.lock(SlotKind::AtomSet)?;
    let mut builder = AtomSelection::linear_builder();
    for set in source.iter() {
        guard.set_atom_set(set.clone());
        if test.eval(env)?.as_bool()? {
            builder.add(set.clone());
        }
    }
    Ok(Value::selection(builder.build()))
}

fn first(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    Ok(Value::selection(source.get(0).cloned().into_iter().collect()))
}

fn with_same_atom_properties(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let candidates = selection(env, args, "0")?;
    let reference = selection(env, args, "source")?;
    let property = argument(args, "property")?;

    let guard = env.lock(SlotKind::Atom)?;
    let mut allowed: HashSet<ValueKey> = HashSet::new();
    for atom in reference.to_indices() {
        guard.set_atom(atom);
        allowed.insert(property.eval(env)?.key()?);
    }

    let mut builder = AtomSelection::linear_builder();
    'sets: for set in candidates.iter() {
        for &atom in set.indices() {
            guard.set_atom(atom);
            if !allowed.contains(&property.eval(env)?.key()?) {
                continue 'sets;
            }
        }
        builder.add(set.clone());
    }
    Ok(Value::selection(builder.build()))
}

fn within(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let target = selection(env, args, "target")?;
    let max_radius = num(env, args, "max-radius")?;
    let min_radius = num(env, args, "min-radius")?;
    let invert = flag(env, args, "invert")?;

    let model = env.model();
    let spheres: Vec<_> = target.iter().map(|t| t.bounding_sphere(model)).collect();
    let lookup = GridLookup::new(
        spheres.iter().map(|s| (s.center, s.radius)),
        model.config().lookup_cell_size,
    );

    let mut builder = AtomSelection::linear_builder();
    for set in source.iter() {
        let sphere = set.bounding_sphere(model);
        let near = lookup
            .query(&sphere.center, sphere.radius + max_radius)
            .into_iter()
            .map(|t| &target.sets()[t as usize])
            .any(|t| {
                if min_radius <= 0.0 {
                    AtomSet::are_within(model, set, t, max_radius)
                } else {
                    let d = AtomSet::distance(model, set, t);
                    min_radius <= d && d <= max_radius
                }
            });
        if near != invert {
            builder.add(set.clone());
        }
    }
    Ok(Value::selection(builder.build()))
}

fn is_connected_to(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let target = selection(env, args, "target")?.get_mask(env.density_threshold());
    let bond_test = args.get("bond-test");
    let disjunct = flag(env, args, "disjunct")?;
    let invert = flag(env, args, "invert")?;

    let guard = match bond_test {
        Some(_) => Some(env.lock(SlotKind::Bond)?),
        None => None,
    };
    let model = env.model_rc();

    let mut builder = AtomSelection::linear_builder();
    for set in source.iter() {
        let mut connected = false;
        'search: for &a in set.indices() {
            for bond in model.bonds().bonds_of(a) {
                if !target.has(bond.b) || (disjunct && set.contains(bond.b)) {
                    continue;
                }
                if let Some(guard) = &guard {
                    guard.set_bond(bond);
                    if !holds(env, bond_test)? {
                        continue;
                    }
                }
                connected = true;
                break 'search;
            }
        }
        if connected != invert {
            builder.add(set.clone());
        }
    }
    Ok(Value::selection(builder.build()))
}
