//! `structure-query.generator`: symbols producing selections from the model.
use std::collections::HashMap;

use either::Either;
use log::trace;
use mqlisp::{
    compiler::CompiledArgs,
    runtime::ArgReader,
    symbol::{Argument, Arguments, Symbol},
    table::SymbolTree,
    types::Type,
    utils::Result,
};

use super::{ATOM_SELECTION, RING_FINGERPRINT, Tree, contextual, flag, holds, pure, selection};
use crate::{
    atoms::{AtomSelection, AtomSet, Mask},
    runtime::{Environment, SlotKind, Value, ValueKey},
};

pub(super) fn tree() -> Tree {
    SymbolTree::namespace(
        "generator",
        [
            contextual(
                Symbol::new(
                    "atom-groups",
                    Arguments::dictionary([
                        ("entity-test", Argument::optional(Type::BOOL)),
                        ("chain-test", Argument::optional(Type::BOOL)),
                        ("residue-test", Argument::optional(Type::BOOL)),
                        ("atom-test", Argument::optional(Type::BOOL)),
                        (
                            "group-by",
                            Argument::optional(Type::Any)
                                .describe("Atoms with equal keys form one atom set"),
                        ),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Walk the entity, chain, residue and atom levels and group the atoms that pass every test."),
                atom_groups,
            ),
            contextual(
                Symbol::new(
                    "rings",
                    Arguments::dictionary([
                        ("0", Argument::rest(RING_FINGERPRINT)),
                        ("only-aromatic", Argument::with_default(Type::BOOL, false)),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("One atom set per ring, optionally restricted to the given fingerprints."),
                rings,
            ),
            pure(Symbol::new("empty", Arguments::None, ATOM_SELECTION), empty),
            contextual(
                Symbol::new(
                    "query-in-selection",
                    Arguments::dictionary([
                        ("0", Argument::new(ATOM_SELECTION).describe("Query")),
                        ("selection", Argument::new(ATOM_SELECTION)),
                        ("in-complement", Argument::with_default(Type::BOOL, false)),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Evaluate a query restricted to the atoms of a selection, or of its complement."),
                query_in_selection,
            ),
        ],
    )
}

fn atom_groups(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let entity_test = args.get("entity-test");
    let chain_test = args.get("chain-test");
    let residue_test = args.get("residue-test");
    let atom_test = args.get("atom-test");
    let group_by = args.get("group-by");

    let guard = env.lock(SlotKind::Atom)?;
    let model = env.model_rc();
    let mask = env.mask_rc();

    if entity_test.is_none() && chain_test.is_none() && residue_test.is_none() && group_by.is_none() {
        trace!("atom-groups: flat walk over {} atoms", mask.len());
        let mut builder = AtomSelection::linear_builder();
        for atom in mask.iter() {
            guard.set_atom(atom);
            if holds(env, atom_test)? {
                builder.add(AtomSet::single(atom));
            }
        }
        return Ok(Value::selection(builder.build()));
    }

    let mut groups: Vec<Vec<u32>> = Vec::new();
    let mut by_key: HashMap<ValueKey, usize> = HashMap::new();

    for (e, entity) in model.entities().iter().enumerate() {
        let Some(first) = model.first_atom_of_entity(e) else {
            continue;
        };
        guard.set_atom(first);
        if !holds(env, entity_test)? {
            continue;
        }

        for c in entity.chains.clone() {
            let Some(first) = model.first_atom_of_chain(c) else {
                continue;
            };
            guard.set_atom(first);
            if !holds(env, chain_test)? {
                continue;
            }

            for residue in &model.residues()[model.chains()[c].residues.clone()] {
                if residue.atoms.is_empty() {
                    continue;
                }
                guard.set_atom(residue.atoms.start as u32);
                if !holds(env, residue_test)? {
                    continue;
                }

                for atom in residue.atoms.clone().map(|a| a as u32) {
                    if !mask.has(atom) {
                        continue;
                    }
                    guard.set_atom(atom);
                    if !holds(env, atom_test)? {
                        continue;
                    }

                    match group_by {
                        None => groups.push(vec![atom]),
                        Some(key) => {
                            let key = key.eval(env)?.key()?;
                            let next = groups.len();
                            let slot = *by_key.entry(key).or_insert(next);
                            if slot == next {
                                groups.push(Vec::new());
                            }
                            groups[slot].push(atom);
                        }
                    }
                }
            }
        }
    }

    trace!("atom-groups: {} groups", groups.len());
    // Atoms are visited in ascending order, so every group is already sorted.
    Ok(Value::selection(
        groups.into_iter().filter_map(AtomSet::from_sorted).collect(),
    ))
}

fn rings(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let mut fingerprints = Vec::new();
    for fingerprint in args.positional() {
        fingerprints.push(fingerprint.eval(env)?.as_str()?.to_string());
    }
    let only_aromatic = flag(env, args, "only-aromatic")?;

    let model = env.model();
    let mask = env.mask();
    let mut builder = AtomSelection::unique_builder();
    let candidates = if fingerprints.is_empty() {
        Either::Left(model.rings().rings().iter())
    } else {
        Either::Right(
            fingerprints
                .iter()
                .flat_map(|f| model.rings().with_fingerprint(f)),
        )
    };
    for ring in candidates {
        if only_aromatic && !ring.aromatic {
            continue;
        }
        if ring.atoms.iter().all(|&a| mask.has(a)) {
            builder.add_indices(ring.sorted_atoms());
        }
    }
    Ok(Value::selection(builder.build()))
}

fn empty(_args: &mut dyn ArgReader<Value>) -> Result<Value> {
    Ok(Value::selection(AtomSelection::empty()))
}

fn query_in_selection(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let within = selection(env, args, "selection")?;
    let threshold = env.density_threshold();
    let mut mask = within.get_mask(threshold);
    if flag(env, args, "in-complement")? {
        let complement = env.mask().iter().filter(|&i| !mask.has(i)).collect();
        mask = Mask::from_sorted(complement, threshold);
    }

    let mut sub = env.restricted(mask);
    args.eval(&mut sub, "0")
}
