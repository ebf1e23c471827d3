//! `structure-query.modifier`: symbols rewriting the atom sets of a selection.
use std::collections::HashMap;

use bit_set::BitSet;
use log::trace;
use mqlisp::{
    compiler::CompiledArgs,
    symbol::{Argument, Arguments, Symbol},
    table::SymbolTree,
    types::Type,
    utils::Result,
};
use smallvec::SmallVec;

use super::{ATOM_SELECTION, Tree, argument, contextual, count, flag, holds, num, selection};
use crate::{
    atoms::{AtomSelection, AtomSet, Mask, selection::LinearBuilder},
    model::{Model, lookup::GridLookup},
    runtime::{Environment, SlotKind, Value, ValueKey},
};

fn source() -> (&'static str, Argument) {
    ("0", Argument::new(ATOM_SELECTION).describe("Selection to modify"))
}

pub(super) fn tree() -> Tree {
    let by = || ("by", Argument::new(ATOM_SELECTION));

    SymbolTree::namespace(
        "modifier",
        [
            contextual(
                Symbol::new(
                    "query-each",
                    Arguments::dictionary([source(), ("query", Argument::new(ATOM_SELECTION))]),
                    ATOM_SELECTION,
                )
                .describe("Evaluate a query inside every atom set and merge the results."),
                query_each,
            ),
            contextual(
                Symbol::new("intersect-by", Arguments::dictionary([source(), by()]), ATOM_SELECTION)
                    .describe("Keep the atoms of every set that are also in `by`."),
                intersect_by,
            ),
            contextual(
                Symbol::new("except-by", Arguments::dictionary([source(), by()]), ATOM_SELECTION)
                    .describe("Remove the atoms of `by` from every set."),
                except_by,
            ),
            contextual(
                Symbol::new("union-by", Arguments::dictionary([source(), by()]), ATOM_SELECTION)
                    .describe("Replace every set by the union of the sets of `by` it shares an atom with."),
                union_by,
            ),
            contextual(
                Symbol::new("union", Arguments::dictionary([source()]), ATOM_SELECTION)
                    .describe("Collapse the selection into a single atom set."),
                union,
            ),
            contextual(
                Symbol::new(
                    "cluster",
                    Arguments::dictionary([
                        source(),
                        ("min-distance", Argument::with_default(Type::NUM, 0.0)),
                        ("max-distance", Argument::new(Type::NUM)),
                        ("min-size", Argument::with_default(Type::NUM, 2.0)),
                        ("max-size", Argument::optional(Type::NUM)),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Groups of atom sets whose pairwise distances all lie within the bounds."),
                cluster,
            ),
            contextual(
                Symbol::new(
                    "include-surroundings",
                    Arguments::dictionary([
                        source(),
                        ("radius", Argument::new(Type::NUM)),
                        ("as-whole-residues", Argument::with_default(Type::BOOL, false)),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Extend every set by the atoms within a radius."),
                include_surroundings,
            ),
            contextual(
                Symbol::new(
                    "include-connected",
                    Arguments::dictionary([
                        source(),
                        ("bond-test", Argument::optional(Type::BOOL)),
                        ("layer-count", Argument::with_default(Type::NUM, 1.0)),
                        ("as-whole-residues", Argument::with_default(Type::BOOL, false)),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Extend every set along bonds, one layer of neighbours at a time."),
                include_connected,
            ),
            contextual(
                Symbol::new(
                    "expand-property",
                    Arguments::dictionary([source(), ("property", Argument::new(Type::Any))]),
                    ATOM_SELECTION,
                )
                .describe("Extend every set by all atoms sharing a property value with one of its atoms."),
                expand_property,
            ),
        ],
    )
}

fn query_each(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let query = argument(args, "query")?;
    let threshold = env.density_threshold();

    let mut builder = AtomSelection::unique_builder();
    for set in source.iter() {
        let mut sub = env.restricted(set.to_mask(threshold));
        let result = query.eval(&mut sub)?.into_selection()?;
        for s in result.iter() {
            builder.add(s.clone());
        }
    }
    Ok(Value::selection(builder.build()))
}

fn filter_by(
    env: &mut Environment,
    args: &CompiledArgs<Environment>,
    keep: fn(&AtomSet, &Mask) -> Option<AtomSet>,
) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let by = selection(env, args, "by")?.get_mask(env.density_threshold());

    let mut builder = AtomSelection::unique_builder();
    for set in source.iter() {
        if let Some(kept) = keep(set, &by) {
            builder.add(kept);
        }
    }
    Ok(Value::selection(builder.build()))
}

fn intersect_by(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    filter_by(env, args, AtomSet::intersect_mask)
}

fn except_by(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    filter_by(env, args, AtomSet::except_mask)
}

fn union_by(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let by = selection(env, args, "by")?;

    let mut occurrences: HashMap<u32, SmallVec<u32, 2>> = HashMap::new();
    for (k, set) in by.iter().enumerate() {
        for &atom in set.indices() {
            occurrences.entry(atom).or_default().push(k as u32);
        }
    }

    let mut builder = AtomSelection::unique_builder();
    for set in source.iter() {
        let mut touched = BitSet::new();
        for atom in set.indices() {
            for &k in occurrences.get(atom).into_iter().flatten() {
                touched.insert(k as usize);
            }
        }
        if let Some(glued) = AtomSet::union_many(touched.iter().map(|k| &by.sets()[k])) {
            builder.add(glued);
        }
    }
    Ok(Value::selection(builder.build()))
}

fn union(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    Ok(Value::selection(source.union_all().into_iter().collect()))
}

struct Clustering<'a> {
    model: &'a Model,
    sets: &'a [AtomSet],
    min_distance: f64,
    max_distance: f64,
    min_size: usize,
    max_size: usize,
}

impl Clustering<'_> {
    /// Extend `included` with every admissible later candidate, depth first.
    fn grow(
        &self,
        included: &mut Vec<usize>,
        union: &AtomSet,
        candidates: &[usize],
        start: usize,
        builder: &mut LinearBuilder,
    ) {
        if included.len() >= self.max_size {
            return;
        }

        for (k, &b) in candidates.iter().enumerate().skip(start) {
            let admissible = included.iter().all(|&i| {
                let d = AtomSet::distance(self.model, &self.sets[i], &self.sets[b]);
                self.min_distance <= d && d <= self.max_distance
            });
            if !admissible {
                continue;
            }

            let extended = AtomSet::union(union, &self.sets[b]);
            included.push(b);
            if (self.min_size..=self.max_size).contains(&included.len()) {
                builder.add(extended.clone());
            }
            self.grow(included, &extended, candidates, k + 1, builder);
            included.pop();
        }
    }
}

fn cluster(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let min_distance = num(env, args, "min-distance")?;
    let max_distance = num(env, args, "max-distance")?;
    let min_size = count(num(env, args, "min-size")?, "min-size")?;
    let max_size = match args.eval_opt(env, "max-size")? {
        Some(value) => count(value.as_num()?, "max-size")?,
        None => usize::MAX,
    };

    let model = env.model();
    let sets = source.sets();
    let spheres: Vec<_> = sets.iter().map(|s| s.bounding_sphere(model)).collect();
    let lookup = GridLookup::new(
        spheres.iter().map(|s| (s.center, s.radius)),
        model.config().lookup_cell_size,
    );
    let clustering = Clustering {
        model,
        sets,
        min_distance,
        max_distance,
        min_size,
        max_size,
    };

    let mut builder = AtomSelection::linear_builder();
    for (a, set) in sets.iter().enumerate() {
        let sphere = &spheres[a];
        // Only later sets are candidates, so a group is grown from its first member only.
        let candidates: Vec<usize> = lookup
            .query(&sphere.center, sphere.radius + max_distance)
            .into_iter()
            .map(|b| b as usize)
            .filter(|&b| b > a)
            .collect();

        if min_size <= 1 && max_size >= 1 {
            builder.add(set.clone());
        }
        clustering.grow(&mut vec![a], set, &candidates, 0, &mut builder);
    }

    trace!("cluster: {} groups from {} sets", builder.len(), sets.len());
    Ok(Value::selection(builder.build()))
}

/// Atoms of `atoms` together with the rest of their residues, restricted to `mask`.
fn whole_residues(model: &Model, mask: &Mask, atoms: &[u32]) -> Vec<u32> {
    let mut residues = BitSet::new();
    let mut expanded = Vec::with_capacity(atoms.len());
    for &atom in atoms {
        let r = model.residue_of(atom);
        if !residues.insert(r) {
            continue;
        }
        expanded.extend(
            model.residues()[r]
                .atoms
                .clone()
                .map(|a| a as u32)
                .filter(|&a| a == atom || mask.has(a)),
        );
    }
    expanded
}

fn include_surroundings(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let radius = num(env, args, "radius")?;
    let as_whole_residues = flag(env, args, "as-whole-residues")?;

    let model = env.model();
    let mask = env.mask();
    let lookup = model.lookup();

    let mut builder = AtomSelection::unique_builder();
    for set in source.iter() {
        let mut atoms = set.indices().to_vec();
        for &a in set.indices() {
            atoms.extend(
                lookup
                    .query(model.position(a), radius)
                    .into_iter()
                    .filter(|&b| mask.has(b)),
            );
        }
        if as_whole_residues {
            atoms.sort_unstable();
            atoms.dedup();
            atoms = whole_residues(model, mask, &atoms);
        }
        builder.add_indices(atoms);
    }
    Ok(Value::selection(builder.build()))
}

fn include_connected(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let bond_test = args.get("bond-test");
    let layer_count = count(num(env, args, "layer-count")?, "layer-count")?;
    let as_whole_residues = flag(env, args, "as-whole-residues")?;

    let guard = match bond_test {
        Some(_) => Some(env.lock(SlotKind::Bond)?),
        None => None,
    };
    let model = env.model_rc();
    let mask = env.mask_rc();

    let mut builder = AtomSelection::unique_builder();
    for set in source.iter() {
        let mut visited = BitSet::new();
        let mut frontier = set.indices().to_vec();
        if as_whole_residues {
            frontier = whole_residues(&model, &mask, &frontier);
        }
        for &a in &frontier {
            visited.insert(a as usize);
        }

        for _ in 0..layer_count {
            let mut next = Vec::new();
            for &a in &frontier {
                for bond in model.bonds().bonds_of(a) {
                    if visited.contains(bond.b as usize) || !mask.has(bond.b) {
                        continue;
                    }
                    if let Some(guard) = &guard {
                        guard.set_bond(bond);
                        if !holds(env, bond_test)? {
                            continue;
                        }
                    }
                    visited.insert(bond.b as usize);
                    next.push(bond.b);
                }
            }
            if as_whole_residues {
                for a in whole_residues(&model, &mask, &next) {
                    if visited.insert(a as usize) {
                        next.push(a);
                    }
                }
            }
            if next.is_empty() {
                break;
            }
            frontier = next;
        }

        builder.add_indices(visited.iter().map(|a| a as u32).collect());
    }
    Ok(Value::selection(builder.build()))
}

fn expand_property(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let source = selection(env, args, "0")?;
    let property = argument(args, "property")?;

    let guard = env.lock(SlotKind::Atom)?;
    let mask = env.mask_rc();

    let mut seeds_by_key: HashMap<ValueKey, SmallVec<usize, 2>> = HashMap::new();
    for (k, set) in source.iter().enumerate() {
        for &atom in set.indices() {
            guard.set_atom(atom);
            let seeds = seeds_by_key.entry(property.eval(env)?.key()?).or_default();
            if seeds.last() != Some(&k) {
                seeds.push(k);
            }
        }
    }

    let mut expanded: Vec<Vec<u32>> = source.iter().map(|s| s.indices().to_vec()).collect();
    for atom in mask.iter() {
        guard.set_atom(atom);
        let key = property.eval(env)?.key()?;
        for &k in seeds_by_key.get(&key).into_iter().flatten() {
            expanded[k].push(atom);
        }
    }

    let mut builder = AtomSelection::unique_builder();
    for atoms in expanded {
        builder.add_indices(atoms);
    }
    Ok(Value::selection(builder.build()))
}
