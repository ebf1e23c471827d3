//! `structure-query.combinator`: symbols combining several selections.
use std::rc::Rc;

use mqlisp::{
    compiler::CompiledArgs,
    symbol::{Argument, Arguments, Symbol},
    table::SymbolTree,
    types::Type,
    utils::{Error, Result},
};

use super::{ATOM_SELECTION, Tree, contextual};
use crate::{
    atoms::{AtomSelection, AtomSelectionSet, AtomSet, selection::UniqueBuilder},
    model::{Model, lookup::GridLookup},
    runtime::{Environment, Value},
};

pub(super) fn tree() -> Tree {
    SymbolTree::namespace(
        "combinator",
        [
            contextual(
                Symbol::new("intersect", Arguments::non_empty_list(ATOM_SELECTION), ATOM_SELECTION)
                    .describe("Atom sets present in every selection."),
                intersect,
            ),
            contextual(
                Symbol::new("merge", Arguments::non_empty_list(ATOM_SELECTION), ATOM_SELECTION)
                    .describe("Atom sets present in any selection, without duplicates."),
                merge,
            ),
            contextual(
                Symbol::new(
                    "distance-cluster",
                    Arguments::dictionary([
                        (
                            "matrix",
                            Argument::new(Type::list(Type::list(Type::NUM))).describe(
                                "Distance bounds: below the diagonal the minimum, above it the maximum",
                            ),
                        ),
                        ("selections", Argument::new(Type::list(ATOM_SELECTION))),
                    ]),
                    ATOM_SELECTION,
                )
                .describe("Unions of one atom set per selection whose pairwise distances satisfy the bounds."),
                distance_cluster,
            ),
        ],
    )
}

fn selections(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Vec<Rc<AtomSelection>>> {
    args.positional()
        .into_iter()
        .map(|arg| arg.eval(env)?.into_selection())
        .collect()
}

fn intersect(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let selections = selections(env, args)?;
    let Some(pivot) = (0..selections.len()).min_by_key(|&i| selections[i].len()) else {
        return Ok(Value::selection(AtomSelection::empty()));
    };

    let others: Vec<AtomSelectionSet> = selections
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != pivot)
        .map(|(_, s)| AtomSelectionSet::from_selection(s))
        .collect();

    let mut builder = AtomSelection::unique_builder();
    for set in selections[pivot].iter() {
        if others.iter().all(|other| other.contains(set)) {
            builder.add(set.clone());
        }
    }
    Ok(Value::selection(builder.build()))
}

fn merge(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let mut builder = AtomSelection::unique_builder();
    for selection in selections(env, args)? {
        for set in selection.iter() {
            builder.add(set.clone());
        }
    }
    Ok(Value::selection(builder.build()))
}

struct DistanceBounds {
    min: Vec<Vec<f64>>,
    max: Vec<Vec<f64>>,
}

impl DistanceBounds {
    /// Split a square matrix: `m[i][j]` with `i < j` is the maximum distance
    /// between selections `i` and `j`, `m[j][i]` the minimum.
    fn from_matrix(matrix: &[Value], n: usize) -> Result<Self> {
        let invalid = |reason: String| Error::InvalidArgument {
            argument: "matrix".to_string(),
            reason,
        };
        if matrix.len() != n {
            return Err(invalid(format!("expected {n} rows, found {}", matrix.len())));
        }

        let mut rows = Vec::with_capacity(n);
        for row in matrix {
            let row = row
                .as_list()?
                .iter()
                .map(Value::as_num)
                .collect::<Result<Vec<f64>>>()?;
            if row.len() != n {
                return Err(invalid(format!("expected {n} columns, found {}", row.len())));
            }
            rows.push(row);
        }

        let mut min = vec![vec![0.0; n]; n];
        let mut max = vec![vec![f64::INFINITY; n]; n];
        for i in 0..n {
            for j in i + 1..n {
                max[i][j] = rows[i][j];
                max[j][i] = rows[i][j];
                min[i][j] = rows[j][i];
                min[j][i] = rows[j][i];
            }
        }
        Ok(Self { min, max })
    }

    fn admits(&self, i: usize, j: usize, d: f64) -> bool {
        self.min[i][j] <= d && d <= self.max[i][j]
    }
}

struct Placement<'a> {
    model: &'a Model,
    selections: &'a [Rc<AtomSelection>],
    bounds: &'a DistanceBounds,
}

impl<'a> Placement<'a> {
    /// Choose a set of selection `k` among `candidates[k]` compatible with every
    /// set already placed, then recurse on `k + 1`.
    fn place(
        &self,
        k: usize,
        placed: &mut Vec<&'a AtomSet>,
        candidates: &[Vec<usize>],
        builder: &mut UniqueBuilder,
    ) {
        if k == self.selections.len() {
            if let Some(union) = AtomSet::union_many(placed.iter().copied()) {
                builder.add(union);
            }
            return;
        }

        let selections = self.selections;
        for &c in &candidates[k] {
            let set = &selections[k].sets()[c];
            let compatible = placed.iter().enumerate().all(|(i, other)| {
                self.bounds.admits(i, k, AtomSet::distance(self.model, other, set))
            });
            if compatible {
                placed.push(set);
                self.place(k + 1, placed, candidates, builder);
                placed.pop();
            }
        }
    }
}

fn distance_cluster(env: &mut Environment, args: &CompiledArgs<Environment>) -> Result<Value> {
    let matrix = args.eval(env, "matrix")?;
    let selections = args
        .eval(env, "selections")?
        .as_list()?
        .iter()
        .map(|s| s.clone().into_selection())
        .collect::<Result<Vec<_>>>()?;
    let n = selections.len();
    let bounds = DistanceBounds::from_matrix(matrix.as_list()?, n)?;

    let mut builder = AtomSelection::unique_builder();
    if n == 0 {
        return Ok(Value::selection(builder.build()));
    }

    let model = env.model();
    let cell_size = model.config().lookup_cell_size;
    let lookups: Vec<GridLookup> = selections
        .iter()
        .map(|s| {
            GridLookup::new(
                s.iter().map(|set| {
                    let sphere = set.bounding_sphere(model);
                    (sphere.center, sphere.radius)
                }),
                cell_size,
            )
        })
        .collect();
    let placement = Placement {
        model,
        selections: &selections,
        bounds: &bounds,
    };

    for seed in selections[0].iter() {
        let sphere = seed.bounding_sphere(model);
        let mut candidates = vec![Vec::new(); n];
        // Prefilter every later selection against the seed.
        for k in 1..n {
            candidates[k] = lookups[k]
                .query(&sphere.center, sphere.radius + bounds.max[0][k])
                .into_iter()
                .map(|c| c as usize)
                .collect();
        }
        if candidates[1..].iter().any(Vec::is_empty) {
            continue;
        }

        let mut placed = vec![seed];
        placement.place(1, &mut placed, &candidates, &mut builder);
    }
    Ok(Value::selection(builder.build()))
}
