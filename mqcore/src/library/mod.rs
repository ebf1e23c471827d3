//! The MolQL symbol library.
//!
//! Declarations and runtime implementations are registered together in one
//! namespace tree. The `core` namespace holds the primitive, pure operations;
//! `structure-query` the generators, modifiers, filters and combinators that
//! operate on the atom algebra, plus atom and bond properties.
//!
//! The library is built once per process and shared by every [`Environment`].
use std::{rc::Rc, sync::Arc};

use log::debug;
use mqlisp::{
    compiler::{Compiled, CompiledArgs},
    runtime::{ContextualFn, Implementation, Library, StaticFn},
    symbol::Symbol,
    table::SymbolTree,
    types::Type,
    utils::{Error, Result},
};
use once_cell::sync::OnceCell;

use crate::{
    atoms::AtomSelection,
    magic::STRUCTURE_NAMESPACE,
    runtime::{Environment, Value},
};

mod atom_set;
mod combinators;
mod filters;
mod generators;
mod modifiers;
mod primitives;
mod properties;

pub const ELEMENT_SYMBOL: Type = Type::value(STRUCTURE_NAMESPACE, "ElementSymbol");
pub const ATOM_NAME: Type = Type::value(STRUCTURE_NAMESPACE, "AtomName");
pub const ENTITY_TYPE: Type = Type::value(STRUCTURE_NAMESPACE, "EntityType");
pub const RING_FINGERPRINT: Type = Type::value(STRUCTURE_NAMESPACE, "RingFingerprint");
pub const ATOM_SET: Type = Type::value(STRUCTURE_NAMESPACE, "AtomSet");
pub const ATOM_SELECTION: Type = Type::value(STRUCTURE_NAMESPACE, "AtomSelection");

pub(crate) type Tree = SymbolTree<Implementation<Environment>>;

static LIBRARY: OnceCell<Arc<Library<Environment>>> = OnceCell::new();

/// Namespace tree of every MolQL symbol.
pub fn symbol_tree() -> Vec<Tree> {
    vec![
        primitives::tree(),
        SymbolTree::namespace(
            "structure-query",
            [
                properties::type_tree(),
                SymbolTree::namespace("slot", [atom_set::accumulator()]),
                generators::tree(),
                modifiers::tree(),
                filters::tree(),
                combinators::tree(),
                atom_set::tree(),
                properties::atom_tree(),
                properties::bond_tree(),
            ],
        )
        .described("Queries over molecular structures."),
    ]
}

/// The shared MolQL library, built on first use.
pub fn library() -> Result<Arc<Library<Environment>>> {
    LIBRARY
        .get_or_try_init(|| {
            let library = Library::build(symbol_tree())?;
            debug!("Built MolQL library with {} symbols", library.symbols().len());
            Ok(Arc::new(library))
        })
        .cloned()
}

pub(crate) fn pure(symbol: Symbol, f: StaticFn<Value>) -> Tree {
    SymbolTree::leaf(symbol, Implementation::Static(f))
}

pub(crate) fn contextual(symbol: Symbol, f: ContextualFn<Environment>) -> Tree {
    SymbolTree::leaf(symbol, Implementation::Contextual(f))
}

/// Compiled argument `key`, unevaluated.
pub(crate) fn argument<'a>(
    args: &'a CompiledArgs<Environment>,
    key: &str,
) -> Result<&'a Compiled<Environment>> {
    args.get(key).ok_or_else(|| Error::MissingRuntimeArgument {
        argument: key.to_string(),
    })
}

pub(crate) fn selection(
    env: &mut Environment,
    args: &CompiledArgs<Environment>,
    key: &str,
) -> Result<Rc<AtomSelection>> {
    args.eval(env, key)?.into_selection()
}

pub(crate) fn num(env: &mut Environment, args: &CompiledArgs<Environment>, key: &str) -> Result<f64> {
    args.eval(env, key)?.as_num()
}

pub(crate) fn flag(env: &mut Environment, args: &CompiledArgs<Environment>, key: &str) -> Result<bool> {
    match args.eval_opt(env, key)? {
        Some(value) => value.as_bool(),
        None => Ok(false),
    }
}

/// Evaluate an optional predicate; an absent predicate holds.
pub(crate) fn holds(env: &mut Environment, test: Option<&Compiled<Environment>>) -> Result<bool> {
    match test {
        Some(test) => test.eval(env)?.as_bool(),
        None => Ok(true),
    }
}

/// Read a non-negative count argument.
pub(crate) fn count(value: f64, argument: &str) -> Result<usize> {
    if value.is_finite() && value >= 0.0 {
        Ok(value as usize)
    } else if value == f64::INFINITY {
        Ok(usize::MAX)
    } else {
        Err(Error::InvalidArgument {
            argument: argument.to_string(),
            reason: format!("expected a non-negative count, found {value}"),
        })
    }
}
