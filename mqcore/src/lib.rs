//! Structural runtime of MolQL.
//!
//! This crate plugs a concrete evaluator into the language layer of `mqlisp`:
//! a read-only molecular [`model::Model`], the atom algebra of [`atoms`]
//! (atom sets, selections and masks), the evaluation [`runtime`] with its
//! slot discipline, and the symbol [`library`] implementing every MolQL
//! symbol. Most consumers only need [`query::Query`].
//!
//! ```ignore
//! use mqcore::query::Query;
//! use mqlisp::expression::Expression;
//!
//! let query = Query::compile_selection(&Expression::symbol("structure-query.generator.atom-groups"))?;
//! let selection = query.execute_selection(&model)?;
//! ```

pub mod atoms;
pub mod base;
pub mod library;
pub mod magic;
pub mod model;
pub mod query;
pub mod runtime;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod utils;

pub extern crate mqlisp;
