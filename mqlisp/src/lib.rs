//! Mqlisp: the typed mini-lisp underneath MolQL.
//!
//! The crate is independent of molecules. It provides the untyped S-expression
//! AST, a structural type algebra with type variables, a namespaced symbol
//! registry, a unification-based type checker and a compiler that turns an
//! expression into a tree of closures evaluated against a caller-defined
//! context.
//!
//! Pipeline
//!  - A front-end (or [`wire::ExpressionDocument::from_json`]) produces an [`expression::Expression`].
//!  - [`checker::type_check`] validates it against a [`table::SymbolTable`].
//!  - [`compiler::compile`] produces a [`compiler::Compiled`] closure tree, folding
//!    applications of static symbols whose arguments are all constant.
//!  - The caller evaluates the result with any context implementing [`runtime::EvalContext`].
//!
//! Example
//! ```
//! use mqlisp::expression::Expression;
//! use mqlisp::wire::ExpressionDocument;
//!
//! let expr = Expression::apply("core.math.add", [Expression::from(1.0), Expression::from(2.0)]);
//! let json = ExpressionDocument::new(expr.clone()).to_json().unwrap();
//! assert_eq!(ExpressionDocument::from_json(&json).unwrap().expression, expr);
//! ```

/// Unification-based type checker.
pub mod checker;
/// Expression compiler producing closure trees.
pub mod compiler;
/// Untyped expression AST and builders.
pub mod expression;
/// Runtime seams: values, contexts, implementations and libraries.
pub mod runtime;
/// Symbol declarations and argument shapes.
pub mod symbol;
/// Namespaced symbol registry.
pub mod table;
/// Structural type algebra.
pub mod types;
/// Error taxonomy shared by every stage.
pub mod utils;
/// Versioned JSON document format for expressions.
pub mod wire;

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::checker::type_check;
    pub use crate::compiler::{Compiled, CompiledArgs, compile};
    pub use crate::expression::{Args, Expression, Literal};
    pub use crate::runtime::{ArgReader, EvalContext, Implementation, Library, RuntimeValue};
    pub use crate::symbol::{Argument, Arguments, Symbol};
    pub use crate::table::{SymbolRef, SymbolTable, SymbolTree};
    pub use crate::types::Type;
    pub use crate::utils::{Error, Result};
    pub use crate::wire::ExpressionDocument;
}
