//! Compiled MolQL queries.
//!
//! A [`Query`] is type checked and compiled once, then executed against any
//! number of models. Every execution gets its own [`Environment`].
use std::{rc::Rc, sync::Arc};

use log::debug;
use mqlisp::{
    checker::type_check,
    compiler::{Compiled, compile},
    expression::Expression,
    runtime::Library,
    types::Type,
    wire::ExpressionDocument,
};

use crate::{
    atoms::AtomSelection,
    library::{ATOM_SELECTION, library},
    model::Model,
    runtime::{Environment, Value},
    utils::error::MqResult,
};

#[derive(Debug, Clone)]
pub struct Query {
    library: Arc<Library<Environment>>,
    compiled: Compiled<Environment>,
    result_type: Type,
}

impl Query {
    /// Check and compile a query of any result type.
    pub fn compile(expr: &Expression) -> MqResult<Self> {
        Self::compile_with(expr, &Type::Any)
    }

    /// Check and compile a query that must produce an `AtomSelection`.
    pub fn compile_selection(expr: &Expression) -> MqResult<Self> {
        Self::compile_with(expr, &ATOM_SELECTION)
    }

    pub fn compile_with(expr: &Expression, expected: &Type) -> MqResult<Self> {
        let library = library()?;
        let result_type = type_check(library.symbols(), expr, expected)?;
        let compiled = compile(&library, expr)?;
        debug!(
            "Compiled query of type {result_type} ({})",
            if compiled.is_const() { "constant" } else { "dynamic" }
        );
        Ok(Self {
            library,
            compiled,
            result_type,
        })
    }

    pub fn from_document(document: &ExpressionDocument) -> MqResult<Self> {
        if let Some(source) = &document.source {
            debug!("Compiling query document from `{source}`");
        }
        Self::compile(&document.expression)
    }

    /// Decode a JSON expression document and compile it.
    pub fn from_json(json: &str) -> MqResult<Self> {
        Self::from_document(&ExpressionDocument::from_json(json)?)
    }

    /// Type inferred for the result of the query.
    pub fn result_type(&self) -> &Type {
        &self.result_type
    }

    pub fn is_const(&self) -> bool {
        self.compiled.is_const()
    }

    /// Run the query over every atom of `model`.
    pub fn execute(&self, model: &Rc<Model>) -> MqResult<Value> {
        let mut env = Environment::new(self.library.clone(), model.clone());
        self.execute_with(&mut env)
    }

    /// Run the query in an existing environment.
    pub fn execute_with(&self, env: &mut Environment) -> MqResult<Value> {
        Ok(self.compiled.eval(env)?)
    }

    /// Run the query and return its selection; fails with `ValueTypeMismatch`
    /// when the query produces anything else.
    pub fn execute_selection(&self, model: &Rc<Model>) -> MqResult<Rc<AtomSelection>> {
        Ok(self.execute(model)?.into_selection()?)
    }
}
