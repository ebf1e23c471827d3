//! Runtime seams between the compiler and a concrete evaluator.
//!
//! The language layer never sees concrete values. A caller plugs in a value
//! type ([`RuntimeValue`]), a context ([`EvalContext`]) and a [`Library`] that
//! pairs every declared symbol with its [`Implementation`].
use std::fmt::{self, Debug};

use crate::{
    compiler::CompiledArgs,
    expression::Literal,
    table::{SymbolRef, SymbolTable, SymbolTree},
    utils::{Error, Result},
};

/// Value produced by evaluating a compiled expression.
pub trait RuntimeValue: Clone + Debug + 'static {
    fn from_literal(literal: &Literal) -> Self;

    /// Symbol id carried by this value, if it can act as a dynamic head.
    fn symbol_id(&self) -> Option<&str>;
}

/// Evaluation context threaded through compiled closures.
pub trait EvalContext: Sized + 'static {
    type Value: RuntimeValue;

    /// Library consulted when a dynamic head is resolved at call time.
    fn library(&self) -> &Library<Self>;
}

/// Lazy, keyed access to the arguments of an application.
///
/// Positional arguments are keyed by their decimal index.
pub trait ArgReader<V> {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate the argument named `key`, if supplied.
    fn get(&mut self, key: &str) -> Result<Option<V>>;

    fn at(&mut self, index: usize) -> Result<Option<V>> {
        self.get(&index.to_string())
    }

    fn required(&mut self, key: &str) -> Result<V> {
        self.get(key)?.ok_or_else(|| Error::MissingRuntimeArgument {
            argument: key.to_string(),
        })
    }

    fn required_at(&mut self, index: usize) -> Result<V> {
        self.required(&index.to_string())
    }
}

/// Implementation of a symbol that never touches the context.
pub type StaticFn<V> = fn(&mut dyn ArgReader<V>) -> Result<V>;

/// Implementation of a symbol that reads or iterates the context.
pub type ContextualFn<C> =
    fn(&mut C, &CompiledArgs<C>) -> Result<<C as EvalContext>::Value>;

/// Runtime implementation of a symbol.
///
/// Static implementations are pure functions of their arguments and are
/// folded by the compiler when every argument is constant.
pub enum Implementation<C: EvalContext> {
    Static(StaticFn<C::Value>),
    Contextual(ContextualFn<C>),
}

impl<C: EvalContext> Clone for Implementation<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: EvalContext> Copy for Implementation<C> {}

impl<C: EvalContext> Debug for Implementation<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Implementation::Static(_) => write!(f, "Static"),
            Implementation::Contextual(_) => write!(f, "Contextual"),
        }
    }
}

impl<C: EvalContext> Implementation<C> {
    pub fn is_static(&self) -> bool {
        matches!(self, Implementation::Static(_))
    }

    /// Run the implementation against live arguments.
    pub fn invoke(&self, ctx: &mut C, args: &CompiledArgs<C>) -> Result<C::Value> {
        match self {
            Implementation::Static(f) => f(&mut args.reader(ctx)),
            Implementation::Contextual(f) => f(ctx, args),
        }
    }
}

/// Symbol table paired with runtime implementations.
pub struct Library<C: EvalContext> {
    symbols: SymbolTable,
    implementations: Vec<Implementation<C>>,
}

impl<C: EvalContext> Library<C> {
    pub fn build(roots: impl IntoIterator<Item = SymbolTree<Implementation<C>>>) -> Result<Self> {
        let (symbols, implementations) = SymbolTable::build(roots)?;
        Ok(Self {
            symbols,
            implementations,
        })
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn implementation(&self, symbol_ref: SymbolRef) -> Implementation<C> {
        self.implementations[symbol_ref.index()]
    }

    /// Resolve `id` to its implementation.
    pub fn resolve(&self, id: &str) -> Result<(SymbolRef, Implementation<C>)> {
        let symbol_ref = self
            .symbols
            .resolve(id)
            .ok_or_else(|| Error::SymbolNotFound { id: id.to_string() })?;
        Ok((symbol_ref, self.implementation(symbol_ref)))
    }
}

impl<C: EvalContext> Debug for Library<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Library")
            .field("symbols", &self.symbols.len())
            .finish()
    }
}
