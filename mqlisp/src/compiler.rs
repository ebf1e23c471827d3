//! Expression compiler.
//!
//! [`compile`] turns an expression into a tree of [`Compiled`] nodes. A node is
//! either a constant or a closure over the context. Applications of static
//! symbols whose arguments are all constant are evaluated once, at compile
//! time; nothing else is optimized.
use std::{collections::BTreeMap, fmt, rc::Rc};

use log::{debug, trace};

use crate::{
    expression::{Apply, Args, Expression},
    runtime::{ArgReader, EvalContext, Implementation, Library, RuntimeValue},
    symbol::{Argument, Arguments},
    utils::{Error, Result},
};

type Closure<C> = Rc<dyn Fn(&mut C) -> Result<<C as EvalContext>::Value>>;

/// A compiled expression.
pub enum Compiled<C: EvalContext> {
    Const(C::Value),
    Dynamic(Closure<C>),
}

impl<C: EvalContext> Clone for Compiled<C> {
    fn clone(&self) -> Self {
        match self {
            Compiled::Const(value) => Compiled::Const(value.clone()),
            Compiled::Dynamic(f) => Compiled::Dynamic(Rc::clone(f)),
        }
    }
}

impl<C: EvalContext> fmt::Debug for Compiled<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compiled::Const(value) => f.debug_tuple("Const").field(value).finish(),
            Compiled::Dynamic(_) => write!(f, "Dynamic"),
        }
    }
}

impl<C: EvalContext> Compiled<C> {
    pub fn from_fn(f: impl Fn(&mut C) -> Result<C::Value> + 'static) -> Self {
        Compiled::Dynamic(Rc::new(f))
    }

    pub fn is_const(&self) -> bool {
        matches!(self, Compiled::Const(_))
    }

    pub fn constant(&self) -> Option<&C::Value> {
        match self {
            Compiled::Const(value) => Some(value),
            Compiled::Dynamic(_) => None,
        }
    }

    pub fn eval(&self, ctx: &mut C) -> Result<C::Value> {
        match self {
            Compiled::Const(value) => Ok(value.clone()),
            Compiled::Dynamic(f) => f(ctx),
        }
    }
}

/// Compiled arguments of an application.
///
/// Arguments of dictionary-shaped symbols are always stored as a dictionary,
/// with positional arguments keyed `"0"`, `"1"`, ... and defaults of omitted
/// optional arguments filled in as constants.
pub enum CompiledArgs<C: EvalContext> {
    None,
    List(Vec<Compiled<C>>),
    Dictionary(BTreeMap<String, Compiled<C>>),
}

impl<C: EvalContext> Clone for CompiledArgs<C> {
    fn clone(&self) -> Self {
        match self {
            CompiledArgs::None => CompiledArgs::None,
            CompiledArgs::List(items) => CompiledArgs::List(items.clone()),
            CompiledArgs::Dictionary(items) => CompiledArgs::Dictionary(items.clone()),
        }
    }
}

impl<C: EvalContext> fmt::Debug for CompiledArgs<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompiledArgs::None => write!(f, "None"),
            CompiledArgs::List(items) => f.debug_list().entries(items).finish(),
            CompiledArgs::Dictionary(items) => f.debug_map().entries(items).finish(),
        }
    }
}

impl<C: EvalContext> CompiledArgs<C> {
    pub fn len(&self) -> usize {
        match self {
            CompiledArgs::None => 0,
            CompiledArgs::List(items) => items.len(),
            CompiledArgs::Dictionary(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<&Compiled<C>> {
        match self {
            CompiledArgs::None => None,
            CompiledArgs::List(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            CompiledArgs::Dictionary(items) => items.get(key),
        }
    }

    pub fn at(&self, index: usize) -> Option<&Compiled<C>> {
        match self {
            CompiledArgs::None => None,
            CompiledArgs::List(items) => items.get(index),
            CompiledArgs::Dictionary(items) => items.get(&index.to_string()),
        }
    }

    /// Positional arguments in index order.
    pub fn positional(&self) -> Vec<&Compiled<C>> {
        match self {
            CompiledArgs::None => Vec::new(),
            CompiledArgs::List(items) => items.iter().collect(),
            CompiledArgs::Dictionary(items) => {
                let mut indexed: Vec<(usize, &Compiled<C>)> = items
                    .iter()
                    .filter_map(|(key, c)| key.parse::<usize>().ok().map(|i| (i, c)))
                    .collect();
                indexed.sort_by_key(|(i, _)| *i);
                indexed.into_iter().map(|(_, c)| c).collect()
            }
        }
    }

    pub fn all_const(&self) -> bool {
        match self {
            CompiledArgs::None => true,
            CompiledArgs::List(items) => items.iter().all(Compiled::is_const),
            CompiledArgs::Dictionary(items) => items.values().all(Compiled::is_const),
        }
    }

    /// Evaluate a required argument.
    pub fn eval(&self, ctx: &mut C, key: &str) -> Result<C::Value> {
        self.eval_opt(ctx, key)?
            .ok_or_else(|| Error::MissingRuntimeArgument {
                argument: key.to_string(),
            })
    }

    pub fn eval_opt(&self, ctx: &mut C, key: &str) -> Result<Option<C::Value>> {
        self.get(key).map(|c| c.eval(ctx)).transpose()
    }

    pub fn eval_at(&self, ctx: &mut C, index: usize) -> Result<C::Value> {
        match self.at(index) {
            Some(c) => c.eval(ctx),
            None => Err(Error::MissingRuntimeArgument {
                argument: index.to_string(),
            }),
        }
    }

    /// Arguments laid out for `shape`: positional for list shapes, keyed for
    /// dictionary shapes with the defaults of omitted parameters filled in.
    pub fn with_defaults(&self, shape: &Arguments) -> Self {
        match shape {
            Arguments::None => self.clone(),
            Arguments::List { .. } => {
                CompiledArgs::List(self.positional().into_iter().cloned().collect())
            }
            Arguments::Dictionary(params) => {
                let mut items = match self {
                    CompiledArgs::None => BTreeMap::new(),
                    CompiledArgs::List(items) => items
                        .iter()
                        .enumerate()
                        .map(|(i, c)| (i.to_string(), c.clone()))
                        .collect(),
                    CompiledArgs::Dictionary(items) => items.clone(),
                };
                fill_defaults(&mut items, params);
                CompiledArgs::Dictionary(items)
            }
        }
    }

    /// Argument reader evaluating lazily against `ctx`.
    pub fn reader<'a>(&'a self, ctx: &'a mut C) -> LiveArgs<'a, C> {
        LiveArgs { ctx, args: self }
    }
}

/// [`ArgReader`] over compiled arguments evaluated against a live context.
pub struct LiveArgs<'a, C: EvalContext> {
    ctx: &'a mut C,
    args: &'a CompiledArgs<C>,
}

impl<C: EvalContext> ArgReader<C::Value> for LiveArgs<'_, C> {
    fn len(&self) -> usize {
        self.args.len()
    }

    fn get(&mut self, key: &str) -> Result<Option<C::Value>> {
        self.args.eval_opt(self.ctx, key)
    }
}

/// [`ArgReader`] over arguments that are all constant; used for folding.
struct ConstArgs<'a, C: EvalContext> {
    args: &'a CompiledArgs<C>,
}

impl<C: EvalContext> ArgReader<C::Value> for ConstArgs<'_, C> {
    fn len(&self) -> usize {
        self.args.len()
    }

    fn get(&mut self, key: &str) -> Result<Option<C::Value>> {
        Ok(self.args.get(key).and_then(Compiled::constant).cloned())
    }
}

/// Compile `expr` against the symbols and implementations of `library`.
///
/// Symbols named by literal heads are resolved here; an unknown id is a
/// [`Error::SymbolNotFound`]. Dynamic heads are resolved on every call against
/// the library of the context the closure is evaluated with.
pub fn compile<C: EvalContext>(library: &Library<C>, expr: &Expression) -> Result<Compiled<C>> {
    let (head, args) = match expr {
        Expression::Literal(literal) => {
            return Ok(Compiled::Const(C::Value::from_literal(literal)));
        }
        Expression::Apply(Apply { head, args }) => (head, args),
    };

    match head.as_symbol_id() {
        Some(id) => {
            let (symbol_ref, implementation) = library.resolve(id)?;
            let symbol = library.symbols().symbol(symbol_ref);
            let args = compile_args(library, &symbol.arguments, args.as_ref())?;

            match implementation {
                Implementation::Static(f) if args.all_const() => {
                    let value = f(&mut ConstArgs { args: &args })?;
                    debug!("Folded application of `{}` into a constant", symbol.id);
                    Ok(Compiled::Const(value))
                }
                implementation => {
                    trace!("Compiled application of `{}` ({implementation:?})", symbol.id);
                    let args = Rc::new(args);
                    Ok(Compiled::from_fn(move |ctx: &mut C| {
                        implementation.invoke(ctx, &args)
                    }))
                }
            }
        }
        None => {
            let head = compile(library, head)?;
            let args = Rc::new(compile_untyped_args(library, args.as_ref())?);
            Ok(Compiled::from_fn(move |ctx: &mut C| {
                let value = head.eval(ctx)?;
                let id = value.symbol_id().ok_or_else(|| Error::NotASymbol {
                    found: format!("{value:?}"),
                })?;
                let (symbol_ref, implementation) = ctx.library().resolve(id)?;
                let shape = &ctx.library().symbols().symbol(symbol_ref).arguments;
                let args = args.with_defaults(shape);
                implementation.invoke(ctx, &args)
            }))
        }
    }
}

fn compile_args<C: EvalContext>(
    library: &Library<C>,
    shape: &Arguments,
    args: Option<&Args>,
) -> Result<CompiledArgs<C>> {
    match shape {
        Arguments::None => compile_untyped_args(library, args),
        Arguments::List { .. } => {
            let mut indexed = match args {
                None => Vec::new(),
                Some(args) => args
                    .entries()
                    .into_iter()
                    .filter_map(|(key, e)| key.parse::<usize>().ok().map(|i| (i, e)))
                    .collect(),
            };
            indexed.sort_by_key(|(i, _)| *i);
            let items = indexed
                .into_iter()
                .map(|(_, e)| compile(library, e))
                .collect::<Result<Vec<_>>>()?;
            Ok(CompiledArgs::List(items))
        }
        Arguments::Dictionary(params) => {
            let mut items = BTreeMap::new();
            if let Some(args) = args {
                for (key, e) in args.entries() {
                    items.insert(key, compile(library, e)?);
                }
            }
            fill_defaults(&mut items, params);
            Ok(CompiledArgs::Dictionary(items))
        }
    }
}

fn fill_defaults<C: EvalContext>(
    items: &mut BTreeMap<String, Compiled<C>>,
    params: &BTreeMap<&'static str, Argument>,
) {
    for (key, param) in params {
        if let Some(default) = &param.default_value {
            items
                .entry(key.to_string())
                .or_insert_with(|| Compiled::Const(C::Value::from_literal(default)));
        }
    }
}

fn compile_untyped_args<C: EvalContext>(
    library: &Library<C>,
    args: Option<&Args>,
) -> Result<CompiledArgs<C>> {
    match args {
        None => Ok(CompiledArgs::None),
        Some(Args::List(items)) => Ok(CompiledArgs::List(
            items
                .iter()
                .map(|e| compile(library, e))
                .collect::<Result<_>>()?,
        )),
        Some(Args::Dictionary(items)) => Ok(CompiledArgs::Dictionary(
            items
                .iter()
                .map(|(key, e)| -> Result<(String, Compiled<C>)> {
                    Ok((key.clone(), compile(library, e)?))
                })
                .collect::<Result<_>>()?,
        )),
    }
}
