//! Untyped S-expression AST.
//!
//! An [`Expression`] is either a [`Literal`] or an application of a head to
//! optional arguments. The head is usually a string literal naming a symbol id
//! (`namespace.name`); any other head is a dynamic dispatch whose symbol is only
//! known once the head has been evaluated.
//!
//! The serde representation is the JSON wire form: literals map to JSON scalars
//! and applications to `{ "head": .., "args": [..] | {..} }`.
use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize, Serializer, ser::Error as _};

use crate::types::Type;

/// A literal value of the language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Boolean(bool),
    #[serde(serialize_with = "serialize_finite")]
    Number(f64),
    String(String),
}

/// JSON has no form for NaN or infinities; refuse them instead of writing `null`.
fn serialize_finite<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.is_finite() {
        serializer.serialize_f64(*value)
    } else {
        Err(S::Error::custom(format!("number {value} has no JSON representation")))
    }
}

impl Literal {
    /// Type inferred from the literal's native kind.
    pub fn type_of(&self) -> Type {
        match self {
            Literal::Boolean(_) => Type::BOOL,
            Literal::Number(_) => Type::NUM,
            Literal::String(_) => Type::STR,
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Boolean(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Number(value as f64)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Boolean(b) => write!(f, "{b}"),
            Literal::Number(n) => write!(f, "{n}"),
            Literal::String(s) => write!(f, "{s:?}"),
        }
    }
}

/// Arguments of an application: positional or named.
///
/// Named arguments are kept sorted by key; their order carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Args {
    List(Vec<Expression>),
    Dictionary(BTreeMap<String, Expression>),
}

impl Args {
    pub fn len(&self) -> usize {
        match self {
            Args::List(items) => items.len(),
            Args::Dictionary(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over `(key, expression)` pairs; positional arguments are keyed
    /// by their decimal index.
    pub fn entries(&self) -> Vec<(String, &Expression)> {
        match self {
            Args::List(items) => items
                .iter()
                .enumerate()
                .map(|(i, e)| (i.to_string(), e))
                .collect(),
            Args::Dictionary(items) => items.iter().map(|(k, e)| (k.clone(), e)).collect(),
        }
    }
}

/// Application of a head to arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Apply {
    pub head: Box<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
}

/// Node of the expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expression {
    Literal(Literal),
    Apply(Apply),
}

impl Expression {
    /// Application of the symbol `id` without arguments.
    pub fn symbol(id: impl Into<String>) -> Self {
        Expression::Apply(Apply {
            head: Box::new(Expression::Literal(Literal::String(id.into()))),
            args: None,
        })
    }

    /// Application of the symbol `id` to positional arguments.
    pub fn apply(id: impl Into<String>, args: impl IntoIterator<Item = Expression>) -> Self {
        Self::apply_dynamic(
            Expression::Literal(Literal::String(id.into())),
            Some(Args::List(args.into_iter().collect())),
        )
    }

    /// Application of the symbol `id` to named arguments.
    pub fn apply_named<K: Into<String>>(
        id: impl Into<String>,
        args: impl IntoIterator<Item = (K, Expression)>,
    ) -> Self {
        Self::apply_dynamic(
            Expression::Literal(Literal::String(id.into())),
            Some(Args::Dictionary(
                args.into_iter().map(|(k, e)| (k.into(), e)).collect(),
            )),
        )
    }

    /// Application of an arbitrary head expression.
    pub fn apply_dynamic(head: Expression, args: Option<Args>) -> Self {
        Expression::Apply(Apply {
            head: Box::new(head),
            args,
        })
    }

    /// The symbol id named by this expression when it is a string literal.
    pub fn as_symbol_id(&self) -> Option<&str> {
        match self {
            Expression::Literal(Literal::String(id)) => Some(id),
            _ => None,
        }
    }

    /// The symbol id of an application with a literal head.
    pub fn head_id(&self) -> Option<&str> {
        match self {
            Expression::Apply(apply) => apply.head.as_symbol_id(),
            Expression::Literal(_) => None,
        }
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        match self {
            Expression::Literal(_) => 1,
            Expression::Apply(apply) => {
                1 + apply.head.node_count()
                    + apply.args.as_ref().map_or(0, |args| {
                        args.entries().iter().map(|(_, e)| e.node_count()).sum()
                    })
            }
        }
    }
}

impl From<Literal> for Expression {
    fn from(value: Literal) -> Self {
        Expression::Literal(value)
    }
}

macro_rules! literal_into_expression {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Expression {
                fn from(value: $ty) -> Self {
                    Expression::Literal(Literal::from(value))
                }
            }
        )*
    };
}

literal_into_expression!(bool, f64, i32, &str, String);

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => literal.fmt(f),
            Expression::Apply(Apply { head, args }) => {
                match head.as_symbol_id() {
                    Some(id) => write!(f, "({id}")?,
                    None => write!(f, "({head}")?,
                }
                match args {
                    None => {}
                    Some(Args::List(items)) => {
                        for item in items {
                            write!(f, " {item}")?;
                        }
                    }
                    Some(Args::Dictionary(items)) => {
                        for (key, item) in items {
                            write!(f, " :{key} {item}")?;
                        }
                    }
                }
                write!(f, ")")
            }
        }
    }
}
