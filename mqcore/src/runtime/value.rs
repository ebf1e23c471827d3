use std::{collections::HashSet, fmt, rc::Rc};

use mqlisp::{compiler::Compiled, expression::Literal, runtime::RuntimeValue, utils::Error};
use strum::{EnumIs, IntoStaticStr};

use crate::{
    atoms::{AtomSelection, AtomSet},
    runtime::environment::Environment,
};

type Result<T> = mqlisp::utils::Result<T>;

/// Value produced by evaluating a MolQL expression.
///
/// Domain value types (element symbols, atom names, entity types, ring
/// fingerprints) are carried as strings.
#[derive(Debug, Clone, EnumIs, IntoStaticStr)]
pub enum Value {
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    List(Rc<Vec<Value>>),
    Set(Rc<HashSet<ValueKey>>),
    AtomSet(AtomSet),
    AtomSelection(Rc<AtomSelection>),
    Fn(Rc<Compiled<Environment>>),
}

/// Hashable projection of a scalar [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Bool(bool),
    /// Bit pattern of the number, with `-0.0` folded onto `0.0`.
    Num(u64),
    Str(Rc<str>),
}

impl ValueKey {
    pub fn num(value: f64) -> Self {
        ValueKey::Num(if value == 0.0 { 0.0f64.to_bits() } else { value.to_bits() })
    }

    pub fn to_value(&self) -> Value {
        match self {
            ValueKey::Bool(b) => Value::Bool(*b),
            ValueKey::Num(bits) => Value::Num(f64::from_bits(*bits)),
            ValueKey::Str(s) => Value::Str(Rc::clone(s)),
        }
    }
}

impl Value {
    pub fn str(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(items))
    }

    pub fn selection(selection: AtomSelection) -> Self {
        Value::AtomSelection(Rc::new(selection))
    }

    pub fn kind(&self) -> &'static str {
        self.into()
    }

    fn mismatch<T>(&self, expected: &'static str) -> Result<T> {
        Err(Error::ValueTypeMismatch {
            expected,
            found: format!("{} ({self})", self.kind()),
        })
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => other.mismatch("Bool"),
        }
    }

    pub fn as_num(&self) -> Result<f64> {
        match self {
            Value::Num(n) => Ok(*n),
            other => other.mismatch("Num"),
        }
    }

    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::Str(s) => Ok(s),
            other => other.mismatch("Str"),
        }
    }

    pub fn as_list(&self) -> Result<&[Value]> {
        match self {
            Value::List(items) => Ok(items),
            other => other.mismatch("List"),
        }
    }

    pub fn as_set(&self) -> Result<&HashSet<ValueKey>> {
        match self {
            Value::Set(set) => Ok(set),
            other => other.mismatch("Set"),
        }
    }

    pub fn as_atom_set(&self) -> Result<&AtomSet> {
        match self {
            Value::AtomSet(set) => Ok(set),
            other => other.mismatch("AtomSet"),
        }
    }

    pub fn as_selection(&self) -> Result<&AtomSelection> {
        match self {
            Value::AtomSelection(selection) => Ok(selection),
            other => other.mismatch("AtomSelection"),
        }
    }

    pub fn into_selection(self) -> Result<Rc<AtomSelection>> {
        match self {
            Value::AtomSelection(selection) => Ok(selection),
            other => other.mismatch("AtomSelection"),
        }
    }

    pub fn as_fn(&self) -> Result<&Rc<Compiled<Environment>>> {
        match self {
            Value::Fn(f) => Ok(f),
            other => other.mismatch("Fn"),
        }
    }

    /// Hashable key of a scalar value; containers and atom values have none.
    pub fn key(&self) -> Result<ValueKey> {
        match self {
            Value::Bool(b) => Ok(ValueKey::Bool(*b)),
            Value::Num(n) => Ok(ValueKey::num(*n)),
            Value::Str(s) => Ok(ValueKey::Str(Rc::clone(s))),
            other => Err(Error::NotImplemented {
                feature: format!("Using a {} value as a set member or grouping key", other.kind()),
            }),
        }
    }

    /// Structural equality. Functions are equal only to themselves.
    pub fn equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Num(a), Value::Num(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.equals(y))
            }
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::AtomSet(a), Value::AtomSet(b)) => a == b,
            (Value::AtomSelection(a), Value::AtomSelection(b)) => a == b,
            (Value::Fn(a), Value::Fn(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// JSON rendering of the value, for hosts that report results as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Bool(b) => Json::Bool(*b),
            Value::Num(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::Str(s) => Json::String(s.to_string()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Set(set) => Json::Array(set.iter().map(|k| k.to_value().to_json()).collect()),
            Value::AtomSet(set) => Json::from(set.indices().to_vec()),
            Value::AtomSelection(selection) => Json::Array(
                selection
                    .iter()
                    .map(|s| Json::from(s.indices().to_vec()))
                    .collect(),
            ),
            Value::Fn(_) => Json::Null,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Num(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Set(set) => write!(f, "<set of {}>", set.len()),
            Value::AtomSet(set) => write!(f, "{set:?}"),
            Value::AtomSelection(selection) => write!(f, "<selection of {}>", selection.len()),
            Value::Fn(_) => write!(f, "<fn>"),
        }
    }
}

impl RuntimeValue for Value {
    fn from_literal(literal: &Literal) -> Self {
        match literal {
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Num(*n),
            Literal::String(s) => Value::str(s),
        }
    }

    fn symbol_id(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Num(value)
    }
}

impl From<AtomSelection> for Value {
    fn from(value: AtomSelection) -> Self {
        Value::selection(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_fold_signed_zero() {
        assert_eq!(Value::Num(-0.0).key().unwrap(), Value::Num(0.0).key().unwrap());
        assert!(Value::list(vec![]).key().unwrap_err().is_not_implemented());
    }

    #[test]
    fn accessors_report_the_found_kind() {
        let err = Value::str("CA").as_num().unwrap_err();
        match err {
            Error::ValueTypeMismatch { expected, found } => {
                assert_eq!(expected, "Num");
                assert!(found.starts_with("Str"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn numbers_print_without_trailing_zero() {
        assert_eq!(Value::Num(3.0).to_string(), "3");
        assert_eq!(Value::list(vec![Value::Num(1.5), Value::Bool(true)]).to_string(), "[1.5, true]");
    }

    #[test]
    fn json_rendering() {
        let selection = AtomSelection::new(vec![AtomSet::single(2)]);
        assert_eq!(Value::selection(selection).to_json(), serde_json::json!([[2]]));
        assert_eq!(Value::Num(0.5).to_json(), serde_json::json!(0.5));
    }
}
