//! Symbol declarations.
//!
//! A [`Symbol`] is declared with a local `name`; its namespace and `id` are
//! stamped when the symbol table is built from the namespace tree.
use std::collections::BTreeMap;

use crate::{expression::Literal, types::Type};

/// Declared parameter of a symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub ty: Type,
    pub is_optional: bool,
    /// Absorbs every positional argument from its own index onward.
    pub is_rest: bool,
    pub default_value: Option<Literal>,
    pub description: Option<&'static str>,
}

impl Argument {
    pub fn new(ty: Type) -> Self {
        Self {
            ty,
            is_optional: false,
            is_rest: false,
            default_value: None,
            description: None,
        }
    }

    pub fn optional(ty: Type) -> Self {
        Self {
            is_optional: true,
            ..Self::new(ty)
        }
    }

    pub fn rest(ty: Type) -> Self {
        Self {
            is_optional: true,
            is_rest: true,
            ..Self::new(ty)
        }
    }

    /// Optional argument filled with `value` when absent.
    pub fn with_default(ty: Type, value: impl Into<Literal>) -> Self {
        Self {
            is_optional: true,
            default_value: Some(value.into()),
            ..Self::new(ty)
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

/// Argument shape of a symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// The symbol takes no arguments.
    None,
    /// Homogeneous positional list.
    List { element: Type, non_empty: bool },
    /// Named parameters. Positional arguments bind to the keys `"0"`, `"1"`, ...
    Dictionary(BTreeMap<&'static str, Argument>),
}

impl Arguments {
    pub fn list(element: Type) -> Self {
        Arguments::List {
            element,
            non_empty: false,
        }
    }

    pub fn non_empty_list(element: Type) -> Self {
        Arguments::List {
            element,
            non_empty: true,
        }
    }

    pub fn dictionary(params: impl IntoIterator<Item = (&'static str, Argument)>) -> Self {
        Arguments::Dictionary(params.into_iter().collect())
    }

    /// Parameter with the greatest numeric key that is marked as rest.
    pub fn rest_parameter(&self) -> Option<(usize, &Argument)> {
        match self {
            Arguments::Dictionary(params) => params
                .iter()
                .filter(|(_, arg)| arg.is_rest)
                .filter_map(|(key, arg)| key.parse::<usize>().ok().map(|i| (i, arg)))
                .max_by_key(|(i, _)| *i),
            _ => None,
        }
    }
}

/// A named, typed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Dotted namespace path; empty until stamped by the table.
    pub namespace: String,
    pub name: &'static str,
    /// `namespace.name`; empty until stamped by the table.
    pub id: String,
    pub arguments: Arguments,
    pub return_type: Type,
    pub description: Option<&'static str>,
}

impl Symbol {
    pub fn new(name: &'static str, arguments: Arguments, return_type: Type) -> Self {
        Self {
            namespace: String::new(),
            name,
            id: String::new(),
            arguments,
            return_type,
            description: None,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    pub(crate) fn stamp(&mut self, namespace: &str) {
        self.namespace = namespace.to_string();
        self.id = if namespace.is_empty() {
            self.name.to_string()
        } else {
            format!("{namespace}.{}", self.name)
        };
    }
}
