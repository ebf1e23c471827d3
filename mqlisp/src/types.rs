//! Structural type algebra.
//!
//! Types are compared structurally: two value types are the same when their
//! namespace and name match, containers additionally compare their child.
//! Type variables carry a bound and are resolved per application by the checker.
use std::fmt;

/// Namespace of the built-in primitive and container types.
pub const CORE_NAMESPACE: &str = "Core";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Top type; also the type of anything whose type is only known at runtime.
    Any,
    /// Any value type (excludes containers and functions).
    AnyValue,
    /// Named value type such as `Num` or `ElementSymbol`.
    Value {
        namespace: &'static str,
        name: &'static str,
    },
    /// Type variable with an upper bound.
    ///
    /// A constraint variable must be instantiated to a single type within one
    /// application; a plain variable widens to the union of what it is bound to.
    Variable {
        name: &'static str,
        bound: Box<Type>,
        is_constraint: bool,
    },
    /// Parameterized container such as `List<T>`.
    Container {
        namespace: &'static str,
        name: &'static str,
        child: Box<Type>,
    },
    /// Flattened, duplicate-free union of at least two members.
    Union(Vec<Type>),
}

impl Type {
    pub const BOOL: Type = Type::Value {
        namespace: CORE_NAMESPACE,
        name: "Bool",
    };
    pub const NUM: Type = Type::Value {
        namespace: CORE_NAMESPACE,
        name: "Num",
    };
    pub const STR: Type = Type::Value {
        namespace: CORE_NAMESPACE,
        name: "Str",
    };

    pub const fn value(namespace: &'static str, name: &'static str) -> Self {
        Type::Value { namespace, name }
    }

    pub fn container(namespace: &'static str, name: &'static str, child: Type) -> Self {
        Type::Container {
            namespace,
            name,
            child: Box::new(child),
        }
    }

    pub fn list(child: Type) -> Self {
        Self::container(CORE_NAMESPACE, "List", child)
    }

    pub fn set(child: Type) -> Self {
        Self::container(CORE_NAMESPACE, "Set", child)
    }

    /// Function producing `child` when applied.
    pub fn func(child: Type) -> Self {
        Self::container(CORE_NAMESPACE, "Fn", child)
    }

    pub fn variable(name: &'static str, bound: Type) -> Self {
        Type::Variable {
            name,
            bound: Box::new(bound),
            is_constraint: false,
        }
    }

    pub fn constraint(name: &'static str, bound: Type) -> Self {
        Type::Variable {
            name,
            bound: Box::new(bound),
            is_constraint: true,
        }
    }

    /// Union of `members`.
    ///
    /// Nested unions are flattened and duplicates removed. A union of a single
    /// type is that type; an empty union is `Any`.
    pub fn union(members: impl IntoIterator<Item = Type>) -> Self {
        let mut flat: Vec<Type> = Vec::new();
        for member in members {
            match member {
                Type::Union(inner) => {
                    for ty in inner {
                        if !flat.contains(&ty) {
                            flat.push(ty);
                        }
                    }
                }
                ty => {
                    if !flat.contains(&ty) {
                        flat.push(ty);
                    }
                }
            }
        }

        match flat.len() {
            0 => Type::Any,
            1 => flat.pop().unwrap_or(Type::Any),
            _ => Type::Union(flat),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, Type::Value { .. } | Type::AnyValue)
    }

    /// Whether a type variable occurs anywhere in this type.
    pub fn has_variables(&self) -> bool {
        match self {
            Type::Variable { .. } => true,
            Type::Container { child, .. } => child.has_variables(),
            Type::Union(members) => members.iter().any(Type::has_variables),
            Type::Any | Type::AnyValue | Type::Value { .. } => false,
        }
    }

    /// Child type of a container, if any.
    pub fn child(&self) -> Option<&Type> {
        match self {
            Type::Container { child, .. } => Some(child),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Any => write!(f, "Any"),
            Type::AnyValue => write!(f, "AnyValue"),
            Type::Value { name, .. } => write!(f, "{name}"),
            Type::Variable { name, bound, .. } => match bound.as_ref() {
                Type::Any => write!(f, "{name}"),
                bound => write!(f, "{name}: {bound}"),
            },
            Type::Container { name, child, .. } => write!(f, "{name}<{child}>"),
            Type::Union(members) => {
                for (i, member) in members.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    write!(f, "{member}")?;
                }
                Ok(())
            }
        }
    }
}
