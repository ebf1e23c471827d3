use semver::{Version, VersionReq};
use strum::{EnumIs, EnumTryAs};
use thiserror::Error;

use crate::types::Type;

/// Every failure the language layer can report.
///
/// Variants are grouped by the stage that raises them: shape and type errors come
/// from the checker and block compilation, dispatch and slot errors are raised while
/// evaluating, and wire errors while decoding documents. None of them is recoverable
/// by the layer that produced it; they are surfaced to the immediate caller.
#[derive(Debug, Clone, PartialEq, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// The head of an application names a symbol absent from the table.
    #[error("Symbol `{id}` is not defined in the symbol table.")]
    UnknownSymbol { id: String },

    /// Arguments were supplied to a symbol that declares none.
    #[error("Symbol `{symbol}` takes no arguments, but {count} were supplied.")]
    UnexpectedArguments { symbol: String, count: usize },

    /// More positional arguments than the symbol declares.
    #[error(
        "Symbol `{symbol}` accepts at most {max} positional arguments, but {count} were supplied."
    )]
    TooManyArguments {
        symbol: String,
        max: usize,
        count: usize,
    },

    /// A named argument the symbol does not declare.
    #[error("Symbol `{symbol}` has no argument named `{argument}`.")]
    UnknownArgument { symbol: String, argument: String },

    /// A required argument was left out.
    #[error("Symbol `{symbol}` requires argument `{argument}`, which was not supplied.")]
    MissingArgument { symbol: String, argument: String },

    /// A list-shaped symbol declared as non-empty received no argument.
    #[error("Symbol `{symbol}` requires a non-empty argument list.")]
    EmptyArgumentList { symbol: String },

    /// An argument's type cannot be assigned to the declared parameter type.
    #[error(
        "Argument `{argument}` of symbol `{symbol}` expects type `{expected}`, found `{found}`."
    )]
    TypeMismatch {
        symbol: String,
        argument: String,
        expected: Type,
        found: Type,
    },

    /// The type of the whole expression does not fit the caller's expectation.
    #[error("Expression of type `{found}` cannot be used where `{expected}` is expected.")]
    ResultTypeMismatch { expected: Type, found: Type },

    /// Two leaves of the namespace tree computed the same id.
    #[error("Symbol id `{id}` is declared more than once.")]
    DuplicateSymbol { id: String },

    /// A symbol could not be resolved while compiling or evaluating.
    #[error("Symbol `{id}` not found.")]
    SymbolNotFound { id: String },

    /// A dynamic head evaluated to something that is not a symbol id.
    #[error("Dynamic head evaluated to `{found}`, which does not name a symbol.")]
    NotASymbol { found: String },

    /// Iteration attempted on a slot another iteration still owns.
    #[error("Slot `{slot}` is already locked.")]
    SlotLocked { slot: &'static str },

    /// A slot was released without having been locked.
    #[error("Slot `{slot}` was released without being locked.")]
    SlotNotLocked { slot: &'static str },

    /// A slot was read while no iteration had populated it.
    #[error("Slot `{slot}` holds no value; it can only be read inside an iteration.")]
    SlotEmpty { slot: &'static str },

    /// A runtime path that is explicitly not supported.
    #[error("{feature} is not implemented.")]
    NotImplemented { feature: String },

    /// A runtime value did not have the kind an implementation required.
    #[error("Expected a value of type `{expected}`, found `{found}`.")]
    ValueTypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// An implementation asked for an argument the application did not carry.
    #[error("Runtime argument `{argument}` was not supplied.")]
    MissingRuntimeArgument { argument: String },

    /// An argument value is out of the range an implementation accepts.
    #[error("Invalid value for argument `{argument}`: {reason}")]
    InvalidArgument { argument: String, reason: String },

    /// The document declares a format version outside the supported range.
    #[error("Expression document version {version} is not compatible with {required}.")]
    IncompatibleVersion {
        version: Version,
        required: VersionReq,
    },

    /// The document could not be encoded or decoded.
    #[error("Failed to (de)serialize expression document: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, Error>;
