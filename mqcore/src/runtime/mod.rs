//! Concrete evaluation context and values for MolQL queries.
pub mod environment;
pub mod value;

pub use environment::{Environment, SlotGuard, SlotKind};
pub use value::{Value, ValueKey};
