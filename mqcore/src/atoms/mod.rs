//! Atom algebra: the structural values queries produce and consume.
//!
//! An [`set::AtomSet`] is an immutable sorted set of atom indices, an
//! [`selection::AtomSelection`] an ordered sequence of atom sets, and a
//! [`mask::Mask`] a density-adaptive membership predicate over the atom
//! index space.
pub mod mask;
pub mod selection;
pub mod set;

pub use mask::Mask;
pub use selection::{AtomSelection, AtomSelectionSet};
pub use set::AtomSet;
