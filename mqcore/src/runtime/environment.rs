use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
    sync::Arc,
};

use enum_map::{Enum, EnumMap};
use log::{trace, warn};
use mqlisp::{
    runtime::{EvalContext, Library},
    utils::{Error, Result},
};
use strum::IntoStaticStr;

use crate::{
    atoms::{AtomSet, Mask},
    model::{Model, bonds::BondRef},
    runtime::value::Value,
};

/// Kinds of reusable iteration cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum SlotKind {
    Atom,
    AtomSet,
    Bond,
    Accumulator,
}

/// Per-scope iteration cursors and their locks.
#[derive(Default)]
pub struct Slots {
    locks: EnumMap<SlotKind, Cell<bool>>,
    atom: Cell<Option<u32>>,
    atom_set: RefCell<Option<AtomSet>>,
    bond: Cell<Option<BondRef>>,
    accumulator: RefCell<Option<Value>>,
}

impl Slots {
    fn acquire(&self, kind: SlotKind) -> Result<()> {
        let lock = &self.locks[kind];
        if lock.get() {
            return Err(Error::SlotLocked { slot: kind.into() });
        }
        lock.set(true);
        trace!("Locked slot `{}`", <&'static str>::from(kind));
        Ok(())
    }

    fn release(&self, kind: SlotKind) -> Result<()> {
        let lock = &self.locks[kind];
        if !lock.get() {
            return Err(Error::SlotNotLocked { slot: kind.into() });
        }
        lock.set(false);
        match kind {
            SlotKind::Atom => self.atom.set(None),
            SlotKind::AtomSet => *self.atom_set.borrow_mut() = None,
            SlotKind::Bond => self.bond.set(None),
            SlotKind::Accumulator => *self.accumulator.borrow_mut() = None,
        }
        Ok(())
    }

    pub fn is_locked(&self, kind: SlotKind) -> bool {
        self.locks[kind].get()
    }
}

impl fmt::Debug for Slots {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locked: Vec<&'static str> = self
            .locks
            .iter()
            .filter(|(_, lock)| lock.get())
            .map(|(kind, _)| kind.into())
            .collect();
        f.debug_struct("Slots").field("locked", &locked).finish()
    }
}

/// Exclusive access to one slot; the lock is released when the guard drops,
/// including on early returns and errors.
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct SlotGuard {
    slots: Rc<Slots>,
    kind: SlotKind,
}

impl SlotGuard {
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    pub fn set_atom(&self, atom: u32) {
        debug_assert_eq!(self.kind, SlotKind::Atom);
        self.slots.atom.set(Some(atom));
    }

    pub fn set_atom_set(&self, set: AtomSet) {
        debug_assert_eq!(self.kind, SlotKind::AtomSet);
        *self.slots.atom_set.borrow_mut() = Some(set);
    }

    pub fn set_bond(&self, bond: BondRef) {
        debug_assert_eq!(self.kind, SlotKind::Bond);
        self.slots.bond.set(Some(bond));
    }

    pub fn set_accumulator(&self, value: Value) {
        debug_assert_eq!(self.kind, SlotKind::Accumulator);
        *self.slots.accumulator.borrow_mut() = Some(value);
    }
}

impl fmt::Debug for SlotGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SlotGuard").field(&self.kind).finish()
    }
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Err(err) = self.slots.release(self.kind) {
            warn!("{err}");
        }
    }
}

/// Evaluation context of MolQL queries.
///
/// An environment is scoped to one evaluation tree: the model is shared, the
/// mask restricts which atoms generators see, and the slots are fresh for
/// every environment.
pub struct Environment {
    library: Arc<Library<Environment>>,
    model: Rc<Model>,
    mask: Rc<Mask>,
    slots: Rc<Slots>,
}

impl Environment {
    /// Environment over every atom of `model`.
    pub fn new(library: Arc<Library<Environment>>, model: Rc<Model>) -> Self {
        let mask = Mask::all(model.atom_count());
        Self {
            library,
            model,
            mask: Rc::new(mask),
            slots: Rc::new(Slots::default()),
        }
    }

    /// Environment over every atom of `model`, with the MolQL library.
    pub fn for_model(model: Rc<Model>) -> Result<Self> {
        Ok(Self::new(crate::library::library()?, model))
    }

    /// Sub-environment seeing only the atoms of `mask`, with its own slots.
    pub fn restricted(&self, mask: Mask) -> Self {
        Self {
            library: Arc::clone(&self.library),
            model: Rc::clone(&self.model),
            mask: Rc::new(mask),
            slots: Rc::new(Slots::default()),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_rc(&self) -> Rc<Model> {
        Rc::clone(&self.model)
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn mask_rc(&self) -> Rc<Mask> {
        Rc::clone(&self.mask)
    }

    pub fn density_threshold(&self) -> f64 {
        self.model.config().mask_density_threshold
    }

    pub fn slots(&self) -> &Slots {
        &self.slots
    }

    /// Lock the `kind` slot for the lifetime of the returned guard.
    ///
    /// Fails with [`Error::SlotLocked`] when an enclosing iteration of this
    /// environment already owns the slot.
    pub fn lock(&self, kind: SlotKind) -> Result<SlotGuard> {
        self.slots.acquire(kind)?;
        Ok(SlotGuard {
            slots: Rc::clone(&self.slots),
            kind,
        })
    }

    pub fn current_atom(&self) -> Result<u32> {
        self.slots.atom.get().ok_or(Error::SlotEmpty {
            slot: SlotKind::Atom.into(),
        })
    }

    pub fn current_atom_set(&self) -> Result<AtomSet> {
        self.slots.atom_set.borrow().clone().ok_or(Error::SlotEmpty {
            slot: SlotKind::AtomSet.into(),
        })
    }

    pub fn current_bond(&self) -> Result<BondRef> {
        self.slots.bond.get().ok_or(Error::SlotEmpty {
            slot: SlotKind::Bond.into(),
        })
    }

    pub fn accumulator(&self) -> Result<Value> {
        self.slots.accumulator.borrow().clone().ok_or(Error::SlotEmpty {
            slot: SlotKind::Accumulator.into(),
        })
    }
}

impl EvalContext for Environment {
    type Value = Value;

    fn library(&self) -> &Library<Self> {
        &self.library
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("atoms", &self.model.atom_count())
            .field("mask", &self.mask.len())
            .field("slots", &self.slots)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_utils::water_box;

    fn env() -> Environment {
        Environment::for_model(Rc::new(water_box(2))).unwrap()
    }

    #[test]
    fn guard_releases_on_drop() {
        let env = env();
        {
            let guard = env.lock(SlotKind::Atom).unwrap();
            guard.set_atom(3);
            assert_eq!(format!("{guard:?}"), "SlotGuard(Atom)");
            assert_eq!(env.current_atom().unwrap(), 3);
            assert!(env.lock(SlotKind::Atom).unwrap_err().is_slot_locked());
            // Other kinds stay available.
            drop(env.lock(SlotKind::Bond).unwrap());
        }
        assert!(!env.slots().is_locked(SlotKind::Atom));
        assert!(env.current_atom().unwrap_err().is_slot_empty());
    }

    #[test]
    fn released_twice_is_reported() {
        let env = env();
        let err = env.slots().release(SlotKind::Accumulator).unwrap_err();
        assert_eq!(err, Error::SlotNotLocked { slot: "accumulator" });
    }

    #[test]
    fn restricted_environments_have_their_own_slots() {
        let env = env();
        let _guard = env.lock(SlotKind::AtomSet).unwrap();
        let sub = env.restricted(Mask::from_indices([0, 1, 2], env.density_threshold()));
        assert_eq!(sub.mask().len(), 3);
        assert!(sub.lock(SlotKind::AtomSet).is_ok());
    }
}
