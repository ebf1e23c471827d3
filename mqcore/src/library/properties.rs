//! Structural value types and the atom and bond properties read through the
//! environment slots.
//!
//! Properties take no argument: they read the atom (or bond) currently bound
//! by the enclosing iteration and fail with `SlotEmpty` outside of one.
use std::str::FromStr;

use mqlisp::{
    runtime::ArgReader,
    symbol::{Argument, Arguments, Symbol},
    table::SymbolTree,
    types::Type,
    utils::{Error, Result},
};

use super::{ATOM_NAME, ELEMENT_SYMBOL, ENTITY_TYPE, RING_FINGERPRINT, Tree, contextual, pure};
use crate::{
    model::{EntityType, Model, elements, rings::canonical_fingerprint},
    runtime::Value,
};

pub(super) fn type_tree() -> Tree {
    let one = |ty: Type| Arguments::dictionary([("0", Argument::new(ty))]);

    SymbolTree::namespace(
        "type",
        [
            pure(
                Symbol::new("element-symbol", one(Type::STR), ELEMENT_SYMBOL)
                    .describe("Element symbol, normalized to upper case."),
                |args| Ok(Value::str(&elements::normalize(args.required_at(0)?.as_str()?))),
            ),
            pure(
                Symbol::new("atom-name", one(Type::STR), ATOM_NAME)
                    .describe("Atom name, normalized to upper case."),
                |args| Ok(Value::str(&args.required_at(0)?.as_str()?.trim().to_ascii_uppercase())),
            ),
            pure(
                Symbol::new("entity-type", one(Type::STR), ENTITY_TYPE)
                    .describe("One of polymer, non-polymer, branched, water, unknown."),
                entity_type,
            ),
            pure(
                Symbol::new(
                    "ring-fingerprint",
                    Arguments::non_empty_list(ELEMENT_SYMBOL),
                    RING_FINGERPRINT,
                )
                .describe("Canonical fingerprint of the ring with the given elements in cycle order."),
                ring_fingerprint,
            ),
        ],
    )
}

fn entity_type(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let value = args.required_at(0)?;
    let kind = EntityType::from_str(value.as_str()?.trim()).map_err(|_| Error::InvalidArgument {
        argument: "0".to_string(),
        reason: format!("unknown entity type '{}'", value),
    })?;
    Ok(Value::str(&kind.to_string()))
}

fn ring_fingerprint(args: &mut dyn ArgReader<Value>) -> Result<Value> {
    let mut elements = Vec::with_capacity(args.len());
    for i in 0..args.len() {
        elements.push(args.required_at(i)?.as_str()?.to_string());
    }
    Ok(Value::str(&canonical_fingerprint(&elements)))
}

/// Register per-atom properties. Each leaf reads the current atom slot and
/// applies the accessor to it.
macro_rules! atom_properties {
    ($namespace:literal, [$($name:literal : $ty:expr => $f:expr),* $(,)?]) => {
        SymbolTree::namespace(
            $namespace,
            [$(
                contextual(Symbol::new($name, Arguments::None, $ty), |env, _| {
                    let read: fn(&Model, u32) -> Value = $f;
                    Ok(read(env.model(), env.current_atom()?))
                })
            ),*],
        )
    };
}

pub(super) fn atom_tree() -> Tree {
    SymbolTree::namespace(
        "atom-property",
        [
            atom_properties!("core", [
                "element-symbol": ELEMENT_SYMBOL => |m, a| Value::str(&elements::normalize(m.element(a))),
                "x": Type::NUM => |m, a| Value::Num(m.position(a).x),
                "y": Type::NUM => |m, a| Value::Num(m.position(a).y),
                "z": Type::NUM => |m, a| Value::Num(m.position(a).z),
                "atom-key": Type::NUM => |_, a| Value::Num(a as f64),
                "source-index": Type::NUM => |m, a| Value::Num(m.row_of(a) as f64),
                "bond-count": Type::NUM => |m, a| Value::Num(m.bonds().degree(a) as f64),
            ]),
            atom_properties!("topology", [
                "connected-component-key": Type::NUM => |m, a| Value::Num(m.component_of(a) as f64),
                "in-ring": Type::BOOL => |m, a| Value::Bool(m.rings().is_in_ring(a)),
            ]),
            atom_properties!("macromolecular", [
                "id": Type::NUM => |m, a| Value::Num(m.columns().id[m.row_of(a)] as f64),
                "label_atom_id": ATOM_NAME => |m, a| Value::str(m.atom_name(a)),
                "label_comp_id": Type::STR => |m, a| Value::str(&m.residues()[m.residue_of(a)].label_comp_id),
                "label_seq_id": Type::NUM => |m, a| Value::Num(m.residues()[m.residue_of(a)].label_seq_id as f64),
                "auth_seq_id": Type::NUM => |m, a| Value::Num(m.residues()[m.residue_of(a)].auth_seq_id as f64),
                "label_asym_id": Type::STR => |m, a| Value::str(&m.chains()[m.chain_of(a)].label_asym_id),
                "auth_asym_id": Type::STR => |m, a| Value::str(&m.chains()[m.chain_of(a)].auth_asym_id),
                "label_entity_id": Type::STR => |m, a| Value::str(&m.entities()[m.entity_of(a)].id),
                "B_iso_or_equiv": Type::NUM => |m, a| Value::Num(m.columns().b_iso_or_equiv[m.row_of(a)]),
                "occupancy": Type::NUM => |m, a| Value::Num(m.columns().occupancy[m.row_of(a)]),
                "residue-key": Type::NUM => |m, a| Value::Num(m.residue_of(a) as f64),
                "chain-key": Type::NUM => |m, a| Value::Num(m.chain_of(a) as f64),
                "entity-key": Type::NUM => |m, a| Value::Num(m.entity_of(a) as f64),
                "entity-type": ENTITY_TYPE => |m, a| Value::str(m.entities()[m.entity_of(a)].entity_type.to_string().as_str()),
            ]),
        ],
    )
}

pub(super) fn bond_tree() -> Tree {
    SymbolTree::namespace(
        "bond-property",
        [
            contextual(
                Symbol::new("order", Arguments::None, Type::NUM).describe("Order of the current bond."),
                |env, _| Ok(Value::Num(env.current_bond()?.bond.order as f64)),
            ),
            contextual(
                Symbol::new("length", Arguments::None, Type::NUM)
                    .describe("Distance between the two atoms of the current bond."),
                |env, _| {
                    let bond = env.current_bond()?;
                    let model = env.model();
                    Ok(Value::Num(nalgebra::distance(
                        model.position(bond.a),
                        model.position(bond.b),
                    )))
                },
            ),
        ],
    )
}
