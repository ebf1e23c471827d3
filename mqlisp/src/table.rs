use std::collections::HashMap;

use log::debug;

use crate::{
    symbol::Symbol,
    utils::{Error, Result},
};

/// Nested namespace declaration.
///
/// Leaves carry a payload (typically the runtime implementation) so that a
/// symbol and whatever the caller associates with it are registered together.
#[derive(Debug, Clone)]
pub enum SymbolTree<T> {
    Namespace {
        name: &'static str,
        description: Option<&'static str>,
        children: Vec<SymbolTree<T>>,
    },
    Leaf(Symbol, T),
}

impl<T> SymbolTree<T> {
    pub fn namespace(name: &'static str, children: impl IntoIterator<Item = SymbolTree<T>>) -> Self {
        SymbolTree::Namespace {
            name,
            description: None,
            children: children.into_iter().collect(),
        }
    }

    pub fn described(mut self, text: &'static str) -> Self {
        if let SymbolTree::Namespace { description, .. } = &mut self {
            *description = Some(text);
        }
        self
    }

    pub fn leaf(symbol: Symbol, payload: T) -> Self {
        SymbolTree::Leaf(symbol, payload)
    }
}

/// Opaque index of a symbol inside its [`SymbolTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymbolRef(u32);

impl SymbolRef {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Registry of symbols indexed by id.
///
/// Built once from a namespace tree; read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_id: HashMap<String, SymbolRef>,
}

impl SymbolTable {
    /// Walk `roots` depth-first, stamp every leaf with its dotted id and return
    /// the table together with the leaf payloads, indexed by [`SymbolRef`].
    pub fn build<T>(roots: impl IntoIterator<Item = SymbolTree<T>>) -> Result<(Self, Vec<T>)> {
        let mut table = SymbolTable::default();
        let mut payloads = Vec::new();
        let mut path: Vec<&'static str> = Vec::new();

        for root in roots {
            table.insert_tree(root, &mut path, &mut payloads)?;
        }

        debug!("Built symbol table with {} symbols", table.symbols.len());
        Ok((table, payloads))
    }

    fn insert_tree<T>(
        &mut self,
        tree: SymbolTree<T>,
        path: &mut Vec<&'static str>,
        payloads: &mut Vec<T>,
    ) -> Result<()> {
        match tree {
            SymbolTree::Namespace { name, children, .. } => {
                path.push(name);
                for child in children {
                    self.insert_tree(child, path, payloads)?;
                }
                path.pop();
            }
            SymbolTree::Leaf(mut symbol, payload) => {
                symbol.stamp(&path.join("."));
                if self.by_id.contains_key(&symbol.id) {
                    return Err(Error::DuplicateSymbol { id: symbol.id });
                }

                let symbol_ref = SymbolRef(self.symbols.len() as u32);
                self.by_id.insert(symbol.id.clone(), symbol_ref);
                self.symbols.push(symbol);
                payloads.push(payload);
            }
        }
        Ok(())
    }

    pub fn resolve(&self, id: &str) -> Option<SymbolRef> {
        self.by_id.get(id).copied()
    }

    pub fn get(&self, id: &str) -> Option<&Symbol> {
        self.resolve(id).map(|r| self.symbol(r))
    }

    pub fn symbol(&self, symbol_ref: SymbolRef) -> &Symbol {
        &self.symbols[symbol_ref.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolRef, &Symbol)> {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (SymbolRef(i as u32), s))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
