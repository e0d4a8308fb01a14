//! Rebuilding trees of the loaded grammar from reductions of the lowered one.

use crate::ast::{Kind, Node, NodeStore};
use crate::schema::Schema;
use lr_grammar_model::lower::{Derivation, LoweredGrammar, SymbolId};

/// Turns shifted tokens into leaves and reductions into trees.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    derivations: Vec<Derivation>,
    /// Kind built by each production, if its derivation names one.
    kinds: Vec<Option<Kind>>,
    terminals: Vec<Option<Kind>>,
}

impl TreeBuilder {
    pub fn new(lowered: &LoweredGrammar, schema: &Schema) -> Self {
        Self {
            derivations: lowered.derivations().to_vec(),
            kinds: lowered
                .derivations()
                .iter()
                .map(|d| schema.kind(&d.name))
                .collect(),
            terminals: lowered
                .terminals()
                .iter()
                .map(|t| schema.kind(t))
                .collect(),
        }
    }

    pub fn leaf(&self, store: &mut NodeStore, terminal: SymbolId, text: &str) -> Node {
        match self.terminals[terminal.0] {
            Some(kind) => store.leaf(kind, text),
            None => panic!("terminal {} has no node kind", terminal.0),
        }
    }

    /// Builds the value of a reduction by production `p` over the values
    /// popped for its right hand side.
    ///
    /// A single child with nothing omitted passes through unchanged. Otherwise
    /// `nothing` goes back into every omitted slot, in ascending order so
    /// each slot is an index into the final list. A collapsing derivation
    /// whose arguments then hold exactly one live value yields that value.
    pub fn reduce(&self, store: &mut NodeStore, p: usize, mut children: Vec<Node>) -> Node {
        let d = &self.derivations[p];
        if children.len() == 1 && d.omitted.is_empty() {
            return children.remove(0);
        }

        for &slot in &d.omitted {
            assert!(
                slot <= children.len(),
                "derivation '{}' omits slot {} of {} arguments",
                d.name,
                slot,
                children.len()
            );
            children.insert(slot, Node::Nothing);
        }

        if d.collapse {
            let mut live = children.iter().filter(|c| !c.is_nothing());
            if let (Some(only), None) = (live.next(), live.next()) {
                return only.clone();
            }
        }

        match self.kinds[p] {
            Some(kind) => store.tree(kind, children),
            None => panic!("derivation '{}' names no node kind", d.name),
        }
    }
}
