//! The table-driven LR automaton.

use crate::ast::{Node, NodeStore};
use crate::reconstruct::TreeBuilder;
use lr_grammar_model::lower::{LoweredGrammar, SymbolId};
use lr_grammar_model::table::{Action, ParseTable, StateId};
use log::trace;
use std::rc::Rc;

/// State and value stacks of one parse over shared, read-only tables.
///
/// Cloning copies the stacks and shares everything else.
#[derive(Debug, Clone)]
pub struct Automaton {
    grammar: Rc<LoweredGrammar>,
    table: Rc<ParseTable>,
    builder: Rc<TreeBuilder>,
    states: Vec<StateId>,
    values: Vec<Node>,
    accepted: bool,
}

impl Automaton {
    pub fn new(grammar: Rc<LoweredGrammar>, table: Rc<ParseTable>, builder: Rc<TreeBuilder>) -> Self {
        Self {
            grammar,
            table,
            builder,
            states: vec![0],
            values: Vec::new(),
            accepted: false,
        }
    }

    pub fn grammar(&self) -> &LoweredGrammar {
        &self.grammar
    }

    pub fn reset(&mut self) {
        self.states.clear();
        self.states.push(0);
        self.values.clear();
        self.accepted = false;
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Values shifted or reduced so far, bottom first.
    pub fn values(&self) -> &[Node] {
        &self.values
    }

    /// The finished tree, once `$end` has been accepted.
    pub fn result(&self) -> Option<&Node> {
        if self.accepted {
            self.values.last()
        } else {
            None
        }
    }

    /// Consumes one terminal, running every reduction it triggers.
    ///
    /// Returns `false` and leaves the automaton untouched when the terminal
    /// is not acceptable here.
    pub fn feed(&mut self, store: &mut NodeStore, terminal: SymbolId, text: &str) -> bool {
        if self.accepted || !self.check(terminal) {
            return false;
        }
        loop {
            let top = self.top();
            match self.table.action(top, terminal) {
                Action::Shift(next) => {
                    trace!("state {}: shift {:?} to {}", top, text, next);
                    self.states.push(next);
                    let leaf = self.builder.leaf(store, terminal, text);
                    self.values.push(leaf);
                    return true;
                }
                Action::Reduce(p) => {
                    let prod = self.grammar.production(p);
                    let n = prod.rhs.len();
                    trace!("state {}: reduce {}", top, self.grammar.render(p));
                    let children = self.values.split_off(self.values.len() - n);
                    self.states.truncate(self.states.len() - n);
                    let value = self.builder.reduce(store, p, children);
                    let next = self.goto(prod.lhs);
                    self.states.push(next);
                    self.values.push(value);
                }
                Action::Accept => {
                    trace!("state {}: accept", top);
                    self.accepted = true;
                    return true;
                }
                Action::Error => panic!("state {}: error after a successful check", top),
            }
        }
    }

    fn top(&self) -> StateId {
        match self.states.last() {
            Some(&s) => s,
            None => panic!("empty state stack"),
        }
    }

    fn goto(&self, nonterminal: SymbolId) -> StateId {
        let top = self.top();
        match self.table.goto(top, nonterminal) {
            Some(s) => s,
            None => panic!(
                "state {}: no goto on {}",
                top,
                self.grammar.name(nonterminal)
            ),
        }
    }

    /// Replays the reductions `terminal` would trigger on a scratch stack:
    /// the real stack below `depth` plus the states pushed since.
    fn check(&self, terminal: SymbolId) -> bool {
        let mut depth = self.states.len();
        let mut extra: Vec<StateId> = Vec::new();
        loop {
            let top = match extra.last() {
                Some(&s) => s,
                None => self.states[depth - 1],
            };
            match self.table.action(top, terminal) {
                Action::Shift(_) | Action::Accept => return true,
                Action::Error => return false,
                Action::Reduce(p) => {
                    let prod = self.grammar.production(p);
                    let n = prod.rhs.len();
                    let from_extra = n.min(extra.len());
                    extra.truncate(extra.len() - from_extra);
                    if n - from_extra >= depth {
                        return false;
                    }
                    depth -= n - from_extra;
                    let below = match extra.last() {
                        Some(&s) => s,
                        None => self.states[depth - 1],
                    };
                    match self.table.goto(below, prod.lhs) {
                        Some(s) => extra.push(s),
                        None => return false,
                    }
                }
            }
        }
    }
}
