//! Canonical LR(1) table construction.
//!
//! States are closed item sets whose items carry their full lookahead set;
//! two states are the same only if their kernels agree on items and
//! lookaheads, so no LALR-style merging happens. Every cell holds at most
//! one action. A second candidate is a conflict and fails the build.

use crate::error::{Error, Result};
use crate::lower::{LoweredGrammar, SymbolId, END};
use log::{debug, info};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

pub type StateId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    Shift(StateId),
    /// Reduce by the production with this index.
    Reduce(usize),
    Accept,
    #[default]
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    pub default: Action,
    /// Per-terminal overrides of `default`.
    pub actions: BTreeMap<SymbolId, Action>,
    pub gotos: BTreeMap<SymbolId, StateId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTable {
    states: Vec<State>,
}

impl ParseTable {
    pub fn build(grammar: &LoweredGrammar) -> Result<Self> {
        Builder::new(grammar).run()
    }

    /// Uses externally built states. State 0 is the initial state.
    pub fn from_states(states: Vec<State>) -> Self {
        assert!(!states.is_empty(), "a parse table needs an initial state");
        Self { states }
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn action(&self, state: StateId, terminal: SymbolId) -> Action {
        let s = &self.states[state];
        s.actions.get(&terminal).copied().unwrap_or(s.default)
    }

    pub fn goto(&self, state: StateId, nonterminal: SymbolId) -> Option<StateId> {
        self.states[state].gotos.get(&nonterminal).copied()
    }
}

/// `(production, dot)`
type Item = (usize, usize);
type ItemSet = BTreeMap<Item, BTreeSet<SymbolId>>;

struct Builder<'a> {
    g: &'a LoweredGrammar,
    by_lhs: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<BTreeSet<SymbolId>>,
}

impl<'a> Builder<'a> {
    fn new(g: &'a LoweredGrammar) -> Self {
        let n = g.num_symbols();
        let nt = g.num_terminals();

        let mut by_lhs = vec![Vec::new(); n - nt];
        for (p, prod) in g.productions().iter().enumerate() {
            by_lhs[prod.lhs.0 - nt].push(p);
        }

        let mut nullable = vec![false; n];
        let mut first: Vec<BTreeSet<SymbolId>> = (0..n)
            .map(|s| {
                if s < nt {
                    BTreeSet::from([SymbolId(s)])
                } else {
                    BTreeSet::new()
                }
            })
            .collect();

        // FIRST and nullable fixpoint
        let mut changed = true;
        while changed {
            changed = false;
            for prod in g.productions() {
                let lhs = prod.lhs.0;
                let mut acc = BTreeSet::new();
                let mut all_nullable = true;
                for s in &prod.rhs {
                    acc.extend(first[s.0].iter().copied());
                    if !nullable[s.0] {
                        all_nullable = false;
                        break;
                    }
                }
                let before = first[lhs].len();
                first[lhs].extend(acc);
                if first[lhs].len() != before {
                    changed = true;
                }
                if all_nullable && !nullable[lhs] {
                    nullable[lhs] = true;
                    changed = true;
                }
            }
        }

        Self {
            g,
            by_lhs,
            nullable,
            first,
        }
    }

    fn first_of(&self, seq: &[SymbolId], follow: &BTreeSet<SymbolId>) -> BTreeSet<SymbolId> {
        let mut acc = BTreeSet::new();
        for s in seq {
            acc.extend(self.first[s.0].iter().copied());
            if !self.nullable[s.0] {
                return acc;
            }
        }
        acc.extend(follow.iter().copied());
        acc
    }

    fn closure(&self, kernel: ItemSet) -> ItemSet {
        let nt = self.g.num_terminals();
        let mut set = kernel;
        let mut queue: VecDeque<Item> = set.keys().copied().collect();

        while let Some(item) = queue.pop_front() {
            let (p, dot) = item;
            let rhs = &self.g.production(p).rhs;
            let next = match rhs.get(dot) {
                Some(&s) if !self.g.is_terminal(s) => s,
                _ => continue,
            };
            let follow = set[&item].clone();
            let lookahead = self.first_of(&rhs[dot + 1..], &follow);
            for &q in &self.by_lhs[next.0 - nt] {
                let is_new = !set.contains_key(&(q, 0));
                let entry = set.entry((q, 0)).or_default();
                let before = entry.len();
                entry.extend(lookahead.iter().copied());
                if is_new || entry.len() != before {
                    queue.push_back((q, 0));
                }
            }
        }
        set
    }

    fn run(self) -> Result<ParseTable> {
        let mut sets: Vec<ItemSet> = Vec::new();
        let mut kernels: HashMap<ItemSet, StateId> = HashMap::new();
        let mut states: Vec<State> = Vec::new();

        let start = ItemSet::from([((0, 0), BTreeSet::new())]);
        self.intern(start, &mut sets, &mut kernels, &mut states);

        let mut i = 0;
        while i < sets.len() {
            let set = sets[i].clone();

            // Transitions, in symbol order so numbering is deterministic
            let next: BTreeSet<SymbolId> = set
                .keys()
                .filter_map(|&(p, dot)| self.g.production(p).rhs.get(dot).copied())
                .filter(|&s| s != END)
                .collect();
            for x in next {
                let kernel: ItemSet = set
                    .iter()
                    .filter(|((p, dot), _)| self.g.production(*p).rhs.get(*dot) == Some(&x))
                    .map(|(&(p, dot), la)| ((p, dot + 1), la.clone()))
                    .collect();
                let target = self.intern(kernel, &mut sets, &mut kernels, &mut states);
                if self.g.is_terminal(x) {
                    self.add_action(&mut states, i, x, Action::Shift(target))?;
                } else {
                    states[i].gotos.insert(x, target);
                }
            }

            if set.contains_key(&(0, 1)) {
                self.add_action(&mut states, i, END, Action::Accept)?;
            }

            for (&(p, dot), lookahead) in &set {
                if p != 0 && dot == self.g.production(p).rhs.len() {
                    for &t in lookahead {
                        self.add_action(&mut states, i, t, Action::Reduce(p))?;
                    }
                }
            }

            debug!(
                "state {}: {} items, {} actions, {} gotos",
                i,
                set.len(),
                states[i].actions.len(),
                states[i].gotos.len()
            );
            i += 1;
        }

        info!("built {} LR(1) states", states.len());
        Ok(ParseTable { states })
    }

    fn intern(
        &self,
        kernel: ItemSet,
        sets: &mut Vec<ItemSet>,
        kernels: &mut HashMap<ItemSet, StateId>,
        states: &mut Vec<State>,
    ) -> StateId {
        if let Some(&id) = kernels.get(&kernel) {
            return id;
        }
        let id = sets.len();
        sets.push(self.closure(kernel.clone()));
        states.push(State::default());
        kernels.insert(kernel, id);
        id
    }

    fn add_action(
        &self,
        states: &mut [State],
        state: StateId,
        symbol: SymbolId,
        action: Action,
    ) -> Result<()> {
        match states[state].actions.entry(symbol) {
            Entry::Vacant(e) => {
                e.insert(action);
                Ok(())
            }
            Entry::Occupied(e) if *e.get() == action => Ok(()),
            Entry::Occupied(e) => Err(Error::Conflict {
                state,
                symbol: self.g.name(symbol).to_string(),
                actions: vec![self.describe(*e.get()), self.describe(action)],
            }),
        }
    }

    fn describe(&self, action: Action) -> String {
        match action {
            Action::Shift(s) => format!("shift to state {}", s),
            Action::Reduce(p) => format!("reduce {}", self.g.render(p)),
            Action::Accept => "accept".to_string(),
            Action::Error => "error".to_string(),
        }
    }
}
