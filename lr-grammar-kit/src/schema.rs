//! Node kinds and what they may contain.
//!
//! A schema built from a [`Grammar`] has one kind per concrete rule: every
//! term, every sequence (named, tagged or numbered) and every `x+` list.
//! Options, aliases and alternatives have no kind of their own but still
//! answer [`Schema::is`] structurally. A schema built from a bare
//! [`LoweredGrammar`] only knows names: each symbol is its own kind.

use crate::ast::{Kind, Node, NodeStore};
use lr_grammar_model::lower::LoweredGrammar;
use lr_grammar_model::model::{Grammar, Rule, RuleId, TermKind};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct KindInfo {
    name: String,
    /// Canonical identifier, `tok-plus`, `tree-add`.
    tag: String,
    rule: Option<RuleId>,
    terminal: bool,
}

#[derive(Debug, Clone)]
pub struct Schema {
    kinds: Vec<KindInfo>,
    by_name: HashMap<String, Kind>,
    grammar: Option<Grammar>,
    rule_kinds: HashMap<RuleId, Kind>,
}

impl Schema {
    pub fn new(grammar: &Grammar) -> Self {
        let mut schema = Schema::empty();
        for (id, rule) in grammar.rules() {
            if rule.is_concrete() {
                let kind = schema.add(rule.name(), &rule.tag().dash, Some(id), rule.is_term());
                schema.rule_kinds.insert(id, kind);
            }
        }
        schema.grammar = Some(grammar.clone());
        schema
    }

    /// Kinds named after symbols and derivations, without child types.
    pub fn from_lowered(lowered: &LoweredGrammar) -> Self {
        let mut schema = Schema::empty();
        for t in &lowered.terminals()[1..] {
            schema.add(t, t, None, true);
        }
        for n in &lowered.nonterminals()[1..] {
            schema.add(n, n, None, false);
        }
        for d in &lowered.derivations()[1..] {
            if !schema.by_name.contains_key(&d.name) {
                schema.add(&d.name, &d.name, None, false);
            }
        }
        schema
    }

    fn empty() -> Self {
        Schema {
            kinds: Vec::new(),
            by_name: HashMap::new(),
            grammar: None,
            rule_kinds: HashMap::new(),
        }
    }

    fn add(&mut self, name: &str, tag: &str, rule: Option<RuleId>, terminal: bool) -> Kind {
        let kind = Kind(self.kinds.len() as u32);
        self.kinds.push(KindInfo {
            name: name.to_string(),
            tag: tag.to_string(),
            rule,
            terminal,
        });
        self.by_name.insert(name.to_string(), kind);
        kind
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn kinds(&self) -> impl Iterator<Item = Kind> + '_ {
        (0..self.kinds.len()).map(|k| Kind(k as u32))
    }

    pub fn kind(&self, name: &str) -> Option<Kind> {
        self.by_name.get(name).copied()
    }

    pub fn name(&self, kind: Kind) -> &str {
        &self.kinds[kind.0 as usize].name
    }

    pub fn tag(&self, kind: Kind) -> &str {
        &self.kinds[kind.0 as usize].tag
    }

    pub fn is_terminal(&self, kind: Kind) -> bool {
        self.kinds[kind.0 as usize].terminal
    }

    pub fn grammar(&self) -> Option<&Grammar> {
        self.grammar.as_ref()
    }

    /// Name of a node's kind, `nothing` for the absent value.
    pub fn name_of(&self, node: &Node) -> &str {
        match node.kind() {
            Some(k) => self.name(k),
            None => "nothing",
        }
    }

    /// Checked leaf constructor.
    ///
    /// # Panics
    ///
    /// If `name` is not a terminal, or if a keyword or symbol is given text
    /// other than its own.
    pub fn terminal(&self, store: &mut NodeStore, name: &str, text: &str) -> Node {
        let kind = self.expect_kind(name);
        let info = &self.kinds[kind.0 as usize];
        assert!(info.terminal, "'{}' is not a terminal", name);
        if let (Some(g), Some(id)) = (&self.grammar, info.rule) {
            if let Rule::Term { kind: k, .. } = g.rule(id) {
                assert!(
                    *k == TermKind::Atom || text == name,
                    "'{}' cannot have the text {:?}",
                    name,
                    text
                );
            }
        }
        store.leaf(kind, text)
    }

    /// Checked tree constructor.
    ///
    /// # Panics
    ///
    /// If `name` is not a tree kind, if the child count is wrong or if a
    /// child does not satisfy the declared type at its position.
    pub fn create(&self, store: &mut NodeStore, name: &str, children: Vec<Node>) -> Node {
        let kind = self.expect_kind(name);
        let info = &self.kinds[kind.0 as usize];
        assert!(!info.terminal, "'{}' is a terminal", name);
        assert!(
            children.len() >= 2,
            "'{}' needs at least two children, got {}",
            name,
            children.len()
        );

        if let (Some(g), Some(id)) = (&self.grammar, info.rule) {
            let expected: Vec<RuleId> = match g.rule(id) {
                Rule::Sequence { bits, .. } => bits.clone(),
                Rule::Plus { child, .. } => vec![id, *child],
                other => panic!("'{}' has no constructor", other.name()),
            };
            assert_eq!(
                children.len(),
                expected.len(),
                "'{}' takes {} children",
                name,
                expected.len()
            );
            for (i, (child, &bit)) in children.iter().zip(&expected).enumerate() {
                assert!(
                    self.matches(g, child, bit, &mut Vec::new()),
                    "child {} of '{}' must be '{}', got '{}'",
                    i,
                    name,
                    g.rule(bit).name(),
                    self.name_of(child)
                );
            }
        }
        store.tree(kind, children)
    }

    fn expect_kind(&self, name: &str) -> Kind {
        match self.kind(name) {
            Some(k) => k,
            None => panic!("no node kind '{}'", name),
        }
    }

    /// Whether `node` is a value of rule `name`.
    ///
    /// Options accept `nothing` or their child, aliases forward, alternatives
    /// accept any branch, lists accept a list node or a single element.
    pub fn is(&self, node: &Node, name: &str) -> bool {
        match &self.grammar {
            Some(g) => match g.lookup(name) {
                Some(id) => self.matches(g, node, id, &mut Vec::new()),
                None => false,
            },
            None => node.kind().is_some() && node.kind() == self.kind(name),
        }
    }

    fn matches(&self, g: &Grammar, node: &Node, id: RuleId, stack: &mut Vec<RuleId>) -> bool {
        // a rule already on the stack would only repeat the same question
        if stack.contains(&id) {
            return false;
        }
        stack.push(id);
        let own = |id: RuleId| node.kind().is_some() && node.kind() == self.rule_kinds.get(&id).copied();
        let result = match g.rule(id) {
            Rule::Term { .. } | Rule::Sequence { .. } => own(id),
            Rule::Plus { child, .. } => own(id) || self.matches(g, node, *child, stack),
            Rule::Option { child, .. }
            | Rule::Dependent { child, .. }
            | Rule::Separator { child, .. } => {
                node.is_nothing() || self.matches(g, node, *child, stack)
            }
            Rule::Alias { child, .. } | Rule::Delimiter { child, .. } => {
                self.matches(g, node, *child, stack)
            }
            Rule::Alternative { bits, .. } => {
                bits.iter().any(|&b| self.matches(g, node, b, stack))
            }
        };
        stack.pop();
        result
    }

    /// Kinds a parent annotation on rule `name` applies to: the rule's own
    /// kind, or every concrete kind an alternative or alias leads to.
    pub fn concrete_kinds(&self, name: &str) -> Vec<Kind> {
        let g = match &self.grammar {
            Some(g) => g,
            None => return self.kind(name).into_iter().collect(),
        };
        let mut out = Vec::new();
        let mut todo: Vec<RuleId> = g.lookup(name).into_iter().collect();
        let mut seen = Vec::new();
        while let Some(id) = todo.pop() {
            if seen.contains(&id) {
                continue;
            }
            seen.push(id);
            match g.rule(id) {
                Rule::Alternative { bits, .. } => todo.extend(bits.iter().rev()),
                Rule::Alias { child, .. } => todo.push(*child),
                _ => out.extend(self.rule_kinds.get(&id).copied()),
            }
        }
        out
    }

    /// `(add (add 1 + 2) + 3)`, with `_` for nothing.
    pub fn sexp(&self, node: &Node) -> String {
        let mut out = String::new();
        self.sexp_into(node, &mut out);
        out
    }

    fn sexp_into(&self, node: &Node, out: &mut String) {
        match node {
            Node::Nothing => out.push('_'),
            Node::Leaf(l) => out.push_str(l.text()),
            Node::Tree(t) => {
                out.push('(');
                out.push_str(self.name(t.kind()));
                for child in t.children() {
                    out.push(' ');
                    self.sexp_into(child, out);
                }
                out.push(')');
            }
        }
    }
}
