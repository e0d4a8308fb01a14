//! Lowering of the rule model into a plain context-free grammar.
//!
//! Options, aliases, dependents and the anonymous sequences of alternative
//! lines do not survive this pass. Every production keeps a [`Derivation`]
//! telling the runtime which node type to build and where the removed
//! optional elements have to be put back as `nothing`.

use crate::error::{Error, Result};
use crate::model::*;
use log::{debug, warn};
use std::collections::HashMap;
use std::fmt;

/// Index into the combined symbol space: terminals first, then nonterminals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub usize);

/// `$end` always comes first.
pub const END: SymbolId = SymbolId(0);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    pub lhs: SymbolId,
    pub rhs: Vec<SymbolId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Derivation {
    /// Node type the reduction builds.
    pub name: String,
    pub rule: Option<RuleId>,
    /// Slots of the rebuilt argument list that hold `nothing`, ascending.
    pub omitted: Vec<usize>,
    /// Whether a single live argument replaces the node.
    pub collapse: bool,
}

impl fmt::Display for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.omitted.is_empty() {
            write!(f, " {:?}", self.omitted)?;
        }
        if self.collapse {
            write!(f, " collapse")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct LoweredGrammar {
    terminals: Vec<String>,
    nonterminals: Vec<String>,
    productions: Vec<Production>,
    derivations: Vec<Derivation>,
    index: HashMap<String, SymbolId>,
    /// Productions that were dropped as duplicates.
    pub warnings: Vec<String>,
}

impl LoweredGrammar {
    /// Builds a lowered grammar by hand.
    ///
    /// `terminals` must start with `$end`, `nonterminals` with `$accept`, and
    /// the first production must be `$accept -> start $end`. Without
    /// `derivations` every production builds a node named after its left
    /// hand side.
    pub fn new(
        terminals: &[&str],
        nonterminals: &[&str],
        productions: &[(&str, Vec<&str>)],
        derivations: Option<Vec<Derivation>>,
    ) -> Self {
        assert_eq!(terminals.first(), Some(&"$end"), "terminals must start with $end");
        assert_eq!(
            nonterminals.first(),
            Some(&"$accept"),
            "nonterminals must start with $accept"
        );

        let mut g = LoweredGrammar::empty();
        for t in terminals {
            g.add_symbol(t, true);
        }
        for n in nonterminals {
            g.add_symbol(n, false);
        }

        let lookup = |name: &str| -> SymbolId {
            match g.symbol(name) {
                Some(s) => s,
                None => panic!("unknown symbol '{}'", name),
            }
        };
        let productions: Vec<Production> = productions
            .iter()
            .map(|(lhs, rhs)| Production {
                lhs: lookup(*lhs),
                rhs: rhs.iter().map(|s| lookup(*s)).collect(),
            })
            .collect();

        let derivations = derivations.unwrap_or_else(|| {
            productions
                .iter()
                .map(|p| Derivation {
                    name: g.name(p.lhs).to_string(),
                    ..Derivation::default()
                })
                .collect()
        });
        assert_eq!(derivations.len(), productions.len(), "one derivation per production");

        for (p, d) in productions.into_iter().zip(derivations) {
            assert!(!g.is_terminal(p.lhs), "terminal '{}' used as lhs", g.name(p.lhs));
            g.productions.push(p);
            g.derivations.push(d);
        }
        g.check_start();
        g
    }

    fn empty() -> Self {
        LoweredGrammar {
            terminals: Vec::new(),
            nonterminals: Vec::new(),
            productions: Vec::new(),
            derivations: Vec::new(),
            index: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    fn add_symbol(&mut self, name: &str, terminal: bool) -> SymbolId {
        assert!(!self.index.contains_key(name), "symbol '{}' listed twice", name);
        let id = if terminal {
            assert!(self.nonterminals.is_empty(), "terminals must precede nonterminals");
            self.terminals.push(name.to_string());
            SymbolId(self.terminals.len() - 1)
        } else {
            self.nonterminals.push(name.to_string());
            SymbolId(self.terminals.len() + self.nonterminals.len() - 1)
        };
        self.index.insert(name.to_string(), id);
        id
    }

    fn check_start(&self) {
        let start = &self.productions[0];
        assert!(
            start.lhs == self.accept() && start.rhs.len() == 2 && start.rhs[1] == END,
            "production 0 must be $accept -> start $end"
        );
        for p in &self.productions[1..] {
            assert!(p.lhs != self.accept(), "$accept has a second production");
            assert!(
                !p.rhs.contains(&END) && !p.rhs.contains(&self.accept()),
                "$end and $accept may only appear in production 0"
            );
        }
    }

    pub fn terminals(&self) -> &[String] {
        &self.terminals
    }

    pub fn nonterminals(&self) -> &[String] {
        &self.nonterminals
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, p: usize) -> &Production {
        &self.productions[p]
    }

    pub fn derivations(&self) -> &[Derivation] {
        &self.derivations
    }

    pub fn derivation(&self, p: usize) -> &Derivation {
        &self.derivations[p]
    }

    pub fn symbol(&self, name: &str) -> Option<SymbolId> {
        self.index.get(name).copied()
    }

    pub fn name(&self, s: SymbolId) -> &str {
        if self.is_terminal(s) {
            &self.terminals[s.0]
        } else {
            &self.nonterminals[s.0 - self.terminals.len()]
        }
    }

    pub fn is_terminal(&self, s: SymbolId) -> bool {
        s.0 < self.terminals.len()
    }

    pub fn num_terminals(&self) -> usize {
        self.terminals.len()
    }

    pub fn num_symbols(&self) -> usize {
        self.terminals.len() + self.nonterminals.len()
    }

    /// The `$accept` nonterminal.
    pub fn accept(&self) -> SymbolId {
        SymbolId(self.terminals.len())
    }

    /// `add -> add + mul`
    pub fn render(&self, p: usize) -> String {
        self.render_production(&self.productions[p])
    }

    fn render_production(&self, prod: &Production) -> String {
        let mut out = format!("{} ->", self.name(prod.lhs));
        for &s in &prod.rhs {
            out.push(' ');
            out.push_str(self.name(s));
        }
        out
    }
}

/// Lowers a loaded grammar.
pub fn lower(grammar: &Grammar) -> Result<LoweredGrammar> {
    let mut lowerer = Lowerer {
        grammar,
        out: LoweredGrammar::empty(),
        symbols: HashMap::new(),
        seen: HashMap::new(),
    };
    lowerer.run()?;
    Ok(lowerer.out)
}

struct Lowerer<'a> {
    grammar: &'a Grammar,
    out: LoweredGrammar,
    symbols: HashMap<RuleId, SymbolId>,
    seen: HashMap<Production, usize>,
}

impl<'a> Lowerer<'a> {
    fn run(&mut self) -> Result<()> {
        let g = self.grammar;

        self.out.add_symbol("$end", true);
        for (id, rule) in g.terms() {
            let s = self.out.add_symbol(rule.name(), true);
            self.symbols.insert(id, s);
        }
        self.out.add_symbol("$accept", false);
        for (id, rule) in g.rules() {
            let lowered = match rule {
                Rule::Sequence { anonymous, .. } => !anonymous,
                Rule::Alternative { .. } | Rule::Plus { .. } => true,
                _ => false,
            };
            if lowered {
                let s = self.out.add_symbol(rule.name(), false);
                self.symbols.insert(id, s);
            }
        }

        let start = self.start_symbol()?;
        let accept = self.out.accept();
        self.out.productions.push(Production {
            lhs: accept,
            rhs: vec![start, END],
        });
        self.out.derivations.push(Derivation {
            name: "$accept".to_string(),
            ..Derivation::default()
        });

        for (id, rule) in g.rules() {
            match rule {
                Rule::Sequence {
                    bits,
                    anonymous: false,
                    ..
                } => self.add_rule(id, bits, id)?,
                Rule::Alternative { bits, .. } => {
                    for &bit in bits {
                        self.add_rule(id, &[bit], bit)?;
                    }
                }
                Rule::Plus { child, .. } => {
                    self.add_rule(id, &[*child], id)?;
                    self.add_rule(id, &[id, *child], id)?;
                }
                Rule::Separator { .. } | Rule::Delimiter { .. } => {
                    return Err(Error::grammar(
                        g.line(id),
                        format!(
                            "'{}': separated and delimited repetition cannot be lowered",
                            rule.name()
                        ),
                    ));
                }
                _ => {}
            }
        }

        self.out.check_start();
        Ok(())
    }

    /// The start rule with aliases and an outer option stripped.
    fn start_symbol(&self) -> Result<SymbolId> {
        let g = self.grammar;
        let mut id = g.start;
        loop {
            match g.rule(id) {
                Rule::Alias { child, .. } => id = *child,
                Rule::Option { child, .. } => {
                    debug!("start rule '{}' is optional, using its child", g.rule(id).name());
                    id = *child;
                }
                _ => break,
            }
        }
        self.symbols.get(&id).copied().ok_or_else(|| {
            Error::grammar(
                g.line(g.start),
                format!("'{}' cannot be the start rule", g.rule(g.start).name()),
            )
        })
    }

    fn add_rule(&mut self, lhs: RuleId, bits: &[RuleId], name: RuleId) -> Result<()> {
        // A tagged or anonymous line stands alone: use its elements directly
        let bits = match bits {
            [only] => match self.grammar.rule(*only) {
                Rule::Sequence {
                    bits,
                    anonymous: true,
                    ..
                } => bits.as_slice(),
                _ => bits,
            },
            _ => bits,
        };

        let mut branches = Vec::new();
        self.expand(bits, Vec::new(), Vec::new(), &mut branches)?;

        let lhs = self.symbols[&lhs];
        let rule = self.grammar.rule(name);
        for (rhs, omitted) in branches {
            let production = Production { lhs, rhs };
            let derivation = Derivation {
                name: rule.name().to_string(),
                rule: Some(name),
                omitted,
                collapse: self.grammar.collapse.contains(&name),
            };
            self.push(production, derivation);
        }
        Ok(())
    }

    fn push(&mut self, production: Production, derivation: Derivation) {
        if let Some(&prev) = self.seen.get(&production) {
            let message = format!(
                "coalescing duplicate production {} ('{}' and '{}')",
                self.out.render_production(&production),
                self.out.derivations[prev].name,
                derivation.name
            );
            warn!("{}: {}", self.grammar.language.dash, message);
            self.out.warnings.push(message);
            return;
        }

        let p = self.out.productions.len();
        self.seen.insert(production.clone(), p);
        self.out.productions.push(production);
        self.out.derivations.push(derivation);
        debug!(
            "{}: {} [{}]",
            self.grammar.language.dash,
            self.out.render(p),
            self.out.derivations[p]
        );
    }

    /// Walks `bits` left to right, forking at every option. Each finished
    /// branch is its symbol list plus the slots that were left out.
    fn expand(
        &self,
        bits: &[RuleId],
        mut done: Vec<SymbolId>,
        mut omitted: Vec<usize>,
        out: &mut Vec<(Vec<SymbolId>, Vec<usize>)>,
    ) -> Result<()> {
        let g = self.grammar;
        'bits: for (i, &bit) in bits.iter().enumerate() {
            let mut id = bit;
            loop {
                match g.rule(id) {
                    Rule::Alias { child, .. } => id = *child,
                    Rule::Option { child, .. } => {
                        let mut skipped = omitted.clone();
                        skipped.push(done.len() + omitted.len());
                        self.expand(&bits[i + 1..], done.clone(), skipped, out)?;
                        id = *child;
                    }
                    Rule::Dependent { child, .. } => {
                        let slot = done.len() + omitted.len();
                        if slot > 0 && omitted.last() == Some(&(slot - 1)) {
                            omitted.push(slot);
                            continue 'bits;
                        }
                        id = *child;
                    }
                    Rule::Separator { .. } | Rule::Delimiter { .. } => {
                        return Err(Error::grammar(
                            g.line(id),
                            format!(
                                "'{}': separated and delimited repetition cannot be lowered",
                                g.rule(id).name()
                            ),
                        ));
                    }
                    Rule::Sequence {
                        anonymous: true, ..
                    } => {
                        panic!(
                            "anonymous sequence '{}' used as an element",
                            g.rule(id).name()
                        );
                    }
                    Rule::Term { .. }
                    | Rule::Sequence { .. }
                    | Rule::Alternative { .. }
                    | Rule::Plus { .. } => {
                        done.push(self.symbols[&id]);
                        continue 'bits;
                    }
                }
            }
        }
        out.push((done, omitted));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_grammar;

    fn lowered(body: &str) -> LoweredGrammar {
        let src = format!(
            "language t\nkeyword x\nkeyword y\nkeyword z\nsymbol ',' comma\nstart s\n{}",
            body
        );
        lower(&parse_grammar(&src).unwrap()).unwrap()
    }

    /// `(rendered production, derivation name, omitted)` for every production.
    fn table(g: &LoweredGrammar) -> Vec<(String, String, Vec<usize>)> {
        (0..g.productions().len())
            .map(|p| {
                let d = g.derivation(p);
                (g.render(p), d.name.clone(), d.omitted.clone())
            })
            .collect()
    }

    fn row(p: &str, name: &str, omitted: &[usize]) -> (String, String, Vec<usize>) {
        (p.to_string(), name.to_string(), omitted.to_vec())
    }

    #[test]
    fn test_symbol_order() {
        let g = lowered("s:\n    x a\na:\n    y z\n");
        assert_eq!(g.terminals(), &["$end", "x", "y", "z", ","]);
        assert_eq!(g.nonterminals(), &["$accept", "s", "a"]);
        assert_eq!(g.symbol("$accept"), Some(SymbolId(5)));
        assert_eq!(g.render(0), "$accept -> s $end");
    }

    #[test]
    fn test_option_branches() {
        let g = lowered("s:\n    x? y? z\n");
        assert_eq!(
            table(&g)[1..].to_vec(),
            vec![
                row("s -> z", "s", &[0, 1]),
                row("s -> y z", "s", &[0]),
                row("s -> x z", "s", &[1]),
                row("s -> x y z", "s", &[]),
            ]
        );
    }

    #[test]
    fn test_alternatives_use_their_own_names() {
        let g = lowered("s:\n    a\n    x y #pair\n    y z\na:\n    x z\n");
        assert_eq!(
            table(&g)[1..].to_vec(),
            vec![
                row("s -> a", "a", &[]),
                row("s -> x y", "pair", &[]),
                row("s -> y z", "s-3", &[]),
                row("a -> x z", "a", &[]),
            ]
        );
        // anonymous sequences are no nonterminals
        assert_eq!(g.symbol("pair"), None);
    }

    #[test]
    fn test_alias_is_inlined() {
        let g = lowered("s:\n    b z\nb:\n    x\n");
        assert_eq!(table(&g)[1], row("s -> x z", "s", &[]));
        assert_eq!(g.symbol("b"), None);
    }

    #[test]
    fn test_dependent_follows_its_option() {
        let g = lowered("s:\n    s? ','= x\n");
        assert_eq!(
            table(&g)[1..].to_vec(),
            vec![row("s -> x", "s", &[0, 1]), row("s -> s , x", "s", &[])]
        );
    }

    #[test]
    fn test_dependent_literal_next_to_longer_symbol() {
        let src = "language t\nkeyword x\nkeyword y\nsymbol '=' eq\nsymbol '==' eqeq\nstart s\ns:\n    x? '='= y\n";
        let g = lower(&parse_grammar(src).unwrap()).unwrap();
        assert_eq!(
            table(&g)[1..].to_vec(),
            vec![row("s -> y", "s", &[0, 1]), row("s -> x = y", "s", &[])]
        );
    }

    #[test]
    fn test_duplicates_are_coalesced() {
        let g = lowered("s:\n    x y #p\n    x y #q\n");
        assert_eq!(g.productions().len(), 2);
        assert_eq!(g.derivation(1).name, "p");
        assert_eq!(g.warnings.len(), 1);
        assert!(g.warnings[0].contains("s -> x y"));
    }

    #[test]
    fn test_plus_is_left_recursive() {
        let g = lowered("s:\n    x+ y\n");
        assert_eq!(
            table(&g)[1..].to_vec(),
            vec![
                row("s -> x+ y", "s", &[]),
                row("x+ -> x", "x+", &[]),
                row("x+ -> x+ x", "x+", &[]),
            ]
        );
    }

    #[test]
    fn test_start_through_alias_and_option() {
        let g = lowered("s:\n    r?\nr:\n    x y\n");
        assert_eq!(g.render(0), "$accept -> r $end");
    }

    #[test]
    fn test_collapse_flag() {
        let src = "language t\nkeyword x\nkeyword y\ncollapse s\nstart s\ns:\n    x? y\n";
        let g = lower(&parse_grammar(src).unwrap()).unwrap();
        assert!(g.derivations()[1..].iter().all(|d| d.collapse));
    }

    #[test]
    fn test_separator_is_rejected() {
        let src = "language t\nkeyword x\nstart s\ns:\n    x& x\n";
        let err = lower(&parse_grammar(src).unwrap()).unwrap_err();
        assert!(err.to_string().contains("cannot be lowered"));
    }

    #[test]
    fn test_hand_built() {
        let g = LoweredGrammar::new(
            &["$end", "LIT", "+"],
            &["$accept", "add"],
            &[
                ("$accept", vec!["add", "$end"]),
                ("add", vec!["add", "+", "LIT"]),
                ("add", vec!["LIT"]),
            ],
            None,
        );
        assert_eq!(g.derivation(1).name, "add");
        assert_eq!(g.name(SymbolId(3)), "$accept");
        assert!(g.is_terminal(SymbolId(2)));
        assert!(!g.is_terminal(g.accept()));
    }
}
