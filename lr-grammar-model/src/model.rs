// Semantic model: rules live in an arena and refer to each other by RuleId,
// so recursive grammars need no owning cycles.
pub mod types;

pub use self::types::Identifier;

use crate::parser::{self, SpacingKind, Suffix, SymbolRef};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TermKind {
    Keyword,
    Atom,
    Symbol,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// A lexical leaf. `pattern` is a regex for atoms; keywords and symbols
    /// match their visual text.
    Term {
        tag: Identifier,
        kind: TermKind,
        pattern: Option<String>,
    },
    /// A concrete node type with at least two children. Anonymous sequences
    /// come from multi-symbol alternative lines and are inlined into the
    /// alternative when lowering.
    Sequence {
        tag: Identifier,
        bits: Vec<RuleId>,
        anonymous: bool,
    },
    Alternative {
        tag: Identifier,
        bits: Vec<RuleId>,
    },
    Option {
        tag: Identifier,
        child: RuleId,
    },
    Alias {
        tag: Identifier,
        child: RuleId,
    },
    /// Present exactly when the optional element before it is present.
    Dependent {
        tag: Identifier,
        child: RuleId,
    },
    /// One or more, as a left-recursive list.
    Plus {
        tag: Identifier,
        child: RuleId,
    },
    Separator {
        tag: Identifier,
        child: RuleId,
    },
    Delimiter {
        tag: Identifier,
        child: RuleId,
    },
}

impl Rule {
    pub fn tag(&self) -> &Identifier {
        match self {
            Rule::Term { tag, .. }
            | Rule::Sequence { tag, .. }
            | Rule::Alternative { tag, .. }
            | Rule::Option { tag, .. }
            | Rule::Alias { tag, .. }
            | Rule::Dependent { tag, .. }
            | Rule::Plus { tag, .. }
            | Rule::Separator { tag, .. }
            | Rule::Delimiter { tag, .. } => tag,
        }
    }

    /// The name rule bodies refer to this rule by.
    pub fn name(&self) -> &str {
        &self.tag().visual
    }

    /// Whether values of this rule are nodes of their own type.
    pub fn is_concrete(&self) -> bool {
        matches!(
            self,
            Rule::Term { .. } | Rule::Sequence { .. } | Rule::Plus { .. }
        )
    }

    pub fn is_term(&self) -> bool {
        matches!(self, Rule::Term { .. })
    }

    /// Child rules in declared order.
    pub fn children(&self) -> Vec<RuleId> {
        match self {
            Rule::Term { .. } => Vec::new(),
            Rule::Sequence { bits, .. } | Rule::Alternative { bits, .. } => bits.clone(),
            Rule::Option { child, .. }
            | Rule::Plus { child, .. }
            | Rule::Alias { child, .. }
            | Rule::Dependent { child, .. }
            | Rule::Separator { child, .. }
            | Rule::Delimiter { child, .. } => vec![*child],
        }
    }
}

/// A spacing annotation for the emitter, with parents resolved to rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Spacing {
    pub kind: SpacingKind,
    pub text: String,
    pub parents: Vec<RuleId>,
}

#[derive(Debug, Clone)]
pub struct Grammar {
    pub language: Identifier,
    /// Pattern of the ignored terminal and the line declaring it.
    pub whitespace: Option<(usize, String)>,
    pub start: RuleId,
    pub collapse: HashSet<RuleId>,
    pub spacing: Vec<Spacing>,
    rules: Vec<Rule>,
    lines: Vec<usize>,
    names: HashMap<String, RuleId>,
    declared: usize,
}

impl Grammar {
    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.0]
    }

    pub fn lookup(&self, name: &str) -> Option<RuleId> {
        self.names.get(name).copied()
    }

    /// Source line the rule was declared (or first used) on.
    pub fn line(&self, id: RuleId) -> usize {
        self.lines[id.0]
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules.iter().enumerate().map(|(i, r)| (RuleId(i), r))
    }

    /// Terms and rules written in the source, excluding the ones derived
    /// from suffixes and alternative lines.
    pub fn declared(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules().take(self.declared)
    }

    pub fn terms(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules().filter(|(_, r)| r.is_term())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Follows aliases to the rule that actually carries structure.
    pub fn resolve_alias(&self, mut id: RuleId) -> RuleId {
        let mut seen = HashSet::new();
        while let Rule::Alias { child, .. } = self.rule(id) {
            if !seen.insert(id) {
                break;
            }
            id = *child;
        }
        id
    }

    pub fn is_nullable(&self, id: RuleId) -> bool {
        let mut stack = Vec::new();
        self.nullable_inner(id, &mut stack)
    }

    fn nullable_inner(&self, id: RuleId, stack: &mut Vec<RuleId>) -> bool {
        if stack.contains(&id) {
            return false;
        }
        stack.push(id);
        let nullable = match self.rule(id) {
            Rule::Term { .. } => false,
            Rule::Option { .. }
            | Rule::Dependent { .. }
            | Rule::Separator { .. } => true,
            Rule::Sequence { bits, .. } => bits.iter().all(|&b| match self.rule(b) {
                Rule::Option { .. } | Rule::Separator { .. } | Rule::Dependent { .. } => true,
                _ => self.nullable_inner(b, stack),
            }),
            Rule::Alternative { bits, .. } => bits.iter().any(|&b| self.nullable_inner(b, stack)),
            Rule::Alias { child, .. } | Rule::Plus { child, .. } | Rule::Delimiter { child, .. } => {
                self.nullable_inner(*child, stack)
            }
        };
        stack.pop();
        nullable
    }
}

impl From<parser::GrammarSource> for Grammar {
    /// Resolves names in two passes. The source must have passed
    /// `validator::validate`; an unknown name here is a bug.
    fn from(source: parser::GrammarSource) -> Self {
        let mut b = Builder::default();

        // 1. Allocate every declared name so bodies can refer forward
        for term in &source.terms {
            let tag = Identifier::prefixed("tok", &term.tag, term.name.clone());
            b.push(
                Rule::Term {
                    tag,
                    kind: term.kind,
                    pattern: term.pattern.clone(),
                },
                term.line,
            );
        }
        let first_rule = b.rules.len();
        for decl in &source.rules {
            // placeholder until the body is resolved
            let tag = Identifier::prefixed("tree", &decl.name, decl.name.clone());
            b.push(
                Rule::Alias {
                    tag,
                    child: RuleId(usize::MAX),
                },
                decl.line,
            );
        }
        let declared = b.rules.len();

        // 2. Resolve bodies
        for (offset, decl) in source.rules.iter().enumerate() {
            let id = RuleId(first_rule + offset);
            let rule = if decl.body.len() == 1 {
                let line = &decl.body[0];
                if line.symbols.len() == 1 {
                    let child = b.symbol(&line.symbols[0], line.line);
                    Rule::Alias {
                        tag: Identifier::prefixed("alias", &decl.name, decl.name.clone()),
                        child,
                    }
                } else {
                    Rule::Sequence {
                        tag: Identifier::prefixed("tree", &decl.name, decl.name.clone()),
                        bits: b.symbols(&line.symbols, line.line),
                        anonymous: false,
                    }
                }
            } else {
                let bits = decl
                    .body
                    .iter()
                    .enumerate()
                    .map(|(n, line)| {
                        if line.symbols.len() == 1 {
                            return b.symbol(&line.symbols[0], line.line);
                        }
                        let name = anonymous_name(&decl.name, n, line.tag.as_deref());
                        let bits = b.symbols(&line.symbols, line.line);
                        b.push(
                            Rule::Sequence {
                                tag: Identifier::prefixed("tree", &name, name.clone()),
                                bits,
                                anonymous: true,
                            },
                            line.line,
                        )
                    })
                    .collect();
                Rule::Alternative {
                    tag: Identifier::prefixed("any", &decl.name, decl.name.clone()),
                    bits,
                }
            };
            b.rules[id.0] = rule;
        }

        let start = b.names[&source.start.name];
        let collapse = source.collapse.iter().map(|n| b.names[&n.name]).collect();
        let spacing = source
            .spacing
            .iter()
            .map(|s| Spacing {
                kind: s.kind,
                text: s.text.clone(),
                parents: s.parents.iter().map(|p| b.names[p]).collect(),
            })
            .collect();

        Grammar {
            language: Identifier::new(&source.language.name, source.language.name.clone()),
            whitespace: source.whitespace,
            start,
            collapse,
            spacing,
            rules: b.rules,
            lines: b.lines,
            names: b.names,
            declared,
        }
    }
}

/// `#tag` names the sequence of an alternative line, otherwise it is
/// numbered after its rule.
pub fn anonymous_name(rule: &str, index: usize, tag: Option<&str>) -> String {
    match tag {
        Some(tag) => tag.to_string(),
        None => format!("{}-{}", rule, index + 1),
    }
}

#[derive(Default)]
struct Builder {
    rules: Vec<Rule>,
    lines: Vec<usize>,
    names: HashMap<String, RuleId>,
    suffixed: HashMap<(RuleId, Suffix), RuleId>,
}

impl Builder {
    fn push(&mut self, rule: Rule, line: usize) -> RuleId {
        let id = RuleId(self.rules.len());
        self.names.insert(rule.name().to_string(), id);
        self.rules.push(rule);
        self.lines.push(line);
        id
    }

    fn symbols(&mut self, symbols: &[SymbolRef], line: usize) -> Vec<RuleId> {
        symbols.iter().map(|s| self.symbol(s, line)).collect()
    }

    /// Resolves one element, creating the suffix rule on first use.
    fn symbol(&mut self, sym: &SymbolRef, line: usize) -> RuleId {
        let base = self.names[&sym.name];
        let suffix = match sym.suffix {
            Some(s) => s,
            None => return base,
        };
        if let Some(&id) = self.suffixed.get(&(base, suffix)) {
            return id;
        }
        let visual = sym.visual();
        let base_tag = self.rules[base.0].tag().dash.clone();
        let rule = match suffix {
            Suffix::Optional => Rule::Option {
                tag: Identifier::prefixed("opt", &base_tag, visual.clone()),
                child: base,
            },
            Suffix::Star => {
                let plus = self.symbol(
                    &SymbolRef {
                        suffix: Some(Suffix::Plus),
                        ..sym.clone()
                    },
                    line,
                );
                let plus_tag = self.rules[plus.0].tag().dash.clone();
                Rule::Option {
                    tag: Identifier::prefixed("opt", &plus_tag, visual.clone()),
                    child: plus,
                }
            }
            Suffix::Plus => Rule::Plus {
                tag: Identifier::prefixed("list", &base_tag, visual.clone()),
                child: base,
            },
            Suffix::Dependent => Rule::Dependent {
                tag: Identifier::prefixed("dep", &base_tag, visual.clone()),
                child: base,
            },
            Suffix::Separator => Rule::Separator {
                tag: Identifier::prefixed("sep", &base_tag, visual.clone()),
                child: base,
            },
            Suffix::Delimiter => Rule::Delimiter {
                tag: Identifier::prefixed("delim", &base_tag, visual.clone()),
                child: base,
            },
        };
        let id = RuleId(self.rules.len());
        // Declared names win the lookup
        self.names.entry(visual).or_insert(id);
        self.suffixed.insert((base, suffix), id);
        self.rules.push(rule);
        self.lines.push(line);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn grammar(body: &str) -> Grammar {
        let src = format!(
            "language t\nkeyword x\nkeyword y\nsymbol ',' comma\nstart s\n{}",
            body
        );
        parse(&src).unwrap().into()
    }

    #[test]
    fn test_rule_shapes() {
        let g = grammar("s:\n    a\n    x y #pair\na:\n    x y?\nb:\n    a\n");
        let s = g.lookup("s").unwrap();
        let bits = match g.rule(s) {
            Rule::Alternative { tag, bits } => {
                assert_eq!(tag.dash, "any-s");
                bits.clone()
            }
            other => panic!("expected alternative, got {:?}", other),
        };
        assert_eq!(bits[0], g.lookup("a").unwrap());
        match g.rule(bits[1]) {
            Rule::Sequence { tag, anonymous, .. } => {
                assert_eq!(tag.visual, "pair");
                assert!(anonymous);
            }
            other => panic!("expected tagged sequence, got {:?}", other),
        }
        assert!(matches!(g.rule(g.lookup("b").unwrap()), Rule::Alias { .. }));
        let opt = g.lookup("y?").unwrap();
        assert_eq!(g.rule(opt).tag().dash, "opt-tok-y");
    }

    #[test]
    fn test_suffix_rules_are_shared() {
        let g = grammar("s:\n    x? y\nt:\n    y x?\n");
        let s_bits = g.rule(g.lookup("s").unwrap()).children();
        let t_bits = g.rule(g.lookup("t").unwrap()).children();
        assert_eq!(s_bits[0], t_bits[1]);
    }

    #[test]
    fn test_star_is_optional_list() {
        let g = grammar("s:\n    x* y\n");
        let star = g.lookup("x*").unwrap();
        let plus = g.lookup("x+").unwrap();
        assert_eq!(g.rule(star).children(), vec![plus]);
        assert_eq!(g.rule(plus).tag().dash, "list-tok-x");
    }

    #[test]
    fn test_suffixed_literal_is_not_a_longer_symbol() {
        let src = "language t\nkeyword x\nkeyword y\nsymbol '=' eq\nsymbol '==' eqeq\nstart s\ns:\n    x? '='= y\nt:\n    x '==' y\n";
        let g: Grammar = parse(src).unwrap().into();
        let eq = g.lookup("=").unwrap();
        let eqeq = g.lookup("==").unwrap();
        let bits = g.rule(g.lookup("s").unwrap()).children();
        assert!(matches!(g.rule(bits[1]), Rule::Dependent { child, .. } if *child == eq));
        assert_eq!(g.rule(bits[1]).name(), "'='=");
        assert_eq!(g.lookup("'='="), Some(bits[1]));
        assert_eq!(g.rule(g.lookup("t").unwrap()).children()[1], eqeq);
        assert!(matches!(g.rule(eqeq), Rule::Term { .. }));
    }

    #[test]
    fn test_untagged_alternative_is_numbered() {
        let g = grammar("s:\n    x\n    x y\n");
        assert!(g.lookup("s-2").is_some());
    }

    #[test]
    fn test_nullability() {
        let g = grammar("s:\n    a b\na:\n    x? y?\nb:\n    x\n    a\nc:\n    c y\n");
        assert!(g.is_nullable(g.lookup("a").unwrap()));
        assert!(g.is_nullable(g.lookup("b").unwrap()));
        assert!(g.is_nullable(g.lookup("s").unwrap()));
        // the cycle through `c` does not recurse forever
        assert!(!g.is_nullable(g.lookup("c").unwrap()));
        assert!(!g.is_nullable(g.lookup("x").unwrap()));
    }
}
