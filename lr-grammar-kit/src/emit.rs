//! Pretty-printing trees back to source text.
//!
//! The emitter only ever looks at leaves. Between two consecutive leaves it
//! writes nothing, a space or a newline, based on the two texts and the
//! kinds of the trees directly above them.

use crate::ast::{walk, Kind, Node, VisitMode};
use crate::schema::Schema;
use lr_grammar_model::model::Grammar;
use lr_grammar_model::parser::SpacingKind;
use std::collections::HashSet;

const INDENT: &str = "    ";

/// Spacing rules. An entry without a parent applies everywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitPolicy {
    no_space_before: HashSet<(String, Option<Kind>)>,
    no_space_after: HashSet<(String, Option<Kind>)>,
    flat: HashSet<(String, Kind)>,
}

impl Default for EmitPolicy {
    /// Glue for brackets, separators and member access.
    fn default() -> Self {
        let mut policy = EmitPolicy::empty();
        for text in ["(", "[", ".", "->"] {
            policy.no_space_after(text, None);
        }
        for text in [")", "[", "]", ",", ";", ".", "->"] {
            policy.no_space_before(text, None);
        }
        policy
    }
}

impl EmitPolicy {
    /// A policy with no glue at all.
    pub fn empty() -> Self {
        Self {
            no_space_before: HashSet::new(),
            no_space_after: HashSet::new(),
            flat: HashSet::new(),
        }
    }

    /// The default policy plus the spacing directives of `grammar`.
    pub fn from_grammar(grammar: &Grammar, schema: &Schema) -> Self {
        let mut policy = EmitPolicy::default();
        for spacing in &grammar.spacing {
            let parents: Vec<Kind> = spacing
                .parents
                .iter()
                .flat_map(|&p| schema.concrete_kinds(grammar.rule(p).name()))
                .collect();
            match spacing.kind {
                SpacingKind::NoSpaceBefore | SpacingKind::NoSpaceAfter if parents.is_empty() => {
                    policy.add_glue(spacing.kind, &spacing.text, None);
                }
                SpacingKind::NoSpaceBefore | SpacingKind::NoSpaceAfter => {
                    for p in parents {
                        policy.add_glue(spacing.kind, &spacing.text, Some(p));
                    }
                }
                SpacingKind::Flat => {
                    for p in parents {
                        policy.flat(&spacing.text, p);
                    }
                }
            }
        }
        policy
    }

    fn add_glue(&mut self, kind: SpacingKind, text: &str, parent: Option<Kind>) {
        if kind == SpacingKind::NoSpaceBefore {
            self.no_space_before(text, parent);
        } else {
            self.no_space_after(text, parent);
        }
    }

    pub fn no_space_before(&mut self, text: &str, parent: Option<Kind>) -> &mut Self {
        self.no_space_before.insert((text.to_string(), parent));
        self
    }

    pub fn no_space_after(&mut self, text: &str, parent: Option<Kind>) -> &mut Self {
        self.no_space_after.insert((text.to_string(), parent));
        self
    }

    /// Keeps `;`, `{` or `}` on the current line under `parent`.
    pub fn flat(&mut self, text: &str, parent: Kind) -> &mut Self {
        self.flat.insert((text.to_string(), parent));
        self
    }

    fn glued_before(&self, text: &str, parent: Option<Kind>) -> bool {
        self.lookup(&self.no_space_before, text, parent)
    }

    fn glued_after(&self, text: &str, parent: Option<Kind>) -> bool {
        self.lookup(&self.no_space_after, text, parent)
    }

    fn lookup(&self, set: &HashSet<(String, Option<Kind>)>, text: &str, parent: Option<Kind>) -> bool {
        let text = text.to_string();
        set.contains(&(text.clone(), None)) || (parent.is_some() && set.contains(&(text, parent)))
    }

    fn is_flat(&self, text: &str, parent: Option<Kind>) -> bool {
        match parent {
            Some(p) => self.flat.contains(&(text.to_string(), p)),
            None => false,
        }
    }

    pub fn emit(&self, node: &Node) -> String {
        let mut emitter = Emitter {
            policy: self,
            out: String::new(),
            indent: 0,
            prev: None,
        };
        walk(node, &mut |mode: VisitMode, node: &Node, parent: Option<Kind>| {
            if let (VisitMode::Enter, Some(text)) = (mode, node.text()) {
                emitter.leaf(text, parent);
            }
        });
        if !emitter.out.is_empty() {
            emitter.out.push('\n');
        }
        emitter.out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Newline,
}

struct Emitter<'p> {
    policy: &'p EmitPolicy,
    out: String,
    indent: usize,
    prev: Option<(String, Option<Kind>)>,
}

impl Emitter<'_> {
    fn leaf(&mut self, text: &str, parent: Option<Kind>) {
        let p = self.policy;
        let closing = text == "}" && !p.is_flat(text, parent);
        if closing {
            self.indent = self.indent.saturating_sub(1);
        }

        let gap = match &self.prev {
            None => Gap::None,
            Some(_) if closing => Gap::Newline,
            Some((prev, prev_parent)) => {
                let prev_parent = *prev_parent;
                let structural = |t: &str| prev == t && !p.is_flat(t, prev_parent);
                if structural(";") || structural("{") {
                    Gap::Newline
                } else if structural("}") {
                    if text == ";" {
                        Gap::None
                    } else {
                        Gap::Newline
                    }
                } else if text == "{" && !p.is_flat(text, parent) {
                    Gap::Newline
                } else if p.glued_after(prev, prev_parent) || p.glued_before(text, parent) {
                    Gap::None
                } else {
                    Gap::Space
                }
            }
        };

        match gap {
            Gap::None => {}
            Gap::Space => self.out.push(' '),
            Gap::Newline => {
                self.out.push('\n');
                for _ in 0..self.indent {
                    self.out.push_str(INDENT);
                }
            }
        }
        self.out.push_str(text);

        if text == "{" && !p.is_flat(text, parent) {
            self.indent += 1;
        }
        self.prev = Some((text.to_string(), parent));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeStore;

    const WORD: Kind = Kind(0);
    const PUNCT: Kind = Kind(1);
    const BODY: Kind = Kind(2);
    const FOR: Kind = Kind(3);
    const CALL: Kind = Kind(4);

    fn tree(store: &mut NodeStore, kind: Kind, texts: &[&str]) -> Node {
        let children = texts
            .iter()
            .map(|t| {
                let k = if t.chars().all(char::is_alphanumeric) { WORD } else { PUNCT };
                store.leaf(k, t)
            })
            .collect();
        store.tree(kind, children)
    }

    #[test]
    fn test_block() {
        let mut store = NodeStore::new();
        let ret = tree(&mut store, BODY, &["return", "0", ";"]);
        let open = store.leaf(PUNCT, "{");
        let close = store.leaf(PUNCT, "}");
        let body = store.tree(BODY, vec![open, ret, close]);
        let head = tree(&mut store, CALL, &["int", "main", "(", ")"]);
        let func = store.tree(BODY, vec![head, body]);

        let mut policy = EmitPolicy::default();
        policy.no_space_before("(", Some(CALL));
        assert_eq!(policy.emit(&func), "int main()\n{\n    return 0;\n}\n");
        // without the parent-specific entry
        assert_eq!(
            EmitPolicy::default().emit(&func),
            "int main ()\n{\n    return 0;\n}\n"
        );
    }

    #[test]
    fn test_flat_semicolons() {
        let mut store = NodeStore::new();
        let header = tree(&mut store, FOR, &["for", "(", "i", ";", "i", ";", ")", "x", ";"]);
        let mut policy = EmitPolicy::default();
        assert_eq!(policy.emit(&header), "for (i;\ni;\n) x;\n");
        policy.flat(";", FOR);
        assert_eq!(policy.emit(&header), "for (i; i;) x;\n");
    }

    #[test]
    fn test_closing_brace_before_semicolon() {
        let mut store = NodeStore::new();
        let t = tree(&mut store, BODY, &["struct", "s", "{", "int", "x", ";", "}", ";", "int"]);
        assert_eq!(
            EmitPolicy::default().emit(&t),
            "struct s\n{\n    int x;\n};\nint\n"
        );
    }

    #[test]
    fn test_flat_braces() {
        let mut store = NodeStore::new();
        let t = tree(&mut store, CALL, &["x", "=", "{", "1", ",", "2", "}", ";"]);
        let mut policy = EmitPolicy::default();
        policy.flat("{", CALL).flat("}", CALL);
        policy.no_space_after("{", Some(CALL)).no_space_before("}", Some(CALL));
        assert_eq!(policy.emit(&t), "x = {1, 2};\n");
    }

    #[test]
    fn test_nothing_emits_nothing() {
        assert_eq!(EmitPolicy::default().emit(&Node::Nothing), "");
        let mut store = NodeStore::new();
        let a = store.leaf(WORD, "a");
        let t = store.tree(BODY, vec![Node::Nothing, a, Node::Nothing]);
        assert_eq!(EmitPolicy::default().emit(&t), "a\n");
    }
}
