use crate::model::*;
use log::warn;
use std::collections::{BTreeSet, HashSet, VecDeque};

// ==============================================================================
//  Diagnostics (nullable and unused rules)
// ==============================================================================

/// Non-fatal findings about a loaded grammar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrammarAnalysis {
    pub nullable_rules: BTreeSet<String>,
    pub unused_rules: BTreeSet<String>,
}

impl GrammarAnalysis {
    pub fn warnings(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.nullable_rules.is_empty() {
            out.push(format!(
                "nullable rules: {}",
                self.nullable_rules.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        if !self.unused_rules.is_empty() {
            out.push(format!(
                "unused rules: {}",
                self.unused_rules.iter().cloned().collect::<Vec<_>>().join(", ")
            ));
        }
        out
    }
}

pub fn analyze_grammar(grammar: &Grammar) -> GrammarAnalysis {
    // 1. Nullable declared rules
    let nullable_rules = grammar
        .declared()
        .filter(|(id, _)| grammar.is_nullable(*id))
        .map(|(_, r)| r.name().to_string())
        .collect();

    // 2. Unused rules
    let unused_rules = find_unused_rules(grammar);

    let analysis = GrammarAnalysis {
        nullable_rules,
        unused_rules,
    };
    for w in analysis.warnings() {
        warn!("{}: {}", grammar.language.dash, w);
    }
    analysis
}

/// Declared rules and terms unreachable from the start rule.
fn find_unused_rules(grammar: &Grammar) -> BTreeSet<String> {
    let mut used = HashSet::new();
    let mut queue = VecDeque::new();

    used.insert(grammar.start);
    queue.push_back(grammar.start);

    while let Some(current) = queue.pop_front() {
        for callee in grammar.rule(current).children() {
            if used.insert(callee) {
                queue.push_back(callee);
            }
        }
    }

    grammar
        .declared()
        .filter(|(id, _)| !used.contains(id))
        .map(|(_, r)| r.name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_grammar;

    #[test]
    fn test_reports() {
        let g = parse_grammar(
            "language t\nkeyword x\nkeyword y\nkeyword z\nstart s\ns:\n    o x\no:\n    x? y?\nlost:\n    x y\n",
        )
        .unwrap();
        let a = analyze_grammar(&g);
        assert_eq!(a.nullable_rules, BTreeSet::from(["o".to_string()]));
        assert_eq!(
            a.unused_rules,
            BTreeSet::from(["lost".to_string(), "z".to_string()])
        );
        assert_eq!(a.warnings().len(), 2);
    }

    #[test]
    fn test_clean_grammar_has_no_warnings() {
        let g = parse_grammar("language t\nkeyword x\nstart s\ns:\n    x x\n").unwrap();
        assert!(analyze_grammar(&g).warnings().is_empty());
    }
}
