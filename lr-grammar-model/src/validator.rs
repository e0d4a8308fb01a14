use crate::error::{Error, Result};
use crate::model::*;
use crate::parser::{GrammarSource, Suffix, SymbolRef};
use std::collections::{HashMap, HashSet};

/// Name checks on the syntactic form, before references are resolved.
pub fn validate(source: &GrammarSource) -> Result<()> {
    // Names a rule body may refer to
    let mut defined: HashMap<&str, usize> = HashMap::new();
    // Names of node types, including tagged alternative lines
    let mut node_types: HashSet<String> = HashSet::new();

    for term in &source.terms {
        reserved(&term.name, term.line)?;
        if let Some(&first) = defined.get(term.name.as_str()) {
            return Err(defined_twice(&term.name, term.line, first));
        }
        defined.insert(&term.name, term.line);
        node_types.insert(term.name.clone());
    }
    for rule in &source.rules {
        reserved(&rule.name, rule.line)?;
        if let Some(&first) = defined.get(rule.name.as_str()) {
            return Err(defined_twice(&rule.name, rule.line, first));
        }
        defined.insert(&rule.name, rule.line);
        node_types.insert(rule.name.clone());
    }

    for rule in &source.rules {
        let single = rule.body.len() == 1;
        for (n, line) in rule.body.iter().enumerate() {
            if let Some(tag) = &line.tag {
                reserved(tag, line.line)?;
                if single {
                    return Err(Error::grammar(
                        line.line,
                        format!("tag '#{}' on '{}', which has no alternatives", tag, rule.name),
                    ));
                }
                if line.symbols.len() == 1 {
                    return Err(Error::grammar(
                        line.line,
                        format!("tag '#{}' needs at least two symbols", tag),
                    ));
                }
            }
            if !single && line.symbols.len() > 1 {
                let name = anonymous_name(&rule.name, n, line.tag.as_deref());
                if defined.contains_key(name.as_str()) || !node_types.insert(name.clone()) {
                    return Err(Error::grammar(
                        line.line,
                        format!("'{}' defined twice", name),
                    ));
                }
            }
            if !single && line.symbols.len() == 1 {
                if let Some(s) = line.symbols[0].suffix.filter(|s| s.is_optional()) {
                    return Err(Error::grammar(
                        line.line,
                        format!(
                            "alternative '{}' of '{}' cannot be marked '{}'",
                            line.symbols[0].name,
                            rule.name,
                            s.as_char()
                        ),
                    ));
                }
            }

            for (i, sym) in line.symbols.iter().enumerate() {
                if !defined.contains_key(sym.name.as_str()) {
                    return Err(Error::grammar(
                        line.line,
                        format!("Undefined rule: '{}'.", sym.name),
                    ));
                }
                if let Some(suffix) = sym.suffix {
                    let mut written = vec![sym.visual()];
                    if suffix == Suffix::Star {
                        written.push(
                            SymbolRef {
                                suffix: Some(Suffix::Plus),
                                ..sym.clone()
                            }
                            .visual(),
                        );
                    }
                    if let Some(clash) = written.iter().find(|w| defined.contains_key(w.as_str())) {
                        return Err(Error::grammar(
                            line.line,
                            format!(
                                "'{}' is both a declared name and '{}' with a suffix, quote the literal or rename it",
                                clash, sym.name
                            ),
                        ));
                    }
                }
                if sym.suffix == Some(Suffix::Dependent) {
                    let follows_optional = i > 0
                        && line.symbols[i - 1]
                            .suffix
                            .map_or(false, Suffix::is_optional);
                    if !follows_optional {
                        return Err(Error::grammar(
                            line.line,
                            format!("'{}' must follow an optional element", sym.visual()),
                        ));
                    }
                }
            }
        }
    }

    if !defined.contains_key(source.start.name.as_str()) {
        return Err(Error::grammar(
            source.start.line,
            format!("Undefined start rule: '{}'.", source.start.name),
        ));
    }
    for target in &source.collapse {
        if !node_types.contains(&target.name) {
            return Err(Error::grammar(
                target.line,
                format!("Undefined rule in collapse: '{}'.", target.name),
            ));
        }
    }
    for decl in &source.spacing {
        if let Some(p) = decl.parents.iter().find(|p| !node_types.contains(*p)) {
            return Err(Error::grammar(
                decl.line,
                format!("Undefined parent rule: '{}'.", p),
            ));
        }
    }

    Ok(())
}

/// `$end` and `$accept` belong to the lowered grammar.
fn reserved(name: &str, line: usize) -> Result<()> {
    if name.starts_with('$') {
        return Err(Error::grammar(
            line,
            format!("'{}' is reserved, names cannot start with '$'", name),
        ));
    }
    Ok(())
}

fn defined_twice(name: &str, line: usize, first: usize) -> Error {
    Error::grammar(
        line,
        format!("'{}' defined twice (first on line {})", name, first),
    )
}

/// Structural checks on the resolved model.
pub fn validate_model(grammar: &Grammar) -> Result<()> {
    let mut tags: HashMap<&str, RuleId> = HashMap::new();
    for (id, rule) in grammar.rules() {
        if let Some(&other) = tags.get(rule.tag().dash.as_str()) {
            return Err(Error::grammar(
                grammar.line(id),
                format!(
                    "'{}' and '{}' both map to the name '{}'",
                    grammar.rule(other).name(),
                    rule.name(),
                    rule.tag().dash
                ),
            ));
        }
        tags.insert(&rule.tag().dash, id);
    }

    for (id, rule) in grammar.declared() {
        if let Rule::Alias { child, .. } = rule {
            if matches!(grammar.rule(grammar.resolve_alias(*child)), Rule::Alias { .. }) {
                return Err(Error::grammar(
                    grammar.line(id),
                    format!("alias cycle through '{}'", rule.name()),
                ));
            }
        }
    }

    for (id, rule) in grammar.rules() {
        if let Rule::Alternative { bits, .. } = rule {
            for &bit in bits {
                let target = grammar.rule(grammar.resolve_alias(bit));
                if matches!(
                    target,
                    Rule::Option { .. } | Rule::Dependent { .. } | Rule::Separator { .. }
                ) {
                    return Err(Error::grammar(
                        grammar.line(id),
                        format!(
                            "alternative '{}' of '{}' is optional",
                            grammar.rule(bit).name(),
                            rule.name()
                        ),
                    ));
                }
            }
        }
    }

    for &target in &grammar.collapse {
        if !matches!(grammar.rule(target), Rule::Sequence { .. }) {
            return Err(Error::grammar(
                grammar.line(target),
                format!("only sequences can collapse, '{}' is not one", grammar.rule(target).name()),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn check(body: &str) -> Result<()> {
        let src = format!(
            "language t\nkeyword x\nkeyword y\nstart s\n{}",
            body
        );
        let source = parse(&src)?;
        validate(&source)?;
        validate_model(&source.into())
    }

    #[test]
    fn test_valid() {
        assert_eq!(check("s:\n    x? y= s\n    y x #pair\n"), Ok(()));
    }

    #[test]
    fn test_undefined_rule() {
        let err = check("s:\n    x z\n").unwrap_err();
        assert_eq!(err, Error::grammar(6, "Undefined rule: 'z'."));
    }

    #[test]
    fn test_duplicate_rule() {
        let err = check("s:\n    x y\nx:\n    y y\n").unwrap_err();
        assert_eq!(err, Error::grammar(7, "'x' defined twice (first on line 2)"));
    }

    #[test]
    fn test_duplicate_tag() {
        let err = check("s:\n    x y #p\n    y x #p\n").unwrap_err();
        assert!(err.to_string().contains("'p' defined twice"));
    }

    #[test]
    fn test_dependent_needs_option() {
        let err = check("s:\n    x y=\n").unwrap_err();
        assert!(err.to_string().contains("must follow an optional element"));
    }

    #[test]
    fn test_optional_alternative() {
        let err = check("s:\n    x?\n    y\n").unwrap_err();
        assert!(err.to_string().contains("cannot be marked '?'"));
    }

    #[test]
    fn test_optional_alternative_through_alias() {
        let err = check("s:\n    a\n    y\na:\n    x?\n").unwrap_err();
        assert!(err.to_string().contains("is optional"));
    }

    #[test]
    fn test_alias_cycle() {
        let err = check("s:\n    a\na:\n    b\nb:\n    a\n").unwrap_err();
        assert!(err.to_string().contains("alias cycle"));
    }

    #[test]
    fn test_tag_needs_alternatives() {
        let err = check("s:\n    x y #p\n").unwrap_err();
        assert!(err.to_string().contains("has no alternatives"));
    }

    #[test]
    fn test_name_clash() {
        let err = check("s:\n    a-b a_b\na-b:\n    x y\na_b:\n    y x\n").unwrap_err();
        assert!(err.to_string().contains("both map to the name 'tree-a-b'"));
    }

    #[test]
    fn test_suffix_reading_as_a_declared_name() {
        let src = "language t\nkeyword x\nsymbol '+' plus\nsymbol '+=' plus-eq\nstart s\ns:\n    x? +=\n";
        let err = validate(&parse(src).unwrap()).unwrap_err();
        assert_eq!(
            err,
            Error::grammar(
                7,
                "'+=' is both a declared name and '+' with a suffix, quote the literal or rename it"
            )
        );

        let quoted = "language t\nkeyword x\nsymbol '+' plus\nsymbol '+=' plus-eq\nstart s\ns:\n    x? '+'= '+='\n";
        assert_eq!(validate(&parse(quoted).unwrap()), Ok(()));

        let err = check("s:\n    x* y\nx+:\n    y y\n").unwrap_err();
        assert!(err.to_string().contains("'x+' is both a declared name"), "{}", err);
    }

    #[test]
    fn test_dollar_names_are_reserved() {
        let err = check("s:\n    x y\n$accept:\n    y x\n").unwrap_err();
        assert_eq!(
            err,
            Error::grammar(7, "'$accept' is reserved, names cannot start with '$'")
        );
        let src = "language t\natom $end [a]\nstart s\ns:\n    $end $end\n";
        let err = validate(&parse(src).unwrap()).unwrap_err();
        assert_eq!(err, Error::grammar(2, "'$end' is reserved, names cannot start with '$'"));
        let src = "language t\nkeyword $accept\nstart s\ns:\n    $accept $accept\n";
        assert!(validate(&parse(src).unwrap()).is_err());
        let err = check("s:\n    x y #$end\n    y x\n").unwrap_err();
        assert!(err.to_string().contains("'$end' is reserved"), "{}", err);
    }
}
