//! Regex lexicon and the tokenizer running it.

use crate::location::LocationTracker;
use lr_grammar_model::lower::{LoweredGrammar, SymbolId};
use lr_grammar_model::model::{Grammar, Rule, TermKind};
use lr_grammar_model::{Error, Location, Result};
use log::debug;
use regex::Regex;

#[derive(Debug, Clone)]
struct Entry {
    /// `None` for the whitespace pattern.
    symbol: Option<SymbolId>,
    /// One regex per top-level alternative.
    alternatives: Vec<Regex>,
}

/// Ordered terminal patterns: whitespace first, then terms in declaration
/// order. Atoms declared without a pattern never match.
///
/// Every pattern takes its longest match, also across the top-level
/// alternatives of `a|b`. Nested alternatives such as `(a|ab)c` follow
/// the regex engine and prefer the leftmost one that matches, so list the
/// longer choice first there.
#[derive(Debug, Clone)]
pub struct Lexicon {
    entries: Vec<Entry>,
}

impl Lexicon {
    pub fn from_grammar(grammar: &Grammar, lowered: &LoweredGrammar) -> Result<Self> {
        let mut entries = Vec::new();
        if let Some((line, pattern)) = &grammar.whitespace {
            entries.push(Entry {
                symbol: None,
                alternatives: compile(*line, pattern)?,
            });
        }
        for (id, rule) in grammar.terms() {
            let (kind, pattern) = match rule {
                Rule::Term { kind, pattern, .. } => (*kind, pattern),
                _ => continue,
            };
            let pattern = match (kind, pattern) {
                (TermKind::Atom, Some(p)) => p.clone(),
                (TermKind::Atom, None) => continue,
                _ => regex::escape(rule.name()),
            };
            let symbol = match lowered.symbol(rule.name()) {
                Some(s) => s,
                None => panic!("term '{}' was not lowered", rule.name()),
            };
            entries.push(Entry {
                symbol: Some(symbol),
                alternatives: compile(grammar.line(id), &pattern)?,
            });
        }
        debug!("{}: lexicon of {} patterns", grammar.language.dash, entries.len());
        Ok(Self { entries })
    }

    /// Builds a lexicon from `(symbol, pattern)` pairs; `None` marks the
    /// whitespace pattern.
    pub fn new(patterns: &[(Option<SymbolId>, &str)]) -> Result<Self> {
        let entries = patterns
            .iter()
            .map(|(symbol, pattern)| {
                Ok(Entry {
                    symbol: *symbol,
                    alternatives: compile(0, pattern)?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(Self { entries })
    }

    /// Longest non-empty match at the start of `text`. Ties go to the
    /// earlier entry.
    fn longest(&self, text: &str) -> Option<(Option<SymbolId>, usize)> {
        let mut best: Option<(Option<SymbolId>, usize)> = None;
        for entry in &self.entries {
            let len = entry
                .alternatives
                .iter()
                .filter_map(|regex| regex.find(text))
                .map(|m| m.end())
                .max()
                .unwrap_or(0);
            if len > 0 && best.map_or(true, |(_, l)| len > l) {
                best = Some((entry.symbol, len));
            }
        }
        best
    }

    pub fn tokenize<'a>(&'a self, file: &str, text: &'a str) -> Tokenizer<'a> {
        Tokenizer::new(self, text, LocationTracker::new(file))
    }
}

fn compile(line: usize, pattern: &str) -> Result<Vec<Regex>> {
    let anchored = |p: &str| {
        Regex::new(&format!("^(?:{})", p))
            .map_err(|e| Error::grammar(line, format!("bad pattern {:?}: {}", pattern, e)))
    };
    let whole = anchored(pattern)?;
    match split_alternatives(pattern) {
        Some(parts) => parts.into_iter().map(anchored).collect(),
        None => Ok(vec![whole]),
    }
}

/// Splits `pattern` at the `|` outside groups and classes. `None` when
/// there is nothing to split, or when a bare flag group like `(?i)` would
/// stop applying to the later parts.
fn split_alternatives(pattern: &str) -> Option<Vec<&str>> {
    let bytes = pattern.as_bytes();
    let mut parts = Vec::new();
    let (mut groups, mut class, mut start, mut i) = (0usize, 0usize, 0, 0);
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'[' => {
                class += 1;
                // a `]` right after the opening bracket is a literal
                if bytes.get(i + 1) == Some(&b'^') {
                    i += 1;
                }
                if bytes.get(i + 1) == Some(&b']') {
                    i += 1;
                }
            }
            b']' if class > 0 => class -= 1,
            _ if class > 0 => {}
            b'(' => {
                if groups == 0 && pattern[i..].starts_with("(?") {
                    let rest = &pattern[i + 2..];
                    match (rest.find(':'), rest.find(')')) {
                        (Some(colon), Some(close)) if colon < close => {}
                        _ => return None,
                    }
                }
                groups += 1;
            }
            b')' => groups = groups.saturating_sub(1),
            b'|' if groups == 0 => {
                parts.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    if parts.is_empty() {
        return None;
    }
    parts.push(&pattern[start..]);
    Some(parts)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub symbol: SymbolId,
    pub text: String,
    pub location: Location,
}

/// Yields the tokens of a text. Whitespace only moves the location.
/// Stops after the first lexical error.
#[derive(Debug, Clone)]
pub struct Tokenizer<'a> {
    lexicon: &'a Lexicon,
    text: &'a str,
    pos: usize,
    tracker: LocationTracker,
    failed: bool,
    at_eof: bool,
}

impl<'a> Tokenizer<'a> {
    /// Tokenizes all of `text`, continuing at the position `tracker` is at.
    pub fn new(lexicon: &'a Lexicon, text: &'a str, tracker: LocationTracker) -> Self {
        Self {
            lexicon,
            text,
            pos: 0,
            tracker,
            failed: false,
            at_eof: true,
        }
    }

    /// Tokenizes a prefix of a longer input. A match running into the end
    /// of `text` might grow with the next piece, so it is left unconsumed,
    /// as is text nothing matches yet. See [`Tokenizer::consumed`].
    pub fn partial(lexicon: &'a Lexicon, text: &'a str, tracker: LocationTracker) -> Self {
        Self {
            at_eof: false,
            ..Self::new(lexicon, text, tracker)
        }
    }

    pub fn location(&self) -> Location {
        self.tracker.location()
    }

    /// Bytes of the text turned into tokens or skipped as whitespace.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    pub fn into_tracker(self) -> LocationTracker {
        self.tracker
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.failed && self.pos < self.text.len() {
            let rest = &self.text[self.pos..];
            let location = self.tracker.location();
            let (symbol, len) = match self.lexicon.longest(rest) {
                Some((_, len)) if !self.at_eof && len == rest.len() => return None,
                Some(found) => found,
                None if !self.at_eof => return None,
                None => {
                    self.failed = true;
                    let c = rest.chars().next().unwrap_or_default();
                    return Some(Err(Error::Lex {
                        location,
                        message: format!("Unexpected character {:?}", c),
                    }));
                }
            };
            let text = &rest[..len];
            self.tracker.advance(text);
            self.pos += len;
            if let Some(symbol) = symbol {
                return Some(Ok(Token {
                    symbol,
                    text: text.to_string(),
                    location,
                }));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lr_grammar_model::lower::lower;
    use lr_grammar_model::parse_grammar;

    const SRC: &str = "language t\nwhitespace [ \\t\\n]+\nkeyword int\nkeyword return\natom ID [a-z_]+\n\
                       atom LIT [0-9]+\natom OPAQUE\nsymbol '<' lt\nsymbol '<=' le\nsymbol ';' semi\n\
                       start s\ns:\n    int ID ';'\n    return LIT? ';'\n    OPAQUE '<' '<=' ';'\n";

    fn lex(text: &str) -> Vec<Result<(String, String, Location)>> {
        let g = parse_grammar(SRC).unwrap();
        let lowered = lower(&g).unwrap();
        let lexicon = Lexicon::from_grammar(&g, &lowered).unwrap();
        lexicon
            .tokenize("in.c", text)
            .map(|t| t.map(|t| (lowered.name(t.symbol).to_string(), t.text, t.location)))
            .collect()
    }

    fn names(text: &str) -> Vec<String> {
        lex(text).into_iter().map(|t| t.unwrap().0).collect()
    }

    #[test]
    fn test_keywords_win_ties() {
        assert_eq!(names("int intx return"), vec!["int", "ID", "return"]);
    }

    #[test]
    fn test_longest_match() {
        assert_eq!(names("< <= <<="), vec!["<", "<=", "<", "<="]);
    }

    #[test]
    fn test_whitespace_is_skipped_and_tracked() {
        let tokens: Vec<_> = lex("int\n  x ;").into_iter().map(|t| t.unwrap()).collect();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].2, Location::new("in.c", 2, 3));
        assert_eq!(tokens[2].2, Location::new("in.c", 2, 5));
    }

    #[test]
    fn test_lex_error() {
        let tokens = lex("int $x");
        assert_eq!(tokens.len(), 2);
        let err = tokens[1].clone().unwrap_err();
        assert_eq!(err.location(), Some(&Location::new("in.c", 1, 5)));
        assert_eq!(err.to_string(), "in.c:1:5: error: Unexpected character '$'");
    }

    #[test]
    fn test_bad_pattern() {
        let src = "language t\natom ID [a-z\nstart s\ns:\n    ID ID\n";
        let g = parse_grammar(src).unwrap();
        let lowered = lower(&g).unwrap();
        let err = Lexicon::from_grammar(&g, &lowered).unwrap_err();
        assert!(err.to_string().starts_with("line 2: bad pattern"));
    }

    #[test]
    fn test_empty_matches_are_ignored() {
        let lexicon = Lexicon::new(&[(Some(SymbolId(1)), "a*"), (Some(SymbolId(2)), "b")]).unwrap();
        let symbols: Vec<_> = lexicon
            .tokenize("t", "bab")
            .map(|t| t.unwrap().symbol)
            .collect();
        assert_eq!(symbols, vec![SymbolId(2), SymbolId(1), SymbolId(2)]);
    }

    #[test]
    fn test_longest_alternative_wins() {
        let lexicon = Lexicon::new(&[
            (None, " +"),
            (Some(SymbolId(1)), r"[0-9]+|[0-9]+\.[0-9]+"),
            (Some(SymbolId(2)), r"\."),
        ])
        .unwrap();
        let texts: Vec<_> = lexicon
            .tokenize("n", "1.5 7 .")
            .map(|t| t.unwrap().text)
            .collect();
        assert_eq!(texts, vec!["1.5", "7", "."]);
    }

    #[test]
    fn test_split_alternatives() {
        assert_eq!(split_alternatives("a|bc"), Some(vec!["a", "bc"]));
        assert_eq!(split_alternatives("(a|b)c"), None);
        assert_eq!(split_alternatives(r"[|]\||x"), Some(vec![r"[|]\|", "x"]));
        assert_eq!(split_alternatives("[]|]x|y"), Some(vec!["[]|]x", "y"]));
        assert_eq!(split_alternatives("(?i)a|b"), None);
        assert_eq!(split_alternatives("(?i:a)|b"), Some(vec!["(?i:a)", "b"]));
    }

    #[test]
    fn test_partial_tokenizer_holds_back_the_tail() {
        let lexicon = Lexicon::new(&[
            (None, " +"),
            (Some(SymbolId(1)), "a"),
            (Some(SymbolId(2)), "aa"),
            (Some(SymbolId(3)), "[a-z]"),
        ])
        .unwrap();
        let run = |text: &str| {
            let mut tokens = Tokenizer::partial(&lexicon, text, LocationTracker::new("p"));
            let symbols: Vec<_> = (&mut tokens).map(|t| t.unwrap().symbol).collect();
            (symbols, tokens.consumed())
        };
        assert_eq!(run("a"), (vec![], 0));
        assert_eq!(run("ab"), (vec![SymbolId(1)], 1));
        assert_eq!(run("aaa"), (vec![SymbolId(2)], 2));
        assert_eq!(run("a "), (vec![SymbolId(1)], 1));
    }
}
