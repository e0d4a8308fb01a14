//! Line-oriented reader producing the syntactic form of a grammar.
//!
//! ```text
//! language calc
//! whitespace [ \t\n]+
//! atom LIT [0-9]+
//! symbol '+' plus
//! start add
//! add:
//!     add? '+'= LIT
//! ```
//!
//! Unindented `name:` lines open a rule, indented lines are its body. Every
//! other unindented line is a directive and must come before the first rule.
//! Operator literals in rule bodies should be quoted, since `? * + & ! =`
//! double as element suffixes.

use crate::error::{Error, Result};
use crate::model::TermKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suffix {
    /// `?`
    Optional,
    /// `*`
    Star,
    /// `+`
    Plus,
    /// `&`
    Separator,
    /// `!`
    Delimiter,
    /// `=`, present only together with the optional element before it
    Dependent,
}

impl Suffix {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            '?' => Suffix::Optional,
            '*' => Suffix::Star,
            '+' => Suffix::Plus,
            '&' => Suffix::Separator,
            '!' => Suffix::Delimiter,
            '=' => Suffix::Dependent,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            Suffix::Optional => '?',
            Suffix::Star => '*',
            Suffix::Plus => '+',
            Suffix::Separator => '&',
            Suffix::Delimiter => '!',
            Suffix::Dependent => '=',
        }
    }

    /// Whether the element may be absent, which is what a following
    /// dependent element needs to attach to.
    pub fn is_optional(self) -> bool {
        matches!(self, Suffix::Optional | Suffix::Star | Suffix::Dependent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRef {
    pub name: String,
    pub suffix: Option<Suffix>,
    /// Written as `'literal'`.
    pub quoted: bool,
}

impl SymbolRef {
    /// The element as written. A suffixed literal keeps its quotes, so that
    /// `'='=` does not read as the `==` symbol.
    pub fn visual(&self) -> String {
        match self.suffix {
            Some(s) if self.quoted => format!("'{}'{}", self.name, s.as_char()),
            Some(s) => format!("{}{}", self.name, s.as_char()),
            None => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BodyLine {
    pub line: usize,
    pub symbols: Vec<SymbolRef>,
    pub tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RuleDecl {
    pub line: usize,
    pub name: String,
    pub body: Vec<BodyLine>,
}

#[derive(Debug, Clone)]
pub struct TermDecl {
    pub line: usize,
    pub kind: TermKind,
    /// The name rule bodies use: the word, the atom name or the literal text.
    pub name: String,
    /// Seed of the canonical `tok-` identifier.
    pub tag: String,
    /// Only atoms carry a pattern here; keywords and symbols match their text.
    pub pattern: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacingKind {
    NoSpaceBefore,
    NoSpaceAfter,
    Flat,
}

#[derive(Debug, Clone)]
pub struct SpacingDecl {
    pub line: usize,
    pub kind: SpacingKind,
    pub text: String,
    pub parents: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Named {
    pub line: usize,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct GrammarSource {
    pub language: Named,
    pub whitespace: Option<(usize, String)>,
    pub terms: Vec<TermDecl>,
    pub start: Named,
    pub collapse: Vec<Named>,
    pub spacing: Vec<SpacingDecl>,
    pub rules: Vec<RuleDecl>,
}

pub fn parse(source: &str) -> Result<GrammarSource> {
    let mut reader = Reader::default();
    let mut last_line = 1;

    for (idx, raw) in source.lines().enumerate() {
        let line = idx + 1;
        last_line = line;
        let text = raw.trim_end();
        let trimmed = text.trim_start();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        if text.len() != trimmed.len() {
            reader.body_line(line, trimmed)?;
        } else if let Some(name) = trimmed.strip_suffix(':') {
            reader.rule_header(line, name.trim())?;
        } else {
            reader.directive(line, trimmed)?;
        }
    }

    reader.finish(last_line)
}

#[derive(Default)]
struct Reader {
    language: Option<Named>,
    whitespace: Option<(usize, String)>,
    terms: Vec<TermDecl>,
    start: Option<Named>,
    collapse: Vec<Named>,
    spacing: Vec<SpacingDecl>,
    rules: Vec<RuleDecl>,
}

impl Reader {
    fn directive(&mut self, line: usize, text: &str) -> Result<()> {
        let (word, rest) = split_word(text);
        if !self.rules.is_empty() {
            return Err(Error::grammar(
                line,
                format!(
                    "unexpected '{}': expected an indented rule body or a rule header",
                    word
                ),
            ));
        }
        if word != "language" && self.language.is_none() {
            return Err(Error::grammar(
                line,
                format!("'{}' specified before language", word),
            ));
        }

        let args: Vec<&str> = rest.split_whitespace().collect();
        match word {
            "language" => {
                if self.language.is_some() {
                    return Err(Error::grammar(line, "language specified twice"));
                }
                let name = exactly(line, word, &args, 1)?[0];
                self.language = Some(Named {
                    line,
                    name: name.to_string(),
                });
            }
            "whitespace" => {
                if self.whitespace.is_some() {
                    return Err(Error::grammar(line, "whitespace specified twice"));
                }
                if rest.is_empty() {
                    return Err(arity(line, word, "a pattern", 0));
                }
                self.whitespace = Some((line, rest.to_string()));
            }
            "keyword" => {
                let name = exactly(line, word, &args, 1)?[0];
                self.terms.push(TermDecl {
                    line,
                    kind: TermKind::Keyword,
                    name: name.to_string(),
                    tag: name.to_string(),
                    pattern: None,
                });
            }
            "atom" => {
                let (name, pattern) = split_word(rest);
                if name.is_empty() {
                    return Err(arity(line, word, "a name and an optional pattern", 0));
                }
                self.terms.push(TermDecl {
                    line,
                    kind: TermKind::Atom,
                    name: name.to_string(),
                    tag: name.to_string(),
                    pattern: (!pattern.is_empty()).then(|| pattern.to_string()),
                });
            }
            "symbol" => {
                let args = exactly(line, word, &args, 2)?;
                let literal = unquote(args[0]);
                if literal.is_empty() {
                    return Err(Error::grammar(line, "empty symbol literal"));
                }
                self.terms.push(TermDecl {
                    line,
                    kind: TermKind::Symbol,
                    name: literal.to_string(),
                    tag: args[1].to_string(),
                    pattern: None,
                });
            }
            "start" => {
                if self.start.is_some() {
                    return Err(Error::grammar(line, "start specified twice"));
                }
                let name = exactly(line, word, &args, 1)?[0];
                self.start = Some(Named {
                    line,
                    name: unquote(name).to_string(),
                });
            }
            "collapse" => {
                if args.is_empty() {
                    return Err(arity(line, word, "at least one rule", 0));
                }
                self.collapse.extend(args.iter().map(|a| Named {
                    line,
                    name: unquote(a).to_string(),
                }));
            }
            "nospace-before" | "nospace-after" | "flat" => {
                let min = if word == "flat" { 2 } else { 1 };
                if args.len() < min {
                    return Err(arity(line, word, "a literal and parent rules", args.len()));
                }
                let kind = match word {
                    "nospace-before" => SpacingKind::NoSpaceBefore,
                    "nospace-after" => SpacingKind::NoSpaceAfter,
                    _ => SpacingKind::Flat,
                };
                self.spacing.push(SpacingDecl {
                    line,
                    kind,
                    text: unquote(args[0]).to_string(),
                    parents: args[1..].iter().map(|a| unquote(a).to_string()).collect(),
                });
            }
            _ => {
                return Err(Error::grammar(line, format!("unknown directive '{}'", word)));
            }
        }
        Ok(())
    }

    fn rule_header(&mut self, line: usize, name: &str) -> Result<()> {
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(Error::grammar(line, format!("malformed rule header '{}:'", name)));
        }
        if self.language.is_none() {
            return Err(Error::grammar(line, "rule specified before language"));
        }
        self.check_last_body()?;
        self.rules.push(RuleDecl {
            line,
            name: name.to_string(),
            body: Vec::new(),
        });
        Ok(())
    }

    fn body_line(&mut self, line: usize, text: &str) -> Result<()> {
        let (symbols, tag) = parse_symbols(line, text)?;
        let rule = self.rules.last_mut().ok_or_else(|| {
            Error::grammar(line, "indented line where a rule header was expected")
        })?;
        if symbols.is_empty() {
            return Err(Error::grammar(line, "tag without symbols"));
        }
        rule.body.push(BodyLine { line, symbols, tag });
        Ok(())
    }

    fn check_last_body(&self) -> Result<()> {
        match self.rules.last() {
            Some(rule) if rule.body.is_empty() => Err(Error::grammar(
                rule.line,
                format!("empty rule body for '{}'", rule.name),
            )),
            _ => Ok(()),
        }
    }

    fn finish(self, last_line: usize) -> Result<GrammarSource> {
        self.check_last_body()?;
        let language = self
            .language
            .ok_or_else(|| Error::grammar(1, "no language specified"))?;
        let start = self
            .start
            .ok_or_else(|| Error::grammar(last_line, "no start rule specified"))?;
        Ok(GrammarSource {
            language,
            whitespace: self.whitespace,
            terms: self.terms,
            start,
            collapse: self.collapse,
            spacing: self.spacing,
            rules: self.rules,
        })
    }
}

fn parse_symbols(line: usize, text: &str) -> Result<(Vec<SymbolRef>, Option<String>)> {
    let mut symbols = Vec::new();
    let mut tag = None;
    let mut rest = text.trim_start();

    while !rest.is_empty() {
        if let Some(t) = rest.strip_prefix('#') {
            let t = t.trim();
            if t.is_empty() || t.contains(char::is_whitespace) {
                return Err(Error::grammar(line, format!("malformed tag '#{}'", t)));
            }
            tag = Some(t.to_string());
            break;
        }

        let end = word_end(line, rest)?;
        let word = &rest[..end];
        symbols.push(parse_symbol(line, word)?);
        rest = rest[end..].trim_start();
    }

    Ok((symbols, tag))
}

/// Length of the next element, keeping whitespace inside quotes.
fn word_end(line: usize, text: &str) -> Result<usize> {
    let from = if let Some(quoted) = text.strip_prefix('\'') {
        let close = quoted
            .find('\'')
            .ok_or_else(|| Error::grammar(line, format!("unterminated quote in {}", text)))?;
        close + 2
    } else {
        0
    };
    Ok(text[from..]
        .find(char::is_whitespace)
        .map_or(text.len(), |i| from + i))
}

fn parse_symbol(line: usize, word: &str) -> Result<SymbolRef> {
    let (name, suffix) = if let Some(quoted) = word.strip_prefix('\'') {
        // word_end guarantees the closing quote
        let close = quoted.find('\'').unwrap_or(quoted.len());
        (&quoted[..close], quoted.get(close + 1..).unwrap_or(""))
    } else {
        match word.char_indices().last() {
            Some((i, c)) if i > 0 && Suffix::from_char(c).is_some() => (&word[..i], &word[i..]),
            _ => (word, ""),
        }
    };

    if name.is_empty() {
        return Err(Error::grammar(line, "empty symbol literal"));
    }

    let mut chars = suffix.chars();
    let suffix = match (chars.next(), chars.next()) {
        (None, _) => None,
        (Some(c), None) => Some(Suffix::from_char(c).ok_or_else(|| {
            Error::grammar(line, format!("unknown suffix '{}' on {}", c, word))
        })?),
        _ => {
            return Err(Error::grammar(
                line,
                format!("more than one suffix on {}", word),
            ))
        }
    };

    Ok(SymbolRef {
        name: name.to_string(),
        suffix,
        quoted: word.starts_with('\''),
    })
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.find(char::is_whitespace) {
        Some(i) => (&text[..i], text[i..].trim()),
        None => (text, ""),
    }
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .filter(|t| !t.is_empty())
        .unwrap_or(text)
}

fn exactly<'a, 'b>(
    line: usize,
    word: &str,
    args: &'b [&'a str],
    n: usize,
) -> Result<&'b [&'a str]> {
    if args.len() != n {
        return Err(arity(line, word, &format!("{} argument(s)", n), args.len()));
    }
    Ok(args)
}

fn arity(line: usize, word: &str, expected: &str, got: usize) -> Error {
    Error::grammar(
        line,
        format!("'{}' expects {}, but got {} argument(s)", word, expected, got),
    )
}
