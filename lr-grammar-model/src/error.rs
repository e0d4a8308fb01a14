use std::fmt;

/// A position in an input file, 1-based in both directions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            file: file.into(),
            line,
            col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

/// Every failure a caller of load, build or parse can observe.
///
/// Inconsistencies inside the compiler itself (a derivation that does not fit
/// the popped children, a constructor called with the wrong child type) are
/// not represented here. They panic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Malformed grammar source.
    #[error("line {line}: {message}")]
    Grammar { line: usize, message: String },

    /// Two actions compete for one table cell.
    #[error("conflict in state {state} on {symbol}: {}", .actions.join(" vs "))]
    Conflict {
        state: usize,
        symbol: String,
        actions: Vec<String>,
    },

    /// Input text that no terminal pattern matches.
    #[error("{location}: error: {message}")]
    Lex { location: Location, message: String },

    /// A token the automaton has no action for.
    #[error("{location}: error: Unexpected {symbol}: {text}")]
    Parse {
        location: Location,
        symbol: String,
        text: String,
    },
}

impl Error {
    pub fn grammar(line: usize, message: impl Into<String>) -> Self {
        Error::Grammar {
            line,
            message: message.into(),
        }
    }

    pub fn location(&self) -> Option<&Location> {
        match self {
            Error::Lex { location, .. } | Error::Parse { location, .. } => Some(location),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
