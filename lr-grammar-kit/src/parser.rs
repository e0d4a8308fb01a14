use crate::ast::{Node, NodeStore};
use crate::automaton::Automaton;
use crate::lexer::{Lexicon, Tokenizer};
use crate::location::LocationTracker;
use lr_grammar_model::lower::END;
use lr_grammar_model::{Error, Result};
use std::rc::Rc;

/// Drives the automaton with the tokens of one input.
///
/// A parser can be fed text in pieces, split anywhere: the tail of a piece
/// that may still grow into a longer token waits for the next piece or for
/// [`Parser::finish`]. Cloning shares the lexicon and the
/// tables and copies the stacks, so a configured parser works as a template
/// for any number of independent parses.
#[derive(Debug, Clone)]
pub struct Parser {
    lexicon: Rc<Lexicon>,
    automaton: Automaton,
    store: NodeStore,
    tracker: LocationTracker,
    pending: String,
}

impl Parser {
    pub fn new(lexicon: Rc<Lexicon>, automaton: Automaton) -> Self {
        Self {
            lexicon,
            automaton,
            store: NodeStore::new(),
            tracker: LocationTracker::new("<input>"),
            pending: String::new(),
        }
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut NodeStore {
        &mut self.store
    }

    /// Starts over at the beginning of the same file. Nodes of earlier
    /// parses are dropped from the store.
    pub fn reset(&mut self) {
        self.automaton.reset();
        self.tracker.reset();
        self.pending.clear();
        self.store = NodeStore::new();
    }

    /// Starts over at the beginning of `file`, like [`Parser::reset`].
    pub fn reset_to(&mut self, file: &str) {
        self.reset();
        self.tracker = LocationTracker::new(file);
    }

    pub fn feed(&mut self, text: &str) -> Result<()> {
        self.pending.push_str(text);
        self.drain(false)
    }

    /// Runs the pending text through the automaton. At the end of input
    /// nothing is held back.
    fn drain(&mut self, at_eof: bool) -> Result<()> {
        let pending = std::mem::take(&mut self.pending);
        let tracker = std::mem::replace(&mut self.tracker, LocationTracker::new(""));
        let lexicon = Rc::clone(&self.lexicon);
        let mut tokens = if at_eof {
            Tokenizer::new(&lexicon, &pending, tracker)
        } else {
            Tokenizer::partial(&lexicon, &pending, tracker)
        };
        let result = (&mut tokens).try_for_each(|token| {
            let token = token?;
            if self.automaton.feed(&mut self.store, token.symbol, &token.text) {
                Ok(())
            } else {
                Err(Error::Parse {
                    symbol: self.automaton.grammar().name(token.symbol).to_string(),
                    text: token.text,
                    location: token.location,
                })
            }
        });
        let consumed = tokens.consumed();
        self.tracker = tokens.into_tracker();
        self.pending = pending[consumed..].to_string();
        result
    }

    /// Feeds `$end` and returns the tree.
    ///
    /// An input that ends before anything was shifted is not an error when
    /// the grammar cannot derive the empty string: it yields `nothing`.
    pub fn finish(&mut self) -> Result<Node> {
        self.drain(true)?;
        if self.automaton.feed(&mut self.store, END, "") {
            return Ok(self.automaton.result().cloned().unwrap_or_default());
        }
        if self.automaton.values().is_empty() {
            return Ok(Node::Nothing);
        }
        Err(Error::Parse {
            location: self.tracker.location(),
            symbol: "$end".to_string(),
            text: String::new(),
        })
    }

    /// Parses a whole text with a fresh copy of this parser.
    pub fn parse_str(&self, file: &str, text: &str) -> Result<Node> {
        let mut parser = self.clone();
        parser.reset_to(file);
        parser.feed(text)?;
        parser.finish()
    }
}
