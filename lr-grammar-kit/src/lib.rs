//! # lr-grammar-kit
//!
//! Runtime support for grammars compiled by `lr-grammar-model`: the node
//! store, the node-kind schema, the LR automaton with its tree builder, the
//! regex lexer and the emitter.
//!
//! Compiled tables, the lexicon and the schema are shared by `Rc`; only the
//! stacks of a parse in progress are owned by its [`Parser`].

pub mod ast;
pub mod automaton;
pub mod emit;
pub mod lexer;
pub mod location;
pub mod parser;
pub mod reconstruct;
pub mod schema;

#[cfg(feature = "testing")]
pub mod testing;

pub use ast::{walk, Kind, Node, NodeStore, VisitMode, Visitor};
pub use automaton::Automaton;
pub use emit::EmitPolicy;
pub use lexer::{Lexicon, Token, Tokenizer};
pub use location::LocationTracker;
pub use parser::Parser;
pub use reconstruct::TreeBuilder;
pub use schema::Schema;
