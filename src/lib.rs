//! # lr-grammar
//!
//! Compiles a line-oriented grammar into three things: a node model with
//! checked constructors and structural predicates, canonical LR(1) tables
//! driving a parser that builds those nodes, and an emitter that prints
//! trees back as source text.
//!
//! [`Language`] bundles all of it for use at runtime. [`Generator`] reads a
//! grammar file and generates a typed Rust API for its node kinds.

use log::info;
use proc_macro2::TokenStream;
use std::path::Path;

pub mod codegen;
mod language;
mod resolver;

pub use language::Language;
pub use lr_grammar_kit as kit;
pub use lr_grammar_model as model;
pub use lr_grammar_model::{Error, Location, Result};

#[cfg(feature = "testing")]
pub use lr_grammar_kit::testing;

pub struct Generator {
    resolver: resolver::GrammarResolver,
}

impl Generator {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            resolver: resolver::GrammarResolver::new(base_dir),
        }
    }

    /// Generates the API of the grammar in `root_file`. The grammar must
    /// lower and build tables without conflicts.
    pub fn generate(&self, root_file: &str) -> std::result::Result<TokenStream, Box<dyn std::error::Error>> {
        let grammar = self.resolver.resolve(root_file)?;
        let lowered = model::lower::lower(&grammar)?;
        model::table::ParseTable::build(&lowered)?;
        info!("{}: generating code for {}", grammar.language.dash, root_file);
        Ok(codegen::generate_rust(&grammar))
    }
}
