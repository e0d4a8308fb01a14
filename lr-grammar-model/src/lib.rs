//! # lr-grammar-model
//!
//! Loading, checking and compiling grammars for the `lr-grammar` runtime.
//! Everything here is independent of input text; the runtime side lives in
//! `lr-grammar-kit`.
//!
//! ## Pipeline
//!
//! 1. **[parser]**: Read the line-oriented grammar text into its syntactic form.
//! 2. **[validator]**: Check names and references on the syntactic form.
//! 3. **[model]**: Resolve the syntactic form into a rule arena (via `Into`),
//!    then check it again structurally.
//! 4. **[analysis]**: Report nullable and unused rules.
//! 5. **[lower]**: Turn the rule model into a plain context-free grammar with
//!    a derivation per production.
//! 6. **[table]**: Build canonical LR(1) tables for the lowered grammar.

pub mod analysis;
pub mod error;
pub mod lower;
pub mod model;
pub mod parser;
pub mod table;
pub mod validator;

pub use error::{Error, Location, Result};

/// Runs steps 1 to 3 of the pipeline.
pub fn parse_grammar(source: &str) -> Result<model::Grammar> {
    let source = parser::parse(source)?;
    validator::validate(&source)?;
    let grammar: model::Grammar = source.into();
    validator::validate_model(&grammar)?;
    Ok(grammar)
}
