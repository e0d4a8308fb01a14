use lr_grammar_model::model::types::canonical;
use lr_grammar_model::model::Grammar;
use lr_grammar_model::parse_grammar;
use std::fs;
use std::path::{Path, PathBuf};

pub struct GrammarResolver {
    base_dir: PathBuf,
}

impl GrammarResolver {
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    /// Loads `filename`, whose stem must be the declared language name.
    pub fn resolve(&self, filename: &str) -> Result<Grammar, Box<dyn std::error::Error>> {
        let path = self.base_dir.join(filename);
        let content = fs::read_to_string(&path)?;

        let grammar = parse_grammar(&content)
            .map_err(|e| format!("{}: {}", path.display(), e))?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
        if canonical(stem) != grammar.language.dash {
            return Err(format!(
                "{}: declares language '{}', expected '{}'",
                path.display(),
                grammar.language.visual,
                stem
            )
            .into());
        }

        Ok(grammar)
    }
}
