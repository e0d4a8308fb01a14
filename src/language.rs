use log::info;
use lr_grammar_kit::{Automaton, EmitPolicy, Lexicon, Node, NodeStore, Parser, Schema, TreeBuilder};
use lr_grammar_model::analysis::{analyze_grammar, GrammarAnalysis};
use lr_grammar_model::lower::{lower, LoweredGrammar};
use lr_grammar_model::model::Grammar;
use lr_grammar_model::table::ParseTable;
use lr_grammar_model::{parse_grammar, Result};
use std::rc::Rc;

/// Everything compiled from one grammar.
#[derive(Debug, Clone)]
pub struct Language {
    grammar: Grammar,
    analysis: GrammarAnalysis,
    lowered: Rc<LoweredGrammar>,
    table: Rc<ParseTable>,
    schema: Rc<Schema>,
    policy: EmitPolicy,
    parser: Parser,
}

impl Language {
    pub fn from_source(source: &str) -> Result<Self> {
        let grammar = parse_grammar(source)?;
        let name = grammar.language.dash.clone();
        let analysis = analyze_grammar(&grammar);

        info!("{}: lowering {} rules", name, grammar.len());
        let lowered = Rc::new(lower(&grammar)?);

        info!("{}: creating automaton for {} productions", name, lowered.productions().len());
        let table = Rc::new(ParseTable::build(&lowered)?);

        let schema = Rc::new(Schema::new(&grammar));
        let builder = Rc::new(TreeBuilder::new(&lowered, &schema));

        info!("{}: creating tokenizer", name);
        let lexicon = Rc::new(Lexicon::from_grammar(&grammar, &lowered)?);

        let policy = EmitPolicy::from_grammar(&grammar, &schema);
        let automaton = Automaton::new(lowered.clone(), table.clone(), builder);
        let parser = Parser::new(lexicon, automaton);

        Ok(Self {
            grammar,
            analysis,
            lowered,
            table,
            schema,
            policy,
            parser,
        })
    }

    pub fn name(&self) -> &str {
        &self.grammar.language.visual
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// Nullable and unused rules found while loading.
    pub fn analysis(&self) -> &GrammarAnalysis {
        &self.analysis
    }

    pub fn lowered(&self) -> &LoweredGrammar {
        &self.lowered
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn policy(&self) -> &EmitPolicy {
        &self.policy
    }

    /// A fresh parser sharing this language's tables.
    pub fn parser(&self) -> Parser {
        let mut parser = self.parser.clone();
        parser.reset();
        parser
    }

    pub fn parse_str(&self, file: &str, text: &str) -> Result<Node> {
        self.parser.parse_str(file, text)
    }

    pub fn emit(&self, node: &Node) -> String {
        self.policy.emit(node)
    }

    /// An empty store for building trees through [`Schema::create`].
    pub fn store(&self) -> NodeStore {
        NodeStore::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lr_grammar_model::Error;

    const SRC: &str = "language calc\nwhitespace [ ]+\natom LIT [0-9]+\nsymbol '+' plus\nstart add\n\
                       add:\n    add '+' LIT #sum\n    LIT\n";

    #[test]
    fn test_pipeline() {
        let calc = Language::from_source(SRC).unwrap();
        assert_eq!(calc.name(), "calc");
        assert!(calc.analysis().warnings().is_empty());
        let tree = calc.parse_str("in", "1 + 2").unwrap();
        assert_eq!(calc.schema().sexp(&tree), "(sum 1 + 2)");
        assert_eq!(calc.emit(&tree), "1 + 2\n");
    }

    #[test]
    fn test_conflicts_are_fatal() {
        let src = SRC.replace("add '+' LIT #sum", "add '+' add #sum");
        assert!(matches!(Language::from_source(&src), Err(Error::Conflict { .. })));
    }
}
