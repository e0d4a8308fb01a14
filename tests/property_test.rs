mod common;

use common::calc;
use proptest::prelude::*;

const OPS: [&str; 5] = ["+", "-", "*", "/", "%"];

/// `n0 op n1 op n2 ...;` with single spaces, the way the emitter prints it.
fn statement() -> impl Strategy<Value = (String, usize)> {
    (0u32..1000, prop::collection::vec((0..OPS.len(), 0u32..1000), 0..12)).prop_map(
        |(first, rest)| {
            let mut text = first.to_string();
            for (op, n) in &rest {
                text.push_str(&format!(" {} {}", OPS[*op], n));
            }
            text.push(';');
            (text, 2 * rest.len() + 2)
        },
    )
}

proptest! {
    #[test]
    fn prop_emit_reproduces_canonical_text((text, tokens) in statement()) {
        let calc = calc();
        let tree = calc.parse_str("p", &text).unwrap();
        prop_assert_eq!(tree.total_tokens(), tokens);
        prop_assert_eq!(calc.emit(&tree), format!("{}\n", text));
    }

    #[test]
    fn prop_reparse_of_emitted_tree_is_identical(
        stmts in prop::collection::vec(statement(), 1..4),
        squeeze in any::<bool>(),
    ) {
        let calc = calc();
        let mut source: String = stmts.iter().map(|(t, _)| t.as_str()).collect::<Vec<_>>().join("\n");
        if squeeze {
            source.retain(|c| c != ' ');
        }
        let tree = calc.parse_str("p", &source).unwrap();
        let printed = calc.emit(&tree);

        let mut parser = calc.parser();
        parser.feed(&printed).unwrap();
        let again = parser.finish().unwrap();
        prop_assert_eq!(calc.schema().sexp(&again), calc.schema().sexp(&tree));
        prop_assert_eq!(again.total_tokens(), tree.total_tokens());
    }
}
