mod common;

use common::{calc, mini_c};
use lr_grammar::kit::{EmitPolicy, Node};
use lr_grammar::testing::Testable;

fn reformat(lang: &lr_grammar::Language, text: &str) -> String {
    let tree = lang.parse_str("test", text).test().assert_success();
    lang.emit(&tree)
}

#[test]
fn test_function_layout() {
    let c = mini_c();
    assert_eq!(
        reformat(&c, "int main() { return 0; }"),
        "int main()\n{\n    return 0;\n}\n"
    );
}

#[test]
fn test_constructed_tree_prints_like_parsed_one() {
    let c = mini_c();
    let s = c.schema();
    let mut store = c.store();

    let int = s.terminal(&mut store, "int", "int");
    let main = s.terminal(&mut store, "ID", "main");
    let lparen = s.terminal(&mut store, "(", "(");
    let rparen = s.terminal(&mut store, ")", ")");
    let lbrace = s.terminal(&mut store, "{", "{");
    let rbrace = s.terminal(&mut store, "}", "}");
    let ret = s.terminal(&mut store, "return", "return");
    let zero = s.terminal(&mut store, "NUM", "0");
    let semi = s.terminal(&mut store, ";", ";");

    let stmt = s.create(&mut store, "ret", vec![ret, zero, semi]);
    let block = s.create(&mut store, "block", vec![lbrace, stmt, rbrace]);
    let function = s.create(
        &mut store,
        "function",
        vec![int, main, lparen, Node::Nothing, rparen, block],
    );

    assert_eq!(c.emit(&function), "int main()\n{\n    return 0;\n}\n");

    let parsed = c
        .parse_str("main.c", "int main() { return 0; }")
        .test()
        .assert_success();
    assert_eq!(s.sexp(&parsed), s.sexp(&function));
}

#[test]
fn test_for_loop_stays_on_one_line() {
    let c = mini_c();
    assert_eq!(
        reformat(&c, "int f() { for (i = 0; i < 10; i = i + 1) x = x + i; }"),
        "int f()\n{\n    for (i = 0; i < 10; i = i + 1) x = x + i;\n}\n"
    );
}

#[test]
fn test_calls_and_nested_blocks() {
    let c = mini_c();
    assert_eq!(
        reformat(&c, "int f() { g(1, 2); { x = 1; } }"),
        "int f()\n{\n    g(1, 2);\n    {\n        x = 1;\n    }\n}\n"
    );
}

#[test]
fn test_functions_start_on_their_own_line() {
    let c = mini_c();
    assert_eq!(
        reformat(&c, "int a() {} int b(int x, int y) { return x + y; }"),
        "int a()\n{\n}\nint b(int x, int y)\n{\n    return x + y;\n}\n"
    );
}

#[test]
fn test_paren_glue_depends_on_parent() {
    let c = mini_c();
    // `(` of a parenthesized expression is not glued to what precedes it
    assert_eq!(
        reformat(&c, "int f() { return (1 + 2) < 3; }"),
        "int f()\n{\n    return (1 + 2) < 3;\n}\n"
    );
}

#[test]
fn test_emitted_text_parses_to_the_same_tree() {
    let c = mini_c();
    let source = "int f(int n) { for (;n < 3;) n = n + 1; return g(n, 1); }";
    let tree = c.parse_str("a", source).test().assert_success();
    let printed = c.emit(&tree);
    let again = c.parse_str("b", &printed).test().assert_success();
    assert_eq!(c.schema().sexp(&again), c.schema().sexp(&tree));
    assert_eq!(c.emit(&again), printed);
}

#[test]
fn test_calc_statements() {
    let calc = calc();
    assert_eq!(
        reformat(&calc, "x=(1+2)*3;y=x%2;"),
        "x = (1 + 2) * 3;\ny = x % 2;\n"
    );
}

#[test]
fn test_policy_without_glue() {
    let c = mini_c();
    let tree = c
        .parse_str("f", "int main() { return 0; }")
        .test()
        .assert_success();
    assert_eq!(
        EmitPolicy::empty().emit(&tree),
        "int main ( )\n{\n    return 0 ;\n}\n"
    );
}

#[test]
fn test_nothing_prints_nothing() {
    let c = mini_c();
    assert_eq!(c.emit(&Node::Nothing), "");
}
