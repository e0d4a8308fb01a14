#![allow(dead_code)]

use lr_grammar::Language;

/// Statements over arithmetic and comparison, in precedence-climbing form.
pub const CALC: &str = r#"# arithmetic statements
language calc
whitespace [ \t\n]+
atom ID [a-z_][a-z0-9_]*
atom LIT [0-9]+
symbol '(' lparen
symbol ')' rparen
symbol ';' semi
symbol '=' eq
symbol '+' plus
symbol '-' minus
symbol '*' star
symbol '/' slash
symbol '%' percent
symbol '<=' le
symbol '>=' ge
symbol '==' eqeq
symbol '!=' ne
symbol '<' lt
symbol '>' gt
start unit

unit:
    top+
top:
    assign ';'
assign:
    ID '=' assign #set
    cmp
cmp:
    add cmp-op add #compare
    add
cmp-op:
    '<'
    '>'
    '<='
    '>='
    '=='
    '!='
add:
    add add-op mul #sum
    mul
add-op:
    '+'
    '-'
mul:
    mul mul-op prim #product
    prim
mul-op:
    '*'
    '/'
    '%'
prim:
    ID
    LIT
    '(' cmp ')' #paren
"#;

/// A small C subset with blocks, calls and for loops.
pub const MINI_C: &str = r#"language mini-c
whitespace [ \t\n]+
keyword int
keyword return
keyword for
atom ID [A-Za-z_][A-Za-z0-9_]*
atom NUM [0-9]+
symbol '(' lparen
symbol ')' rparen
symbol '{' lbrace
symbol '}' rbrace
symbol ';' semi
symbol ',' comma
symbol '=' assign
symbol '<' lt
symbol '+' plus
collapse params
nospace-before '(' function invoke
flat ';' loop
start unit

unit:
    function+
function:
    int ID '(' params? ')' block
params:
    params? ','= param
param:
    int ID
block:
    '{' stmt* '}'
stmt:
    return expr? ';' #ret
    expr ';' #expr-stmt
    for '(' expr? ';' expr? ';' expr? ')' stmt #loop
    block
expr:
    ID '=' expr #assignment
    cmp
cmp:
    sum '<' sum #less
    sum
sum:
    sum '+' call #add
    call
call:
    ID '(' args? ')' #invoke
    ID
    NUM
    '(' expr ')' #paren
args:
    args? ','= expr
"#;

pub fn calc() -> Language {
    Language::from_source(CALC).expect("calc grammar must compile")
}

pub fn mini_c() -> Language {
    Language::from_source(MINI_C).expect("mini-c grammar must compile")
}

pub fn sexp(lang: &Language, text: &str) -> String {
    let tree = lang
        .parse_str("test", text)
        .unwrap_or_else(|e| panic!("{}", e));
    lang.schema().sexp(&tree)
}
