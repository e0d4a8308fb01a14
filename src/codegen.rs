//! Generates a typed Rust API over the node store for one grammar.

use itertools::Itertools;
use lr_grammar_model::model::*;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use std::collections::HashMap;

/// A module named after the language with a closed `Kind` enum, checked
/// `create_*` constructors for every concrete rule and `is_*` predicates for
/// every rule.
pub fn generate_rust(grammar: &Grammar) -> TokenStream {
    let module = grammar.language.to_ident();
    let language = &grammar.language.visual;

    let concrete: Vec<&Rule> = grammar
        .rules()
        .map(|(_, r)| r)
        .filter(|r| r.is_concrete())
        .collect();
    let variants: Vec<_> = concrete.iter().map(|r| r.tag().to_type_ident()).collect();
    let names: Vec<&str> = concrete.iter().map(|r| r.name()).collect();

    let constructors = concrete.iter().map(|r| generate_constructor(grammar, r));
    let predicates = grammar.rules().map(|(_, r)| generate_predicate(r));

    quote! {
        pub mod #module {
            use lr_grammar_kit::{Node, NodeStore, Schema};

            pub const LANGUAGE: &str = #language;

            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub enum Kind {
                Nothing,
                #(#variants,)*
            }

            impl Kind {
                pub fn name(self) -> &'static str {
                    match self {
                        Kind::Nothing => "nothing",
                        #(Kind::#variants => #names,)*
                    }
                }
            }

            pub fn kind(schema: &Schema, node: &Node) -> Kind {
                match node.kind() {
                    None => Kind::Nothing,
                    Some(k) => match schema.name(k) {
                        #(#names => Kind::#variants,)*
                        other => panic!("unknown node kind '{}'", other),
                    },
                }
            }

            #(#constructors)*

            #(#predicates)*
        }
    }
}

fn generate_constructor(grammar: &Grammar, rule: &Rule) -> TokenStream {
    let name = rule.name();
    let fn_name = format_ident!("create_{}", rule.tag().lower);

    let children: Vec<&Rule> = match rule {
        Rule::Term { kind, .. } => {
            let doc = format!("Creates a `{}` leaf.", name);
            return if *kind == TermKind::Atom {
                quote! {
                    #[doc = #doc]
                    pub fn #fn_name(schema: &Schema, store: &mut NodeStore, text: &str) -> Node {
                        schema.terminal(store, #name, text)
                    }
                }
            } else {
                quote! {
                    #[doc = #doc]
                    pub fn #fn_name(schema: &Schema, store: &mut NodeStore) -> Node {
                        schema.terminal(store, #name, #name)
                    }
                }
            };
        }
        Rule::Sequence { bits, .. } => bits.iter().map(|&b| grammar.rule(b)).collect(),
        Rule::Plus { child, .. } => vec![rule, grammar.rule(*child)],
        _ => return TokenStream::new(),
    };

    let args = argument_names(&children);
    let doc = format!(
        "Creates `{}` from `{}`.",
        name,
        children.iter().map(|c| c.name()).join(" ")
    );
    quote! {
        #[doc = #doc]
        pub fn #fn_name(schema: &Schema, store: &mut NodeStore, #(#args: Node),*) -> Node {
            schema.create(store, #name, vec![#(#args),*])
        }
    }
}

/// Child tags as argument names, numbered from the second use on.
fn argument_names(children: &[&Rule]) -> Vec<syn::Ident> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    children
        .iter()
        .map(|c| {
            let lower = c.tag().lower.as_str();
            let n = seen.entry(lower).or_insert(0);
            *n += 1;
            if *n == 1 {
                format_ident!("{}", lower)
            } else {
                format_ident!("{}_{}", lower, *n)
            }
        })
        .collect()
}

fn generate_predicate(rule: &Rule) -> TokenStream {
    let name = rule.name();
    let fn_name = format_ident!("is_{}", rule.tag().lower);
    quote! {
        pub fn #fn_name(schema: &Schema, node: &Node) -> bool {
            schema.is(node, #name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lr_grammar_model::parse_grammar;

    fn normalize(s: &str) -> String {
        s.chars().filter(|c| !c.is_whitespace()).collect()
    }

    fn generate(src: &str) -> String {
        let grammar = parse_grammar(src).unwrap();
        normalize(&generate_rust(&grammar).to_string())
    }

    const SRC: &str = "language mini-calc\natom LIT [0-9]+\nsymbol '+' plus\nstart add\n\
                       add:\n    add '+' LIT #sum\n    LIT\n";

    #[test]
    fn test_module_and_kinds() {
        let s = generate(SRC);
        assert!(s.contains("pubmodmini_calc{"));
        assert!(s.contains("pubenumKind{Nothing,TokLit,TokPlus,TreeSum,}"));
        assert!(s.contains("Kind::TreeSum=>\"sum\""));
    }

    #[test]
    fn test_constructors() {
        let s = generate(SRC);
        assert!(s.contains(
            "pubfncreate_tree_sum(schema:&Schema,store:&mutNodeStore,any_add:Node,tok_plus:Node,tok_lit:Node)->Node"
        ));
        assert!(s.contains("pubfncreate_tok_lit(schema:&Schema,store:&mutNodeStore,text:&str)->Node"));
        assert!(s.contains("schema.terminal(store,\"+\",\"+\")"));
    }

    #[test]
    fn test_predicates_for_every_rule() {
        let s = generate(SRC);
        for name in ["is_any_add", "is_tree_sum", "is_tok_lit", "is_tok_plus"] {
            assert!(s.contains(&format!("pubfn{}(", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_repeated_children_are_numbered() {
        let src = "language t\nkeyword x\nkeyword y\nstart s\ns:\n    x y x+\n";
        let s = generate(src);
        assert!(s.contains("tok_x:Node,tok_y:Node,list_tok_x:Node"));
        assert!(s.contains("create_list_tok_x(schema:&Schema,store:&mutNodeStore,list_tok_x:Node,tok_x:Node)"));

        let src = "language t\nkeyword x\nstart s\ns:\n    x x\n";
        assert!(generate(src).contains("tok_x:Node,tok_x_2:Node"));
    }
}
