use proc_macro2::{Span, TokenStream};
use quote::ToTokens;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A rule name with all the spellings needed to address it.
///
/// `dash` is the canonical form (`tree-expr-list`), `visual` is what the
/// grammar author wrote (`expr-list`, `'+'`). Two identifiers are equal when
/// both agree.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub dash: String,
    pub space: String,
    pub lower: String,
    pub upper: String,
    pub camel: String,
    pub visual: String,
}

impl Identifier {
    pub fn new(name: &str, visual: impl Into<String>) -> Self {
        let dash = canonical(name);
        let space = dash.replace('-', " ");
        let lower = dash.replace('-', "_");
        let upper = lower.to_uppercase();
        let camel = camel_case(&space);
        Self {
            dash,
            space,
            lower,
            upper,
            camel,
            visual: visual.into(),
        }
    }

    /// `prefixed("tree", "expr-list")` names the node type of rule `expr-list`.
    pub fn prefixed(prefix: &str, name: &str, visual: impl Into<String>) -> Self {
        Self::new(&format!("{}-{}", prefix, name), visual)
    }

    pub fn to_ident(&self) -> syn::Ident {
        syn::Ident::new(&self.lower, Span::call_site())
    }

    pub fn to_type_ident(&self) -> syn::Ident {
        syn::Ident::new(&self.camel, Span::call_site())
    }
}

/// Lowercase, with every run of non-alphanumeric characters turned into one `-`.
pub fn canonical(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    out
}

fn camel_case(space: &str) -> String {
    let mut out = String::new();
    for word in space.split_whitespace() {
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            out.extend(first.to_uppercase());
            out.push_str(chars.as_str());
        }
        // keep `int8 t` from running into `Int8T`
        if word.ends_with(|c: char| c.is_ascii_digit()) {
            out.push('_');
        }
    }
    out
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.dash == other.dash && self.visual == other.visual
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.dash.hash(state);
        self.visual.hash(state);
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.visual)
    }
}

impl ToTokens for Identifier {
    fn to_tokens(&self, tokens: &mut TokenStream) {
        self.to_ident().to_tokens(tokens);
    }
}
