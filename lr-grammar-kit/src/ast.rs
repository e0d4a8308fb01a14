//! Shared, immutable syntax tree nodes.
//!
//! Nodes are reference counted and never mutated after construction, so
//! subtrees can be shared freely between trees and parser clones. A
//! [`NodeStore`] interns nodes by content: building the same leaf or the same
//! tree twice hands back the same allocation.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

/// Index of a node type in a [`Schema`](crate::schema::Schema).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Kind(pub u32);

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Leaf {
    kind: Kind,
    text: Rc<str>,
}

impl Leaf {
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Tree {
    kind: Kind,
    tokens: usize,
    children: Vec<Node>,
}

impl Tree {
    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }
}

/// A syntax tree value.
///
/// `Nothing` stands in for an absent optional element. It has no kind, no
/// children and counts zero tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum Node {
    #[default]
    Nothing,
    Leaf(Rc<Leaf>),
    Tree(Rc<Tree>),
}

impl Node {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Node::Nothing)
    }

    pub fn kind(&self) -> Option<Kind> {
        match self {
            Node::Nothing => None,
            Node::Leaf(l) => Some(l.kind),
            Node::Tree(t) => Some(t.kind),
        }
    }

    /// Number of leaves below this node, computed at construction.
    pub fn total_tokens(&self) -> usize {
        match self {
            Node::Nothing => 0,
            Node::Leaf(_) => 1,
            Node::Tree(t) => t.tokens,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Tree(t) => &t.children,
            _ => &[],
        }
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Leaf(l) => Some(&l.text),
            _ => None,
        }
    }

    /// Whether both are the same allocation, or both nothing.
    pub fn same(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Nothing, Node::Nothing) => true,
            (Node::Leaf(a), Node::Leaf(b)) => Rc::ptr_eq(a, b),
            (Node::Tree(a), Node::Tree(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    fn key(&self) -> NodeKey {
        match self {
            Node::Nothing => NodeKey::Nothing,
            Node::Leaf(l) => NodeKey::Leaf(Rc::as_ptr(l) as usize),
            Node::Tree(t) => NodeKey::Tree(Rc::as_ptr(t) as usize),
        }
    }
}

impl fmt::Display for Node {
    /// The leaf texts separated by single spaces.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut result = Ok(());
        walk(self, &mut |mode: VisitMode, node: &Node, _parent: Option<Kind>| {
            if let (VisitMode::Enter, Some(text)) = (mode, node.text()) {
                if !first {
                    result = result.and_then(|_| f.write_str(" "));
                }
                first = false;
                result = result.and_then(|_| f.write_str(text));
            }
        });
        result
    }
}

/// Identity of an interned child. Stored nodes are kept alive by the store,
/// so their addresses stay unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum NodeKey {
    Nothing,
    Leaf(usize),
    Tree(usize),
}

/// Interning arena for nodes.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    texts: HashSet<Rc<str>>,
    leaves: HashMap<(Kind, Rc<str>), Rc<Leaf>>,
    trees: HashMap<(Kind, Vec<NodeKey>), Rc<Tree>>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn leaf(&mut self, kind: Kind, text: &str) -> Node {
        let text = match self.texts.get(text) {
            Some(t) => t.clone(),
            None => {
                let t: Rc<str> = Rc::from(text);
                self.texts.insert(t.clone());
                t
            }
        };
        let leaf = self
            .leaves
            .entry((kind, text.clone()))
            .or_insert_with(|| Rc::new(Leaf { kind, text }));
        Node::Leaf(leaf.clone())
    }

    /// Children must come from this store.
    pub fn tree(&mut self, kind: Kind, children: Vec<Node>) -> Node {
        let key = (kind, children.iter().map(Node::key).collect());
        let tree = self.trees.entry(key).or_insert_with(|| {
            let tokens = children.iter().map(Node::total_tokens).sum();
            Rc::new(Tree {
                kind,
                tokens,
                children,
            })
        });
        Node::Tree(tree.clone())
    }

    /// Number of distinct nodes held.
    pub fn len(&self) -> usize {
        self.leaves.len() + self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitMode {
    Enter,
    Leave,
}

pub trait Visitor {
    /// `parent` is the kind of the tree directly above `node`.
    fn visit(&mut self, mode: VisitMode, node: &Node, parent: Option<Kind>);
}

impl<F> Visitor for F
where
    F: FnMut(VisitMode, &Node, Option<Kind>),
{
    fn visit(&mut self, mode: VisitMode, node: &Node, parent: Option<Kind>) {
        self(mode, node, parent)
    }
}

/// Depth-first walk, children left to right. Every node, `nothing`
/// included, is entered before and left after its children.
pub fn walk<V: Visitor + ?Sized>(node: &Node, visitor: &mut V) {
    walk_inner(node, None, visitor);
}

fn walk_inner<V: Visitor + ?Sized>(node: &Node, parent: Option<Kind>, visitor: &mut V) {
    visitor.visit(VisitMode::Enter, node, parent);
    let kind = node.kind();
    for child in node.children() {
        walk_inner(child, kind, visitor);
    }
    visitor.visit(VisitMode::Leave, node, parent);
}
