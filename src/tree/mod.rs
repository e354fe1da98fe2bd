//! The parse tree handed over by the tokenizer.
//!
//! Nodes live in an arena and are addressed by `NodeId`. Detaching a node
//! only unlinks it; the slot stays allocated so ids held by a pass remain
//! valid for the lifetime of the tree.

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{ChemError, Result};

mod kind;
pub use kind::*;

mod sexpr;
pub use sexpr::*;

pub type Attrs = BTreeMap<String, String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    /// The characters of the name this node was made from.
    pub text: String,
    pub attrs: Attrs,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ParseTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for ParseTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Index<NodeId> for ParseTree {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

impl std::ops::IndexMut<NodeId> for ParseTree {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }
}

impl ParseTree {
    /// An empty tree holding only the `molecule` node.
    pub fn new() -> Self {
        let mut tree = ParseTree {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        tree.root = tree.create(NodeKind::Molecule, "");
        tree
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Allocates a detached node.
    pub fn create(&mut self, kind: NodeKind, text: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            text: text.into(),
            attrs: Attrs::new(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self[id].kind
    }

    pub fn text(&self, id: NodeId) -> &str {
        &self[id].text
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self[id].attrs.get(key).map(String::as_str)
    }

    pub fn has_attr(&self, id: NodeId, key: &str) -> bool {
        self[id].attrs.contains_key(key)
    }

    pub fn set_attr(&mut self, id: NodeId, key: &str, value: impl Into<String>) {
        self[id].attrs.insert(key.to_string(), value.into());
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<String> {
        self[id].attrs.remove(key)
    }

    /// A required attribute; its absence is a broken contract between passes.
    pub fn attr_or_err(&self, id: NodeId, key: &str) -> Result<&str> {
        self.attr(id, key).ok_or_else(|| {
            ChemError::internal(format!("<{}> {} has no {} attribute", self.kind(id).tag(), self.text(id), key))
        })
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self[id].children
    }

    pub fn child_vec(&self, id: NodeId) -> Vec<NodeId> {
        self[id].children.clone()
    }

    pub fn children_of_kind(&self, id: NodeId, pred: impl Fn(NodeKind) -> bool) -> Vec<NodeId> {
        self.children(id).iter().copied().filter(|&c| pred(self.kind(c))).collect()
    }

    fn index_in_parent(&self, id: NodeId) -> Option<(NodeId, usize)> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|&c| c == id)?;
        Some((parent, index))
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        self.children(parent).get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let (parent, index) = self.index_in_parent(id)?;
        index.checked_sub(1).map(|i| self.children(parent)[i])
    }

    /// Siblings after `id`, nearest first.
    pub fn following_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.index_in_parent(id) {
            Some((parent, index)) => self.children(parent)[index + 1..].to_vec(),
            None => Vec::new(),
        }
    }

    /// Siblings before `id`, nearest first.
    pub fn preceding_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.index_in_parent(id) {
            Some((parent, index)) => self.children(parent)[..index].iter().rev().copied().collect(),
            None => Vec::new(),
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self[child].parent = Some(parent);
        self[parent].children.push(child);
    }

    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self[child].parent = Some(parent);
        let index = index.min(self[parent].children.len());
        self[parent].children.insert(index, child);
    }

    pub fn insert_before(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        self.detach(node);
        let (parent, index) = self
            .index_in_parent(anchor)
            .ok_or_else(|| ChemError::internal("inserting next to a detached node"))?;
        self.insert_child(parent, index, node);
        Ok(())
    }

    pub fn insert_after(&mut self, anchor: NodeId, node: NodeId) -> Result<()> {
        self.detach(node);
        let (parent, index) = self
            .index_in_parent(anchor)
            .ok_or_else(|| ChemError::internal("inserting next to a detached node"))?;
        self.insert_child(parent, index + 1, node);
        Ok(())
    }

    /// Unlinks a node (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        if let Some((parent, index)) = self.index_in_parent(id) {
            self[parent].children.remove(index);
        }
        self[id].parent = None;
    }

    /// Puts `replacement` where `old` was and detaches `old`.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) -> Result<()> {
        self.insert_before(old, replacement)?;
        self.detach(old);
        Ok(())
    }

    /// Deep copy of a subtree; the copy is detached.
    pub fn deep_copy(&mut self, id: NodeId) -> NodeId {
        let node = self[id].clone();
        let copy = self.create(node.kind, node.text.clone());
        self[copy].attrs = node.attrs;
        for child in node.children {
            let child_copy = self.deep_copy(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Preorder walk of the subtree below `id`, `id` excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.children(n).iter().rev().copied());
        }
        out
    }

    pub fn descendants_of_kind(&self, id: NodeId, pred: impl Fn(NodeKind) -> bool) -> Vec<NodeId> {
        self.descendants(id).into_iter().filter(|&n| pred(self.kind(n))).collect()
    }

    /// Nearest ancestor (excluding `id`) satisfying `pred`.
    pub fn ancestor(&self, id: NodeId, pred: impl Fn(NodeKind) -> bool) -> Option<NodeId> {
        let mut current = self.parent(id);
        while let Some(n) = current {
            if pred(self.kind(n)) {
                return Some(n);
            }
            current = self.parent(n);
        }
        None
    }

    pub fn word_of(&self, id: NodeId) -> Option<NodeId> {
        self.ancestor(id, |k| matches!(k, NodeKind::Word(_)))
    }

    /// The group of a substituent or root scope.
    pub fn scope_group(&self, scope: NodeId) -> Option<NodeId> {
        self.children(scope).iter().copied().find(|&c| self.kind(c).is_group())
    }

    pub fn scope_group_or_err(&self, scope: NodeId) -> Result<NodeId> {
        self.scope_group(scope).ok_or_else(|| {
            ChemError::internal(format!("<{}> {} has no group", self.kind(scope).tag(), scope))
        })
    }

    pub fn word_rules(&self) -> Vec<NodeId> {
        self.descendants_of_kind(self.root, |k| matches!(k, NodeKind::WordRule(_)))
    }

    pub fn words(&self) -> Vec<NodeId> {
        self.descendants_of_kind(self.root, |k| matches!(k, NodeKind::Word(_)))
    }

    /// Substituents and roots below `id`, in document order.
    pub fn substituents_and_roots(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants_of_kind(id, |k| matches!(k, NodeKind::Substituent | NodeKind::Root))
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(p) = self.parent(current) {
            current = p;
        }
        current == self.root
    }

    /// Splits a resolved `locant` attribute into its locants.
    pub fn locants(&self, id: NodeId) -> Vec<String> {
        match self.attr(id, "locant") {
            Some(text) if !text.is_empty() => text.split(',').map(str::to_string).collect(),
            _ => Vec::new(),
        }
    }

    pub fn multiplier(&self, id: NodeId) -> u32 {
        self.attr(id, "multiplier").and_then(|m| m.parse().ok()).unwrap_or(1)
    }

    /// The name text covered by a subtree, for error messages.
    pub fn subtree_text(&self, id: NodeId) -> String {
        let mut out = self.text(id).to_string();
        for d in self.descendants(id) {
            out.push_str(self.text(d));
        }
        out
    }
}
