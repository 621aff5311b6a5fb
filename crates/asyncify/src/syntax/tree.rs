//! Immutable tree snapshots with stable node identity.
//!
//! A [`SyntaxTree`] indexes a root node by id and records parent links.
//! [`SyntaxTree::replace`] path-copies the ancestors of the edited node, so
//! untouched subtrees are shared between snapshots and every surviving node
//! keeps its id.

use super::node::{Node, NodeId, NodeRef};
use crate::error::{AsyncifyError, AsyncifyResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Immutable snapshot of a syntax tree.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    root: NodeRef,
    nodes: HashMap<NodeId, NodeRef>,
    parents: HashMap<NodeId, NodeId>,
    /// Next id to hand out; ids of removed nodes are never reused.
    next_id: u32,
}

impl SyntaxTree {
    /// Build a snapshot, assigning ids to detached nodes.
    ///
    /// Fails with [`AsyncifyError::DuplicateNode`] if two nodes already
    /// carry the same id.
    pub fn new(root: NodeRef) -> AsyncifyResult<Self> {
        Self::with_next_id(root, 1)
    }

    fn with_next_id(root: NodeRef, floor: u32) -> AsyncifyResult<Self> {
        let max_assigned = root
            .descendants()
            .map(|n| n.id().get())
            .max()
            .unwrap_or(0);
        let mut next_id = floor.max(max_assigned.saturating_add(1));
        let mut seen = HashSet::new();
        let root = assign_ids(&root, &mut next_id, &mut seen)?;

        let mut nodes = HashMap::with_capacity(seen.len());
        let mut parents = HashMap::with_capacity(seen.len());
        for node in root.descendants() {
            for child in node.children() {
                parents.insert(child.id(), node.id());
            }
            nodes.insert(node.id(), node);
        }

        Ok(Self {
            root,
            nodes,
            parents,
            next_id,
        })
    }

    /// Root node.
    #[must_use]
    pub const fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty (never true for a built tree).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node by id.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&NodeRef> {
        self.nodes.get(&id)
    }

    /// Node by id, failing with [`AsyncifyError::NodeNotFound`].
    pub fn get(&self, id: NodeId) -> AsyncifyResult<&NodeRef> {
        self.nodes.get(&id).ok_or(AsyncifyError::NodeNotFound(id))
    }

    /// Whether the snapshot contains `id`.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Parent of `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<&NodeRef> {
        self.parents.get(&id).and_then(|p| self.nodes.get(p))
    }

    /// Ancestors of `id`, nearest first, not including `id` itself.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parents.get(&id).copied(),
        }
    }

    /// Every node in preorder.
    pub fn descendants(&self) -> super::node::Descendants {
        self.root.descendants()
    }

    /// New snapshot with `target` replaced by `replacement`.
    ///
    /// Ancestors of `target` are rebuilt with their ids unchanged. Detached
    /// nodes inside `replacement` receive fresh ids; nodes that already
    /// carry an id (typically reused parts of the old subtree) keep it.
    pub fn replace(&self, target: NodeId, replacement: NodeRef) -> AsyncifyResult<Self> {
        self.get(target)?;

        let mut current = replacement;
        let mut old_child = target;
        while let Some(&parent_id) = self.parents.get(&old_child) {
            let parent = self.get(parent_id)?;
            current = parent.with_child_replaced(old_child, &current);
            old_child = parent_id;
        }

        Self::with_next_id(current, self.next_id)
    }
}

fn assign_ids(
    node: &NodeRef,
    next_id: &mut u32,
    seen: &mut HashSet<NodeId>,
) -> AsyncifyResult<NodeRef> {
    let mut changed = false;
    let id = if node.id().is_assigned() {
        node.id()
    } else {
        changed = true;
        let id = NodeId::new(*next_id);
        *next_id += 1;
        id
    };
    if !seen.insert(id) {
        return Err(AsyncifyError::DuplicateNode(id));
    }

    let mut children = Vec::with_capacity(node.children().len());
    for child in node.children() {
        let assigned = assign_ids(child, next_id, seen)?;
        changed |= !Arc::ptr_eq(&assigned, child);
        children.push(assigned);
    }

    if changed {
        Ok(Node::from_parts(
            id,
            node.span(),
            node.kind().clone(),
            children,
        ))
    } else {
        Ok(Arc::clone(node))
    }
}

/// Iterator over the ancestors of a node.
#[derive(Debug)]
pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a NodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        self.next = self.tree.parents.get(&id).copied();
        self.tree.nodes.get(&id)
    }
}
