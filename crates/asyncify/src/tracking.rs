//! Node tracking across immutable rewrites.
//!
//! A rewrite session registers the nodes it will revisit before any edit
//! and resolves them again against each new snapshot. Every edit goes
//! through [`Transaction::replace`], which refuses to commit a snapshot in
//! which a live handle no longer resolves.

use crate::error::{AsyncifyError, AsyncifyResult};
use crate::syntax::{NodeId, NodeRef, SyntaxTree};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Handle to a tracked node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackHandle(u32);

impl fmt::Display for TrackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Registry of tracked nodes.
#[derive(Debug, Default, Clone)]
pub struct TrackedNodes {
    entries: BTreeMap<TrackHandle, NodeId>,
    next: u32,
}

impl TrackedNodes {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `node`; it must exist in `tree`.
    pub fn track(&mut self, tree: &SyntaxTree, node: NodeId) -> AsyncifyResult<TrackHandle> {
        tree.get(node)?;
        let handle = TrackHandle(self.next);
        self.next += 1;
        self.entries.insert(handle, node);
        Ok(handle)
    }

    /// Resolve a handle in `tree`.
    pub fn resolve<'t>(&self, handle: TrackHandle, tree: &'t SyntaxTree) -> AsyncifyResult<&'t NodeRef> {
        let node = self
            .entries
            .get(&handle)
            .copied()
            .ok_or(AsyncifyError::LostTrackedNode {
                handle,
                node: NodeId::UNASSIGNED,
            })?;
        tree.node(node)
            .ok_or(AsyncifyError::LostTrackedNode { handle, node })
    }

    /// Stop tracking a handle.
    pub fn release(&mut self, handle: TrackHandle) {
        self.entries.remove(&handle);
    }

    /// Number of live handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no handles are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fail if any live handle does not resolve in `tree`.
    pub fn verify(&self, tree: &SyntaxTree) -> AsyncifyResult<()> {
        match self.entries.iter().find(|(_, node)| !tree.contains(**node)) {
            Some((&handle, &node)) => Err(AsyncifyError::LostTrackedNode { handle, node }),
            None => Ok(()),
        }
    }
}

/// Current snapshot plus the nodes tracked across its edits.
#[derive(Debug, Clone)]
pub struct Transaction {
    tree: SyntaxTree,
    tracked: TrackedNodes,
    edits: usize,
}

impl Transaction {
    /// Start from `tree`.
    #[must_use]
    pub fn new(tree: SyntaxTree) -> Self {
        Self {
            tree,
            tracked: TrackedNodes::new(),
            edits: 0,
        }
    }

    /// Current snapshot.
    #[must_use]
    pub const fn tree(&self) -> &SyntaxTree {
        &self.tree
    }

    /// Number of committed edits.
    #[must_use]
    pub const fn edits(&self) -> usize {
        self.edits
    }

    /// Track a node of the current snapshot.
    pub fn track(&mut self, node: NodeId) -> AsyncifyResult<TrackHandle> {
        self.tracked.track(&self.tree, node)
    }

    /// Resolve a tracked node in the current snapshot.
    pub fn resolve(&self, handle: TrackHandle) -> AsyncifyResult<&NodeRef> {
        self.tracked.resolve(handle, &self.tree)
    }

    /// Stop tracking a node.
    pub fn release(&mut self, handle: TrackHandle) {
        self.tracked.release(handle);
    }

    /// Replace `target` and commit the new snapshot.
    pub fn replace(&mut self, target: NodeId, replacement: NodeRef) -> AsyncifyResult<()> {
        let next = self.tree.replace(target, replacement)?;
        self.tracked.verify(&next)?;
        trace!(target = %target, nodes = next.len(), "committed edit");
        self.tree = next;
        self.edits += 1;
        Ok(())
    }

    /// Finish the session, returning the final snapshot.
    #[must_use]
    pub fn into_tree(self) -> SyntaxTree {
        self.tree
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::syntax::{Expr, Node, NodeKind, Stmt};
    use std::sync::Arc;

    fn sample() -> SyntaxTree {
        let block = Stmt::block(vec![
            Stmt::expr(Expr::ident("a").call(vec![])),
            Stmt::expr(Expr::ident("b").call(vec![])),
        ]);
        SyntaxTree::new(block.into_node()).unwrap()
    }

    fn call(tree: &SyntaxTree, name: &str) -> NodeId {
        tree.descendants()
            .find(|n| n.is_call() && n.invoked_name() == Some(name))
            .unwrap()
            .id()
    }

    #[test]
    fn tracked_node_survives_sibling_edit() {
        let tree = sample();
        let a = call(&tree, "a");
        let b = call(&tree, "b");
        let mut tx = Transaction::new(tree);
        let handle = tx.track(b).unwrap();

        let wrapped = Node::new(NodeKind::Await, vec![Arc::clone(tx.tree().get(a).unwrap())]);
        tx.replace(a, wrapped).unwrap();

        assert_eq!(tx.resolve(handle).unwrap().id(), b);
        assert_eq!(tx.edits(), 1);
    }

    #[test]
    fn losing_a_tracked_node_is_an_error() {
        let tree = sample();
        let a = call(&tree, "a");
        let mut tx = Transaction::new(tree);
        let handle = tx.track(a).unwrap();

        let err = tx
            .replace(a, Expr::ident("gone").into_node())
            .unwrap_err();
        assert!(matches!(
            err,
            AsyncifyError::LostTrackedNode { handle: h, node } if h == handle && node == a
        ));
        // snapshot not committed
        assert!(tx.tree().contains(a));
        assert_eq!(tx.edits(), 0);
    }

    #[test]
    fn released_handles_are_not_verified() {
        let tree = sample();
        let a = call(&tree, "a");
        let mut tx = Transaction::new(tree);
        let handle = tx.track(a).unwrap();
        tx.release(handle);
        tx.replace(a, Expr::ident("gone").into_node()).unwrap();
        assert!(tx.resolve(handle).is_err());
    }

    #[test]
    fn tracking_unknown_node_fails() {
        let tree = sample();
        let mut registry = TrackedNodes::new();
        assert!(registry.track(&tree, NodeId::new(777)).is_err());
        assert!(registry.is_empty());
    }
}
