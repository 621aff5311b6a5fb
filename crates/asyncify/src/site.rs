//! Call-site context.
//!
//! Everything the detector and the rewrite engine need to know about where
//! an invocation sits: the enclosing routine or lambda, whether it is inside
//! a lock, and which expression (if any) synchronously consumes its handle.

use crate::config::BlockingNames;
use crate::syntax::{NodeId, NodeKind, NodeRef, SyntaxTree};

/// How a handle is being waited on synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum BlockingKind {
    /// `call().Result`
    ResultAccessor,
    /// `call().Wait()`
    WaitCall,
    /// `call().GetAwaiter().GetResult()`
    ManualAwaiterRetrieval,
}

impl BlockingKind {
    /// Human-readable description.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::ResultAccessor => "result accessor",
            Self::WaitCall => "wait call",
            Self::ManualAwaiterRetrieval => "manual awaiter retrieval",
        }
    }
}

/// Expression that blocks on a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockingConsumer {
    /// Outermost node of the blocking construct
    pub node: NodeId,
    /// Form of the construct
    pub kind: BlockingKind,
}

/// Enclosing context of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Site node
    pub node: NodeId,
    /// Nearest routine declaration
    pub routine: Option<NodeId>,
    /// Nearest lambda between the site and its routine
    pub lambda: Option<NodeId>,
    /// Inside a lock within the nearest function boundary
    pub in_lock: bool,
    /// Directly consumed by a suspension point
    pub awaited: bool,
}

impl CallSite {
    /// Compute the context of `node` in `tree`.
    #[must_use]
    pub fn locate(tree: &SyntaxTree, node: NodeId) -> Self {
        let mut site = Self {
            node,
            routine: None,
            lambda: None,
            in_lock: false,
            awaited: matches!(
                skip_parens_up(tree, node).map(|p| p.kind()),
                Some(NodeKind::Await)
            ),
        };

        let mut crossed_boundary = false;
        for ancestor in tree.ancestors(node) {
            match ancestor.kind() {
                NodeKind::Lock if !crossed_boundary => site.in_lock = true,
                NodeKind::Lambda { .. } => {
                    if site.lambda.is_none() {
                        site.lambda = Some(ancestor.id());
                    }
                    crossed_boundary = true;
                }
                NodeKind::Routine(_) => {
                    site.routine = Some(ancestor.id());
                    break;
                }
                _ => {}
            }
        }
        site
    }

    /// Function the site's code belongs to: the lambda if there is one,
    /// otherwise the routine.
    #[must_use]
    pub fn scope(&self) -> Option<NodeId> {
        self.lambda.or(self.routine)
    }
}

/// First ancestor that is not a parenthesized expression.
pub(crate) fn skip_parens_up(tree: &SyntaxTree, node: NodeId) -> Option<&NodeRef> {
    tree.ancestors(node)
        .find(|a| !matches!(a.kind(), NodeKind::Paren))
}

/// Strip parentheses around an expression.
pub(crate) fn skip_parens_down(node: &NodeRef) -> &NodeRef {
    let mut current = node;
    while let (NodeKind::Paren, Some(inner)) = (current.kind(), current.child(0)) {
        current = inner;
    }
    current
}

/// Parent of `member` if it invokes `member` as its callee.
fn invoking_call<'t>(tree: &'t SyntaxTree, member: &NodeRef) -> Option<&'t NodeRef> {
    tree.parent(member.id())
        .filter(|p| p.is_call() && p.callee().is_some_and(|c| c.id() == member.id()))
}

/// Find the construct that synchronously waits on the handle produced by
/// `operand`.
///
/// Ascends from `operand` through parentheses only. Recognises the
/// configured result accessor, the wait call and the two-step awaiter
/// retrieval; any other parent means the handle is not being waited on.
#[must_use]
pub fn find_blocking_consumer(
    tree: &SyntaxTree,
    operand: NodeId,
    names: &BlockingNames,
) -> Option<BlockingConsumer> {
    let member = skip_parens_up(tree, operand)?;
    let name = member.member_name()?;

    if name == names.result {
        return Some(BlockingConsumer {
            node: member.id(),
            kind: BlockingKind::ResultAccessor,
        });
    }

    if name == names.wait {
        let call = invoking_call(tree, member)?;
        return Some(BlockingConsumer {
            node: call.id(),
            kind: BlockingKind::WaitCall,
        });
    }

    if name == names.awaiter {
        let awaiter_call = invoking_call(tree, member)?;
        let result_member = tree
            .parent(awaiter_call.id())
            .filter(|p| p.member_name() == Some(names.awaiter_result.as_str()))?;
        let result_call = invoking_call(tree, result_member)?;
        return Some(BlockingConsumer {
            node: result_call.id(),
            kind: BlockingKind::ManualAwaiterRetrieval,
        });
    }

    None
}
