//! Blocking-wait detection.
//!
//! Classifies an invocation as blocking on an asynchronous result, as a
//! synchronous platform call with an asynchronous sibling, or as neither.
//!
//! ## Rules (evaluated in order)
//!
//! | # | Rule | Outcome |
//! |---|------|---------|
//! | 1 | Handle immediately consumed by a member call returning nothing | not applicable |
//! | 2 | Enclosing routine has by-ref parameters | not applicable |
//! | 3 | No resolvable target, lock, already suspended, no routine | not applicable |
//! | 4 | Platform target with exactly one compatible `…Async` sibling | sibling exists |
//! | 5 | Async-or-handle target with a blocking consumer | blocking unwrap |
//! | 6 | Otherwise | not applicable |

use crate::config::AsyncifyConfig;
use crate::semantic::{RoutineSymbol, SemanticModel, SymbolId};
use crate::site::{find_blocking_consumer, skip_parens_down, BlockingKind, CallSite};
use crate::syntax::{NodeId, NodeKind, SyntaxTree, TypeRef};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Asynchronous variant of a synchronous platform routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsyncSibling {
    /// Name to call instead
    pub name: String,
    /// Sibling symbol
    pub symbol: SymbolId,
    /// Types of the sibling's parameters
    pub param_types: Vec<TypeRef>,
}

/// Detection outcome for one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Classification {
    /// Nothing to fix
    NotApplicable,
    /// Handle is waited on synchronously
    BlockingUnwrap(BlockingKind),
    /// Synchronous call has an asynchronous sibling
    SynchronousSiblingExists(AsyncSibling),
}

impl Classification {
    /// Whether a fix can be offered.
    #[must_use]
    pub const fn is_applicable(&self) -> bool {
        !matches!(self, Self::NotApplicable)
    }

    /// Replacement routine name for sibling classifications.
    #[must_use]
    pub fn replacement_name(&self) -> Option<&str> {
        match self {
            Self::SynchronousSiblingExists(sibling) => Some(&sibling.name),
            _ => None,
        }
    }
}

/// Detector over one semantic model.
#[derive(Debug)]
pub struct Detector<'a, M: ?Sized> {
    model: &'a M,
    config: &'a AsyncifyConfig,
}

impl<'a, M: SemanticModel + ?Sized> Detector<'a, M> {
    /// Create a detector.
    pub const fn new(model: &'a M, config: &'a AsyncifyConfig) -> Self {
        Self { model, config }
    }

    /// Classify an invocation site.
    #[must_use]
    pub fn classify(&self, tree: &SyntaxTree, call: NodeId) -> Classification {
        match self.classify_call(tree, call) {
            Ok(classification) => classification,
            Err(reason) => {
                trace!(node = %call, reason, "not applicable");
                Classification::NotApplicable
            }
        }
    }

    fn classify_call(&self, tree: &SyntaxTree, call: NodeId) -> Result<Classification, &'static str> {
        let node = tree.node(call).ok_or("node not in tree")?;
        if !node.is_call() {
            return Err("not an invocation");
        }

        if self.consumed_by_void_call(tree, call) {
            return Err("result consumed by a void member call");
        }

        let site = CallSite::locate(tree, call);
        self.check_context(tree, &site)?;

        let target = self.model.symbol_of(call).ok_or("unresolved target")?;

        if let Some(sibling) = self.find_async_sibling(tree, call, target) {
            return Ok(Classification::SynchronousSiblingExists(sibling));
        }

        if target.is_awaitable(&self.config.handle_type) {
            if let Some(consumer) = find_blocking_consumer(tree, call, &self.config.blocking) {
                return Ok(Classification::BlockingUnwrap(consumer.kind));
            }
        }

        Err("no blocking consumer")
    }

    /// Classify a result access on a handle held in a variable or other
    /// non-invocation expression: `task.Result`.
    #[must_use]
    pub fn classify_access(&self, tree: &SyntaxTree, member: NodeId) -> Classification {
        match self.classify_member(tree, member) {
            Ok(classification) => classification,
            Err(reason) => {
                trace!(node = %member, reason, "access not applicable");
                Classification::NotApplicable
            }
        }
    }

    fn classify_member(&self, tree: &SyntaxTree, member: NodeId) -> Result<Classification, &'static str> {
        let node = tree.node(member).ok_or("node not in tree")?;
        if node.member_name() != Some(self.config.blocking.result.as_str()) {
            return Err("not a result access");
        }
        let target = node.member_target().ok_or("member without target")?;
        let operand = skip_parens_down(target);
        if operand.is_call() {
            return Err("invocation handled by classify");
        }

        let site = CallSite::locate(tree, member);
        self.check_context(tree, &site)?;

        let is_handle = self
            .model
            .type_of(operand.id())
            .is_some_and(|ty| ty.is_named(&self.config.handle_type));
        if is_handle {
            Ok(Classification::BlockingUnwrap(BlockingKind::ResultAccessor))
        } else {
            Err("target is not a handle")
        }
    }

    fn check_context(&self, tree: &SyntaxTree, site: &CallSite) -> Result<(), &'static str> {
        if site.awaited {
            return Err("already suspended");
        }
        if site.in_lock {
            return Err("inside a lock");
        }
        let routine = site
            .routine
            .and_then(|id| tree.node(id))
            .ok_or("no enclosing routine")?;
        if routine.signature().is_some_and(|s| s.has_by_ref_params()) {
            return Err("enclosing routine has by-ref parameters");
        }
        Ok(())
    }

    /// `call().M()` where `M` returns nothing. Checks only the immediate
    /// parent; parenthesized receivers are not exempt.
    fn consumed_by_void_call(&self, tree: &SyntaxTree, call: NodeId) -> bool {
        let Some(member) = tree
            .parent(call)
            .filter(|p| matches!(p.kind(), NodeKind::Member { .. }))
        else {
            return false;
        };
        let Some(outer) = tree
            .parent(member.id())
            .filter(|p| p.is_call() && p.callee().is_some_and(|c| c.id() == member.id()))
        else {
            return false;
        };
        self.model
            .symbol_of(outer.id())
            .is_some_and(RoutineSymbol::returns_void)
    }

    /// Find the single compatible `…Async` sibling of a platform routine.
    fn find_async_sibling(
        &self,
        tree: &SyntaxTree,
        call: NodeId,
        target: &RoutineSymbol,
    ) -> Option<AsyncSibling> {
        if !self.config.sibling.is_platform(&target.assembly) {
            return None;
        }

        let receiver = tree
            .node(call)
            .and_then(|n| n.callee())
            .and_then(|callee| callee.member_target())
            .and_then(|recv| self.model.type_of(recv.id()))
            .cloned()
            .unwrap_or_else(|| TypeRef::named(target.containing_type.clone()));

        let name = format!("{}{}", target.name, self.config.sibling.suffix);
        let candidates: Vec<&RoutineSymbol> = self
            .model
            .lookup_members(&receiver, &name, call)
            .into_iter()
            .filter(|m| !m.is_overridable() && signature_compatible(target, m))
            .collect();

        match candidates.as_slice() {
            [sibling] => Some(AsyncSibling {
                name: sibling.name.clone(),
                symbol: sibling.id,
                param_types: sibling.params.iter().map(|p| p.ty.clone()).collect(),
            }),
            [] => None,
            _ => {
                trace!(node = %call, name = %name, count = candidates.len(), "ambiguous sibling");
                None
            }
        }
    }
}

/// Leading parameters match and every extra parameter has a default.
fn signature_compatible(sync: &RoutineSymbol, candidate: &RoutineSymbol) -> bool {
    candidate.params.len() >= sync.params.len()
        && sync
            .params
            .iter()
            .zip(&candidate.params)
            .all(|(a, b)| a.ty == b.ty && a.mode == b.mode)
        && candidate.params[sync.params.len()..]
            .iter()
            .all(|p| p.has_default)
}
