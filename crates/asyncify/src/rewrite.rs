//! Rewrite engine.
//!
//! Turns a classified site into a suspension point and converts the
//! enclosing routine (or lambda) to asynchronous form. Each step produces a
//! new snapshot through a [`Transaction`]; the routine, lambda and site are
//! tracked before the first edit and resolved again after each one.
//!
//! ```text
//! int Test() { return test.CallAsync().Result; }
//!   -> async Task<int> Test(CancellationToken cancellationToken = default(CancellationToken))
//!      { return await test.CallAsync(cancellationToken); }
//! ```

use crate::boundary;
use crate::config::AsyncifyConfig;
use crate::detect::Classification;
use crate::error::{AsyncifyError, AsyncifyResult};
use crate::semantic::{cancellation_slot, SemanticModel};
use crate::site::{find_blocking_consumer, CallSite};
use crate::syntax::{Node, NodeId, NodeKind, NodeRef, Param, SyntaxTree, TypeRef};
use crate::tracking::Transaction;
use crate::walker::CallChainWalker;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, debug_span};

/// Result of a fix.
#[derive(Debug, Clone)]
pub struct FixOutcome {
    /// Final snapshot
    pub tree: SyntaxTree,
    /// Classification the fix was applied for
    pub classification: Classification,
    /// Routines whose headers changed, leaf first
    pub converted: Vec<NodeId>,
    /// Lambdas marked asynchronous
    pub lambdas: Vec<NodeId>,
    /// Caller sites left blocking at a conversion boundary
    pub blocked_sites: Vec<NodeId>,
}

impl FixOutcome {
    /// Top-most routine changed by the fix.
    #[must_use]
    pub fn topmost(&self) -> Option<NodeId> {
        self.converted.last().copied()
    }

    /// Serializable summary.
    #[must_use]
    pub fn summary(&self) -> FixSummary {
        let names = |ids: &[NodeId]| {
            ids.iter()
                .filter_map(|id| self.tree.node(*id))
                .filter_map(|n| n.signature().map(|s| s.name.clone()))
                .collect()
        };
        FixSummary {
            converted: names(&self.converted),
            lambdas: self.lambdas.len(),
            blocked_sites: self.blocked_sites.clone(),
        }
    }
}

/// Names of converted routines and counts, for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FixSummary {
    /// Converted routine names, leaf first
    pub converted: Vec<String>,
    /// Number of lambdas marked asynchronous
    pub lambdas: usize,
    /// Sites left blocking
    pub blocked_sites: Vec<NodeId>,
}

/// How a routine header was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoutineChange {
    /// Already asynchronous
    Unchanged,
    /// Already returned a handle; only marked asynchronous
    MarkedAsync,
    /// Marked asynchronous, return type wrapped, token appended
    Converted,
}

/// State shared by the leaf fix and call-chain propagation.
#[derive(Debug)]
pub(crate) struct Session {
    pub(crate) tx: Transaction,
    pub(crate) visited: HashSet<NodeId>,
    pub(crate) converted: Vec<NodeId>,
    pub(crate) lambdas: Vec<NodeId>,
    pub(crate) blocked: Vec<NodeId>,
}

impl Session {
    pub(crate) fn new(tree: SyntaxTree) -> Self {
        Self {
            tx: Transaction::new(tree),
            visited: HashSet::new(),
            converted: Vec::new(),
            lambdas: Vec::new(),
            blocked: Vec::new(),
        }
    }

    pub(crate) fn note_lambda(&mut self, lambda: NodeId) {
        if !self.lambdas.contains(&lambda) {
            self.lambdas.push(lambda);
        }
    }

    fn into_outcome(self, classification: Classification) -> FixOutcome {
        FixOutcome {
            tree: self.tx.into_tree(),
            classification,
            converted: self.converted,
            lambdas: self.lambdas,
            blocked_sites: self.blocked,
        }
    }
}

/// Applies fixes against one semantic model.
#[derive(Debug)]
pub struct RewriteEngine<'a, M: ?Sized> {
    model: &'a M,
    config: &'a AsyncifyConfig,
}

impl<'a, M: SemanticModel + ?Sized> RewriteEngine<'a, M> {
    /// Create an engine.
    pub const fn new(model: &'a M, config: &'a AsyncifyConfig) -> Self {
        Self { model, config }
    }

    /// Apply the fix for `site` and, when propagation is enabled, carry the
    /// conversion up the call chain.
    ///
    /// `site` is an invocation, or a result access for variable-held
    /// handles. The input snapshot is left untouched.
    pub fn apply_fix(
        &self,
        tree: &SyntaxTree,
        site: NodeId,
        classification: &Classification,
    ) -> AsyncifyResult<FixOutcome> {
        let _span = debug_span!("apply_fix", site = %site).entered();
        let mut session = Session::new(tree.clone());

        let seed = self.fix_leaf(&mut session, site, classification)?;
        if let Some(routine) = seed.filter(|_| self.config.propagate) {
            CallChainWalker::new(self.model, self.config).run(&mut session, routine)?;
        }

        debug!(
            converted = session.converted.len(),
            blocked = session.blocked.len(),
            edits = session.tx.edits(),
            "fix applied"
        );
        Ok(session.into_outcome(classification.clone()))
    }

    /// Rewrite the site itself and its enclosing scope. Returns the routine
    /// to propagate from, if its return type changed.
    fn fix_leaf(
        &self,
        session: &mut Session,
        site: NodeId,
        classification: &Classification,
    ) -> AsyncifyResult<Option<NodeId>> {
        let tree = session.tx.tree();
        let node = tree.get(site)?;

        let (operand, consumer, rename, callee_params) = match classification {
            Classification::NotApplicable => {
                return Err(AsyncifyError::not_applicable(site, "site is not a blocking wait"));
            }
            Classification::BlockingUnwrap(_) if node.is_call() => {
                let consumer = find_blocking_consumer(tree, site, &self.config.blocking)
                    .ok_or_else(|| AsyncifyError::not_applicable(site, "no blocking consumer"))?;
                let params = self
                    .model
                    .symbol_of(site)
                    .map(|s| s.params.iter().map(|p| p.ty.clone()).collect());
                (site, Some(consumer.node), None, params)
            }
            Classification::BlockingUnwrap(_) => {
                let target = node.member_target().ok_or_else(|| {
                    AsyncifyError::not_applicable(site, "site is neither a call nor a result access")
                })?;
                (target.id(), Some(site), None, None)
            }
            Classification::SynchronousSiblingExists(sibling) => {
                if !node.is_call() {
                    return Err(AsyncifyError::not_applicable(site, "sibling fix needs a call"));
                }
                let consumer = find_blocking_consumer(tree, site, &self.config.blocking);
                (
                    site,
                    consumer.map(|c| c.node),
                    Some(sibling.name.clone()),
                    Some(sibling.param_types.clone()),
                )
            }
        };

        let ctx = CallSite::locate(tree, site);
        if ctx.awaited {
            return Err(AsyncifyError::not_applicable(site, "already suspended"));
        }
        let routine = ctx.routine.ok_or(AsyncifyError::MissingRoutine(site))?;
        if let Some(boundary) = boundary::site_boundary(tree, &ctx) {
            return Err(AsyncifyError::not_applicable(site, boundary.to_string()));
        }

        let token = self.token_in_scope(tree, routine, ctx.lambda.is_none());
        let forward = callee_params
            .as_deref()
            .and_then(|params| self.forwarding_token(tree.get(operand).ok()?, params, token.as_deref()));

        let routine_handle = session.tx.track(routine)?;
        let lambda_handle = ctx.lambda.map(|l| session.tx.track(l)).transpose()?;
        let operand_handle = session.tx.track(operand)?;

        self.await_operand(
            &mut session.tx,
            operand,
            consumer,
            rename.as_deref(),
            forward.as_deref(),
        )?;
        session.tx.resolve(operand_handle)?;
        session.tx.release(operand_handle);

        if let Some(handle) = lambda_handle {
            let lambda = session.tx.resolve(handle)?.id();
            self.mark_lambda_async(&mut session.tx, lambda)?;
            session.note_lambda(lambda);
            session.tx.release(handle);
            session.tx.release(routine_handle);
            return Ok(None);
        }

        let routine = session.tx.resolve(routine_handle)?.id();
        let change = self.convert_routine(&mut session.tx, routine)?;
        session.tx.release(routine_handle);
        session.visited.insert(routine);
        if change != RoutineChange::Unchanged {
            session.converted.push(routine);
        }
        Ok((change == RoutineChange::Converted).then_some(routine))
    }

    /// Name of the cancellation token visible in `routine`'s body after
    /// conversion: an existing parameter, or the one conversion will add.
    pub(crate) fn token_in_scope(
        &self,
        tree: &SyntaxTree,
        routine: NodeId,
        will_convert: bool,
    ) -> Option<String> {
        let sig = tree.node(routine)?.signature()?;
        if let Some(param) = sig.param_of_type(&self.config.cancellation.type_name) {
            return Some(param.name.clone());
        }
        let gains_token = will_convert
            && !sig.is_async
            && !sig.return_type.is_named(&self.config.handle_type);
        gains_token.then(|| self.config.cancellation.param_name.clone())
    }

    /// Token to append to `call` if its callee takes a cancellation token in
    /// the position right after the supplied arguments.
    pub(crate) fn forwarding_token(
        &self,
        call: &Node,
        callee_params: &[TypeRef],
        token: Option<&str>,
    ) -> Option<String> {
        if !self.config.forward_cancellation || !call.is_call() {
            return None;
        }
        let token = token?;
        let slot = cancellation_slot(callee_params, &self.config.cancellation.type_name)?;
        (slot == call.args().len()).then(|| token.to_string())
    }

    /// Replace the blocking construct (or the bare call) with a suspension
    /// on `operand`, optionally renaming the callee and forwarding a token.
    pub(crate) fn await_operand(
        &self,
        tx: &mut Transaction,
        operand: NodeId,
        consumer: Option<NodeId>,
        rename: Option<&str>,
        forward: Option<&str>,
    ) -> AsyncifyResult<()> {
        let tree = tx.tree();
        let mut awaited = std::sync::Arc::clone(tree.get(operand)?);
        if let Some(name) = rename {
            awaited = rename_callee(&awaited, name);
        }
        if let Some(token) = forward {
            awaited = append_arg(&awaited, token);
        }

        let replaced = consumer.unwrap_or(operand);
        let needs_parens = tree
            .parent(replaced)
            .is_some_and(|p| matches!(p.kind(), NodeKind::Member { .. }));

        let suspension = Node::new(NodeKind::Await, vec![awaited]);
        let replacement = if needs_parens {
            Node::new(NodeKind::Paren, vec![suspension])
        } else {
            suspension
        };
        tx.replace(replaced, replacement)
    }

    /// Wrap `site` in a synchronous wait: `.Wait()` when the callee now
    /// returns a bare handle, `.Result` otherwise.
    pub(crate) fn block_site(
        &self,
        tx: &mut Transaction,
        site: NodeId,
        bare_handle: bool,
    ) -> AsyncifyResult<()> {
        let call = std::sync::Arc::clone(tx.tree().get(site)?);
        let names = &self.config.blocking;
        let wrapper = if bare_handle {
            let member = Node::new(
                NodeKind::Member {
                    name: names.wait.clone(),
                },
                vec![call],
            );
            Node::new(NodeKind::Call, vec![member])
        } else {
            Node::new(
                NodeKind::Member {
                    name: names.result.clone(),
                },
                vec![call],
            )
        };
        tx.replace(site, wrapper)
    }

    /// Mark a lambda asynchronous.
    pub(crate) fn mark_lambda_async(&self, tx: &mut Transaction, lambda: NodeId) -> AsyncifyResult<()> {
        let node = tx.tree().get(lambda)?;
        let NodeKind::Lambda { params, is_async } = node.kind() else {
            return Err(AsyncifyError::not_applicable(lambda, "not a lambda"));
        };
        if *is_async {
            return Ok(());
        }
        let marked = node.with_kind(NodeKind::Lambda {
            params: params.clone(),
            is_async: true,
        });
        tx.replace(lambda, marked)
    }

    /// Convert a routine header to asynchronous form.
    pub(crate) fn convert_routine(
        &self,
        tx: &mut Transaction,
        routine: NodeId,
    ) -> AsyncifyResult<RoutineChange> {
        let node = tx.tree().get(routine)?;
        let sig = node
            .signature()
            .ok_or_else(|| AsyncifyError::not_applicable(routine, "not a routine"))?;
        if sig.is_async {
            return Ok(RoutineChange::Unchanged);
        }

        let handle = &self.config.handle_type;
        let mut converted = sig.clone();
        converted.is_async = true;

        let change = if sig.return_type.is_named(handle) {
            RoutineChange::MarkedAsync
        } else {
            converted.return_type = match &sig.return_type {
                TypeRef::Void => TypeRef::named(handle.clone()),
                other => TypeRef::generic(handle.clone(), vec![other.clone()]),
            };
            let ct = &self.config.cancellation;
            if sig.param_of_type(&ct.type_name).is_none() {
                let mut param = Param::new(ct.param_name.clone(), TypeRef::named(ct.type_name.clone()));
                if ct.supports_default_values {
                    param = param.with_default(ct.default_value.clone());
                }
                converted.params.push(param);
            }
            RoutineChange::Converted
        };

        debug!(routine = %sig.name, ?change, "converting routine");
        let replacement = node.with_kind(NodeKind::Routine(converted));
        tx.replace(routine, replacement)?;
        Ok(change)
    }
}

fn rename_callee(call: &NodeRef, name: &str) -> NodeRef {
    let Some(callee) = call.callee() else {
        return std::sync::Arc::clone(call);
    };
    let renamed = match callee.kind() {
        NodeKind::Ident { .. } => callee.with_kind(NodeKind::Ident {
            name: name.to_string(),
        }),
        NodeKind::Member { .. } => callee.with_kind(NodeKind::Member {
            name: name.to_string(),
        }),
        _ => return std::sync::Arc::clone(call),
    };
    call.with_child_replaced(callee.id(), &renamed)
}

fn append_arg(call: &NodeRef, token: &str) -> NodeRef {
    let mut children = call.children().to_vec();
    children.push(Node::new(
        NodeKind::Ident {
            name: token.to_string(),
        },
        vec![],
    ));
    call.with_children(children)
}
