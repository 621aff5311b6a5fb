//! Call-chain propagation.
//!
//! Once a routine becomes asynchronous, each of its callers either awaits
//! the call and is converted in turn, or, at a conversion boundary, keeps
//! waiting synchronously. The walk is breadth-first over routines with a
//! visited set, so recursion and mutual recursion terminate.

use crate::boundary;
use crate::config::AsyncifyConfig;
use crate::error::{AsyncifyError, AsyncifyResult};
use crate::rewrite::{FixOutcome, RewriteEngine, RoutineChange, Session};
use crate::semantic::SemanticModel;
use crate::site::CallSite;
use crate::syntax::{NodeId, Signature, SyntaxTree};
use std::collections::VecDeque;
use tracing::{debug, debug_span, trace};

/// Propagates a conversion to every caller.
#[derive(Debug)]
pub struct CallChainWalker<'a, M: ?Sized> {
    model: &'a M,
    config: &'a AsyncifyConfig,
    engine: RewriteEngine<'a, M>,
}

impl<'a, M: SemanticModel + ?Sized> CallChainWalker<'a, M> {
    /// Create a walker.
    pub const fn new(model: &'a M, config: &'a AsyncifyConfig) -> Self {
        Self {
            model,
            config,
            engine: RewriteEngine::new(model, config),
        }
    }

    /// Propagate from a routine that has already been converted in `tree`.
    pub fn propagate(&self, tree: &SyntaxTree, converted: NodeId) -> AsyncifyResult<FixOutcome> {
        let routine = tree.get(converted)?;
        if !routine.signature().is_some_and(|s| s.is_async) {
            return Err(AsyncifyError::not_applicable(
                converted,
                "routine has not been converted",
            ));
        }

        let mut session = Session::new(tree.clone());
        session.visited.insert(converted);
        self.run(&mut session, converted)?;
        Ok(FixOutcome {
            tree: session.tx.into_tree(),
            classification: crate::detect::Classification::NotApplicable,
            converted: session.converted,
            lambdas: session.lambdas,
            blocked_sites: session.blocked,
        })
    }

    pub(crate) fn run(&self, session: &mut Session, seed: NodeId) -> AsyncifyResult<()> {
        let _span = debug_span!("propagate", seed = %seed).entered();
        let mut frontier = VecDeque::from([seed]);

        while let Some(callee) = frontier.pop_front() {
            let Some(symbol) = self.model.declared_symbol(callee) else {
                debug!(routine = %callee, "no symbol for converted routine");
                continue;
            };
            let sites: Vec<NodeId> = self
                .model
                .references_to(symbol.id)
                .into_iter()
                .filter(|site| session.tx.tree().contains(*site))
                .collect();
            trace!(routine = %symbol.name, sites = sites.len(), "visiting callers");

            let handles = sites
                .iter()
                .map(|site| session.tx.track(*site))
                .collect::<AsyncifyResult<Vec<_>>>()?;
            let callee_sig = session
                .tx
                .tree()
                .get(callee)?
                .signature()
                .cloned()
                .ok_or_else(|| AsyncifyError::not_applicable(callee, "not a routine"))?;

            for handle in handles {
                let site = session.tx.resolve(handle)?.id();
                if let Some(next) = self.rewrite_caller(session, site, &callee_sig)? {
                    frontier.push_back(next);
                }
                session.tx.release(handle);
            }
        }
        Ok(())
    }

    /// Rewrite one call site of a converted routine. Returns the caller if
    /// it was converted and must be propagated from in turn.
    fn rewrite_caller(
        &self,
        session: &mut Session,
        site: NodeId,
        callee: &Signature,
    ) -> AsyncifyResult<Option<NodeId>> {
        let tree = session.tx.tree();
        let ctx = CallSite::locate(tree, site);
        if ctx.awaited {
            trace!(site = %site, "already awaited");
            return Ok(None);
        }
        let callee_params: Vec<_> = callee.params.iter().map(|p| p.ty.clone()).collect();
        let call = tree.get(site)?;

        if let Some(boundary) = boundary::site_boundary(tree, &ctx) {
            debug!(site = %site, %boundary, "caller stays synchronous");
            let bare_handle = callee.return_type.is_named(&self.config.handle_type)
                && callee.return_type.args().is_empty();
            self.engine.block_site(&mut session.tx, site, bare_handle)?;
            session.blocked.push(site);
            return Ok(None);
        }

        if let Some(lambda) = ctx.lambda {
            let token = ctx
                .routine
                .and_then(|r| self.engine.token_in_scope(tree, r, false));
            let forward = self
                .engine
                .forwarding_token(call, &callee_params, token.as_deref());
            self.engine
                .await_operand(&mut session.tx, site, None, None, forward.as_deref())?;
            self.engine.mark_lambda_async(&mut session.tx, lambda)?;
            session.note_lambda(lambda);
            return Ok(None);
        }

        let routine = ctx.routine.ok_or(AsyncifyError::MissingRoutine(site))?;
        let already_async = tree
            .get(routine)?
            .signature()
            .is_some_and(|s| s.is_async);
        let settled = already_async || session.visited.contains(&routine);

        let token = self.engine.token_in_scope(tree, routine, !settled);
        let forward = self
            .engine
            .forwarding_token(call, &callee_params, token.as_deref());
        self.engine
            .await_operand(&mut session.tx, site, None, None, forward.as_deref())?;

        if settled {
            return Ok(None);
        }

        let change = self.engine.convert_routine(&mut session.tx, routine)?;
        session.visited.insert(routine);
        if change != RoutineChange::Unchanged {
            session.converted.push(routine);
        }
        Ok((change == RoutineChange::Converted).then_some(routine))
    }
}
