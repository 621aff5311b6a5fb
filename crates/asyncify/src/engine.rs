//! Top-level entry point tying detection, diagnostics and fixes together.

use crate::config::AsyncifyConfig;
use crate::detect::{Classification, Detector};
use crate::diagnostic::{AnalysisReport, Diagnostic};
use crate::error::{AsyncifyError, AsyncifyResult};
use crate::rewrite::{FixOutcome, RewriteEngine};
use crate::semantic::SemanticModel;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use crate::walker::CallChainWalker;
use tracing::{debug, info_span};

/// Analyzer and fixer over one semantic model.
///
/// ```rust
/// use asyncify::prelude::*;
///
/// let tree = UnitBuilder::new()
///     .ty(TypeBuilder::class("C").routine(RoutineBuilder::new("Run")))
///     .build()
///     .unwrap();
/// let table = SymbolTable::bind(&tree, &Library::standard());
/// let report = Asyncify::new(&table).analyze(&tree);
/// assert!(!report.has_findings());
/// ```
#[derive(Debug)]
pub struct Asyncify<'a, M: ?Sized> {
    model: &'a M,
    config: AsyncifyConfig,
}

impl<'a, M: SemanticModel + ?Sized> Asyncify<'a, M> {
    /// Engine with default configuration.
    pub fn new(model: &'a M) -> Self {
        Self::with_config(model, AsyncifyConfig::default())
    }

    /// Engine with explicit configuration.
    pub const fn with_config(model: &'a M, config: AsyncifyConfig) -> Self {
        Self { model, config }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AsyncifyConfig {
        &self.config
    }

    fn detector(&self) -> Detector<'_, M> {
        Detector::new(self.model, &self.config)
    }

    /// Classify an invocation.
    #[must_use]
    pub fn classify(&self, tree: &SyntaxTree, call: NodeId) -> Classification {
        self.detector().classify(tree, call)
    }

    /// Classify a result access on a non-invocation handle.
    #[must_use]
    pub fn classify_access(&self, tree: &SyntaxTree, member: NodeId) -> Classification {
        self.detector().classify_access(tree, member)
    }

    /// Classify any site: invocations and result accesses.
    #[must_use]
    pub fn classify_site(&self, tree: &SyntaxTree, site: NodeId) -> Classification {
        match tree.node(site).map(|n| n.kind()) {
            Some(NodeKind::Call) => self.classify(tree, site),
            Some(NodeKind::Member { .. }) => self.classify_access(tree, site),
            _ => Classification::NotApplicable,
        }
    }

    /// Report every blocking wait in the tree, in source order.
    #[must_use]
    pub fn analyze(&self, tree: &SyntaxTree) -> AnalysisReport {
        let _span = info_span!("analyze", nodes = tree.len()).entered();
        let mut report = AnalysisReport::default();
        for node in tree.descendants() {
            if !matches!(node.kind(), NodeKind::Call | NodeKind::Member { .. }) {
                continue;
            }
            report.sites_checked += 1;
            let classification = self.classify_site(tree, node.id());
            if let Some(diagnostic) = Diagnostic::for_site(&node, &classification) {
                report.diagnostics.push(diagnostic);
            }
        }
        debug!(
            findings = report.diagnostics.len(),
            sites = report.sites_checked,
            "analysis complete"
        );
        report
    }

    /// Classify `site` and apply its fix.
    pub fn fix(&self, tree: &SyntaxTree, site: NodeId) -> AsyncifyResult<FixOutcome> {
        let _span = info_span!("fix", site = %site).entered();
        tree.get(site)?;
        let classification = self.classify_site(tree, site);
        if !classification.is_applicable() {
            return Err(AsyncifyError::not_applicable(
                site,
                "no blocking wait at this site",
            ));
        }
        RewriteEngine::new(self.model, &self.config).apply_fix(tree, site, &classification)
    }

    /// Propagate from a routine the host converted itself.
    pub fn propagate(&self, tree: &SyntaxTree, converted: NodeId) -> AsyncifyResult<FixOutcome> {
        CallChainWalker::new(self.model, &self.config).propagate(tree, converted)
    }
}
