//! Workspace documents: a syntax tree plus the external library it uses.
//!
//! ```json
//! {
//!   "library": { "types": [ ... ] },
//!   "unit": { "kind": "Unit", "children": [ ... ] }
//! }
//! ```
//!
//! The optional `library` is merged over [`Library::standard`]; its types
//! shadow standard types of the same name.

use crate::error::{CliError, CliResult};
use asyncify::semantic::{Library, SymbolTable};
use asyncify::syntax::{NodeId, NodeRef};
use asyncify::{Asyncify, AsyncifyConfig, FixOutcome, FixSummary, SyntaxTree};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Serialized form of a workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    /// Extra external types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<Library>,
    /// Compilation unit
    pub unit: NodeRef,
}

impl WorkspaceDocument {
    /// Document for a unit without extra library types.
    #[must_use]
    pub const fn new(unit: NodeRef) -> Self {
        Self {
            library: None,
            unit,
        }
    }

    /// Attach extra library types.
    #[must_use]
    pub fn with_library(mut self, library: Library) -> Self {
        self.library = Some(library);
        self
    }
}

/// A loaded workspace: tree snapshot plus resolved library.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Current snapshot
    pub tree: SyntaxTree,
    /// Standard library merged with document types
    pub library: Library,
    extra: Option<Library>,
}

impl Workspace {
    /// Build from a parsed document.
    pub fn from_document(doc: WorkspaceDocument) -> CliResult<Self> {
        let tree = SyntaxTree::new(doc.unit)?;
        let library = match &doc.library {
            Some(extra) => {
                let mut merged = extra.clone();
                merged.merge(Library::standard());
                merged
            }
            None => Library::standard(),
        };
        Ok(Self {
            tree,
            library,
            extra: doc.library,
        })
    }

    /// Parse a JSON document.
    pub fn from_json_str(json: &str) -> CliResult<Self> {
        let doc: WorkspaceDocument = serde_json::from_str(json)?;
        Self::from_document(doc)
    }

    /// Load a JSON document from disk.
    pub fn load(path: &Path) -> CliResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CliError::workspace(format!("{}: {e}", path.display())))?;
        let workspace = Self::from_json_str(&text)?;
        debug!(path = %path.display(), nodes = workspace.tree.len(), "workspace loaded");
        Ok(workspace)
    }

    /// Document for the current snapshot, ids included.
    #[must_use]
    pub fn to_document(&self) -> WorkspaceDocument {
        WorkspaceDocument {
            library: self.extra.clone(),
            unit: std::sync::Arc::clone(self.tree.root()),
        }
    }

    /// Serialize the current snapshot.
    pub fn to_json(&self) -> CliResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Bind the current snapshot.
    #[must_use]
    pub fn bind(&self) -> SymbolTable {
        SymbolTable::bind(&self.tree, &self.library)
    }

    /// Fix one site and adopt the result.
    pub fn fix_site(&mut self, config: &AsyncifyConfig, site: NodeId) -> CliResult<FixOutcome> {
        let table = self.bind();
        let outcome = Asyncify::with_config(&table, config.clone()).fix(&self.tree, site)?;
        self.tree = outcome.tree.clone();
        Ok(outcome)
    }

    /// Fix every reported site until none remain.
    ///
    /// The tree is rebound after each fix. A site whose fix is rejected is
    /// not retried, so the loop ends even when some findings cannot be fixed.
    pub fn fix_all(&mut self, config: &AsyncifyConfig) -> CliResult<Vec<FixSummary>> {
        let mut attempted: HashSet<NodeId> = HashSet::new();
        let mut fixes = Vec::new();

        loop {
            let table = self.bind();
            let engine = Asyncify::with_config(&table, config.clone());
            let report = engine.analyze(&self.tree);
            let Some(site) = report
                .diagnostics
                .iter()
                .map(|d| d.node)
                .find(|node| !attempted.contains(node))
            else {
                break;
            };
            attempted.insert(site);

            match engine.fix(&self.tree, site) {
                Ok(outcome) => {
                    fixes.push(outcome.summary());
                    self.tree = outcome.tree;
                }
                Err(e) if e.is_not_applicable() => {
                    debug!(site = %site, error = %e, "skipping site");
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(fixes = fixes.len(), "fix-all complete");
        Ok(fixes)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use asyncify::prelude::*;

    fn unit() -> SyntaxTree {
        UnitBuilder::new()
            .ty(TypeBuilder::class("TapTest")
                .routine(
                    RoutineBuilder::new("Test")
                        .returns(TypeRef::named("int"))
                        .body(vec![
                            Stmt::var("test", Expr::create_named("AsyncClass")),
                            Stmt::var(
                                "a",
                                Expr::ident("test").dot("CallAsync").call(vec![]).dot("Result"),
                            ),
                            Stmt::ret(
                                Expr::ident("test").dot("CallAsync").call(vec![]).dot("Result"),
                            ),
                        ]),
                )
                .routine(
                    RoutineBuilder::new("Caller")
                        .returns(TypeRef::named("int"))
                        .body(vec![Stmt::ret(Expr::ident("Test").call(vec![]))]),
                ))
            .ty(TypeBuilder::class("AsyncClass").routine(
                RoutineBuilder::new("CallAsync")
                    .returns(TypeRef::generic("Task", vec![TypeRef::named("int")]))
                    .async_()
                    .body(vec![Stmt::ret(Expr::lit("0"))]),
            ))
            .build()
            .unwrap()
    }

    fn workspace() -> Workspace {
        let doc = WorkspaceDocument::new(std::sync::Arc::clone(unit().root()));
        Workspace::from_json_str(&serde_json::to_string(&doc).unwrap()).unwrap()
    }

    #[test]
    fn test_document_roundtrip_keeps_ids() {
        let ws = workspace();
        let again = Workspace::from_json_str(&ws.to_json().unwrap()).unwrap();
        let before: Vec<_> = ws.tree.descendants().map(|n| n.id()).collect();
        let after: Vec<_> = again.tree.descendants().map(|n| n.id()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_document_library_shadows_standard() {
        let extra = Library::new().with_type(asyncify::semantic::ExternalType::new(
            "Stream",
            "Vendor.IO",
        ));
        let doc = WorkspaceDocument::new(std::sync::Arc::clone(unit().root())).with_library(extra);
        let ws = Workspace::from_document(doc).unwrap();
        assert_eq!(ws.library.find_type("Stream").unwrap().assembly, "Vendor.IO");
        assert!(ws.library.find_type("Task").is_some());
    }

    #[test]
    fn test_fix_all_clears_findings() {
        let mut ws = workspace();
        let config = AsyncifyConfig::default();
        let fixes = ws.fix_all(&config).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].converted, vec!["Test", "Caller"]);
        assert!(fixes[1].converted.is_empty());

        let table = ws.bind();
        assert!(!Asyncify::new(&table).analyze(&ws.tree).has_findings());
        let text = render(&ws.tree);
        assert!(text.contains("var a = await test.CallAsync();"));
        assert!(text.contains("return await test.CallAsync();"));
    }

    #[test]
    fn test_fix_site_rejects_clean_node() {
        let mut ws = workspace();
        let root = ws.tree.root().id();
        let err = ws.fix_site(&AsyncifyConfig::default(), root).unwrap_err();
        assert!(matches!(err, CliError::Asyncify(_)));
    }

    #[test]
    fn test_malformed_document() {
        let err = Workspace::from_json_str("{\"unit\": 3}").unwrap_err();
        assert!(matches!(err, CliError::Json(_)));
    }
}
