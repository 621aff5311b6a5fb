//! Diagnostics reported for blocking waits.
//!
//! | Rule | Description |
//! |------|-------------|
//! | ASYNC001 | Invocation result waited on synchronously |
//! | ASYNC002 | Handle held in an expression waited on synchronously |
//! | ASYNC003 | Synchronous platform call with an asynchronous sibling |

use crate::detect::Classification;
use crate::syntax::{render_node, Node, NodeId, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blocking wait on an invocation result.
pub const BLOCKING_INVOCATION: &str = "ASYNC001";
/// Blocking wait on a handle held in a variable or other expression.
pub const BLOCKING_ACCESS: &str = "ASYNC002";
/// Synchronous call with an asynchronous sibling.
pub const SYNC_SIBLING: &str = "ASYNC003";

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Must be fixed
    Error,
    /// Should be reviewed
    Warning,
    /// Informational
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A finding with location and suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Rule identifier (e.g. "ASYNC001")
    pub rule: String,
    /// Severity level
    pub severity: Severity,
    /// Site to pass back to `fix`
    pub node: NodeId,
    /// Source position, if the host supplied one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Human-readable message
    pub message: String,
    /// Suggested fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Build the diagnostic for a classified site; `None` when not applicable.
    #[must_use]
    pub fn for_site(site: &Node, classification: &Classification) -> Option<Self> {
        let (rule, message, suggestion) = match classification {
            Classification::NotApplicable => return None,
            Classification::BlockingUnwrap(kind) if site.is_call() => {
                let name = site.invoked_name().unwrap_or("call");
                (
                    BLOCKING_INVOCATION,
                    format!("`{name}` is waited on synchronously ({})", kind.describe()),
                    format!("await `{name}` and make the enclosing routine async"),
                )
            }
            Classification::BlockingUnwrap(_) => {
                let target = site
                    .member_target()
                    .map_or_else(|| "handle".to_string(), |t| render_node(t));
                (
                    BLOCKING_ACCESS,
                    format!("result of `{target}` is waited on synchronously"),
                    format!("use `await {target}`"),
                )
            }
            Classification::SynchronousSiblingExists(sibling) => {
                let name = site.invoked_name().unwrap_or("call");
                (
                    SYNC_SIBLING,
                    format!("`{name}` blocks; `{}` is available", sibling.name),
                    format!("call `await {}` instead", sibling.name),
                )
            }
        };

        Some(Self {
            rule: rule.to_string(),
            severity: Severity::Warning,
            node: site.id(),
            span: site.span(),
            message,
            suggestion: Some(suggestion),
        })
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {} (node {}", self.severity, self.rule, self.message, self.node)?;
        if let Some(span) = self.span {
            write!(f, " at {span}")?;
        }
        write!(f, ")")?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n  = help: {suggestion}")?;
        }
        Ok(())
    }
}

/// Report from analyzing one tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// All findings, in source order
    pub diagnostics: Vec<Diagnostic>,
    /// Invocation and access sites examined
    pub sites_checked: usize,
}

impl AnalysisReport {
    /// Whether anything was found
    #[must_use]
    pub fn has_findings(&self) -> bool {
        !self.diagnostics.is_empty()
    }

    /// Count findings for one rule
    #[must_use]
    pub fn count_rule(&self, rule: &str) -> usize {
        self.diagnostics.iter().filter(|d| d.rule == rule).count()
    }

    /// Count findings of one severity
    #[must_use]
    pub fn count_severity(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    /// Merge another report into this one
    pub fn merge(&mut self, other: Self) {
        self.diagnostics.extend(other.diagnostics);
        self.sites_checked += other.sites_checked;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::detect::AsyncSibling;
    use crate::semantic::SymbolId;
    use crate::site::BlockingKind;
    use crate::syntax::{Expr, SyntaxTree};

    fn site(expr: Expr) -> SyntaxTree {
        SyntaxTree::new(expr.into_node()).unwrap()
    }

    #[test]
    fn invocation_diagnostic() {
        let tree = site(Expr::ident("test").dot("CallAsync").call(vec![]).at(12, 20));
        let diag = Diagnostic::for_site(
            tree.root(),
            &Classification::BlockingUnwrap(BlockingKind::ResultAccessor),
        )
        .unwrap();
        assert_eq!(diag.rule, BLOCKING_INVOCATION);
        assert_eq!(diag.span, Some(Span::new(12, 20)));
        assert!(diag.message.contains("CallAsync"));
        let text = diag.to_string();
        assert!(text.starts_with("warning[ASYNC001]"));
        assert!(text.contains("at 12:20"));
        assert!(text.contains("= help:"));
    }

    #[test]
    fn access_diagnostic_renders_target() {
        let tree = site(Expr::ident("task").dot("Result"));
        let diag = Diagnostic::for_site(
            tree.root(),
            &Classification::BlockingUnwrap(BlockingKind::ResultAccessor),
        )
        .unwrap();
        assert_eq!(diag.rule, BLOCKING_ACCESS);
        assert_eq!(diag.suggestion.as_deref(), Some("use `await task`"));
    }

    #[test]
    fn sibling_diagnostic() {
        let tree = site(Expr::ident("s").dot("Read").call(vec![]));
        let classification = Classification::SynchronousSiblingExists(AsyncSibling {
            name: "ReadAsync".into(),
            symbol: SymbolId(3),
            param_types: vec![],
        });
        let diag = Diagnostic::for_site(tree.root(), &classification).unwrap();
        assert_eq!(diag.rule, SYNC_SIBLING);
        assert!(diag.message.contains("ReadAsync"));
    }

    #[test]
    fn not_applicable_has_no_diagnostic() {
        let tree = site(Expr::ident("x"));
        assert!(Diagnostic::for_site(tree.root(), &Classification::NotApplicable).is_none());
    }

    #[test]
    fn report_counts_and_merge() {
        let tree = site(Expr::ident("f").call(vec![]));
        let diag = Diagnostic::for_site(
            tree.root(),
            &Classification::BlockingUnwrap(BlockingKind::WaitCall),
        )
        .unwrap();
        let mut report = AnalysisReport {
            diagnostics: vec![diag],
            sites_checked: 4,
        };
        report.merge(AnalysisReport {
            diagnostics: vec![],
            sites_checked: 2,
        });
        assert!(report.has_findings());
        assert_eq!(report.sites_checked, 6);
        assert_eq!(report.count_rule(BLOCKING_INVOCATION), 1);
        assert_eq!(report.count_severity(Severity::Warning), 1);
        assert_eq!(report.count_severity(Severity::Error), 0);
    }
}
