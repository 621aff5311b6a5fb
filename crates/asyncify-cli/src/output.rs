//! Output formatting

use asyncify::{AnalysisReport, FixSummary, Severity};
use console::style;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON output
    Json,
}

fn severity_symbol(severity: Severity) -> &'static str {
    match severity {
        Severity::Error => "✗",
        Severity::Warning => "⚠",
        Severity::Info => "ℹ",
    }
}

/// Render an analysis report as text.
#[must_use]
pub fn render_check_report(source: &str, report: &AnalysisReport, use_color: bool) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "ASYNCIFY REPORT: {source}");
    output.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    if report.diagnostics.is_empty() {
        output.push_str("✓ No blocking waits found\n");
    } else {
        for diagnostic in &report.diagnostics {
            let symbol = severity_symbol(diagnostic.severity);
            let symbol = if use_color {
                style(symbol).yellow().bold().to_string()
            } else {
                symbol.to_string()
            };
            let location = diagnostic
                .span
                .map_or_else(|| format!("node {}", diagnostic.node), |s| format!("Line {s}"));
            let _ = writeln!(
                output,
                "  {symbol} {location} [{}] {}",
                diagnostic.rule, diagnostic.message
            );
            if let Some(suggestion) = &diagnostic.suggestion {
                let _ = writeln!(output, "      Suggestion: {suggestion}");
            }
            let _ = writeln!(output, "      Fix with: asyncify fix --node {}", diagnostic.node.get());
        }
        output.push('\n');
    }

    let _ = writeln!(
        output,
        "Summary: {} finding(s) in {} site(s) checked",
        report.diagnostics.len(),
        report.sites_checked
    );
    output
}

/// Render an analysis report as JSON.
pub fn render_check_json(report: &AnalysisReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(report)
}

/// One-line-per-fix summary.
#[must_use]
pub fn render_fix_summary(fixes: &[FixSummary]) -> String {
    let mut output = String::new();
    for (i, fix) in fixes.iter().enumerate() {
        let converted = if fix.converted.is_empty() {
            "no signature changes".to_string()
        } else {
            fix.converted.join(" -> ")
        };
        let _ = write!(output, "fix {}: {converted}", i + 1);
        if fix.lambdas > 0 {
            let _ = write!(output, ", {} lambda(s)", fix.lambdas);
        }
        if !fix.blocked_sites.is_empty() {
            let _ = write!(output, ", {} blocked caller(s)", fix.blocked_sites.len());
        }
        output.push('\n');
    }
    output
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use asyncify::syntax::{NodeId, Span};
    use asyncify::Diagnostic;

    fn report() -> AnalysisReport {
        AnalysisReport {
            diagnostics: vec![Diagnostic {
                rule: "ASYNC001".into(),
                severity: Severity::Warning,
                node: NodeId::new(9),
                span: Some(Span::new(4, 16)),
                message: "`CallAsync` is waited on synchronously".into(),
                suggestion: Some("await `CallAsync`".into()),
            }],
            sites_checked: 5,
        }
    }

    #[test]
    fn test_text_report() {
        let text = render_check_report("doc.json", &report(), false);
        assert!(text.contains("ASYNCIFY REPORT: doc.json"));
        assert!(text.contains("⚠ Line 4:16 [ASYNC001]"));
        assert!(text.contains("Suggestion: await `CallAsync`"));
        assert!(text.contains("asyncify fix --node 9"));
        assert!(text.contains("1 finding(s) in 5 site(s)"));
    }

    #[test]
    fn test_empty_report() {
        let text = render_check_report("doc.json", &AnalysisReport::default(), false);
        assert!(text.contains("No blocking waits found"));
    }

    #[test]
    fn test_json_report() {
        let json = render_check_json(&report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["diagnostics"][0]["rule"], "ASYNC001");
        assert_eq!(value["diagnostics"][0]["severity"], "warning");
        assert_eq!(value["sites_checked"], 5);
    }

    #[test]
    fn test_fix_summary() {
        let text = render_fix_summary(&[
            FixSummary {
                converted: vec!["Test".into(), "Caller".into()],
                lambdas: 0,
                blocked_sites: vec![NodeId::new(3)],
            },
            FixSummary {
                converted: vec![],
                lambdas: 1,
                blocked_sites: vec![],
            },
        ]);
        assert!(text.contains("fix 1: Test -> Caller, 1 blocked caller(s)"));
        assert!(text.contains("fix 2: no signature changes, 1 lambda(s)"));
    }
}
