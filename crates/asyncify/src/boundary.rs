//! Conversion boundaries.
//!
//! A boundary is a context where a routine cannot become asynchronous, or
//! where waiting cannot become a suspension point. Rewrites and call-chain
//! propagation stop at boundaries.

use crate::site::CallSite;
use crate::syntax::{NodeKind, NodeRef, SyntaxTree, TypeDeclKind};
use std::fmt;

/// Why a site or routine cannot be converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Boundary {
    /// Routine has `ref` or `out` parameters
    ByRefParameters,
    /// Routine has no body to rewrite (abstract or interface member)
    NoBody,
    /// Site sits inside a lock
    Lock,
    /// Site has no enclosing routine
    NoEnclosingRoutine,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ByRefParameters => "routine has by-reference parameters",
            Self::NoBody => "routine has no body",
            Self::Lock => "inside a lock",
            Self::NoEnclosingRoutine => "no enclosing routine",
        };
        f.write_str(text)
    }
}

/// Check whether `routine` can be converted.
#[must_use]
pub fn routine_boundary(tree: &SyntaxTree, routine: &NodeRef) -> Option<Boundary> {
    let sig = routine.signature()?;
    if sig.has_by_ref_params() {
        return Some(Boundary::ByRefParameters);
    }
    let in_interface = tree.parent(routine.id()).is_some_and(|p| {
        matches!(
            p.kind(),
            NodeKind::TypeDecl {
                kind: TypeDeclKind::Interface,
                ..
            }
        )
    });
    if sig.is_abstract || in_interface || routine.body().is_none() {
        return Some(Boundary::NoBody);
    }
    None
}

/// Check whether the code at `site` may suspend.
///
/// Lambdas are never boundaries: a lambda is converted in place.
#[must_use]
pub fn site_boundary(tree: &SyntaxTree, site: &CallSite) -> Option<Boundary> {
    if site.in_lock {
        return Some(Boundary::Lock);
    }
    if site.lambda.is_some() {
        return None;
    }
    let Some(routine) = site.routine.and_then(|id| tree.node(id)) else {
        return Some(Boundary::NoEnclosingRoutine);
    };
    routine_boundary(tree, routine)
}
