//! Semantic model façade.
//!
//! The detector and rewrite engine only see the host's semantic information
//! through [`SemanticModel`]. Queries are made against the snapshot the
//! model was built for; ids of nodes that survive later rewrites remain
//! valid keys, so a model built once serves a whole fix session.
//!
//! [`SymbolTable`] is a reference implementation that binds a
//! [`SyntaxTree`](crate::syntax::SyntaxTree) against an external
//! [`Library`] description.

mod binder;
mod library;

pub use binder::{SymbolTable, SOURCE_ASSEMBLY};
pub use library::{ExternalMethod, ExternalProperty, ExternalType, Library};

use crate::syntax::{NodeId, ParamMode, TypeRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a routine symbol within one semantic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym{}", self.0)
    }
}

/// Parameter of a routine symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSymbol {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: TypeRef,
    /// Passing mode
    pub mode: ParamMode,
    /// Whether callers may omit it
    pub has_default: bool,
}

/// Resolved routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineSymbol {
    /// Symbol identity
    pub id: SymbolId,
    /// Routine name
    pub name: String,
    /// Declaring type
    pub containing_type: String,
    /// Library the routine is defined in
    pub assembly: String,
    /// Declared `async`
    pub is_async: bool,
    /// Overridable
    pub is_virtual: bool,
    /// Abstract or interface member
    pub is_abstract: bool,
    /// Static routine
    pub is_static: bool,
    /// Return type
    pub return_type: TypeRef,
    /// Parameters in order
    pub params: Vec<ParamSymbol>,
    /// Declaration node, for routines defined in the analyzed tree
    pub declaration: Option<NodeId>,
}

impl RoutineSymbol {
    /// Whether the routine returns nothing.
    #[must_use]
    pub const fn returns_void(&self) -> bool {
        self.return_type.is_void()
    }

    /// Whether the routine produces an awaitable handle.
    #[must_use]
    pub fn is_awaitable(&self, handle_type: &str) -> bool {
        self.is_async || self.return_type.is_named(handle_type)
    }

    /// Whether the routine can be overridden or has no implementation.
    #[must_use]
    pub const fn is_overridable(&self) -> bool {
        self.is_virtual || self.is_abstract
    }
}

/// Index of the first parameter whose type is `type_name`.
pub(crate) fn cancellation_slot<'a>(
    types: impl IntoIterator<Item = &'a TypeRef>,
    type_name: &str,
) -> Option<usize> {
    types.into_iter().position(|ty| ty.is_named(type_name))
}

/// Host-provided semantic queries.
pub trait SemanticModel {
    /// Routine an invocation resolves to.
    fn symbol_of(&self, call: NodeId) -> Option<&RoutineSymbol>;

    /// Static type of an expression.
    fn type_of(&self, expr: NodeId) -> Option<&TypeRef>;

    /// Members named `name` on `receiver` that are visible at `at`.
    fn lookup_members(&self, receiver: &TypeRef, name: &str, at: NodeId) -> Vec<&RoutineSymbol>;

    /// Symbol declared by a routine declaration node.
    fn declared_symbol(&self, declaration: NodeId) -> Option<&RoutineSymbol>;

    /// Invocation nodes that call `routine`.
    fn references_to(&self, routine: SymbolId) -> Vec<NodeId>;
}

impl<M: SemanticModel + ?Sized> SemanticModel for &M {
    fn symbol_of(&self, call: NodeId) -> Option<&RoutineSymbol> {
        (**self).symbol_of(call)
    }

    fn type_of(&self, expr: NodeId) -> Option<&TypeRef> {
        (**self).type_of(expr)
    }

    fn lookup_members(&self, receiver: &TypeRef, name: &str, at: NodeId) -> Vec<&RoutineSymbol> {
        (**self).lookup_members(receiver, name, at)
    }

    fn declared_symbol(&self, declaration: NodeId) -> Option<&RoutineSymbol> {
        (**self).declared_symbol(declaration)
    }

    fn references_to(&self, routine: SymbolId) -> Vec<NodeId> {
        (**self).references_to(routine)
    }
}
