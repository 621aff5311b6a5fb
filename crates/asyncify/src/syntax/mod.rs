//! Syntax model: immutable nodes, tree snapshots, builders and rendering.

mod builder;
mod node;
mod render;
mod tree;

pub use builder::{Expr, RoutineBuilder, Stmt, TypeBuilder, UnitBuilder};
pub use node::{
    Descendants, Node, NodeId, NodeKind, NodeRef, Param, ParamMode, Signature, Span,
    TypeDeclKind, TypeRef,
};
pub use render::{render, render_node, render_signature};
pub use tree::{Ancestors, SyntaxTree};
