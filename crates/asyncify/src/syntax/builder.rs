//! Fluent builders for syntax trees.
//!
//! Hosts that already own a parser construct [`Node`]s directly; these
//! builders exist for tests, fixtures and embedding code.
//!
//! # Example
//!
//! ```rust
//! use asyncify::syntax::{Expr, RoutineBuilder, Stmt, TypeBuilder, TypeRef, UnitBuilder};
//!
//! let tree = UnitBuilder::new()
//!     .ty(TypeBuilder::class("TapTest").routine(
//!         RoutineBuilder::new("Test")
//!             .returns(TypeRef::named("int"))
//!             .body(vec![Stmt::ret(
//!                 Expr::ident("test").dot("CallAsync").call(vec![]).dot("Result"),
//!             )]),
//!     ))
//!     .build()
//!     .unwrap();
//! assert!(tree.len() > 5);
//! ```

use super::node::{Node, NodeKind, NodeRef, Param, Signature, Span, TypeDeclKind, TypeRef};
use super::tree::SyntaxTree;
use crate::error::AsyncifyResult;

/// Expression under construction.
#[derive(Debug, Clone)]
pub struct Expr(NodeRef);

impl Expr {
    /// Identifier reference.
    #[must_use]
    pub fn ident(name: impl Into<String>) -> Self {
        Self(Node::new(NodeKind::Ident { name: name.into() }, vec![]))
    }

    /// Literal kept as source text (`42`, `"x"`, `true`).
    #[must_use]
    pub fn lit(text: impl Into<String>) -> Self {
        Self(Node::new(NodeKind::Literal { text: text.into() }, vec![]))
    }

    /// Object creation `new T(args)`.
    #[must_use]
    pub fn create(ty: TypeRef, args: Vec<Self>) -> Self {
        Self(Node::new(NodeKind::New { ty }, into_nodes(args)))
    }

    /// Object creation of a non-generic type without arguments.
    #[must_use]
    pub fn create_named(name: impl Into<String>) -> Self {
        Self::create(TypeRef::named(name), vec![])
    }

    /// Lambda with an expression body.
    #[must_use]
    pub fn lambda(params: &[&str], body: Self) -> Self {
        Self::lambda_node(params, body.0, false)
    }

    /// Async lambda with an expression body.
    #[must_use]
    pub fn async_lambda(params: &[&str], body: Self) -> Self {
        Self::lambda_node(params, body.0, true)
    }

    /// Lambda with a block body.
    #[must_use]
    pub fn lambda_block(params: &[&str], body: Vec<Stmt>) -> Self {
        Self::lambda_node(params, Stmt::block(body).0, false)
    }

    fn lambda_node(params: &[&str], body: NodeRef, is_async: bool) -> Self {
        let params = params.iter().map(|p| (*p).to_string()).collect();
        Self(Node::new(NodeKind::Lambda { params, is_async }, vec![body]))
    }

    /// Member access `self.name`.
    #[must_use]
    pub fn dot(self, name: impl Into<String>) -> Self {
        Self(Node::new(NodeKind::Member { name: name.into() }, vec![self.0]))
    }

    /// Invocation `self(args)`.
    #[must_use]
    pub fn call(self, args: Vec<Self>) -> Self {
        let mut children = Vec::with_capacity(args.len() + 1);
        children.push(self.0);
        children.extend(into_nodes(args));
        Self(Node::new(NodeKind::Call, children))
    }

    /// Suspension `await self`.
    #[must_use]
    pub fn awaited(self) -> Self {
        Self(Node::new(NodeKind::Await, vec![self.0]))
    }

    /// Parenthesized `(self)`.
    #[must_use]
    pub fn paren(self) -> Self {
        Self(Node::new(NodeKind::Paren, vec![self.0]))
    }

    /// Attach a source position.
    #[must_use]
    pub fn at(self, line: u32, column: u32) -> Self {
        Self(self.0.with_span(Span::new(line, column)))
    }

    /// Underlying node.
    #[must_use]
    pub fn into_node(self) -> NodeRef {
        self.0
    }
}

impl From<Expr> for NodeRef {
    fn from(expr: Expr) -> Self {
        expr.0
    }
}

/// Statement under construction.
#[derive(Debug, Clone)]
pub struct Stmt(NodeRef);

impl Stmt {
    /// `var name = init;`
    #[must_use]
    pub fn var(name: impl Into<String>, init: Expr) -> Self {
        Self(Node::new(
            NodeKind::Local {
                name: name.into(),
                ty: None,
            },
            vec![init.0],
        ))
    }

    /// `T name = init;`
    #[must_use]
    pub fn local(name: impl Into<String>, ty: TypeRef, init: Expr) -> Self {
        Self(Node::new(
            NodeKind::Local {
                name: name.into(),
                ty: Some(ty),
            },
            vec![init.0],
        ))
    }

    /// `expr;`
    #[must_use]
    pub fn expr(expr: Expr) -> Self {
        Self(Node::new(NodeKind::ExprStmt, vec![expr.0]))
    }

    /// `return expr;`
    #[must_use]
    pub fn ret(expr: Expr) -> Self {
        Self(Node::new(NodeKind::Return, vec![expr.0]))
    }

    /// `return;`
    #[must_use]
    pub fn ret_void() -> Self {
        Self(Node::new(NodeKind::Return, vec![]))
    }

    /// `lock (target) { body }`
    #[must_use]
    pub fn lock(target: Expr, body: Vec<Self>) -> Self {
        Self(Node::new(NodeKind::Lock, vec![target.0, Self::block(body).0]))
    }

    /// `{ body }`
    #[must_use]
    pub fn block(body: Vec<Self>) -> Self {
        Self(Node::new(NodeKind::Block, into_nodes(body)))
    }

    /// Underlying node.
    #[must_use]
    pub fn into_node(self) -> NodeRef {
        self.0
    }
}

impl From<Stmt> for NodeRef {
    fn from(stmt: Stmt) -> Self {
        stmt.0
    }
}

fn into_nodes<T: Into<NodeRef>>(items: Vec<T>) -> Vec<NodeRef> {
    items.into_iter().map(Into::into).collect()
}

#[derive(Debug, Clone)]
enum Body {
    None,
    Block(Vec<Stmt>),
    Expr(Expr),
}

/// Builder for routine declarations.
#[derive(Debug, Clone)]
pub struct RoutineBuilder {
    signature: Signature,
    body: Body,
}

impl RoutineBuilder {
    /// Public `void` routine with an empty block body.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            signature: Signature::new(name, TypeRef::void()),
            body: Body::Block(Vec::new()),
        }
    }

    /// Set the return type.
    #[must_use]
    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.signature.return_type = ty;
        self
    }

    /// Append a parameter.
    #[must_use]
    pub fn param(mut self, param: Param) -> Self {
        self.signature.params.push(param);
        self
    }

    /// Set the visibility keyword (empty for none).
    #[must_use]
    pub fn visibility(mut self, visibility: impl Into<String>) -> Self {
        self.signature.visibility = visibility.into();
        self
    }

    /// Mark `static`.
    #[must_use]
    pub fn static_(mut self) -> Self {
        self.signature.is_static = true;
        self
    }

    /// Mark `async`.
    #[must_use]
    pub fn async_(mut self) -> Self {
        self.signature.is_async = true;
        self
    }

    /// Mark `abstract`; abstract routines have no body.
    #[must_use]
    pub fn abstract_(mut self) -> Self {
        self.signature.is_abstract = true;
        self.body = Body::None;
        self
    }

    /// Declaration without a body.
    #[must_use]
    pub fn no_body(mut self) -> Self {
        self.body = Body::None;
        self
    }

    /// Block body.
    #[must_use]
    pub fn body(mut self, stmts: Vec<Stmt>) -> Self {
        self.body = Body::Block(stmts);
        self
    }

    /// Expression body `=> expr;`
    #[must_use]
    pub fn expression_body(mut self, expr: Expr) -> Self {
        self.body = Body::Expr(expr);
        self
    }

    /// Build the routine node.
    #[must_use]
    pub fn build(self) -> NodeRef {
        let children = match self.body {
            Body::None => vec![],
            Body::Block(stmts) => vec![Stmt::block(stmts).0],
            Body::Expr(expr) => vec![expr.0],
        };
        Node::new(NodeKind::Routine(self.signature), children)
    }
}

/// Builder for class and interface declarations.
#[derive(Debug, Clone)]
pub struct TypeBuilder {
    name: String,
    kind: TypeDeclKind,
    routines: Vec<NodeRef>,
}

impl TypeBuilder {
    /// Class declaration.
    #[must_use]
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeDeclKind::Class,
            routines: Vec::new(),
        }
    }

    /// Interface declaration; member bodies and visibility are dropped.
    #[must_use]
    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeDeclKind::Interface,
            routines: Vec::new(),
        }
    }

    /// Add a routine.
    #[must_use]
    pub fn routine(mut self, routine: RoutineBuilder) -> Self {
        let routine = match self.kind {
            TypeDeclKind::Class => routine,
            TypeDeclKind::Interface => routine.visibility("").no_body(),
        };
        self.routines.push(routine.build());
        self
    }

    /// Build the declaration node.
    #[must_use]
    pub fn build(self) -> NodeRef {
        Node::new(
            NodeKind::TypeDecl {
                name: self.name,
                kind: self.kind,
            },
            self.routines,
        )
    }
}

/// Builder for a compilation unit.
#[derive(Debug, Clone, Default)]
pub struct UnitBuilder {
    types: Vec<NodeRef>,
}

impl UnitBuilder {
    /// Empty unit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type declaration.
    #[must_use]
    pub fn ty(mut self, ty: TypeBuilder) -> Self {
        self.types.push(ty.build());
        self
    }

    /// Build the tree snapshot.
    pub fn build(self) -> AsyncifyResult<SyntaxTree> {
        SyntaxTree::new(Node::new(NodeKind::Unit, self.types))
    }
}
