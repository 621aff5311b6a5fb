//! Syntax node model.
//!
//! # Design Principles
//!
//! 1. **Immutability**: nodes are shared through [`Arc`] and never mutated;
//!    every edit produces new nodes along the edited path.
//! 2. **Stable identity**: every node placed in a [`SyntaxTree`] carries a
//!    [`NodeId`] that survives later rewrites of its ancestors or siblings.
//! 3. **Uniform shape**: each node is a [`NodeKind`] payload plus ordered
//!    children, so parent links and path copying work the same for every kind.
//!
//! [`SyntaxTree`]: super::SyntaxTree

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Shared handle to an immutable node.
pub type NodeRef = Arc<Node>;

/// Stable logical identity of a node.
///
/// Ids are assigned when a node first enters a tree snapshot and are never
/// reused within the lineage of that snapshot.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// Marker for nodes that have not been placed in a tree yet.
    pub const UNASSIGNED: Self = Self(0);

    /// Create an id from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether the id was assigned by a tree.
    #[must_use]
    pub const fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source position supplied by the host parser (1-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Line number
    pub line: u32,
    /// Column number
    pub column: u32,
}

impl Span {
    /// Create a span.
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Type reference as written in a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TypeRef {
    /// No value.
    #[default]
    Void,
    /// Named type with optional generic arguments: `int`, `Task<int>`.
    Named {
        /// Type name
        name: String,
        /// Generic arguments
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<TypeRef>,
    },
}

impl TypeRef {
    /// `void`
    #[must_use]
    pub const fn void() -> Self {
        Self::Void
    }

    /// Non-generic named type.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Generic named type.
    #[must_use]
    pub fn generic(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Named {
            name: name.into(),
            args,
        }
    }

    /// Whether this is `void`.
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Type name, `None` for `void`.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Void => None,
            Self::Named { name, .. } => Some(name),
        }
    }

    /// Generic arguments.
    #[must_use]
    pub fn args(&self) -> &[Self] {
        match self {
            Self::Void => &[],
            Self::Named { args, .. } => args,
        }
    }

    /// Whether the type is named `name`, ignoring generic arguments.
    #[must_use]
    pub fn is_named(&self, name: &str) -> bool {
        self.name() == Some(name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Named { name, args } if args.is_empty() => write!(f, "{name}"),
            Self::Named { name, args } => {
                write!(f, "{name}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
        }
    }
}

/// How an argument is passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamMode {
    /// By value
    #[default]
    Value,
    /// By reference (`ref`)
    Ref,
    /// Output parameter (`out`)
    Out,
}

impl ParamMode {
    /// Keyword prefix used when rendering.
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::Value => None,
            Self::Ref => Some("ref"),
            Self::Out => Some("out"),
        }
    }
}

/// Routine parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name
    pub name: String,
    /// Declared type
    pub ty: TypeRef,
    /// Passing mode
    #[serde(default)]
    pub mode: ParamMode,
    /// Default value text, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl Param {
    /// By-value parameter without default.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            mode: ParamMode::Value,
            default: None,
        }
    }

    /// Set the passing mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: ParamMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the default value text.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Whether the parameter is `ref` or `out`.
    #[must_use]
    pub const fn is_by_ref(&self) -> bool {
        matches!(self.mode, ParamMode::Ref | ParamMode::Out)
    }
}

/// Kind of a type declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeDeclKind {
    /// Class with bodies
    #[default]
    Class,
    /// Interface; members have no bodies
    Interface,
}

/// Routine declaration header.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    /// Routine name
    pub name: String,
    /// Visibility keyword (`public`), empty for none
    #[serde(default)]
    pub visibility: String,
    /// `static` modifier
    #[serde(default)]
    pub is_static: bool,
    /// `abstract` modifier
    #[serde(default)]
    pub is_abstract: bool,
    /// `async` modifier
    #[serde(default)]
    pub is_async: bool,
    /// Declared return type
    pub return_type: TypeRef,
    /// Parameters in order
    #[serde(default)]
    pub params: Vec<Param>,
}

impl Signature {
    /// Public, non-async routine returning `return_type`.
    #[must_use]
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            visibility: "public".to_string(),
            is_static: false,
            is_abstract: false,
            is_async: false,
            return_type,
            params: Vec::new(),
        }
    }

    /// Whether any parameter is `ref` or `out`.
    #[must_use]
    pub fn has_by_ref_params(&self) -> bool {
        self.params.iter().any(Param::is_by_ref)
    }

    /// First parameter of the given type.
    #[must_use]
    pub fn param_of_type(&self, type_name: &str) -> Option<&Param> {
        self.params.iter().find(|p| p.ty.is_named(type_name))
    }
}

/// Node payload. Child layout per kind is documented on each variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Compilation unit. Children: type declarations.
    Unit,
    /// Class or interface. Children: routines.
    TypeDecl {
        /// Type name
        name: String,
        /// Class or interface
        #[serde(default)]
        kind: TypeDeclKind,
    },
    /// Routine declaration. Children: `[]` (no body), `[Block]`, or
    /// `[expression]` for an expression-bodied routine.
    Routine(Signature),
    /// Statement block. Children: statements.
    Block,
    /// Local declaration. Children: `[initializer]` or `[]`.
    Local {
        /// Variable name
        name: String,
        /// Declared type, `None` for `var`
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ty: Option<TypeRef>,
    },
    /// Expression statement. Children: `[expression]`.
    ExprStmt,
    /// Return statement. Children: `[]` or `[expression]`.
    Return,
    /// Mutual-exclusion block. Children: `[target, Block]`.
    Lock,
    /// Identifier reference.
    Ident {
        /// Referenced name
        name: String,
    },
    /// Literal, kept as source text.
    Literal {
        /// Literal text
        text: String,
    },
    /// Member access `target.name`. Children: `[target]`.
    Member {
        /// Member name
        name: String,
    },
    /// Invocation. Children: `[callee, args...]`.
    Call,
    /// Object creation `new T(args)`. Children: args.
    New {
        /// Created type
        ty: TypeRef,
    },
    /// Suspension point `await operand`. Children: `[operand]`.
    Await,
    /// Parenthesized expression. Children: `[inner]`.
    Paren,
    /// Lambda. Children: `[body]` where body is a `Block` or an expression.
    Lambda {
        /// Parameter names
        #[serde(default)]
        params: Vec<String>,
        /// `async` modifier
        #[serde(default)]
        is_async: bool,
    },
}

impl NodeKind {
    /// Short kind name for logs and errors.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::TypeDecl { .. } => "type",
            Self::Routine(_) => "routine",
            Self::Block => "block",
            Self::Local { .. } => "local",
            Self::ExprStmt => "expression-statement",
            Self::Return => "return",
            Self::Lock => "lock",
            Self::Ident { .. } => "identifier",
            Self::Literal { .. } => "literal",
            Self::Member { .. } => "member-access",
            Self::Call => "call",
            Self::New { .. } => "new",
            Self::Await => "await",
            Self::Paren => "paren",
            Self::Lambda { .. } => "lambda",
        }
    }
}

/// Immutable syntax node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "is_unassigned")]
    id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    span: Option<Span>,
    kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    children: Vec<NodeRef>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_unassigned(id: &NodeId) -> bool {
    !id.is_assigned()
}

impl Node {
    /// Create a detached node; it receives an id when placed in a tree.
    #[must_use]
    pub fn new(kind: NodeKind, children: Vec<NodeRef>) -> NodeRef {
        Arc::new(Self {
            id: NodeId::UNASSIGNED,
            span: None,
            kind,
            children,
        })
    }

    pub(crate) fn from_parts(
        id: NodeId,
        span: Option<Span>,
        kind: NodeKind,
        children: Vec<NodeRef>,
    ) -> NodeRef {
        Arc::new(Self {
            id,
            span,
            kind,
            children,
        })
    }

    /// Node id (`UNASSIGNED` while detached).
    #[must_use]
    pub const fn id(&self) -> NodeId {
        self.id
    }

    /// Source span, if the host supplied one.
    #[must_use]
    pub const fn span(&self) -> Option<Span> {
        self.span
    }

    /// Payload.
    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Ordered children.
    #[must_use]
    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&NodeRef> {
        self.children.get(index)
    }

    /// Same identity and children, new payload.
    #[must_use]
    pub fn with_kind(&self, kind: NodeKind) -> NodeRef {
        Self::from_parts(self.id, self.span, kind, self.children.clone())
    }

    /// Same identity and payload, new children.
    #[must_use]
    pub fn with_children(&self, children: Vec<NodeRef>) -> NodeRef {
        Self::from_parts(self.id, self.span, self.kind.clone(), children)
    }

    /// Same node with a source span attached.
    #[must_use]
    pub fn with_span(&self, span: Span) -> NodeRef {
        Self::from_parts(self.id, Some(span), self.kind.clone(), self.children.clone())
    }

    /// Copy of this node with the child `old` swapped for `replacement`.
    #[must_use]
    pub fn with_child_replaced(&self, old: NodeId, replacement: &NodeRef) -> NodeRef {
        let children = self
            .children
            .iter()
            .map(|c| {
                if c.id == old {
                    Arc::clone(replacement)
                } else {
                    Arc::clone(c)
                }
            })
            .collect();
        self.with_children(children)
    }

    // ------------------------------------------------------------------
    // Typed views
    // ------------------------------------------------------------------

    /// Whether this is an invocation.
    #[must_use]
    pub const fn is_call(&self) -> bool {
        matches!(self.kind, NodeKind::Call)
    }

    /// Callee of an invocation.
    #[must_use]
    pub fn callee(&self) -> Option<&NodeRef> {
        match self.kind {
            NodeKind::Call => self.children.first(),
            _ => None,
        }
    }

    /// Arguments of an invocation or object creation.
    #[must_use]
    pub fn args(&self) -> &[NodeRef] {
        match self.kind {
            NodeKind::Call => self.children.get(1..).unwrap_or(&[]),
            NodeKind::New { .. } => &self.children,
            _ => &[],
        }
    }

    /// Accessed member name.
    #[must_use]
    pub fn member_name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Member { name } => Some(name),
            _ => None,
        }
    }

    /// Receiver of a member access.
    #[must_use]
    pub fn member_target(&self) -> Option<&NodeRef> {
        match self.kind {
            NodeKind::Member { .. } => self.children.first(),
            _ => None,
        }
    }

    /// Name of the routine an invocation calls, as written.
    #[must_use]
    pub fn invoked_name(&self) -> Option<&str> {
        let callee = self.callee()?;
        match callee.kind() {
            NodeKind::Ident { name } | NodeKind::Member { name } => Some(name),
            _ => None,
        }
    }

    /// Routine header.
    #[must_use]
    pub const fn signature(&self) -> Option<&Signature> {
        match &self.kind {
            NodeKind::Routine(sig) => Some(sig),
            _ => None,
        }
    }

    /// Body of a routine or lambda.
    #[must_use]
    pub fn body(&self) -> Option<&NodeRef> {
        match self.kind {
            NodeKind::Routine(_) | NodeKind::Lambda { .. } => self.children.first(),
            _ => None,
        }
    }

    /// Whether this is a lambda.
    #[must_use]
    pub const fn is_lambda(&self) -> bool {
        matches!(self.kind, NodeKind::Lambda { .. })
    }

    /// Whether this is a routine declaration.
    #[must_use]
    pub const fn is_routine(&self) -> bool {
        matches!(self.kind, NodeKind::Routine(_))
    }

    /// Whether this node is a function boundary (routine or lambda).
    #[must_use]
    pub const fn is_function_boundary(&self) -> bool {
        self.is_routine() || self.is_lambda()
    }

    /// Preorder walk of this node and its descendants.
    pub fn descendants(self: &Arc<Self>) -> Descendants {
        Descendants {
            stack: vec![Arc::clone(self)],
        }
    }
}

/// Preorder iterator over a subtree.
#[derive(Debug)]
pub struct Descendants {
    stack: Vec<NodeRef>,
}

impl Iterator for Descendants {
    type Item = NodeRef;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev().cloned());
        Some(node)
    }
}
