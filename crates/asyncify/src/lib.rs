//! Asyncify: rewrite blocking waits on asynchronous routines.
//!
//! Detects code that synchronously waits on an asynchronous result
//! (`.Result`, `.Wait()`, `.GetAwaiter().GetResult()`) or calls a
//! synchronous platform routine that has an `…Async` sibling, and rewrites
//! it into a suspension point. The enclosing routine becomes asynchronous
//! and the change is carried up the call chain until a boundary is reached.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                      ASYNCIFY Architecture                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐   ┌────────────┐   ┌─────────┐  │
//! │  │ SyntaxTree │──►│ Detector   │──►│ Rewrite    │──►│ Call    │  │
//! │  │ + Semantic │   │ (classify) │   │ Engine     │   │ Chain   │  │
//! │  │   Model    │   │            │   │ (leaf fix) │   │ Walker  │  │
//! │  └────────────┘   └────────────┘   └────────────┘   └─────────┘  │
//! │                                          │               │       │
//! │                                    ┌─────▼───────────────▼────┐  │
//! │                                    │ Transaction + tracking   │  │
//! │                                    └──────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Trees are immutable. Every edit yields a new [`SyntaxTree`] snapshot in
//! which untouched nodes keep their [`NodeId`](syntax::NodeId), so sites
//! found before an edit can be resolved after it.
//!
//! # Example
//!
//! ```rust
//! use asyncify::prelude::*;
//!
//! let tree = UnitBuilder::new()
//!     .ty(TypeBuilder::class("TapTest").routine(
//!         RoutineBuilder::new("Test")
//!             .returns(TypeRef::named("int"))
//!             .body(vec![Stmt::ret(
//!                 Expr::ident("Work").call(vec![]).dot("Result"),
//!             )]),
//!     ).routine(
//!         RoutineBuilder::new("Work")
//!             .returns(TypeRef::generic("Task", vec![TypeRef::named("int")]))
//!             .async_()
//!             .body(vec![Stmt::ret(Expr::lit("1"))]),
//!     ))
//!     .build()
//!     .unwrap();
//!
//! let table = SymbolTable::bind(&tree, &Library::standard());
//! let engine = Asyncify::new(&table);
//! let report = engine.analyze(&tree);
//! let outcome = engine.fix(&tree, report.diagnostics[0].node).unwrap();
//! assert!(render(&outcome.tree).contains("return await Work();"));
//! ```

#![warn(missing_docs)]

pub mod boundary;
pub mod config;
pub mod detect;
pub mod diagnostic;
mod engine;
mod error;
pub mod rewrite;
pub mod semantic;
pub mod site;
pub mod syntax;
pub mod tracking;
pub mod walker;

pub use config::AsyncifyConfig;
pub use detect::{AsyncSibling, Classification, Detector};
pub use diagnostic::{AnalysisReport, Diagnostic, Severity};
pub use engine::Asyncify;
pub use error::{AsyncifyError, AsyncifyResult};
pub use rewrite::{FixOutcome, FixSummary, RewriteEngine};
pub use site::{BlockingKind, CallSite};
pub use syntax::SyntaxTree;
pub use walker::CallChainWalker;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::AsyncifyConfig;
    pub use crate::detect::Classification;
    pub use crate::diagnostic::{AnalysisReport, Diagnostic};
    pub use crate::engine::Asyncify;
    pub use crate::error::{AsyncifyError, AsyncifyResult};
    pub use crate::rewrite::FixOutcome;
    pub use crate::semantic::{Library, SemanticModel, SymbolTable};
    pub use crate::site::BlockingKind;
    pub use crate::syntax::{
        render, render_node, Expr, NodeId, Param, ParamMode, RoutineBuilder, Stmt, SyntaxTree,
        TypeBuilder, TypeRef, UnitBuilder,
    };
}
