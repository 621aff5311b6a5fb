//! Error types for `asyncify`.
//!
//! Analysis never fails: a site that cannot be classified is simply
//! `NotApplicable`. Errors are reserved for rewrites that cannot be carried
//! out and for malformed input documents.

use crate::syntax::NodeId;
use crate::tracking::TrackHandle;
use thiserror::Error;

/// Result type alias for asyncify operations.
pub type AsyncifyResult<T> = std::result::Result<T, AsyncifyError>;

/// Errors that can occur while rewriting a syntax tree.
#[derive(Debug, Error)]
pub enum AsyncifyError {
    /// A node id does not exist in the current snapshot
    #[error("Node {0} not found in syntax tree")]
    NodeNotFound(NodeId),

    /// Two nodes in one snapshot carry the same id
    #[error("Node id {0} appears more than once in syntax tree")]
    DuplicateNode(NodeId),

    /// A tracked node no longer resolves after an edit
    #[error("Tracked node {node} (handle {handle}) did not survive a rewrite step")]
    LostTrackedNode {
        /// Tracking handle
        handle: TrackHandle,
        /// Node the handle was registered for
        node: NodeId,
    },

    /// The classification does not permit a fix at this site
    #[error("Fix not applicable at node {node}: {reason}")]
    FixNotApplicable {
        /// Site the fix was requested for
        node: NodeId,
        /// Why no fix is possible
        reason: String,
    },

    /// The site has no enclosing routine or lambda to convert
    #[error("Node {0} has no enclosing routine")]
    MissingRoutine(NodeId),

    /// Configuration could not be parsed
    #[error("Configuration error: {0}")]
    Config(#[from] serde_yaml_ng::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error while loading configuration or documents
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AsyncifyError {
    /// Create a fix-not-applicable error.
    pub fn not_applicable(node: NodeId, reason: impl Into<String>) -> Self {
        Self::FixNotApplicable {
            node,
            reason: reason.into(),
        }
    }

    /// Whether the error means the request was simply a no-op.
    #[must_use]
    pub const fn is_not_applicable(&self) -> bool {
        matches!(self, Self::FixNotApplicable { .. } | Self::MissingRoutine(_))
    }
}
