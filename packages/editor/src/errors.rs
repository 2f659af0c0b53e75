//! Error types for the editor

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which way a history navigation was heading when it hit the end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryDirection {
    Undo,
    Redo,
}

impl fmt::Display for HistoryDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryDirection::Undo => f.write_str("undo"),
            HistoryDirection::Redo => f.write_str("redo"),
        }
    }
}

/// Every way an engine operation can be rejected.
///
/// A rejected operation leaves the tree, history and selection untouched.
#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Node not found: {0}")]
    NotFound(NodeId),

    #[error("Invalid target {id}: {reason}")]
    InvalidTarget { id: NodeId, reason: String },

    #[error("Moving {node} under {target} would create a cycle")]
    CyclicMove { node: NodeId, target: NodeId },

    #[error("Nothing to {0}")]
    AtBoundary(HistoryDirection),

    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("Unknown element kind: {0}")]
    UnknownKind(String),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl EditorError {
    pub(crate) fn invalid_target(id: &NodeId, reason: impl Into<String>) -> Self {
        EditorError::InvalidTarget {
            id: id.clone(),
            reason: reason.into(),
        }
    }

    /// Short message suitable for a toast or a rejected-drop tooltip
    pub fn user_message(&self) -> String {
        match self {
            EditorError::NotFound(_) => "That element no longer exists.".to_string(),
            EditorError::InvalidTarget { reason, .. } => format!("Can't do that here: {}.", reason),
            EditorError::CyclicMove { .. } => {
                "An element can't be placed inside itself.".to_string()
            }
            EditorError::AtBoundary(HistoryDirection::Undo) => "Nothing to undo.".to_string(),
            EditorError::AtBoundary(HistoryDirection::Redo) => "Nothing to redo.".to_string(),
            EditorError::DuplicateId(_) => {
                "That element is already on the canvas.".to_string()
            }
            EditorError::UnknownKind(kind) => format!("\"{}\" is not in the palette.", kind),
            EditorError::Config(_) => "The editor settings could not be read.".to_string(),
        }
    }
}

pub type EditorResult<T> = Result<T, EditorError>;
