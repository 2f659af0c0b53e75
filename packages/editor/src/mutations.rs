//! # Mutations
//!
//! Serializable description of every committed edit a host can request.
//!
//! ## Mutation Semantics
//!
//! ### AddElement / InsertSubtree
//! - Creates (or takes) a detached node and inserts it at `index`, appending
//!   when `index` is absent or past the end
//! - Fails if the parent cannot hold children
//!
//! ### MoveElement
//! - Atomic relocation: the subtree is never observable as missing
//! - Fails if the new parent is the node itself or one of its descendants
//!
//! ### DeleteElement
//! - Removes the node and all descendants
//! - Clears selection, hover and drag references into the removed subtree
//!
//! ### UpdateProperty
//! - Each bag present in the patch replaces the node's bag whole; structure untouched
//! - A patch that leaves the node as it was records nothing

use crate::node::{Node, NodeId, NodePatch};
use serde::{Deserialize, Serialize};

/// Semantic edits (one mutation = one history entry)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Mutation {
    /// Create a node of a registered kind
    AddElement {
        kind: String,
        parent_id: Option<NodeId>,
        index: Option<usize>,
    },

    /// Insert a ready-made subtree (template/palette output)
    InsertSubtree {
        node: Node,
        parent_id: Option<NodeId>,
        index: Option<usize>,
    },

    DeleteElement {
        node_id: NodeId,
    },

    MoveElement {
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        index: Option<usize>,
    },

    UpdateProperty {
        node_id: NodeId,
        patch: NodePatch,
    },

    /// Deep copy with fresh ids, placed right after the original
    DuplicateElement {
        node_id: NodeId,
    },
}

impl Mutation {
    /// Human-readable history label, e.g. for an "Undo Move element" menu item
    pub fn label(&self) -> &'static str {
        match self {
            Mutation::AddElement { .. } => "Add element",
            Mutation::InsertSubtree { .. } => "Insert template",
            Mutation::DeleteElement { .. } => "Delete element",
            Mutation::MoveElement { .. } => "Move element",
            Mutation::UpdateProperty { .. } => "Update properties",
            Mutation::DuplicateElement { .. } => "Duplicate element",
        }
    }
}
