//! Selection, hover and drag references.
//!
//! Three independent optional ids. The only rule is that none of them may
//! point at a node that is no longer in the tree.

use crate::node::NodeId;
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub selected_id: Option<NodeId>,
    pub hovered_id: Option<NodeId>,
    pub dragged_id: Option<NodeId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.selected_id.is_none() && self.hovered_id.is_none() && self.dragged_id.is_none()
    }

    /// Clear any reference into a removed subtree
    pub fn forget(&mut self, removed: &[NodeId]) {
        for slot in self.slots_mut() {
            if slot.as_ref().is_some_and(|id| removed.contains(id)) {
                *slot = None;
            }
        }
    }

    /// Clear any reference the tree no longer contains.
    ///
    /// Returns true when something was cleared.
    pub fn prune(&mut self, tree: &Tree) -> bool {
        let mut changed = false;
        for slot in self.slots_mut() {
            if slot.as_ref().is_some_and(|id| !tree.contains(id)) {
                *slot = None;
                changed = true;
            }
        }
        changed
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    fn slots_mut(&mut self) -> [&mut Option<NodeId>; 3] {
        [
            &mut self.selected_id,
            &mut self.hovered_id,
            &mut self.dragged_id,
        ]
    }
}
