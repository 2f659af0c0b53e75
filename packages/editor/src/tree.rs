//! # Tree Store
//!
//! An ordered forest of [`Node`]s with pure, non-mutating structural
//! operations. Every operation returns a new [`Tree`]; the receiver is never
//! modified, so a rejected operation is a full no-op and older snapshots stay
//! valid.
//!
//! ## Sharing
//!
//! Nodes are held in `Arc`s. A rewrite copies only the spine from the root
//! sequence down to the touched node (`Arc::make_mut` along a path of child
//! indices); every other subtree is shared with the source tree.
//!
//! ## Traversal
//!
//! All operations compose two primitives: [`Tree::path_to`] locates a node as
//! a list of child indices (pre-order depth-first search), and
//! `children_at_mut` / `node_at_mut` walk such a path copying the spine.

use crate::errors::{EditorError, EditorResult};
use crate::ids::IdGenerator;
use crate::node::{Node, NodeId, NodePatch};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// A structural invariant that does not hold
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("id {0} appears more than once")]
    DuplicateId(NodeId),

    #[error("node {node} has parent_id {found:?} but lives under {expected:?}")]
    WrongParent {
        node: NodeId,
        expected: Option<NodeId>,
        found: Option<NodeId>,
    },

    #[error("leaf node {0} has children")]
    LeafWithChildren(NodeId),
}

/// Ordered forest of root nodes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tree {
    roots: Vec<Arc<Node>>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a forest by inserting each root in order
    pub fn from_roots(roots: Vec<Node>) -> EditorResult<Self> {
        let mut tree = Self::new();
        for root in roots {
            tree = tree.insert(root, None, None)?;
        }
        Ok(tree)
    }

    pub fn roots(&self) -> &[Arc<Node>] {
        &self.roots
    }

    pub fn root_ids(&self) -> Vec<&NodeId> {
        self.roots.iter().map(|n| &n.id).collect()
    }

    /// True when the forest has no roots
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Total number of nodes in the forest
    pub fn len(&self) -> usize {
        self.roots.iter().map(|r| r.subtree_len()).sum()
    }

    /// Pre-order iterator over every node
    pub fn iter(&self) -> TreeIter<'_> {
        TreeIter {
            stack: vec![self.roots.iter()],
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Child-index path from the root sequence to `id`, pre-order search
    pub fn path_to(&self, id: &NodeId) -> Option<Vec<usize>> {
        fn search(children: &[Arc<Node>], id: &NodeId, path: &mut Vec<usize>) -> bool {
            for (i, child) in children.iter().enumerate() {
                path.push(i);
                if &child.id == id || search(&child.children, id, path) {
                    return true;
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        search(&self.roots, id, &mut path).then_some(path)
    }

    /// Nodes along a path, outermost first
    fn nodes_on_path(&self, path: &[usize]) -> Vec<&Arc<Node>> {
        let mut nodes = Vec::with_capacity(path.len());
        let mut children = &self.roots;
        for &i in path {
            let node = &children[i];
            nodes.push(node);
            children = &node.children;
        }
        nodes
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.get_shared(id).map(|n| n.as_ref())
    }

    /// The shared handle for a node, for identity comparisons across snapshots
    pub fn get_shared(&self, id: &NodeId) -> Option<&Arc<Node>> {
        let path = self.path_to(id)?;
        self.nodes_on_path(&path).pop()
    }

    /// Depth-first lookup
    pub fn find(&self, id: &NodeId) -> EditorResult<&Node> {
        self.get(id).ok_or_else(|| EditorError::NotFound(id.clone()))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.path_to(id).is_some()
    }

    /// Parent node, `None` for roots
    pub fn parent_of(&self, id: &NodeId) -> EditorResult<Option<&Node>> {
        let node = self.find(id)?;
        match &node.parent_id {
            Some(parent_id) => self.find(parent_id).map(Some),
            None => Ok(None),
        }
    }

    /// Position of `id` among its siblings (or among the roots)
    pub fn index_in_parent(&self, id: &NodeId) -> EditorResult<usize> {
        self.path_to(id)
            .and_then(|path| path.last().copied())
            .ok_or_else(|| EditorError::NotFound(id.clone()))
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: &NodeId) -> EditorResult<Vec<&Node>> {
        let path = self
            .path_to(id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        let mut nodes: Vec<&Node> = self
            .nodes_on_path(&path)
            .into_iter()
            .map(|n| n.as_ref())
            .collect();
        nodes.pop();
        nodes.reverse();
        Ok(nodes)
    }

    /// Whether `ancestor` is a strict ancestor of `id`
    pub fn is_ancestor(&self, ancestor: &NodeId, id: &NodeId) -> bool {
        self.ancestors(id)
            .map(|nodes| nodes.iter().any(|n| &n.id == ancestor))
            .unwrap_or(false)
    }

    /// Ids of `id` and all of its descendants
    pub fn subtree_ids(&self, id: &NodeId) -> EditorResult<Vec<NodeId>> {
        Ok(self.find(id)?.subtree_ids())
    }

    /// Check every structural invariant, reporting the first violation
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        fn check(
            children: &[Arc<Node>],
            parent: Option<&NodeId>,
            seen: &mut HashSet<NodeId>,
        ) -> Result<(), InvariantViolation> {
            for child in children {
                if !seen.insert(child.id.clone()) {
                    return Err(InvariantViolation::DuplicateId(child.id.clone()));
                }
                if child.parent_id.as_ref() != parent {
                    return Err(InvariantViolation::WrongParent {
                        node: child.id.clone(),
                        expected: parent.cloned(),
                        found: child.parent_id.clone(),
                    });
                }
                if !child.can_have_children && !child.children.is_empty() {
                    return Err(InvariantViolation::LeafWithChildren(child.id.clone()));
                }
                check(&child.children, Some(&child.id), seen)?;
            }
            Ok(())
        }

        check(&self.roots, None, &mut HashSet::new())
    }

    // ---------------------------------------------------------------------
    // Rewrites
    // ---------------------------------------------------------------------

    /// Insert a detached node (or subtree) under `parent` at `index`.
    ///
    /// `None` parent means the root sequence; `None` index appends. An index
    /// past the end appends.
    pub fn insert(
        &self,
        mut node: Node,
        parent: Option<&NodeId>,
        index: Option<usize>,
    ) -> EditorResult<Tree> {
        self.check_insertable(&node)?;

        let mut next = self.clone();
        let siblings = next.children_of_mut(parent)?;
        node.parent_id = parent.cloned();
        rewire(&mut node);
        let at = index.map_or(siblings.len(), |i| i.min(siblings.len()));
        siblings.insert(at, Arc::new(node));
        Ok(next)
    }

    /// Detach `id` and its subtree, closing the gap among its siblings
    pub fn remove(&self, id: &NodeId) -> EditorResult<(Tree, Arc<Node>)> {
        let node = self.find(id)?;
        let mut locked = None;
        node.walk(&mut |n| {
            if n.locked && locked.is_none() {
                locked = Some(n.id.clone());
            }
        });
        if let Some(locked_id) = locked {
            return Err(EditorError::invalid_target(&locked_id, "element is locked"));
        }

        let mut next = self.clone();
        let removed = next.detach(id)?;
        Ok((next, removed))
    }

    /// Relocate `id` (children preserved verbatim) under `new_parent` at `index`.
    ///
    /// `index` is interpreted after the node has left its old position.
    pub fn move_node(
        &self,
        id: &NodeId,
        new_parent: Option<&NodeId>,
        index: Option<usize>,
    ) -> EditorResult<Tree> {
        self.check_movable(id, new_parent)?;

        let mut next = self.clone();
        let detached = next.detach(id)?;
        let siblings = next.children_of_mut(new_parent)?;
        let mut moved = Arc::unwrap_or_clone(detached);
        moved.parent_id = new_parent.cloned();
        let at = index.map_or(siblings.len(), |i| i.min(siblings.len()));
        siblings.insert(at, Arc::new(moved));
        Ok(next)
    }

    /// Validate a move without performing it
    pub fn check_movable(&self, id: &NodeId, new_parent: Option<&NodeId>) -> EditorResult<()> {
        let node = self.find(id)?;
        if node.locked {
            return Err(EditorError::invalid_target(id, "element is locked"));
        }

        let Some(parent_id) = new_parent else {
            return Ok(());
        };
        if parent_id == id {
            return Err(EditorError::CyclicMove {
                node: id.clone(),
                target: parent_id.clone(),
            });
        }

        let parent = self.find(parent_id)?;
        // Walk from the target up to its root; meeting `id` means the target
        // is inside the subtree being moved.
        if self.ancestors(parent_id)?.iter().any(|a| &a.id == id) {
            return Err(EditorError::CyclicMove {
                node: id.clone(),
                target: parent_id.clone(),
            });
        }
        if !parent.can_have_children {
            return Err(EditorError::invalid_target(parent_id, "element cannot contain children"));
        }
        Ok(())
    }

    /// Apply `patch` to `id` field by field, leaving children and position alone
    pub fn patch(&self, id: &NodeId, patch: &NodePatch) -> EditorResult<Tree> {
        let path = self
            .path_to(id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        let mut next = self.clone();
        let node = next
            .node_at_mut(&path)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        patch.apply_to(node);
        Ok(next)
    }

    // ---------------------------------------------------------------------
    // Spine-copying helpers
    // ---------------------------------------------------------------------

    fn check_insertable(&self, node: &Node) -> EditorResult<()> {
        let existing: HashSet<&NodeId> = self.iter().map(|n| &n.id).collect();
        let mut incoming = HashSet::new();
        let mut problem = None;
        node.walk(&mut |n| {
            if problem.is_some() {
                return;
            }
            if existing.contains(&n.id) || !incoming.insert(&n.id) {
                problem = Some(EditorError::DuplicateId(n.id.clone()));
            } else if !n.can_have_children && !n.children.is_empty() {
                problem = Some(EditorError::invalid_target(
                    &n.id,
                    "element cannot contain children",
                ));
            }
        });
        match problem {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Mutable children of `parent` (or the roots), copying the spine
    fn children_of_mut(&mut self, parent: Option<&NodeId>) -> EditorResult<&mut Vec<Arc<Node>>> {
        let Some(parent_id) = parent else {
            return Ok(&mut self.roots);
        };
        let path = self
            .path_to(parent_id)
            .ok_or_else(|| EditorError::NotFound(parent_id.clone()))?;
        let node = self
            .node_at_mut(&path)
            .ok_or_else(|| EditorError::NotFound(parent_id.clone()))?;
        if !node.can_have_children {
            return Err(EditorError::invalid_target(parent_id, "element cannot contain children"));
        }
        Ok(&mut node.children)
    }

    /// Walk `path`, un-sharing each node on the way down
    fn children_at_mut(&mut self, path: &[usize]) -> &mut Vec<Arc<Node>> {
        let mut children = &mut self.roots;
        for &i in path {
            children = &mut Arc::make_mut(&mut children[i]).children;
        }
        children
    }

    fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (last, spine) = path.split_last()?;
        Some(Arc::make_mut(&mut self.children_at_mut(spine)[*last]))
    }

    fn detach(&mut self, id: &NodeId) -> EditorResult<Arc<Node>> {
        let path = self
            .path_to(id)
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        let (last, spine) = path
            .split_last()
            .ok_or_else(|| EditorError::NotFound(id.clone()))?;
        Ok(self.children_at_mut(spine).remove(*last))
    }
}

/// Make every descendant's `parent_id` agree with where it sits
fn rewire(node: &mut Node) {
    fn is_wired(node: &Node) -> bool {
        node.children
            .iter()
            .all(|c| c.parent_id.as_ref() == Some(&node.id) && is_wired(c))
    }

    let id = node.id.clone();
    for child in node.children.iter_mut() {
        if child.parent_id.as_ref() != Some(&id) || !is_wired(child) {
            let child = Arc::make_mut(child);
            child.parent_id = Some(id.clone());
            rewire(child);
        }
    }
}

/// Deep copy of `node` with fresh ids throughout, detached from any parent
pub fn fresh_copy(node: &Node, ids: &mut IdGenerator) -> Node {
    let mut copy = Node {
        id: ids.next_id(),
        children: Vec::with_capacity(node.children.len()),
        parent_id: None,
        ..node.clone()
    };
    copy.children = node
        .children
        .iter()
        .map(|child| {
            let mut child = fresh_copy(child, ids);
            child.parent_id = Some(copy.id.clone());
            Arc::new(child)
        })
        .collect();
    copy
}

/// Pre-order iterator over a [`Tree`]
pub struct TreeIter<'a> {
    stack: Vec<std::slice::Iter<'a, Arc<Node>>>,
}

impl<'a> Iterator for TreeIter<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(node) => {
                    self.stack.push(node.children.iter());
                    return Some(node.as_ref());
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
