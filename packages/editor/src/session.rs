//! # Editor Session
//!
//! The façade the property panel, renderer and toolbar talk to.
//!
//! Every mutating call is one transaction: the Tree Store computes a new
//! tree, the history records it, selection references into removed
//! subtrees are cleared, and observers are notified. A rejected call changes
//! none of these.

use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};
use crate::history::History;
use crate::ids::IdGenerator;
use crate::mutations::Mutation;
use crate::node::{Node, NodeId, NodePatch};
use crate::registry::ElementRegistry;
use crate::reparent::{
    CancelReason, DragEffect, DragEvent, DragSource, DragState, DropHit, DropPlan, DropTarget,
    ForbiddenReason, HoverVerdict, ReparentProtocol,
};
use crate::selection::Selection;
use crate::tree::{fresh_copy, InvariantViolation, Tree};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Why observers are being notified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitCause {
    Mutation,
    Undo,
    Redo,
}

/// "Tree changed" notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEvent {
    /// Increments on every commit, undo and redo
    pub revision: u64,
    pub cause: CommitCause,
    pub label: Option<String>,
}

/// Subscriber for tree changes (typically the renderer)
pub trait SessionObserver {
    fn on_commit(&mut self, event: &CommitEvent, tree: &Tree);
}

impl<F> SessionObserver for F
where
    F: FnMut(&CommitEvent, &Tree),
{
    fn on_commit(&mut self, event: &CommitEvent, tree: &Tree) {
        self(event, tree)
    }
}

/// Rejected drop, ready for a tooltip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropRejection {
    pub reason: ForbiddenReason,
    pub message: String,
}

impl From<&EditorError> for DropRejection {
    fn from(err: &EditorError) -> Self {
        Self {
            reason: ForbiddenReason::from(err),
            message: err.user_message(),
        }
    }
}

/// Result of releasing a drag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    Committed {
        node_id: NodeId,
        parent: Option<NodeId>,
        index: usize,
    },
    Rejected(DropRejection),
    Cancelled,
}

/// Staging area for one commit.
///
/// Operations run against a private working tree; nothing reaches the
/// session until the closure passed to [`EditorSession::transaction`]
/// returns `Ok`.
pub struct Transaction<'a> {
    tree: Tree,
    ids: IdGenerator,
    registry: &'a ElementRegistry,
    removed: Vec<NodeId>,
    changed: bool,
}

impl Transaction<'_> {
    /// Working tree as of the last operation
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn add_element(
        &mut self,
        kind: &str,
        parent: Option<&NodeId>,
        index: Option<usize>,
    ) -> EditorResult<NodeId> {
        let node = self.registry.create_node(kind, parent, &mut self.ids)?;
        self.insert_subtree(node, parent, index)
    }

    pub fn insert_subtree(
        &mut self,
        node: Node,
        parent: Option<&NodeId>,
        index: Option<usize>,
    ) -> EditorResult<NodeId> {
        let id = node.id.clone();
        // Externally built subtrees may carry ids minted with this seed.
        self.ids.skip_past(node.subtree_ids().iter());
        self.tree = self.tree.insert(node, parent, index)?;
        self.changed = true;
        Ok(id)
    }

    pub fn delete_element(&mut self, id: &NodeId) -> EditorResult<Arc<Node>> {
        let (next, removed) = self.tree.remove(id)?;
        self.tree = next;
        self.removed.extend(removed.subtree_ids());
        self.changed = true;
        Ok(removed)
    }

    pub fn move_element(
        &mut self,
        id: &NodeId,
        new_parent: Option<&NodeId>,
        index: Option<usize>,
    ) -> EditorResult<()> {
        let next = self.tree.move_node(id, new_parent, index)?;
        let before = self.tree.index_in_parent(id)?;
        let after = next.index_in_parent(id)?;
        let old_parent = self.tree.find(id)?.parent_id.as_ref();
        if old_parent == new_parent && before == after {
            return Ok(());
        }
        self.tree = next;
        self.changed = true;
        Ok(())
    }

    pub fn update_property(&mut self, id: &NodeId, patch: &NodePatch) -> EditorResult<()> {
        if patch.is_empty() {
            self.tree.find(id)?;
            return Ok(());
        }
        let next = self.tree.patch(id, patch)?;
        if next.get_shared(id) == self.tree.get_shared(id) {
            return Ok(());
        }
        self.tree = next;
        self.changed = true;
        Ok(())
    }

    pub fn duplicate_element(&mut self, id: &NodeId) -> EditorResult<NodeId> {
        let original = self.tree.find(id)?;
        let parent = original.parent_id.clone();
        let copy = fresh_copy(original, &mut self.ids);
        let index = self.tree.index_in_parent(id)? + 1;
        self.insert_subtree(copy, parent.as_ref(), Some(index))
    }
}

/// Single-user editing session over one element tree
pub struct EditorSession {
    config: EditorConfig,
    registry: ElementRegistry,
    ids: IdGenerator,
    history: History,
    selection: Selection,
    drag: ReparentProtocol,
    revision: u64,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl EditorSession {
    /// Empty canvas with the default palette
    pub fn new(config: EditorConfig) -> Self {
        Self::with_registry(config, ElementRegistry::with_defaults())
    }

    pub fn with_registry(config: EditorConfig, registry: ElementRegistry) -> Self {
        info!(
            seed = %config.id_seed,
            max_history = config.max_history,
            kinds = registry.kinds().count(),
            "Starting editor session"
        );
        Self {
            ids: IdGenerator::new(&config.id_seed),
            history: History::with_max_levels(config.max_history),
            drag: ReparentProtocol::new(config.drop_split_ratio),
            selection: Selection::new(),
            revision: 0,
            observers: Vec::new(),
            registry,
            config,
        }
    }

    /// Open a session on an existing tree; it becomes the un-undoable baseline
    pub fn with_tree(config: EditorConfig, tree: Tree) -> EditorResult<Self> {
        if let Err(violation) = tree.validate() {
            let id = match &violation {
                InvariantViolation::DuplicateId(id) | InvariantViolation::LeafWithChildren(id) => {
                    id.clone()
                }
                InvariantViolation::WrongParent { node, .. } => node.clone(),
            };
            return Err(EditorError::invalid_target(&id, violation.to_string()));
        }

        let mut session = Self::new(config);
        session.ids.skip_past(tree.iter().map(|n| &n.id));
        session.history = History::starting_at(tree, session.config.max_history);
        Ok(session)
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    pub fn current_tree(&self) -> &Tree {
        self.history.current()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn hover(&self) -> Option<&NodeId> {
        self.selection.hovered_id.as_ref()
    }

    pub fn find(&self, id: &NodeId) -> EditorResult<&Node> {
        self.current_tree().find(id)
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Palette registration point for new kinds
    pub fn registry_mut(&mut self) -> &mut ElementRegistry {
        &mut self.registry
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    /// UI-facing text for an engine error
    pub fn describe_error(&self, err: &EditorError) -> String {
        err.user_message()
    }

    pub fn subscribe(&mut self, observer: impl SessionObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Allocate a node of `kind` without inserting it.
    ///
    /// The ids it consumes are never handed out again, whether or not the
    /// node is later passed to [`insert_subtree`](Self::insert_subtree).
    pub fn create_node(&mut self, kind: &str, parent: Option<&NodeId>) -> EditorResult<Node> {
        self.registry.create_node(kind, parent, &mut self.ids)
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    pub fn select(&mut self, id: Option<&NodeId>) -> EditorResult<()> {
        if let Some(id) = id {
            self.find(id)?;
        }
        self.selection.selected_id = id.cloned();
        Ok(())
    }

    pub fn set_hover(&mut self, id: Option<&NodeId>) -> EditorResult<()> {
        if let Some(id) = id {
            self.find(id)?;
        }
        self.selection.hovered_id = id.cloned();
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ---------------------------------------------------------------------
    // Commits
    // ---------------------------------------------------------------------

    /// Run several edits as one commit and one history entry
    pub fn transaction<T>(
        &mut self,
        label: &str,
        f: impl FnOnce(&mut Transaction<'_>) -> EditorResult<T>,
    ) -> EditorResult<T> {
        let mut tx = Transaction {
            tree: self.history.current().clone(),
            ids: self.ids.clone(),
            registry: &self.registry,
            removed: Vec::new(),
            changed: false,
        };

        let value = match f(&mut tx) {
            Ok(value) => value,
            Err(err) => {
                warn!(label, error = %err, "Rejected edit");
                return Err(err);
            }
        };

        let Transaction {
            tree,
            ids,
            removed,
            changed,
            ..
        } = tx;
        if changed {
            self.ids = ids;
            self.commit(label, tree, &removed);
        }
        Ok(value)
    }

    fn commit(&mut self, label: &str, tree: Tree, removed: &[NodeId]) {
        debug_assert!(tree.validate().is_ok(), "commit broke a tree invariant");

        self.history.record(tree, Some(label.to_string()));
        self.selection.forget(removed);
        self.selection.prune(self.history.current());
        self.revision += 1;

        debug!(
            revision = self.revision,
            label,
            removed = removed.len(),
            nodes = self.history.current().len(),
            "Committed edit"
        );
        self.notify(CommitCause::Mutation, Some(label.to_string()));
    }

    fn notify(&mut self, cause: CommitCause, label: Option<String>) {
        let event = CommitEvent {
            revision: self.revision,
            cause,
            label,
        };
        let tree = self.history.current();
        for observer in &mut self.observers {
            observer.on_commit(&event, tree);
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub fn add_element(
        &mut self,
        kind: &str,
        parent: Option<&NodeId>,
        index: Option<usize>,
    ) -> EditorResult<NodeId> {
        self.transaction("Add element", |tx| tx.add_element(kind, parent, index))
    }

    /// Insert a template-generated subtree as a unit
    #[instrument(level = "debug", skip(self, node), fields(root = %node.id))]
    pub fn insert_subtree(
        &mut self,
        node: Node,
        parent: Option<&NodeId>,
        index: Option<usize>,
    ) -> EditorResult<NodeId> {
        self.transaction("Insert template", |tx| tx.insert_subtree(node, parent, index))
    }

    /// Remove a node and its subtree, returning what was removed
    #[instrument(level = "debug", skip(self))]
    pub fn delete_element(&mut self, id: &NodeId) -> EditorResult<Arc<Node>> {
        self.transaction("Delete element", |tx| tx.delete_element(id))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn move_element(
        &mut self,
        id: &NodeId,
        target: Option<&NodeId>,
        index: Option<usize>,
    ) -> EditorResult<()> {
        self.transaction("Move element", |tx| tx.move_element(id, target, index))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn update_property(&mut self, id: &NodeId, patch: &NodePatch) -> EditorResult<()> {
        self.transaction("Update properties", |tx| tx.update_property(id, patch))
    }

    #[instrument(level = "debug", skip(self))]
    pub fn duplicate_element(&mut self, id: &NodeId) -> EditorResult<NodeId> {
        self.transaction("Duplicate element", |tx| tx.duplicate_element(id))
    }

    /// Execute a serialized mutation through the commit path
    pub fn apply(&mut self, mutation: Mutation) -> EditorResult<()> {
        let label = mutation.label();
        self.transaction(label, |tx| match mutation {
            Mutation::AddElement {
                kind,
                parent_id,
                index,
            } => tx.add_element(&kind, parent_id.as_ref(), index).map(|_| ()),
            Mutation::InsertSubtree {
                node,
                parent_id,
                index,
            } => tx.insert_subtree(node, parent_id.as_ref(), index).map(|_| ()),
            Mutation::DeleteElement { node_id } => tx.delete_element(&node_id).map(|_| ()),
            Mutation::MoveElement {
                node_id,
                new_parent_id,
                index,
            } => tx.move_element(&node_id, new_parent_id.as_ref(), index),
            Mutation::UpdateProperty { node_id, patch } => tx.update_property(&node_id, &patch),
            Mutation::DuplicateElement { node_id } => {
                tx.duplicate_element(&node_id).map(|_| ())
            }
        })
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    pub fn undo(&mut self) -> EditorResult<&Tree> {
        let label = self.history.undo_label().map(str::to_string);
        self.history.undo()?;
        self.after_history_step(CommitCause::Undo, label);
        Ok(self.history.current())
    }

    pub fn redo(&mut self) -> EditorResult<&Tree> {
        let label = self.history.redo_label().map(str::to_string);
        self.history.redo()?;
        self.after_history_step(CommitCause::Redo, label);
        Ok(self.history.current())
    }

    fn after_history_step(&mut self, cause: CommitCause, label: Option<String>) {
        if self.config.clear_selection_on_undo {
            self.selection.selected_id = None;
        }
        self.selection.prune(self.history.current());
        self.revision += 1;
        info!(
            revision = self.revision,
            ?cause,
            label = label.as_deref().unwrap_or(""),
            undo_levels = self.history.undo_levels(),
            redo_levels = self.history.redo_levels(),
            "History step"
        );
        self.notify(cause, label);
    }

    // ---------------------------------------------------------------------
    // Drag and drop
    // ---------------------------------------------------------------------

    /// Pointer-down on a node handle or a palette entry
    pub fn begin_drag(&mut self, source: DragSource) -> EditorResult<DragEffect> {
        match &source {
            DragSource::Existing { id } => {
                self.find(id)?;
            }
            DragSource::NewFromKind { kind } => {
                if !self.registry.contains(kind) {
                    return Err(EditorError::UnknownKind(kind.clone()));
                }
            }
        }

        let effect = self
            .drag
            .apply_event(self.history.current(), DragEvent::Pick(source));
        if let DragEffect::Picked { source } = &effect {
            self.selection.dragged_id = source.node_id().cloned();
        }
        Ok(effect)
    }

    /// Pointer entered a droppable region; `None` when no drag is active
    pub fn drag_over(&mut self, target: DropTarget) -> Option<HoverVerdict> {
        match self
            .drag
            .apply_event(self.history.current(), DragEvent::Hover(target.clone()))
        {
            DragEffect::Hovered { verdict, .. } => {
                self.selection.hovered_id = target.parent().cloned();
                Some(verdict)
            }
            _ => None,
        }
    }

    /// Pointer left every droppable region
    pub fn drag_leave(&mut self) {
        if let DragEffect::Left = self
            .drag
            .apply_event(self.history.current(), DragEvent::Leave)
        {
            self.selection.hovered_id = None;
        }
    }

    /// Pointer released; commits the drop or reports why it was refused
    pub fn drop_at(&mut self, hit: DropHit) -> DropOutcome {
        let effect = self
            .drag
            .apply_event(self.history.current(), DragEvent::Release(hit));
        self.selection.dragged_id = None;

        match effect {
            DragEffect::Dropped(plan) => self.execute_drop(plan),
            DragEffect::Canceled {
                reason: CancelReason::Rejected(reason),
            } => {
                warn!(?reason, "Rejected drop");
                DropOutcome::Rejected(DropRejection {
                    reason,
                    message: rejection_message(reason),
                })
            }
            _ => DropOutcome::Cancelled,
        }
    }

    /// Escape key; returns false when no drag was active
    pub fn cancel_drag(&mut self) -> bool {
        let effect = self
            .drag
            .apply_event(self.history.current(), DragEvent::Cancel);
        self.selection.dragged_id = None;
        matches!(effect, DragEffect::Canceled { .. })
    }

    fn execute_drop(&mut self, plan: DropPlan) -> DropOutcome {
        let DropPlan {
            source,
            parent,
            index,
        } = plan;

        let result = match &source {
            DragSource::NewFromKind { kind } => {
                self.add_element(kind, parent.as_ref(), Some(index))
            }
            DragSource::Existing { id } => self
                .move_element(id, parent.as_ref(), Some(index))
                .map(|()| id.clone()),
        };

        match result {
            Ok(node_id) => {
                let index = self
                    .current_tree()
                    .index_in_parent(&node_id)
                    .unwrap_or(index);
                debug!(node = %node_id, index, "Drop landed");
                DropOutcome::Committed {
                    node_id,
                    parent,
                    index,
                }
            }
            Err(err) => {
                warn!(error = %err, "Rejected drop");
                DropOutcome::Rejected(DropRejection::from(&err))
            }
        }
    }
}

fn rejection_message(reason: ForbiddenReason) -> String {
    match reason {
        ForbiddenReason::NotFound => "That element no longer exists.",
        ForbiddenReason::InvalidTarget => "Can't drop here.",
        ForbiddenReason::Cycle => "An element can't be placed inside itself.",
        ForbiddenReason::Other => "That drop isn't allowed.",
    }
    .to_string()
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(EditorConfig::default())
    }
}
