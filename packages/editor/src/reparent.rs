//! # Reparent Protocol
//!
//! Drag-and-drop lifecycle that turns pointer gestures into a single tree
//! edit.
//!
//! ```text
//! Idle -> Picking -> Hovering -> Idle (drop)
//!            \          \-----> Idle (cancel)
//!             \---------------> Idle (release outside / cancel)
//! ```
//!
//! The protocol never edits the tree itself. A successful release yields a
//! [`DropPlan`] that the session executes through its commit path; hover
//! verdicts are computed eagerly so the UI can show a forbidden cursor before
//! the pointer is released.

use crate::errors::{EditorError, EditorResult};
use crate::node::NodeId;
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

/// What is being dragged
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DragSource {
    /// An element already on the canvas
    Existing { id: NodeId },
    /// A palette entry; a node of this kind is created on drop
    NewFromKind { kind: String },
}

impl DragSource {
    pub fn existing(id: impl Into<NodeId>) -> Self {
        DragSource::Existing { id: id.into() }
    }

    pub fn new_from_kind(kind: impl Into<String>) -> Self {
        DragSource::NewFromKind { kind: kind.into() }
    }

    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            DragSource::Existing { id } => Some(id),
            DragSource::NewFromKind { .. } => None,
        }
    }
}

/// Droppable region under the pointer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum DropTarget {
    Node { id: NodeId },
    /// The canvas itself; drops land in the root sequence
    CanvasRoot,
}

impl DropTarget {
    pub fn node(id: impl Into<NodeId>) -> Self {
        DropTarget::Node { id: id.into() }
    }

    /// Parent id the dropped node will get, `None` for the canvas
    pub fn parent(&self) -> Option<&NodeId> {
        match self {
            DropTarget::Node { id } => Some(id),
            DropTarget::CanvasRoot => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned box in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        self.contains_y(p.y) && p.x >= self.x && p.x < self.x + self.width
    }

    pub fn contains_y(&self, y: f32) -> bool {
        y >= self.y && y < self.y + self.height
    }
}

/// Rendered box of one child of the drop target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiblingBox {
    pub id: NodeId,
    pub bounds: Rect,
}

/// Pointer position at release plus the boxes the renderer drew for the
/// target's children
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DropHit {
    pub pointer: Option<Point>,
    pub siblings: Vec<SiblingBox>,
}

impl DropHit {
    pub fn at(x: f32, y: f32) -> Self {
        Self {
            pointer: Some(Point::new(x, y)),
            siblings: Vec::new(),
        }
    }

    pub fn sibling(mut self, id: impl Into<NodeId>, bounds: Rect) -> Self {
        self.siblings.push(SiblingBox {
            id: id.into(),
            bounds,
        });
        self
    }
}

/// Why a hover or drop is refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForbiddenReason {
    NotFound,
    InvalidTarget,
    Cycle,
    Other,
}

impl From<&EditorError> for ForbiddenReason {
    fn from(err: &EditorError) -> Self {
        match err {
            EditorError::NotFound(_) => ForbiddenReason::NotFound,
            EditorError::InvalidTarget { .. } => ForbiddenReason::InvalidTarget,
            EditorError::CyclicMove { .. } => ForbiddenReason::Cycle,
            _ => ForbiddenReason::Other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "camelCase")]
pub enum HoverVerdict {
    Allowed,
    Forbidden { reason: ForbiddenReason },
}

impl HoverVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, HoverVerdict::Allowed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DragState {
    Idle,
    Picking {
        source: DragSource,
    },
    Hovering {
        source: DragSource,
        target: DropTarget,
        verdict: HoverVerdict,
    },
}

/// One discrete pointer/keyboard input for the drag lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    Pick(DragSource),
    Hover(DropTarget),
    /// Pointer left every droppable region
    Leave,
    Release(DropHit),
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CancelReason {
    ReleasedOutside,
    Explicit,
    Rejected(ForbiddenReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DragNoopReason {
    IdleWithoutActiveDrag,
    DragAlreadyInProgress,
}

/// Resolved edit for a successful release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DropPlan {
    pub source: DragSource,
    pub parent: Option<NodeId>,
    pub index: usize,
}

/// What one event did to the machine
#[derive(Debug, Clone, PartialEq)]
pub enum DragEffect {
    Picked { source: DragSource },
    Hovered { target: DropTarget, verdict: HoverVerdict },
    Left,
    Dropped(DropPlan),
    Canceled { reason: CancelReason },
    Noop { reason: DragNoopReason },
}

/// Drag-and-drop state machine
#[derive(Debug, Clone)]
pub struct ReparentProtocol {
    state: DragState,
    split_ratio: f32,
}

impl ReparentProtocol {
    pub fn new(split_ratio: f32) -> Self {
        Self {
            state: DragState::Idle,
            split_ratio,
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    /// Whether a drag is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self.state, DragState::Idle)
    }

    pub fn source(&self) -> Option<&DragSource> {
        match &self.state {
            DragState::Idle => None,
            DragState::Picking { source } | DragState::Hovering { source, .. } => Some(source),
        }
    }

    /// Apply one input event against the current tree
    pub fn apply_event(&mut self, tree: &Tree, event: DragEvent) -> DragEffect {
        let state = std::mem::replace(&mut self.state, DragState::Idle);

        match (state, event) {
            (DragState::Idle, DragEvent::Pick(source)) => {
                self.state = DragState::Picking {
                    source: source.clone(),
                };
                DragEffect::Picked { source }
            }
            (DragState::Idle, _) => DragEffect::Noop {
                reason: DragNoopReason::IdleWithoutActiveDrag,
            },

            (active, DragEvent::Pick(_)) => {
                self.state = active;
                DragEffect::Noop {
                    reason: DragNoopReason::DragAlreadyInProgress,
                }
            }

            (
                DragState::Picking { source } | DragState::Hovering { source, .. },
                DragEvent::Hover(target),
            ) => {
                let verdict = hover_verdict(tree, &source, &target);
                self.state = DragState::Hovering {
                    source,
                    target: target.clone(),
                    verdict,
                };
                DragEffect::Hovered { target, verdict }
            }

            (
                DragState::Picking { source } | DragState::Hovering { source, .. },
                DragEvent::Leave,
            ) => {
                self.state = DragState::Picking { source };
                DragEffect::Left
            }

            (DragState::Picking { .. }, DragEvent::Release(_)) => DragEffect::Canceled {
                reason: CancelReason::ReleasedOutside,
            },

            (DragState::Hovering { source, target, .. }, DragEvent::Release(hit)) => {
                // Re-check: the tree may have changed since the last hover.
                if let HoverVerdict::Forbidden { reason } = hover_verdict(tree, &source, &target) {
                    return DragEffect::Canceled {
                        reason: CancelReason::Rejected(reason),
                    };
                }
                match resolve_drop_index(tree, &source, &target, &hit, self.split_ratio) {
                    Ok(index) => DragEffect::Dropped(DropPlan {
                        source,
                        parent: target.parent().cloned(),
                        index,
                    }),
                    Err(err) => DragEffect::Canceled {
                        reason: CancelReason::Rejected(ForbiddenReason::from(&err)),
                    },
                }
            }

            (DragState::Picking { .. } | DragState::Hovering { .. }, DragEvent::Cancel) => {
                DragEffect::Canceled {
                    reason: CancelReason::Explicit,
                }
            }
        }
    }
}

/// Whether `source` may be dropped into `target` right now
pub fn hover_verdict(tree: &Tree, source: &DragSource, target: &DropTarget) -> HoverVerdict {
    let check = match source {
        DragSource::Existing { id } => tree.check_movable(id, target.parent()),
        DragSource::NewFromKind { .. } => match target {
            DropTarget::CanvasRoot => Ok(()),
            DropTarget::Node { id } => tree.find(id).and_then(|node| {
                if node.can_have_children {
                    Ok(())
                } else {
                    Err(EditorError::invalid_target(id, "element cannot contain children"))
                }
            }),
        },
    };

    match check {
        Ok(()) => HoverVerdict::Allowed,
        Err(err) => HoverVerdict::Forbidden {
            reason: ForbiddenReason::from(&err),
        },
    }
}

/// Insertion index for a drop, in post-removal coordinates.
///
/// The nearest sibling under the pointer decides: the part of its box above
/// `split_ratio` inserts before it, the rest after. No sibling under the
/// pointer appends; an empty target always yields 0.
pub fn resolve_drop_index(
    tree: &Tree,
    source: &DragSource,
    target: &DropTarget,
    hit: &DropHit,
    split_ratio: f32,
) -> EditorResult<usize> {
    let children: Vec<&NodeId> = match target {
        DropTarget::CanvasRoot => tree.root_ids(),
        DropTarget::Node { id } => tree.find(id)?.child_ids(),
    };
    if children.is_empty() {
        return Ok(0);
    }

    let under_pointer = hit.pointer.and_then(|p| {
        let candidates = || {
            hit.siblings
                .iter()
                .filter_map(|s| children.iter().position(|c| *c == &s.id).map(|i| (i, s)))
        };
        candidates()
            .find(|(_, s)| s.bounds.contains(p))
            .or_else(|| candidates().find(|(_, s)| s.bounds.contains_y(p.y)))
            .map(|(i, s)| {
                let split = s.bounds.y + s.bounds.height * split_ratio;
                if p.y < split {
                    i
                } else {
                    i + 1
                }
            })
    });

    let mut index = under_pointer.unwrap_or(children.len());

    // A node moving within its own parent leaves a gap before `index`.
    if let Some(id) = source.node_id() {
        if let Some(current) = children.iter().position(|c| *c == id) {
            if current < index {
                index -= 1;
            }
        }
    }

    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    /// list: [a, b, c] stacked 20px apart; leaf "note" at the root
    fn sample() -> Tree {
        Tree::from_roots(vec![
            Node::new("list", "list")
                .container()
                .with_child(Node::new("a", "text"))
                .with_child(Node::new("b", "text"))
                .with_child(Node::new("c", "text")),
            Node::new("note", "text"),
            Node::new("empty", "container").container(),
        ])
        .unwrap()
    }

    fn stacked(x: f32, y: f32) -> DropHit {
        DropHit::at(x, y)
            .sibling("a", Rect::new(0.0, 0.0, 100.0, 20.0))
            .sibling("b", Rect::new(0.0, 20.0, 100.0, 20.0))
            .sibling("c", Rect::new(0.0, 40.0, 100.0, 20.0))
    }

    fn index_for(source: DragSource, y: f32) -> usize {
        resolve_drop_index(&sample(), &source, &DropTarget::node("list"), &stacked(10.0, y), 0.5)
            .unwrap()
    }

    #[test]
    fn test_upper_half_inserts_before() {
        assert_eq!(index_for(DragSource::new_from_kind("text"), 22.0), 1);
    }

    #[test]
    fn test_lower_half_inserts_after() {
        assert_eq!(index_for(DragSource::new_from_kind("text"), 35.0), 2);
    }

    #[test]
    fn test_no_sibling_under_pointer_appends() {
        assert_eq!(index_for(DragSource::new_from_kind("text"), 500.0), 3);
    }

    #[test]
    fn test_empty_container_is_index_zero() {
        let index = resolve_drop_index(
            &sample(),
            &DragSource::existing("note"),
            &DropTarget::node("empty"),
            &DropHit::at(5.0, 5.0),
            0.5,
        )
        .unwrap();
        assert_eq!(index, 0);
    }

    #[test]
    fn test_same_parent_move_accounts_for_gap() {
        // Dragging "a" below "b": final order b, a, c
        assert_eq!(index_for(DragSource::existing("a"), 35.0), 1);
        // Dragging "c" above "a" is unaffected
        assert_eq!(index_for(DragSource::existing("c"), 2.0), 0);
    }

    #[test]
    fn test_hover_verdicts() {
        let tree = sample();
        assert!(
            hover_verdict(&tree, &DragSource::existing("a"), &DropTarget::CanvasRoot).is_allowed()
        );
        assert_eq!(
            hover_verdict(&tree, &DragSource::existing("list"), &DropTarget::node("b")),
            HoverVerdict::Forbidden {
                reason: ForbiddenReason::Cycle
            }
        );
        assert_eq!(
            hover_verdict(&tree, &DragSource::new_from_kind("text"), &DropTarget::node("note")),
            HoverVerdict::Forbidden {
                reason: ForbiddenReason::InvalidTarget
            }
        );
        assert_eq!(
            hover_verdict(&tree, &DragSource::new_from_kind("text"), &DropTarget::node("ghost")),
            HoverVerdict::Forbidden {
                reason: ForbiddenReason::NotFound
            }
        );
    }

    #[test]
    fn test_lifecycle_to_drop() {
        let tree = sample();
        let mut protocol = ReparentProtocol::new(0.5);

        assert!(matches!(
            protocol.apply_event(&tree, DragEvent::Hover(DropTarget::CanvasRoot)),
            DragEffect::Noop {
                reason: DragNoopReason::IdleWithoutActiveDrag
            }
        ));

        protocol.apply_event(&tree, DragEvent::Pick(DragSource::existing("note")));
        assert_eq!(protocol.source(), Some(&DragSource::existing("note")));
        assert!(matches!(
            protocol.apply_event(&tree, DragEvent::Pick(DragSource::existing("a"))),
            DragEffect::Noop {
                reason: DragNoopReason::DragAlreadyInProgress
            }
        ));

        let effect = protocol.apply_event(&tree, DragEvent::Hover(DropTarget::node("list")));
        assert_eq!(
            effect,
            DragEffect::Hovered {
                target: DropTarget::node("list"),
                verdict: HoverVerdict::Allowed
            }
        );

        let effect = protocol.apply_event(&tree, DragEvent::Release(stacked(10.0, 5.0)));
        assert_eq!(
            effect,
            DragEffect::Dropped(DropPlan {
                source: DragSource::existing("note"),
                parent: Some(NodeId::from("list")),
                index: 0,
            })
        );
        assert_eq!(protocol.state(), &DragState::Idle);
    }

    #[test]
    fn test_release_outside_cancels() {
        let tree = sample();
        let mut protocol = ReparentProtocol::new(0.5);
        protocol.apply_event(&tree, DragEvent::Pick(DragSource::new_from_kind("text")));
        protocol.apply_event(&tree, DragEvent::Hover(DropTarget::node("list")));
        assert_eq!(protocol.apply_event(&tree, DragEvent::Leave), DragEffect::Left);

        assert_eq!(
            protocol.apply_event(&tree, DragEvent::Release(DropHit::default())),
            DragEffect::Canceled {
                reason: CancelReason::ReleasedOutside
            }
        );
        assert!(!protocol.is_active());
    }

    #[test]
    fn test_forbidden_release_is_rejected() {
        let tree = sample();
        let mut protocol = ReparentProtocol::new(0.5);
        protocol.apply_event(&tree, DragEvent::Pick(DragSource::existing("list")));
        protocol.apply_event(&tree, DragEvent::Hover(DropTarget::node("list")));

        assert_eq!(
            protocol.apply_event(&tree, DragEvent::Release(DropHit::at(0.0, 0.0))),
            DragEffect::Canceled {
                reason: CancelReason::Rejected(ForbiddenReason::Cycle)
            }
        );
        assert_eq!(protocol.state(), &DragState::Idle);
    }

    #[test]
    fn test_explicit_cancel() {
        let tree = sample();
        let mut protocol = ReparentProtocol::new(0.5);
        protocol.apply_event(&tree, DragEvent::Pick(DragSource::existing("a")));
        assert_eq!(
            protocol.apply_event(&tree, DragEvent::Cancel),
            DragEffect::Canceled {
                reason: CancelReason::Explicit
            }
        );
        assert!(!protocol.is_active());
    }
}
