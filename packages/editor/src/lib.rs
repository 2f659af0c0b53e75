//! # Trellis Editor
//!
//! Document-tree mutation engine for the Trellis visual builder.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ host UI: palette, canvas, property panel    │
//! └─────────────────────────────────────────────┘
//!                     ↓ gestures / edits
//! ┌─────────────────────────────────────────────┐
//! │ session: the only entry point               │
//! │  - reparent: drag lifecycle → drop plan     │
//! │  - tree: pure insert/remove/move/patch      │
//! │  - history: snapshot undo/redo              │
//! │  - selection: selected/hovered/dragged ids  │
//! └─────────────────────────────────────────────┘
//!                     ↓ CommitEvent + &Tree
//! ┌─────────────────────────────────────────────┐
//! │ renderer (read-only consumer)               │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Tree is the source of truth**: rendered markup is a derived view
//! 2. **Copy-on-write**: edits rebuild only the root-to-node spine; snapshots
//!    share everything else
//! 3. **One commit path**: every undoable edit goes through
//!    [`EditorSession::transaction`], so history and tree cannot drift
//! 4. **Reject, don't repair**: a refused edit leaves tree, history and
//!    selection exactly as they were
//!
//! ## Usage
//!
//! ```rust
//! use trellis_editor::{EditorConfig, EditorSession, NodePatch};
//!
//! let mut session = EditorSession::new(EditorConfig::default());
//!
//! let container = session.add_element("container", None, None)?;
//! let text = session.add_element("text", Some(&container), None)?;
//! session.update_property(&text, &NodePatch::new().content("Hello"))?;
//!
//! // Move the text out to the canvas root, then take it back
//! session.move_element(&text, None, Some(0))?;
//! session.undo()?;
//! assert_eq!(session.find(&text)?.parent_id.as_ref(), Some(&container));
//! # Ok::<(), trellis_editor::EditorError>(())
//! ```

mod config;
mod errors;
mod history;
mod ids;
mod mutations;
mod node;
mod registry;
mod reparent;
mod selection;
mod session;
mod tree;

pub use config::EditorConfig;
pub use errors::{EditorError, EditorResult, HistoryDirection};
pub use history::{History, HistoryEntry};
pub use ids::{get_seed, IdGenerator};
pub use mutations::Mutation;
pub use node::{Node, NodeId, NodePatch, PropertyBag};
pub use registry::{ElementRegistry, NodeTemplate};
pub use reparent::{
    hover_verdict, resolve_drop_index, CancelReason, DragEffect, DragEvent, DragNoopReason,
    DragSource, DragState, DropHit, DropPlan, DropTarget, ForbiddenReason, HoverVerdict, Point,
    Rect, ReparentProtocol, SiblingBox,
};
pub use selection::Selection;
pub use session::{
    CommitCause, CommitEvent, DropOutcome, DropRejection, EditorSession, SessionObserver,
    Transaction,
};
pub use tree::{fresh_copy, InvariantViolation, Tree, TreeIter};
