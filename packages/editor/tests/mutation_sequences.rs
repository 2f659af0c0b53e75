//! Property tests: arbitrary edit sequences checked against the tree invariants
//!
//! This tests:
//! - id uniqueness, parent back-references and leaf containment after every step
//! - no orphaning after insert/move
//! - rejected edits leaving tree and history untouched
//! - undo/redo as exact inverses of each commit
//! - ids minted by the session never coming back, even after undo
//! - the session staying usable after any sequence, including inserted
//!   subtrees whose ids carry the session's own seed

use proptest::prelude::*;
use std::collections::HashSet;
use trellis_editor::{
    EditorConfig, EditorError, EditorSession, ElementRegistry, IdGenerator, NodeId, NodePatch,
    PropertyBag, Tree,
};

// ── Strategies ──────────────────────────────────────────────────────────

const KINDS: &[&str] = &["container", "row", "text", "button", "card", "image"];

/// One host action. Node references are picks into the current pre-order
/// id list, so every sequence stays meaningful while shrinking.
#[derive(Debug, Clone)]
enum Step {
    Add {
        kind: usize,
        parent: Option<usize>,
        index: Option<usize>,
    },
    /// A palette-built card minted with the session's own seed
    InsertCard {
        skip: u8,
        parent: Option<usize>,
    },
    Delete(usize),
    Move {
        node: usize,
        parent: Option<usize>,
        index: Option<usize>,
    },
    Patch {
        node: usize,
        order: u8,
        locked: bool,
        clear_style: bool,
    },
    Duplicate(usize),
    Select(usize),
    Undo,
    Redo,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let target = || prop::option::weighted(0.75, any::<usize>());
    let slot = || prop::option::of(0usize..5);

    prop_oneof![
        4 => (0..KINDS.len(), target(), slot())
            .prop_map(|(kind, parent, index)| Step::Add { kind, parent, index }),
        1 => (0u8..8, target()).prop_map(|(skip, parent)| Step::InsertCard { skip, parent }),
        2 => any::<usize>().prop_map(Step::Delete),
        3 => (any::<usize>(), target(), slot())
            .prop_map(|(node, parent, index)| Step::Move { node, parent, index }),
        2 => (
            any::<usize>(),
            0u8..100,
            prop::bool::weighted(0.15),
            prop::bool::weighted(0.2),
        )
            .prop_map(|(node, order, locked, clear_style)| Step::Patch {
                node,
                order,
                locked,
                clear_style,
            }),
        1 => any::<usize>().prop_map(Step::Duplicate),
        1 => any::<usize>().prop_map(Step::Select),
        1 => Just(Step::Undo),
        1 => Just(Step::Redo),
    ]
}

fn steps_strategy() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(step_strategy(), 1..80)
}

// ── Helpers ─────────────────────────────────────────────────────────────

fn session() -> EditorSession {
    EditorSession::new(EditorConfig::default().with_max_history(0))
}

fn nth(tree: &Tree, pick: usize) -> NodeId {
    let ids: Vec<&NodeId> = tree.iter().map(|n| &n.id).collect();
    if ids.is_empty() {
        NodeId::from("missing")
    } else {
        ids[pick % ids.len()].clone()
    }
}

fn is_history_step(step: &Step) -> bool {
    matches!(step, Step::Undo | Step::Redo)
}

/// Run a step, returning the node whose placement should be checked
fn apply(session: &mut EditorSession, step: &Step) -> Result<Option<NodeId>, EditorError> {
    let tree = session.current_tree().clone();
    let target = |pick: &Option<usize>| pick.map(|p| nth(&tree, p));

    match step {
        Step::Add {
            kind,
            parent,
            index,
        } => session
            .add_element(KINDS[*kind], target(parent).as_ref(), *index)
            .map(Some),
        Step::InsertCard { skip, parent } => {
            let mut ids = IdGenerator::new(&session.config().id_seed);
            for _ in 0..*skip {
                ids.next_id();
            }
            let card = ElementRegistry::with_defaults().instantiate("card", &mut ids)?;
            session
                .insert_subtree(card, target(parent).as_ref(), None)
                .map(Some)
        }
        Step::Delete(pick) => session.delete_element(&nth(&tree, *pick)).map(|_| None),
        Step::Move {
            node,
            parent,
            index,
        } => {
            let id = nth(&tree, *node);
            session
                .move_element(&id, target(parent).as_ref(), *index)
                .map(|()| Some(id))
        }
        Step::Patch {
            node,
            order,
            locked,
            clear_style,
        } => {
            let mut patch = NodePatch::new()
                .style("order", order.to_string())
                .locked(*locked);
            if *clear_style {
                patch = patch.with_style(PropertyBag::new());
            }
            session.update_property(&nth(&tree, *node), &patch).map(|()| None)
        }
        Step::Duplicate(pick) => session.duplicate_element(&nth(&tree, *pick)).map(Some),
        Step::Select(pick) => session.select(Some(&nth(&tree, *pick))).map(|()| None),
        Step::Undo => session.undo().map(|_| None),
        Step::Redo => session.redo().map(|_| None),
    }
}

fn assert_placed(tree: &Tree, id: &NodeId) -> Result<(), TestCaseError> {
    let node = tree.find(id).map_err(|e| TestCaseError::fail(e.to_string()))?;
    let siblings: Vec<&NodeId> = match &node.parent_id {
        Some(parent) => tree
            .find(parent)
            .map_err(|e| TestCaseError::fail(e.to_string()))?
            .child_ids(),
        None => tree.root_ids(),
    };
    prop_assert_eq!(
        siblings.iter().filter(|s| **s == id).count(),
        1,
        "{} must appear exactly once under its parent",
        id
    );
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Structural invariants after every step
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_step_keeps_the_tree_valid(steps in steps_strategy()) {
        let mut session = session();
        let mut minted: HashSet<NodeId> = HashSet::new();

        for step in &steps {
            let before = session.current_tree().clone();
            let levels = session.history().undo_levels();
            let result = apply(&mut session, step);
            let after = session.current_tree().clone();

            prop_assert!(after.validate().is_ok(), "{:?} broke the tree", step);
            match &result {
                Ok(Some(id)) => assert_placed(&after, id)?,
                Ok(None) => {}
                Err(err) => {
                    prop_assert_eq!(
                        &after, &before,
                        "{:?} failed with {} but changed the tree", step, err
                    );
                    prop_assert_eq!(session.history().undo_levels(), levels);
                }
            }

            // Fresh ids from the session's own generator are never reissued
            if matches!(step, Step::Add { .. } | Step::Duplicate(_)) && result.is_ok() {
                for node in after.iter().filter(|n| !before.contains(&n.id)) {
                    prop_assert!(minted.insert(node.id.clone()), "{} was reissued", node.id);
                }
            }

            let sel = session.selection();
            for id in [&sel.selected_id, &sel.hovered_id, &sel.dragged_id].into_iter().flatten() {
                prop_assert!(after.contains(id), "selection kept stale {}", id);
            }
        }

        prop_assert!(session.add_element("text", None, None).is_ok());
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 2. Undo/redo inverse law
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_and_redo_invert_each_commit(steps in steps_strategy()) {
        let mut session = session();

        for step in steps.iter().filter(|s| !is_history_step(s)) {
            let before = session.current_tree().clone();
            if apply(&mut session, step).is_err() {
                continue;
            }
            let after = session.current_tree().clone();
            if after == before {
                continue;
            }

            prop_assert_eq!(session.undo().ok(), Some(&before), "undo of {:?}", step);
            prop_assert_eq!(session.redo().ok(), Some(&after), "redo of {:?}", step);
        }
    }

    #[test]
    fn whole_history_walks_back_to_empty(steps in steps_strategy()) {
        let mut session = session();
        for step in &steps {
            let _ = apply(&mut session, step);
        }
        while session.can_redo() {
            prop_assert!(session.redo().is_ok());
        }
        let last = session.current_tree().clone();

        while session.can_undo() {
            prop_assert!(session.undo().is_ok());
            prop_assert!(session.current_tree().validate().is_ok());
        }
        prop_assert!(session.current_tree().is_empty());

        while session.can_redo() {
            prop_assert!(session.redo().is_ok());
        }
        prop_assert_eq!(session.current_tree(), &last);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3. Fixed sequences
// ═══════════════════════════════════════════════════════════════════════

#[test]
fn test_ids_are_never_reused_after_undo() {
    let mut session = EditorSession::default();
    let first = session.add_element("text", None, None).unwrap();
    session.undo().unwrap();

    let second = session.add_element("text", None, None).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_move_then_delete_then_undo_restores_subtree() {
    let mut session = EditorSession::default();
    let a = session.add_element("container", None, None).unwrap();
    let b = session.add_element("container", None, None).unwrap();
    let leaf = session.add_element("text", Some(&b), None).unwrap();

    session.move_element(&b, Some(&a), Some(0)).unwrap();
    session.select(Some(&leaf)).unwrap();
    session.delete_element(&a).unwrap();
    assert!(session.current_tree().is_empty());
    assert!(session.selection().selected_id.is_none());

    session.undo().unwrap();
    assert_eq!(session.find(&leaf).unwrap().parent_id, Some(b.clone()));
    assert_eq!(session.find(&b).unwrap().parent_id, Some(a.clone()));

    session.undo().unwrap();
    let roots: Vec<&NodeId> = session.current_tree().root_ids();
    assert_eq!(roots, vec![&a, &b]);
}

#[test]
fn test_new_commit_after_undo_discards_redo() {
    let mut session = EditorSession::default();
    let text = session.add_element("text", None, None).unwrap();
    for i in 1..=5 {
        session
            .update_property(&text, &NodePatch::new().content(format!("v{}", i)))
            .unwrap();
    }
    assert_eq!(session.history().undo_levels(), 6);

    for _ in 0..3 {
        session.undo().unwrap();
    }
    assert_eq!(session.find(&text).unwrap().content.as_deref(), Some("v2"));
    assert_eq!(session.history().redo_levels(), 3);

    session
        .update_property(&text, &NodePatch::new().content("branch"))
        .unwrap();
    assert_eq!(session.history().redo_levels(), 0);
    assert!(matches!(
        session.redo(),
        Err(EditorError::AtBoundary(trellis_editor::HistoryDirection::Redo))
    ));
}
