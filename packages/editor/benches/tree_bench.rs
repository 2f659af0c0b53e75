use criterion::{black_box, criterion_group, criterion_main, Criterion};
use trellis_editor::{EditorConfig, EditorSession, Node, NodeId, NodePatch, Tree};

/// One container holding `width` text leaves
fn wide_tree(width: usize) -> Tree {
    let root = (0..width).fold(Node::new("root", "container").container(), |root, i| {
        root.with_child(Node::new(format!("leaf-{}", i), "text").with_content("Lorem"))
    });
    Tree::from_roots(vec![root]).unwrap()
}

/// A chain of nested containers `depth` levels deep
fn deep_tree(depth: usize) -> Tree {
    let mut node = Node::new(format!("level-{}", depth), "text");
    for level in (0..depth).rev() {
        node = Node::new(format!("level-{}", level), "container")
            .container()
            .with_child(node);
    }
    Tree::from_roots(vec![node]).unwrap()
}

fn insert_wide(c: &mut Criterion) {
    let tree = wide_tree(1_000);
    let parent = NodeId::from("root");

    c.bench_function("insert_wide_1000", |b| {
        b.iter(|| {
            tree.insert(
                black_box(Node::new("fresh", "text")),
                Some(&parent),
                Some(500),
            )
        })
    });
}

fn move_deep(c: &mut Criterion) {
    let tree = deep_tree(200);
    let leaf = NodeId::from("level-200");
    let target = NodeId::from("level-10");

    c.bench_function("move_deep_200", |b| {
        b.iter(|| tree.move_node(black_box(&leaf), Some(&target), Some(0)))
    });
}

fn patch_deep(c: &mut Criterion) {
    let tree = deep_tree(200);
    let leaf = NodeId::from("level-200");
    let patch = NodePatch::new().content("Changed").style("color", "red");

    c.bench_function("patch_deep_200", |b| {
        b.iter(|| tree.patch(black_box(&leaf), &patch))
    });
}

fn session_edit_undo_redo(c: &mut Criterion) {
    let mut session = EditorSession::new(EditorConfig::default());
    let list = session.add_element("list", None, None).unwrap();
    for _ in 0..100 {
        session.add_element("text", Some(&list), None).unwrap();
    }

    c.bench_function("session_edit_undo_redo", |b| {
        b.iter(|| {
            session
                .update_property(&list, &NodePatch::new().style("gap", "8px"))
                .unwrap();
            session.undo().unwrap();
            session.redo().unwrap();
        })
    });
}

criterion_group!(
    benches,
    insert_wide,
    move_deep,
    patch_deep,
    session_edit_undo_redo
);
criterion_main!(benches);
