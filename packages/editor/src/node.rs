//! # Nodes
//!
//! The atomic unit of the element tree. A node owns its children through
//! `Arc`s so history snapshots and the live tree can share untouched
//! subtrees; nothing may mutate a shared node in place (writes go through
//! `Arc::make_mut`).

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Opaque style/attribute/event map. The engine stores and replaces these, never reads them.
pub type PropertyBag = BTreeMap<String, String>;

/// Opaque, never-reused node identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// One element on the canvas
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,

    /// Palette kind that produced this node (opaque to the engine)
    pub kind: String,

    /// Inline text/markup; `None` for kinds without inline content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default)]
    pub children: Vec<Arc<Node>>,

    pub can_have_children: bool,
    pub is_container: bool,

    /// Back-reference to the owning node, `None` for roots
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<NodeId>,

    #[serde(default)]
    pub style: PropertyBag,
    #[serde(default)]
    pub attributes: PropertyBag,
    #[serde(default)]
    pub events: PropertyBag,

    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub hidden: bool,
}

impl Node {
    /// Bare leaf node with empty property bags
    pub fn new(id: impl Into<NodeId>, kind: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            content: None,
            children: Vec::new(),
            can_have_children: false,
            is_container: false,
            parent_id: None,
            style: PropertyBag::new(),
            attributes: PropertyBag::new(),
            events: PropertyBag::new(),
            locked: false,
            hidden: false,
        }
    }

    /// Mark as a container that accepts children
    pub fn container(mut self) -> Self {
        self.can_have_children = true;
        self.is_container = true;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Append a child, wiring its parent reference
    pub fn with_child(mut self, mut child: Node) -> Self {
        child.parent_id = Some(self.id.clone());
        self.children.push(Arc::new(child));
        self
    }

    pub fn child_ids(&self) -> Vec<&NodeId> {
        self.children.iter().map(|c| &c.id).collect()
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Pre-order visit of this node and everything below it
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Node)) {
        f(self);
        for child in &self.children {
            child.walk(f);
        }
    }

    /// Ids of this node and all of its descendants, pre-order
    pub fn subtree_ids(&self) -> Vec<NodeId> {
        let mut ids = Vec::new();
        self.walk(&mut |n| ids.push(n.id.clone()));
        ids
    }

    pub fn subtree_len(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |_| count += 1);
        count
    }
}

/// Shallow property update for one node.
///
/// Each field that is present replaces the node's value as a whole: a bag is
/// swapped for the patch's bag (an empty bag clears it), and `content: null`
/// removes the content. Absent fields, children and position are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_or_null"
    )]
    pub content: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<PropertyBag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<PropertyBag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<PropertyBag>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
}

/// Distinguish `"content": null` (clear) from a missing key (keep)
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl NodePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(Some(content.into()));
        self
    }

    pub fn clear_content(mut self) -> Self {
        self.content = Some(None);
        self
    }

    /// Add one entry to the replacement style bag
    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style
            .get_or_insert_with(PropertyBag::new)
            .insert(property.into(), value.into());
        self
    }

    /// Replace the whole style bag
    pub fn with_style(mut self, style: PropertyBag) -> Self {
        self.style = Some(style);
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes
            .get_or_insert_with(PropertyBag::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn with_attributes(mut self, attributes: PropertyBag) -> Self {
        self.attributes = Some(attributes);
        self
    }

    pub fn event(mut self, name: impl Into<String>, handler: impl Into<String>) -> Self {
        self.events
            .get_or_insert_with(PropertyBag::new)
            .insert(name.into(), handler.into());
        self
    }

    pub fn with_events(mut self, events: PropertyBag) -> Self {
        self.events = Some(events);
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = Some(locked);
        self
    }

    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = Some(hidden);
        self
    }

    /// True when no field is present
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub(crate) fn apply_to(&self, node: &mut Node) {
        if let Some(content) = &self.content {
            node.content = content.clone();
        }
        if let Some(style) = &self.style {
            node.style = style.clone();
        }
        if let Some(attributes) = &self.attributes {
            node.attributes = attributes.clone();
        }
        if let Some(events) = &self.events {
            node.events = events.clone();
        }
        if let Some(locked) = self.locked {
            node.locked = locked;
        }
        if let Some(hidden) = self.hidden {
            node.hidden = hidden;
        }
    }
}
