//! # Element Registry
//!
//! Data-driven table mapping a palette kind to the template that produces
//! its nodes. New kinds are registered, not matched on.

use crate::errors::{EditorError, EditorResult};
use crate::ids::IdGenerator;
use crate::node::{Node, NodeId, PropertyBag};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Blueprint for a node (and optionally a ready-made subtree)
#[derive(Debug, Clone, PartialEq)]
pub struct NodeTemplate {
    pub kind: String,
    pub content: Option<String>,
    pub style: PropertyBag,
    pub attributes: PropertyBag,
    pub events: PropertyBag,
    pub can_have_children: bool,
    pub is_container: bool,
    pub children: Vec<NodeTemplate>,
}

impl NodeTemplate {
    /// Leaf template
    pub fn leaf(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            content: None,
            style: PropertyBag::new(),
            attributes: PropertyBag::new(),
            events: PropertyBag::new(),
            can_have_children: false,
            is_container: false,
            children: Vec::new(),
        }
    }

    /// Template for a node that accepts children
    pub fn container(kind: impl Into<String>) -> Self {
        Self {
            can_have_children: true,
            is_container: true,
            ..Self::leaf(kind)
        }
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.insert(property.into(), value.into());
        self
    }

    pub fn attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn child(mut self, child: NodeTemplate) -> Self {
        self.children.push(child);
        self
    }

    fn build(&self, ids: &mut IdGenerator, parent: Option<&NodeId>) -> EditorResult<Node> {
        let mut node = Node::new(ids.next_id(), self.kind.clone());
        node.content = self.content.clone();
        node.style = self.style.clone();
        node.attributes = self.attributes.clone();
        node.events = self.events.clone();
        node.can_have_children = self.can_have_children;
        node.is_container = self.is_container;
        node.parent_id = parent.cloned();

        if !self.children.is_empty() && !self.can_have_children {
            return Err(EditorError::invalid_target(
                &node.id,
                format!("template \"{}\" cannot have children", self.kind),
            ));
        }

        let mut children = Vec::with_capacity(self.children.len());
        for child in &self.children {
            children.push(Arc::new(child.build(ids, Some(&node.id))?));
        }
        node.children = children;

        Ok(node)
    }
}

/// Palette of known element kinds
#[derive(Debug, Clone, Default)]
pub struct ElementRegistry {
    templates: BTreeMap<String, NodeTemplate>,
}

impl ElementRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the builder's standard palette
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(NodeTemplate::container("container").style("display", "flex"));
        registry.register(NodeTemplate::container("section").style("padding", "24px"));
        registry.register(
            NodeTemplate::container("row")
                .style("display", "flex")
                .style("flex-direction", "row"),
        );
        registry.register(
            NodeTemplate::container("column")
                .style("display", "flex")
                .style("flex-direction", "column"),
        );
        registry.register(NodeTemplate::container("list").attribute("role", "list"));

        registry.register(NodeTemplate::leaf("text").content("Text"));
        registry.register(
            NodeTemplate::leaf("heading")
                .content("Heading")
                .style("font-size", "32px")
                .attribute("level", "1"),
        );
        registry.register(NodeTemplate::leaf("paragraph").content("Lorem ipsum dolor sit amet."));
        registry.register(
            NodeTemplate::leaf("button")
                .content("Button")
                .attribute("type", "button")
                .style("padding", "8px 16px"),
        );
        registry.register(NodeTemplate::leaf("link").content("Link").attribute("href", "#"));
        registry.register(
            NodeTemplate::leaf("image")
                .attribute("src", "")
                .attribute("alt", ""),
        );
        registry.register(NodeTemplate::leaf("input").attribute("placeholder", "Type here"));
        registry.register(NodeTemplate::leaf("divider").style("border-top", "1px solid #ddd"));

        registry.register(
            NodeTemplate::container("card")
                .style("padding", "16px")
                .style("border-radius", "8px")
                .child(NodeTemplate::leaf("heading").content("Card title").attribute("level", "3"))
                .child(NodeTemplate::leaf("paragraph").content("Card body"))
                .child(NodeTemplate::leaf("button").content("Action").attribute("type", "button")),
        );

        registry
    }

    /// Register a template, returning the one it replaced
    pub fn register(&mut self, template: NodeTemplate) -> Option<NodeTemplate> {
        self.templates.insert(template.kind.clone(), template)
    }

    pub fn get(&self, kind: &str) -> Option<&NodeTemplate> {
        self.templates.get(kind)
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.templates.contains_key(kind)
    }

    /// Registered kinds in sorted order
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.templates.keys().map(String::as_str)
    }

    /// Allocate a detached node (or subtree) for `kind` with fresh ids
    pub fn instantiate(&self, kind: &str, ids: &mut IdGenerator) -> EditorResult<Node> {
        self.create_node(kind, None, ids)
    }

    /// Like [`instantiate`](Self::instantiate), with `parent_id` pre-set for
    /// the parent the node is about to be inserted under. Nothing is
    /// inserted; `Tree::insert` sets the final parent id.
    pub fn create_node(
        &self,
        kind: &str,
        parent: Option<&NodeId>,
        ids: &mut IdGenerator,
    ) -> EditorResult<Node> {
        let template = self
            .get(kind)
            .ok_or_else(|| EditorError::UnknownKind(kind.to_string()))?;
        template.build(ids, parent)
    }
}
