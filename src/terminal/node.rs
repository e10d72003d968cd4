//! Terminal virtual nodes.
//!
//! The terminal back-end renders from a tree of [`TermNode`]s - the
//! platform-node implementation the renderer core mutates. Nodes are
//! reference-counted records with identity equality; every structural or
//! attribute mutation marks the back-end dirty so the render pipeline
//! recomputes a frame.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use crate::render::{AttrValue, EventHandler, EventPayload, PlatformNode};

use super::style::StyleProps;

/// Node variants in the terminal tree.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TermKind {
    /// An intrinsic element (`box`, `text`, ...).
    Element(String),
    /// Transparent container owned by a structural component; flattened
    /// away during layout.
    Container(String),
    /// Text leaf.
    Text,
    /// Position marker; ignored by layout and paint.
    Marker(String),
}

pub(crate) struct TermNodeData {
    pub kind: TermKind,
    pub text: RefCell<String>,
    pub attrs: RefCell<FxHashMap<String, AttrValue>>,
    pub style: RefCell<StyleProps>,
    pub children: RefCell<Vec<TermNode>>,
    pub parent: RefCell<Option<Weak<TermNodeData>>>,
    pub listeners: RefCell<FxHashMap<String, Vec<(usize, EventHandler)>>>,
    pub next_listener_id: Cell<usize>,
}

/// A node in the terminal back-end's virtual tree.
#[derive(Clone)]
pub struct TermNode {
    pub(crate) data: Rc<TermNodeData>,
}

impl TermNode {
    fn new(kind: TermKind, text: &str) -> Self {
        Self {
            data: Rc::new(TermNodeData {
                kind,
                text: RefCell::new(text.to_string()),
                attrs: RefCell::new(FxHashMap::default()),
                style: RefCell::new(StyleProps::default()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(None),
                listeners: RefCell::new(FxHashMap::default()),
                next_listener_id: Cell::new(0),
            }),
        }
    }

    fn set_parent(&self, parent: Option<&TermNode>) {
        *self.data.parent.borrow_mut() = parent.map(|p| Rc::downgrade(&p.data));
    }

    fn detach_from_current_parent(&self) {
        if let Some(parent) = self.parent() {
            parent.data.children.borrow_mut().retain(|c| c != self);
        }
        self.set_parent(None);
    }

    pub(crate) fn is_text(&self) -> bool {
        matches!(self.data.kind, TermKind::Text)
    }

    pub(crate) fn is_container(&self) -> bool {
        matches!(self.data.kind, TermKind::Container(_))
    }

    pub(crate) fn is_marker(&self) -> bool {
        matches!(self.data.kind, TermKind::Marker(_))
    }

    pub(crate) fn style(&self) -> StyleProps {
        self.data.style.borrow().clone()
    }

    /// Text of this node (text leaves only).
    pub fn text(&self) -> String {
        self.data.text.borrow().clone()
    }

    /// Concatenated text of the subtree.
    pub fn text_content(&self) -> String {
        if self.is_text() {
            return self.text();
        }
        self.data
            .children
            .borrow()
            .iter()
            .map(TermNode::text_content)
            .collect()
    }

    /// Direct children, in order.
    pub fn children(&self) -> Vec<TermNode> {
        self.data.children.borrow().clone()
    }

    /// Direct child count.
    pub fn child_count(&self) -> usize {
        self.data.children.borrow().len()
    }

    /// Current value of an attribute.
    pub fn attr(&self, key: &str) -> Option<AttrValue> {
        self.data.attrs.borrow().get(key).cloned()
    }

    /// Fire an event at this node's listeners.
    pub fn emit(&self, event: &str, value: AttrValue) {
        let payload = EventPayload {
            name: event.to_string(),
            value,
        };
        let handlers: Vec<EventHandler> = self
            .data
            .listeners
            .borrow()
            .get(event)
            .map(|entries| entries.iter().map(|(_, handler)| handler.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(&payload);
        }
    }

    /// Fire an event at every listener in the subtree (depth-first).
    pub fn broadcast(&self, event: &str, value: AttrValue) {
        self.emit(event, value.clone());
        for child in self.children() {
            child.broadcast(event, value.clone());
        }
    }
}

impl PartialEq for TermNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for TermNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.data.kind {
            TermKind::Element(tag) => tag.clone(),
            TermKind::Container(name) => format!("#container:{name}"),
            TermKind::Text => "#text".to_string(),
            TermKind::Marker(name) => format!("#marker:{name}"),
        };
        f.debug_struct("TermNode")
            .field("kind", &kind)
            .field("children", &self.child_count())
            .finish()
    }
}

impl PlatformNode for TermNode {
    fn create_element(tag: &str) -> Self {
        TermNode::new(TermKind::Element(tag.to_string()), "")
    }

    fn create_container(debug_name: &str) -> Self {
        TermNode::new(TermKind::Container(debug_name.to_string()), "")
    }

    fn create_text(text: &str) -> Self {
        TermNode::new(TermKind::Text, text)
    }

    fn create_marker(name: &str) -> Self {
        TermNode::new(TermKind::Marker(name.to_string()), "")
    }

    fn set_text(&self, text: &str) {
        let changed = *self.data.text.borrow() != text;
        if changed {
            *self.data.text.borrow_mut() = text.to_string();
            super::mark_dirty();
        }
    }

    fn set_children(&self, children: Vec<Self>) {
        let old: Vec<TermNode> = self.data.children.borrow_mut().drain(..).collect();
        for child in &old {
            child.set_parent(None);
        }
        for child in &children {
            child.detach_from_current_parent();
            child.set_parent(Some(self));
        }
        *self.data.children.borrow_mut() = children;
        super::mark_dirty();
    }

    fn append_child(&self, child: &Self) {
        child.detach_from_current_parent();
        child.set_parent(Some(self));
        self.data.children.borrow_mut().push(child.clone());
        super::mark_dirty();
    }

    fn insert_before(&self, child: &Self, reference: &Self) {
        child.detach_from_current_parent();
        child.set_parent(Some(self));
        let mut children = self.data.children.borrow_mut();
        match children.iter().position(|c| c == reference) {
            Some(index) => children.insert(index, child.clone()),
            None => {
                log::warn!("insert_before: reference is not a child; appending instead");
                children.push(child.clone());
            }
        }
        drop(children);
        super::mark_dirty();
    }

    fn remove_child(&self, child: &Self) {
        self.data.children.borrow_mut().retain(|c| c != child);
        child.set_parent(None);
        super::mark_dirty();
    }

    fn parent(&self) -> Option<Self> {
        self.data
            .parent
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|data| TermNode { data })
    }

    fn set_attribute(&self, key: &str, value: AttrValue) {
        self.data.style.borrow_mut().apply(key, &value);
        let mut attrs = self.data.attrs.borrow_mut();
        match value {
            AttrValue::Null => {
                attrs.remove(key);
            }
            other => {
                attrs.insert(key.to_string(), other);
            }
        }
        drop(attrs);
        super::mark_dirty();
    }

    fn add_listener(&self, event: &str, handler: EventHandler) -> usize {
        let id = self.data.next_listener_id.get();
        self.data.next_listener_id.set(id + 1);
        self.data
            .listeners
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    fn remove_listener(&self, event: &str, id: usize) {
        if let Some(entries) = self.data.listeners.borrow_mut().get_mut(event) {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    fn notify_update(&self) {
        super::mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_style_attributes_parse_into_props() {
        let node = TermNode::create_element("box");
        node.set_attribute("width", AttrValue::Int(20));
        node.set_attribute("fg", AttrValue::from("red"));
        let style = node.style();
        assert_eq!(style.width, super::super::style::Dim::Cells(20));
        assert_eq!(style.fg, super::super::style::Rgba::RED);
    }

    #[test]
    fn test_plain_attributes_kept() {
        let node = TermNode::create_element("box");
        node.set_attribute("title", AttrValue::from("hello"));
        assert_eq!(node.attr("title"), Some(AttrValue::from("hello")));
    }

    #[test]
    fn test_tree_mutation_marks_dirty() {
        let root = TermNode::create_element("box");
        let _ = super::super::take_dirty();
        root.append_child(&TermNode::create_text("x"));
        assert!(super::super::take_dirty());
    }
}
