//! Headless back-end - an Rc-tree stand-in for a host DOM.
//!
//! Serves two purposes: it pins down the platform contract in tests
//! without a terminal or a browser, and it documents what a host back-end
//! must provide. Nodes are reference-counted records with reference
//! identity; equality is pointer equality, as the renderer requires.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use rustc_hash::FxHashMap;

use super::platform::{AttrValue, EventHandler, EventPayload, PlatformNode};

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Element(String),
    Container(String),
    Text,
    Marker(String),
}

struct NodeData {
    kind: NodeKind,
    text: RefCell<String>,
    attrs: RefCell<FxHashMap<String, AttrValue>>,
    children: RefCell<Vec<HeadlessNode>>,
    parent: RefCell<Option<Weak<NodeData>>>,
    listeners: RefCell<FxHashMap<String, Vec<(usize, EventHandler)>>>,
    next_listener_id: Cell<usize>,
    /// Number of `notify_update` hints received (observable in tests).
    updates: Cell<u64>,
}

/// A headless platform node.
#[derive(Clone)]
pub struct HeadlessNode {
    data: Rc<NodeData>,
}

impl HeadlessNode {
    fn new(kind: NodeKind, text: &str) -> Self {
        Self {
            data: Rc::new(NodeData {
                kind,
                text: RefCell::new(text.to_string()),
                attrs: RefCell::new(FxHashMap::default()),
                children: RefCell::new(Vec::new()),
                parent: RefCell::new(None),
                listeners: RefCell::new(FxHashMap::default()),
                next_listener_id: Cell::new(0),
                updates: Cell::new(0),
            }),
        }
    }

    fn set_parent(&self, parent: Option<&HeadlessNode>) {
        *self.data.parent.borrow_mut() = parent.map(|p| Rc::downgrade(&p.data));
    }

    fn detach_from_current_parent(&self) {
        if let Some(parent) = self.parent() {
            parent
                .data
                .children
                .borrow_mut()
                .retain(|c| c != self);
        }
        self.set_parent(None);
    }

    // =========================================================================
    // Test/introspection helpers
    // =========================================================================

    /// Element tag, container/marker debug name, or `"#text"`.
    pub fn tag(&self) -> String {
        match &self.data.kind {
            NodeKind::Element(tag) => tag.clone(),
            NodeKind::Container(name) => format!("#container:{name}"),
            NodeKind::Text => "#text".to_string(),
            NodeKind::Marker(name) => format!("#marker:{name}"),
        }
    }

    /// True for transparent container nodes.
    pub fn is_container(&self) -> bool {
        matches!(self.data.kind, NodeKind::Container(_))
    }

    /// Concatenated text of this subtree.
    pub fn text_content(&self) -> String {
        match self.data.kind {
            NodeKind::Text => self.data.text.borrow().clone(),
            _ => self
                .data
                .children
                .borrow()
                .iter()
                .map(HeadlessNode::text_content)
                .collect(),
        }
    }

    /// Direct child count.
    pub fn child_count(&self) -> usize {
        self.data.children.borrow().len()
    }

    /// Direct child by index. Panics when out of range (test helper).
    pub fn child(&self, index: usize) -> HeadlessNode {
        self.data.children.borrow()[index].clone()
    }

    /// Direct children, in order.
    pub fn children(&self) -> Vec<HeadlessNode> {
        self.data.children.borrow().clone()
    }

    /// Current value of an attribute.
    pub fn attr(&self, key: &str) -> Option<AttrValue> {
        self.data.attrs.borrow().get(key).cloned()
    }

    /// Number of `notify_update` hints this node received.
    pub fn update_count(&self) -> u64 {
        self.data.updates.get()
    }

    /// Fire an event at this node's listeners (test helper).
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
            .map(|entries| entries.iter().map(|(_, h)| h.clone()).collect())
            .unwrap_or_default();
        for handler in handlers {
            handler(&payload);
        }
    }

    /// Number of listeners registered for an event (test helper).
    pub fn listener_count(&self, event: &str) -> usize {
        self.data
            .listeners
            .borrow()
            .get(event)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl PartialEq for HeadlessNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl fmt::Debug for HeadlessNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeadlessNode")
            .field("tag", &self.tag())
            .field("children", &self.child_count())
            .finish()
    }
}

impl PlatformNode for HeadlessNode {
    fn create_element(tag: &str) -> Self {
        HeadlessNode::new(NodeKind::Element(tag.to_string()), "")
    }

    fn create_container(debug_name: &str) -> Self {
        HeadlessNode::new(NodeKind::Container(debug_name.to_string()), "")
    }

    fn create_text(text: &str) -> Self {
        HeadlessNode::new(NodeKind::Text, text)
    }

    fn create_marker(name: &str) -> Self {
        HeadlessNode::new(NodeKind::Marker(name.to_string()), "")
    }

    fn set_text(&self, text: &str) {
        *self.data.text.borrow_mut() = text.to_string();
    }

    fn set_children(&self, children: Vec<Self>) {
        let old: Vec<HeadlessNode> = self.data.children.borrow_mut().drain(..).collect();
        for child in &old {
            child.set_parent(None);
        }
        for child in &children {
            child.detach_from_current_parent();
            child.set_parent(Some(self));
        }
        *self.data.children.borrow_mut() = children;
    }

    fn append_child(&self, child: &Self) {
        child.detach_from_current_parent();
        child.set_parent(Some(self));
        self.data.children.borrow_mut().push(child.clone());
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
    }

    fn remove_child(&self, child: &Self) {
        self.data.children.borrow_mut().retain(|c| c != child);
        child.set_parent(None);
    }

    fn parent(&self) -> Option<Self> {
        self.data
            .parent
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .map(|data| HeadlessNode { data })
    }

    fn set_attribute(&self, key: &str, value: AttrValue) {
        let mut attrs = self.data.attrs.borrow_mut();
        match value {
            AttrValue::Null => {
                attrs.remove(key);
            }
            other => {
                attrs.insert(key.to_string(), other);
            }
        }
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
        self.data.updates.set(self.data.updates.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_surgery() {
        let parent = HeadlessNode::create_element("box");
        let a = HeadlessNode::create_text("a");
        let b = HeadlessNode::create_text("b");
        let c = HeadlessNode::create_text("c");

        parent.append_child(&a);
        parent.append_child(&c);
        parent.insert_before(&b, &c);
        assert_eq!(parent.text_content(), "abc");
        assert_eq!(a.parent(), Some(parent.clone()));

        parent.remove_child(&b);
        assert_eq!(parent.text_content(), "ac");
        assert!(b.parent().is_none());

        parent.set_children(vec![c.clone()]);
        assert_eq!(parent.text_content(), "c");
        assert!(a.parent().is_none());
    }

    #[test]
    fn test_reparenting_detaches_first() {
        let first = HeadlessNode::create_element("box");
        let second = HeadlessNode::create_element("box");
        let child = HeadlessNode::create_text("x");

        first.append_child(&child);
        second.append_child(&child);

        assert_eq!(first.child_count(), 0);
        assert_eq!(second.child_count(), 1);
        assert_eq!(child.parent(), Some(second));
    }

    #[test]
    fn test_attributes_and_null_clears() {
        let node = HeadlessNode::create_element("box");
        node.set_attribute("width", AttrValue::Int(10));
        assert_eq!(node.attr("width"), Some(AttrValue::Int(10)));
        node.set_attribute("width", AttrValue::Null);
        assert_eq!(node.attr("width"), None);
    }

    #[test]
    fn test_listeners_fire_and_remove() {
        use std::cell::Cell;
        let node = HeadlessNode::create_element("input");
        let hits = Rc::new(Cell::new(0));
        let hits2 = hits.clone();

        let id = node.add_listener(
            "change",
            Rc::new(move |_payload| hits2.set(hits2.get() + 1)),
        );
        node.emit("change", AttrValue::from("x"));
        assert_eq!(hits.get(), 1);

        node.remove_listener("change", id);
        node.emit("change", AttrValue::from("y"));
        assert_eq!(hits.get(), 1);
    }
}
