//! Platform abstraction - the contract between the renderer core and a
//! back-end.
//!
//! A back-end supplies one node type implementing [`PlatformNode`]. Nodes
//! are cheaply cloneable handles with reference identity (`PartialEq`
//! compares identity, not structure); the renderer holds and compares
//! them freely.
//!
//! Containers are transparent: structural components render into a
//! container node and replace its children on update, never the container
//! itself. Back-ends that cannot host a transparent parent natively are
//! expected to flatten containers during layout (the terminal back-end
//! does exactly that).

use std::rc::Rc;

/// Attribute/property value applied to a platform node.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Remove/clear the attribute.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl AttrValue {
    /// Borrow the textual form, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Coerce to the string form used for text nodes and debugging.
    pub fn coerce_text(&self) -> String {
        match self {
            AttrValue::Null => String::new(),
            AttrValue::Bool(b) => b.to_string(),
            AttrValue::Int(i) => i.to_string(),
            AttrValue::Float(f) => f.to_string(),
            AttrValue::Text(s) => s.clone(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttrValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(i) => Some(*i),
            AttrValue::Float(f) => Some(*f as i64),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttrValue::Float(f) => Some(*f),
            AttrValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        AttrValue::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        AttrValue::Text(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        AttrValue::Bool(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        AttrValue::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<u16> for AttrValue {
    fn from(value: u16) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<usize> for AttrValue {
    fn from(value: usize) -> Self {
        AttrValue::Int(value as i64)
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        AttrValue::Float(value)
    }
}

impl From<f32> for AttrValue {
    fn from(value: f32) -> Self {
        AttrValue::Float(value as f64)
    }
}

/// Payload delivered to event listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct EventPayload {
    /// Event name (without the attribute prefix), e.g. `"change"`.
    pub name: String,
    /// Event value, e.g. the new text of an input.
    pub value: AttrValue,
}

/// Event listener callback.
pub type EventHandler = Rc<dyn Fn(&EventPayload)>;

/// A rendering back-end node.
///
/// Creation functions are associated (a back-end owns whatever shared
/// state it needs, the way a DOM back-end owns the document); mutation is
/// by method on the node handle.
pub trait PlatformNode: Clone + PartialEq + std::fmt::Debug + 'static {
    /// Create an intrinsic element node for `tag`.
    fn create_element(tag: &str) -> Self;

    /// Create a transparent container node. `debug_name` identifies the
    /// structural component that owns it.
    fn create_container(debug_name: &str) -> Self;

    /// Create a text leaf node.
    fn create_text(text: &str) -> Self;

    /// Create a position marker node.
    fn create_marker(name: &str) -> Self;

    /// Replace the text of a text node.
    fn set_text(&self, text: &str);

    /// Replace this node's children atomically, in order.
    fn set_children(&self, children: Vec<Self>);

    /// Append `child` at the end of this node's children.
    fn append_child(&self, child: &Self);

    /// Insert `child` before `reference` among this node's children.
    fn insert_before(&self, child: &Self, reference: &Self);

    /// Detach `child` from this node.
    fn remove_child(&self, child: &Self);

    /// The parent node, if attached.
    fn parent(&self) -> Option<Self>;

    /// Apply an attribute or property.
    fn set_attribute(&self, key: &str, value: AttrValue);

    /// Register an event listener; returns an id for removal.
    fn add_listener(&self, event: &str, handler: EventHandler) -> usize;

    /// Remove a previously registered listener.
    fn remove_listener(&self, event: &str, id: usize);

    /// Opaque "this node changed" hint; back-ends use it to wake their
    /// output pipeline.
    fn notify_update(&self);
}
