//! Content - everything that can be appended to a node.
//!
//! The renderer is fine-grained: reactive children are wrapped in effects
//! at the narrowest possible point. A signal child becomes a single text
//! node with an effect writing into it; a thunk child becomes a
//! transparent container whose children are swapped by an effect. Static
//! children are appended once and never revisited.

use std::fmt;
use std::rc::Rc;

use crate::signals::{Derived, Signal};

use super::element::Descriptor;
use super::platform::PlatformNode;

/// A child of a node: the universe of appendable values.
pub enum Content<N: PlatformNode> {
    /// Nothing (the `null`/`None` child).
    Empty,
    /// Static text; becomes a text node.
    Text(String),
    /// An already-created platform node.
    Node(N),
    /// A list; appended element by element.
    Many(Vec<Content<N>>),
    /// A deferred component invocation, executed at append time.
    Component(Descriptor<N>),
    /// A reactive text binding: a tracked closure whose string output is
    /// written into a dedicated text node on every change.
    CellText(Rc<dyn Fn() -> String>),
    /// A reactive fragment: a tracked closure re-evaluated into a
    /// container, short-circuiting when it yields identical nodes.
    Fragment(Rc<dyn Fn() -> Content<N>>),
}

impl<N: PlatformNode> Content<N> {
    /// Wrap an existing platform node.
    pub fn node(node: N) -> Self {
        Content::Node(node)
    }

    /// Static text.
    pub fn text(text: impl Into<String>) -> Self {
        Content::Text(text.into())
    }

    /// A reactive fragment from a thunk. The thunk is re-evaluated
    /// whenever a cell it reads changes.
    pub fn dynamic(thunk: impl Fn() -> Content<N> + 'static) -> Self {
        Content::Fragment(Rc::new(thunk))
    }

    /// A reactive text binding from a tracked closure.
    pub fn dynamic_text(read: impl Fn() -> String + 'static) -> Self {
        Content::CellText(Rc::new(read))
    }
}

impl<N: PlatformNode> fmt::Debug for Content<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Content::Empty => write!(f, "Content::Empty"),
            Content::Text(s) => f.debug_tuple("Content::Text").field(s).finish(),
            Content::Node(n) => f.debug_tuple("Content::Node").field(n).finish(),
            Content::Many(items) => f.debug_tuple("Content::Many").field(&items.len()).finish(),
            Content::Component(d) => f.debug_tuple("Content::Component").field(&d.name()).finish(),
            Content::CellText(_) => write!(f, "Content::CellText(..)"),
            Content::Fragment(_) => write!(f, "Content::Fragment(..)"),
        }
    }
}

impl<N: PlatformNode> From<&str> for Content<N> {
    fn from(value: &str) -> Self {
        Content::Text(value.to_string())
    }
}

impl<N: PlatformNode> From<String> for Content<N> {
    fn from(value: String) -> Self {
        Content::Text(value)
    }
}

macro_rules! content_from_display {
    ($($ty:ty),*) => {
        $(
            impl<N: PlatformNode> From<$ty> for Content<N> {
                fn from(value: $ty) -> Self {
                    Content::Text(value.to_string())
                }
            }
        )*
    };
}

content_from_display!(i32, i64, u32, u64, usize, f32, f64, char);

impl<N: PlatformNode, C: Into<Content<N>>> From<Option<C>> for Content<N> {
    fn from(value: Option<C>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Content::Empty,
        }
    }
}

impl<N: PlatformNode> From<Vec<Content<N>>> for Content<N> {
    fn from(value: Vec<Content<N>>) -> Self {
        Content::Many(value)
    }
}

impl<N, T> From<Signal<T>> for Content<N>
where
    N: PlatformNode,
    T: fmt::Display + Clone + 'static,
{
    /// A signal child installs a reactive text binding.
    fn from(signal: Signal<T>) -> Self {
        Content::CellText(Rc::new(move || signal.with(|v| v.to_string())))
    }
}

impl<N, T> From<Derived<T>> for Content<N>
where
    N: PlatformNode,
    T: fmt::Display + Clone + 'static,
{
    /// A derived child installs a reactive text binding.
    fn from(derived: Derived<T>) -> Self {
        Content::CellText(Rc::new(move || derived.with(|v| v.to_string())))
    }
}
