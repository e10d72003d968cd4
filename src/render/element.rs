//! Intrinsic elements and component descriptors.
//!
//! User components never execute at construction time. Building a view
//! produces a [`Descriptor`] wrapping the pending invocation; the parent
//! resolves it at append time under a freshly created child owner. That
//! ordering is what makes context propagation work: by the time the
//! component body runs, every ancestor provider is already bound on the
//! owner chain.
//!
//! Intrinsic elements are built through [`ElementBuilder`]: attributes
//! collect as typed bindings and are applied (installing per-attribute
//! effects where reactive) when the node is created.

use std::cell::RefCell;
use std::rc::Rc;

use crate::signals::{create_scope, Signal};

use super::attrs::{self, AttrBinding, StyleBinding};
use super::content::Content;
use super::insert;
use super::platform::{AttrValue, EventHandler, EventPayload, PlatformNode};

// =============================================================================
// Descriptors
// =============================================================================

/// A deferred component invocation.
///
/// Single-use: the first [`execute`] consumes the factory; a second
/// attempt warns and yields nothing.
pub struct Descriptor<N: PlatformNode> {
    name: &'static str,
    factory: Rc<RefCell<Option<Box<dyn FnOnce() -> Content<N>>>>>,
}

impl<N: PlatformNode> Clone for Descriptor<N> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            factory: self.factory.clone(),
        }
    }
}

impl<N: PlatformNode> Descriptor<N> {
    /// Debug name of the component.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Wrap a component invocation. `body` captures its props; it runs only
/// when the result is appended somewhere, under a fresh child owner.
pub fn component<N, C, F>(name: &'static str, body: F) -> Content<N>
where
    N: PlatformNode,
    C: Into<Content<N>>,
    F: FnOnce() -> C + 'static,
{
    Content::Component(Descriptor {
        name,
        factory: Rc::new(RefCell::new(Some(Box::new(move || body().into())))),
    })
}

/// Execute a descriptor under a fresh child owner, resolving nested
/// descriptors transitively.
pub(crate) fn execute<N: PlatformNode>(descriptor: &Descriptor<N>) -> Content<N> {
    let factory = descriptor.factory.borrow_mut().take();
    let Some(factory) = factory else {
        log::warn!(
            "component `{}` executed twice; descriptors are single-use",
            descriptor.name
        );
        return Content::Empty;
    };
    let (content, _owner) = create_scope(factory);
    match content {
        Content::Component(inner) => execute(&inner),
        other => other,
    }
}

// =============================================================================
// Element builder
// =============================================================================

/// Builder for an intrinsic element node.
pub struct ElementBuilder<N: PlatformNode> {
    tag: String,
    attrs: Vec<(String, AttrBinding<N>)>,
    children: Vec<Content<N>>,
}

/// Start building an intrinsic element.
pub fn el<N: PlatformNode>(tag: impl Into<String>) -> ElementBuilder<N> {
    ElementBuilder {
        tag: tag.into(),
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

impl<N: PlatformNode> ElementBuilder<N> {
    /// Set a static attribute.
    pub fn attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs
            .push((key.into(), AttrBinding::Static(value.into())));
        self
    }

    /// Set a reactive attribute: the closure is tracked and the attribute
    /// re-applied whenever a cell it reads changes.
    pub fn attr_reactive(
        mut self,
        key: impl Into<String>,
        read: impl Fn() -> AttrValue + 'static,
    ) -> Self {
        self.attrs
            .push((key.into(), AttrBinding::Reactive(Rc::new(read))));
        self
    }

    /// Bind an attribute to a signal.
    pub fn attr_signal<T>(self, key: impl Into<String>, signal: Signal<T>) -> Self
    where
        T: Clone + Into<AttrValue> + 'static,
    {
        self.attr_reactive(key, move || signal.get().into())
    }

    /// Set the class attribute.
    pub fn class(self, value: impl Into<AttrValue>) -> Self {
        self.attr("class", value)
    }

    /// Set the style string verbatim.
    pub fn style(mut self, style: impl Into<String>) -> Self {
        self.attrs.push((
            "style".to_string(),
            AttrBinding::Style(StyleBinding::Text(style.into())),
        ));
        self
    }

    /// Merge style properties into the element.
    pub fn style_map(mut self, entries: Vec<(String, AttrValue)>) -> Self {
        self.attrs.push((
            "style".to_string(),
            AttrBinding::Style(StyleBinding::Map(entries)),
        ));
        self
    }

    /// Reactive style: the closure re-runs and re-merges on change.
    pub fn style_reactive(
        mut self,
        read: impl Fn() -> Vec<(String, AttrValue)> + 'static,
    ) -> Self {
        self.attrs.push((
            "style".to_string(),
            AttrBinding::Style(StyleBinding::Reactive(Rc::new(read))),
        ));
        self
    }

    /// Register an event listener; removed automatically when the current
    /// scope is disposed.
    pub fn on(mut self, event: impl Into<String>, handler: impl Fn(&EventPayload) + 'static) -> Self {
        let key = format!("{}{}", attrs::EVENT_PREFIX, event.into());
        self.attrs
            .push((key, AttrBinding::Handler(Rc::new(handler) as EventHandler)));
        self
    }

    /// Receive the created node.
    pub fn node_ref(mut self, callback: impl Fn(&N) + 'static) -> Self {
        self.attrs
            .push(("ref".to_string(), AttrBinding::NodeRef(Rc::new(callback))));
        self
    }

    /// Two-way value binding: writes the signal into the element's value
    /// and feeds `change` events back into the signal.
    pub fn bind_value(mut self, value: Signal<String>) -> Self {
        self.attrs
            .push(("value".to_string(), AttrBinding::TwoWay(value)));
        self
    }

    /// Append a child.
    pub fn child(mut self, child: impl Into<Content<N>>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn children(mut self, children: Vec<Content<N>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Create the node, apply all attribute bindings, append all children.
    pub fn finish(self) -> N {
        let node = N::create_element(&self.tag);
        for (key, binding) in self.attrs {
            attrs::apply_attribute(&node, &key, binding);
        }
        for child in self.children {
            insert::append(&node, child);
        }
        node
    }

    /// Like [`finish`](Self::finish), wrapped as content.
    pub fn build(self) -> Content<N> {
        Content::Node(self.finish())
    }
}
