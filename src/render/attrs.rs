//! Attribute binding application.
//!
//! Each binding touches exactly one attribute of one node; reactive
//! bindings wrap that single mutation in an effect, so a change to one
//! cell re-applies one attribute and nothing else.
//!
//! Key dispatch rules:
//! - Keys with the event prefix (`on*`) register listeners, removed via a
//!   cleanup when the installing scope is disposed.
//! - `style` accepts a verbatim string, a property map (merged entry by
//!   entry), or a reactive closure producing a map.
//! - `ref` hands the created node to a callback.
//! - Two-way bindings write the signal into the node's value and read
//!   `change` events back into the signal.

use std::rc::Rc;

use crate::signals::{effect, on_cleanup, Signal};

use super::platform::{AttrValue, EventHandler, PlatformNode};

/// Attribute keys beginning with this prefix register event listeners.
pub(crate) const EVENT_PREFIX: &str = "on";

/// A value bound to an attribute key.
pub enum AttrBinding<N: PlatformNode> {
    /// Applied once at element creation.
    Static(AttrValue),
    /// Tracked closure; re-applied on every change.
    Reactive(Rc<dyn Fn() -> AttrValue>),
    /// Style forms (string / map / reactive map).
    Style(StyleBinding),
    /// Event listener.
    Handler(EventHandler),
    /// Node reference callback.
    NodeRef(Rc<dyn Fn(&N)>),
    /// Two-way value binding.
    TwoWay(Signal<String>),
}

/// The accepted shapes of a style binding.
pub enum StyleBinding {
    /// Verbatim style string, stored under the `style` attribute.
    Text(String),
    /// Property map merged into the element attribute by attribute.
    Map(Vec<(String, AttrValue)>),
    /// Reactive property map.
    Reactive(Rc<dyn Fn() -> Vec<(String, AttrValue)>>),
}

/// Apply one binding to one node.
pub(crate) fn apply_attribute<N: PlatformNode>(node: &N, key: &str, binding: AttrBinding<N>) {
    match binding {
        AttrBinding::Static(value) => {
            node.set_attribute(key, value);
        }
        AttrBinding::Reactive(read) => {
            let node = node.clone();
            let key = key.to_string();
            effect(move || {
                node.set_attribute(&key, read());
                node.notify_update();
            });
        }
        AttrBinding::Style(style) => apply_style(node, style),
        AttrBinding::Handler(handler) => {
            let event = key.strip_prefix(EVENT_PREFIX).unwrap_or(key).to_string();
            let id = node.add_listener(&event, handler);
            let node = node.clone();
            on_cleanup(move || node.remove_listener(&event, id));
        }
        AttrBinding::NodeRef(callback) => callback(node),
        AttrBinding::TwoWay(value) => bind_value(node, value),
    }
}

fn apply_style<N: PlatformNode>(node: &N, style: StyleBinding) {
    match style {
        StyleBinding::Text(text) => {
            node.set_attribute("style", AttrValue::Text(text));
        }
        StyleBinding::Map(entries) => {
            for (prop, value) in entries {
                node.set_attribute(&prop, value);
            }
        }
        StyleBinding::Reactive(read) => {
            let node = node.clone();
            effect(move || {
                for (prop, value) in read() {
                    node.set_attribute(&prop, value);
                }
                node.notify_update();
            });
        }
    }
}

/// Install a two-way value binding: an effect writes the signal into the
/// node, a `change` listener writes the node's value back.
fn bind_value<N: PlatformNode>(node: &N, value: Signal<String>) {
    let writer = node.clone();
    let source = value.clone();
    effect(move || {
        writer.set_attribute("value", AttrValue::Text(source.get()));
        writer.notify_update();
    });

    let sink = value.clone();
    let id = node.add_listener(
        "change",
        Rc::new(move |payload: &super::platform::EventPayload| {
            if let Some(text) = payload.value.as_text() {
                sink.set(text.to_string());
            }
        }),
    );
    let node = node.clone();
    on_cleanup(move || node.remove_listener("change", id));
}
