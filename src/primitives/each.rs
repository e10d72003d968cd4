//! Keyed list rendering.
//!
//! One scope per key. When the list changes, entries whose key survives
//! keep their nodes and receive the new item/index through their signals;
//! entries whose key vanished are disposed; new keys render under fresh
//! child scopes. The container's children are then re-set in list order,
//! so a pure reorder is a single `set_children` with zero creations and
//! zero disposals.

use std::cell::RefCell;
use std::fmt;
use std::hash::Hash;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::render::{realize, Content, PlatformNode};
use crate::signals::{create_scope, effect, signal, untrack, Owner, Signal};

/// Per-item handle passed to the render function.
///
/// Both fields are signals: content reading them follows item mutations
/// and reorders without the item's nodes being rebuilt.
pub struct EachEntry<T: 'static> {
    /// The item value for this key.
    pub item: Signal<T>,
    /// The item's current position in the list.
    pub index: Signal<usize>,
}

impl<T: 'static> Clone for EachEntry<T> {
    fn clone(&self) -> Self {
        Self {
            item: self.item.clone(),
            index: self.index.clone(),
        }
    }
}

struct KeyedState<N: PlatformNode, T: 'static> {
    nodes: Vec<N>,
    entry: EachEntry<T>,
    scope: Owner,
}

/// Render a keyed list into a container.
pub fn each<N, T, K>(
    items: impl Fn() -> Vec<T> + 'static,
    key_fn: impl Fn(&T) -> K + 'static,
    render_fn: impl Fn(&EachEntry<T>) -> Content<N> + 'static,
) -> Content<N>
where
    N: PlatformNode,
    T: Clone + PartialEq + 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    each_impl(items, key_fn, render_fn, None)
}

/// Like [`each`], with a fallback shown while the list is empty.
pub fn each_or<N, T, K>(
    items: impl Fn() -> Vec<T> + 'static,
    key_fn: impl Fn(&T) -> K + 'static,
    render_fn: impl Fn(&EachEntry<T>) -> Content<N> + 'static,
    fallback: impl Fn() -> Content<N> + 'static,
) -> Content<N>
where
    N: PlatformNode,
    T: Clone + PartialEq + 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    each_impl(items, key_fn, render_fn, Some(Rc::new(fallback)))
}

fn each_impl<N, T, K>(
    items: impl Fn() -> Vec<T> + 'static,
    key_fn: impl Fn(&T) -> K + 'static,
    render_fn: impl Fn(&EachEntry<T>) -> Content<N> + 'static,
    fallback: Option<Rc<dyn Fn() -> Content<N>>>,
) -> Content<N>
where
    N: PlatformNode,
    T: Clone + PartialEq + 'static,
    K: Eq + Hash + Clone + fmt::Debug + 'static,
{
    let container = N::create_container("each");
    let target = container.clone();

    let state: Rc<RefCell<FxHashMap<K, KeyedState<N, T>>>> =
        Rc::new(RefCell::new(FxHashMap::default()));
    let empty_state: Rc<RefCell<Option<(Vec<N>, Owner)>>> = Rc::new(RefCell::new(None));

    effect(move || {
        let list = items();
        untrack(|| {
            let mut map = state.borrow_mut();

            if list.is_empty() {
                let drained: Vec<KeyedState<N, T>> =
                    map.drain().map(|(_, entry)| entry).collect();
                for entry in drained {
                    entry.scope.dispose();
                }
                let children = match &fallback {
                    Some(fallback) => {
                        let mut cached = empty_state.borrow_mut();
                        if cached.is_none() {
                            let fallback = fallback.clone();
                            let (nodes, scope) = create_scope(move || realize(fallback()));
                            *cached = Some((nodes, scope));
                        }
                        cached
                            .as_ref()
                            .map(|(nodes, _)| nodes.clone())
                            .unwrap_or_default()
                    }
                    None => Vec::new(),
                };
                target.set_children(children);
                target.notify_update();
                return;
            }

            if let Some((_, scope)) = empty_state.borrow_mut().take() {
                scope.dispose();
            }

            let mut seen: FxHashSet<K> = FxHashSet::default();
            let mut order: Vec<K> = Vec::with_capacity(list.len());

            for (index, item) in list.iter().enumerate() {
                let key = key_fn(item);
                if !seen.insert(key.clone()) {
                    log::warn!("duplicate key {key:?} in each(); entry skipped");
                    continue;
                }
                order.push(key.clone());

                if let Some(existing) = map.get(&key) {
                    // Reuse: the nodes stay; the signals carry the change.
                    existing.entry.item.set(item.clone());
                    existing.entry.index.set(index);
                } else {
                    let entry = EachEntry {
                        item: signal(item.clone()),
                        index: signal(index),
                    };
                    let handle = entry.clone();
                    let render = &render_fn;
                    let (nodes, scope) = create_scope(move || realize(render(&handle)));
                    map.insert(key.clone(), KeyedState { nodes, entry, scope });
                }
            }

            let stale: Vec<K> = map
                .keys()
                .filter(|key| !seen.contains(*key))
                .cloned()
                .collect();
            for key in stale {
                if let Some(entry) = map.remove(&key) {
                    entry.scope.dispose();
                }
            }

            let children: Vec<N> = order
                .iter()
                .flat_map(|key| {
                    map.get(key)
                        .map(|entry| entry.nodes.clone())
                        .unwrap_or_default()
                })
                .collect();
            target.set_children(children);
            target.notify_update();
        });
    });

    Content::Node(container)
}
