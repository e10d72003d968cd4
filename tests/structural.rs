//! Structural-component scenarios against the headless back-end: keyed
//! reuse, glitch-free branching, error boundaries, defer, portals and
//! two-way bindings.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glint::{
    arm, branch, catch_boundary, component, create_context, defer, each, each_or, el, on_cleanup,
    portal, provide_context, render, resource, signal, use_context, when, AttrValue, Content,
    HeadlessNode, PlatformNode, Resource,
};

#[derive(Debug, Clone, PartialEq)]
struct Todo {
    id: u32,
    label: &'static str,
}

fn todo(id: u32, label: &'static str) -> Todo {
    Todo { id, label }
}

#[test]
fn keyed_list_reuses_nodes_on_reorder() {
    let root = HeadlessNode::create_container("app");
    let items = signal(vec![todo(1, "a"), todo(2, "b"), todo(3, "c")]);
    let renders = Rc::new(Cell::new(0));
    let cleanups = Rc::new(Cell::new(0));

    let _handle = render(
        {
            let items = items.clone();
            let (renders, cleanups) = (renders.clone(), cleanups.clone());
            move || {
                each(
                    move || items.get(),
                    |item: &Todo| item.id,
                    move |entry| {
                        renders.set(renders.get() + 1);
                        let cleanups = cleanups.clone();
                        on_cleanup(move || cleanups.set(cleanups.get() + 1));
                        let entry = entry.clone();
                        Content::dynamic_text(move || {
                            format!("{}{}", entry.index.get(), entry.item.get().label)
                        })
                    },
                )
            }
        },
        &root,
    );

    let container = root.child(0);
    assert_eq!(root.text_content(), "0a1b2c");
    assert_eq!(renders.get(), 3);

    let nodes_before = container.children();
    items.set(vec![todo(2, "b"), todo(3, "c"), todo(1, "a")]);

    // Reorder: no creations, no disposals, same nodes in the new order,
    // and every index signal reflects the new position.
    assert_eq!(renders.get(), 3, "reorder must not re-render entries");
    assert_eq!(cleanups.get(), 0, "reorder must not dispose entries");
    assert_eq!(root.text_content(), "0b1c2a");

    let nodes_after = container.children();
    assert_eq!(nodes_after.len(), 3);
    assert_eq!(nodes_after[0], nodes_before[1], "b's node moved to front");
    assert_eq!(nodes_after[2], nodes_before[0], "a's node moved to back");
}

#[test]
fn keyed_list_disposes_removed_entries() {
    let root = HeadlessNode::create_container("app");
    let items = signal(vec![todo(1, "a"), todo(2, "b"), todo(3, "c")]);
    let cleanups = Rc::new(Cell::new(0));

    let _handle = render(
        {
            let items = items.clone();
            let cleanups = cleanups.clone();
            move || {
                each(
                    move || items.get(),
                    |item: &Todo| item.id,
                    move |entry| {
                        let cleanups = cleanups.clone();
                        on_cleanup(move || cleanups.set(cleanups.get() + 1));
                        let entry = entry.clone();
                        Content::dynamic_text(move || entry.item.get().label.to_string())
                    },
                )
            }
        },
        &root,
    );

    items.set(vec![todo(2, "b")]);
    assert_eq!(cleanups.get(), 2, "removed entries dispose exactly once");
    assert_eq!(root.text_content(), "b");

    items.set(vec![]);
    assert_eq!(cleanups.get(), 3);
    assert_eq!(root.text_content(), "");
}

#[test]
fn keyed_list_empty_fallback() {
    let root = HeadlessNode::create_container("app");
    let items = signal(vec![todo(1, "a")]);

    let _handle = render(
        {
            let items = items.clone();
            move || {
                each_or(
                    move || items.get(),
                    |item: &Todo| item.id,
                    |entry| {
                        let entry = entry.clone();
                        Content::dynamic_text(move || entry.item.get().label.to_string())
                    },
                    || Content::text("nothing here"),
                )
            }
        },
        &root,
    );

    assert_eq!(root.text_content(), "a");
    items.set(vec![]);
    assert_eq!(root.text_content(), "nothing here");
    items.set(vec![todo(2, "b")]);
    assert_eq!(root.text_content(), "b");
}

#[test]
fn when_does_not_reconstruct_active_branch() {
    let root = HeadlessNode::create_container("app");
    let visible = signal(true);
    let builds = Rc::new(Cell::new(0));

    let _handle = render(
        {
            let visible = visible.clone();
            let builds = builds.clone();
            move || {
                when(
                    move || visible.get(),
                    move || {
                        builds.set(builds.get() + 1);
                        Content::text("shown")
                    },
                )
            }
        },
        &root,
    );

    assert_eq!(root.text_content(), "shown");
    assert_eq!(builds.get(), 1);

    visible.set(true);
    assert_eq!(builds.get(), 1, "same resolved boolean must not rebuild");

    visible.set(false);
    assert_eq!(root.text_content(), "");

    visible.set(true);
    assert_eq!(builds.get(), 2, "a real transition rebuilds");
}

#[test]
fn branch_switch_is_glitch_free() {
    let root = HeadlessNode::create_container("app");
    let phase = signal("a");

    // Track which arms are mounted at any instant.
    let mounted: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));
    let max_concurrent = Rc::new(Cell::new(0_usize));
    let a_disposals = Rc::new(Cell::new(0));
    let b_mounts = Rc::new(Cell::new(0));

    let track_mount = {
        let (mounted, max_concurrent) = (mounted.clone(), max_concurrent.clone());
        move |name: &'static str| {
            mounted.borrow_mut().push(name);
            max_concurrent.set(max_concurrent.get().max(mounted.borrow().len()));
        }
    };
    let track_unmount = {
        let mounted = mounted.clone();
        move |name: &'static str| {
            mounted.borrow_mut().retain(|entry| *entry != name);
        }
    };

    let _handle = render(
        {
            let phase = phase.clone();
            let (track_mount, track_unmount) = (track_mount.clone(), track_unmount.clone());
            let (a_disposals, b_mounts) = (a_disposals.clone(), b_mounts.clone());
            move || {
                let phase_a = phase.clone();
                let phase_b = phase.clone();
                let mount_a = track_mount.clone();
                let mount_b = track_mount.clone();
                let unmount_a = track_unmount.clone();
                let unmount_b = track_unmount.clone();
                let a_disposals = a_disposals.clone();
                let b_mounts = b_mounts.clone();
                branch(vec![
                    arm(
                        move || phase_a.get() == "a",
                        move || {
                            mount_a("a");
                            let unmount_a = unmount_a.clone();
                            let a_disposals = a_disposals.clone();
                            on_cleanup(move || {
                                unmount_a("a");
                                a_disposals.set(a_disposals.get() + 1);
                            });
                            Content::text("arm a")
                        },
                    ),
                    arm(
                        move || phase_b.get() == "b",
                        move || {
                            mount_b("b");
                            b_mounts.set(b_mounts.get() + 1);
                            let unmount_b = unmount_b.clone();
                            on_cleanup(move || unmount_b("b"));
                            Content::text("arm b")
                        },
                    ),
                ])
            }
        },
        &root,
    );

    assert_eq!(root.text_content(), "arm a");

    phase.set("b");
    assert_eq!(root.text_content(), "arm b");
    assert_eq!(a_disposals.get(), 1, "arm a disposed exactly once");
    assert_eq!(b_mounts.get(), 1, "arm b mounted exactly once");
    assert_eq!(
        max_concurrent.get(),
        1,
        "both arms must never be mounted at the same time"
    );
}

#[test]
fn branch_fallback_when_no_arm_matches() {
    let root = HeadlessNode::create_container("app");
    let phase = signal("x");

    let _handle = render(
        {
            let phase = phase.clone();
            move || {
                let phase_a = phase.clone();
                glint::branch_or(
                    vec![arm(move || phase_a.get() == "a", || Content::text("a"))],
                    || Content::text("none"),
                )
            }
        },
        &root,
    );

    assert_eq!(root.text_content(), "none");
    phase.set("a");
    assert_eq!(root.text_content(), "a");
}

#[test]
fn catch_boundary_traps_effect_panic_and_resets() {
    let root = HeadlessNode::create_container("app");
    let explode = signal(false);

    let reset_handle: Rc<RefCell<Option<glint::ResetFn>>> = Rc::new(RefCell::new(None));

    let _handle = render(
        {
            let explode = explode.clone();
            let reset_handle = reset_handle.clone();
            move || {
                let explode = explode.clone();
                let reset_handle = reset_handle.clone();
                catch_boundary(
                    move || {
                        let explode = explode.clone();
                        let probe = explode.clone();
                        glint::effect(move || {
                            if probe.get() {
                                panic!("subtree failure");
                            }
                        });
                        Content::text("healthy")
                    },
                    move |error, reset| {
                        *reset_handle.borrow_mut() = Some(reset);
                        Content::text(format!("error: {}", error.message))
                    },
                )
            }
        },
        &root,
    );

    assert_eq!(root.text_content(), "healthy");

    explode.set(true);
    assert_eq!(root.text_content(), "error: subtree failure");

    // Reset reinstalls the protected subtree under a fresh owner. The
    // trigger is back to false first, so it mounts cleanly.
    explode.set(false);
    let reset = reset_handle.borrow_mut().take().expect("handler captured reset");
    reset();
    assert_eq!(root.text_content(), "healthy");
}

#[test]
fn defer_shows_fallback_until_work_settles() {
    let root = HeadlessNode::create_container("app");
    let pending: Rc<RefCell<Option<Resource<i32, String>>>> = Rc::new(RefCell::new(None));

    let _handle = render(
        {
            let pending = pending.clone();
            move || {
                let pending = pending.clone();
                defer(
                    move || {
                        let res: Resource<i32, String> = resource();
                        *pending.borrow_mut() = Some(res.clone());
                        let state = res.signal();
                        Content::dynamic_text(move || format!("data: {:?}", state.get()))
                    },
                    || Content::text("loading..."),
                )
            }
        },
        &root,
    );

    assert_eq!(root.text_content(), "loading...");

    let res = pending.borrow().clone().expect("resource created");
    res.resolve(42);
    assert!(
        root.text_content().starts_with("data:"),
        "child becomes visible once pending work settles"
    );
}

#[test]
fn portal_renders_into_target_and_cleans_up() {
    let root = HeadlessNode::create_container("app");
    let overlay = HeadlessNode::create_container("overlay");

    let handle = render(
        {
            let overlay = overlay.clone();
            move || portal(&overlay, || Content::text("popup"))
        },
        &root,
    );

    assert_eq!(overlay.text_content(), "popup");
    assert_eq!(root.text_content(), "", "only the marker stays in-tree");

    handle.dispose();
    assert_eq!(
        overlay.text_content(),
        "",
        "disposal removes projected nodes"
    );
}

#[test]
fn two_way_binding_round_trips() {
    let root = HeadlessNode::create_container("app");
    let value = signal(String::from("start"));

    let _handle = render(
        {
            let value = value.clone();
            move || el("input").bind_value(value).build()
        },
        &root,
    );

    let input = root.child(0);
    assert_eq!(input.attr("value"), Some(AttrValue::from("start")));

    // Signal -> element.
    value.set("typed".to_string());
    assert_eq!(input.attr("value"), Some(AttrValue::from("typed")));

    // Element -> signal.
    input.emit("change", AttrValue::from("edited"));
    assert_eq!(value.get(), "edited");
    assert_eq!(input.attr("value"), Some(AttrValue::from("edited")));
}

#[test]
fn listeners_removed_on_unmount() {
    let root = HeadlessNode::create_container("app");
    let hits = Rc::new(Cell::new(0));

    let handle = render(
        {
            let hits = hits.clone();
            move || {
                let hits = hits.clone();
                el("button")
                    .on("press", move |_| hits.set(hits.get() + 1))
                    .build()
            }
        },
        &root,
    );

    let button = root.child(0);
    button.emit("press", AttrValue::Null);
    assert_eq!(hits.get(), 1);
    assert_eq!(button.listener_count("press"), 1);

    handle.dispose();
    assert_eq!(button.listener_count("press"), 0);
    button.emit("press", AttrValue::Null);
    assert_eq!(hits.get(), 1);
}

#[test]
fn context_flows_through_descriptors() {
    let root = HeadlessNode::create_container("app");
    let theme = create_context(String::from("plain"));

    let _handle = render(
        {
            let theme = theme.clone();
            move || {
                let inner_theme = theme.clone();
                provide_context(&theme, String::from("fancy"), move || {
                    // The component executes at append time, under the
                    // provider's owner subtree.
                    component("Badge", move || {
                        let value = use_context(&inner_theme)
                            .map(|v| (*v).clone())
                            .unwrap_or_default();
                        Content::text(value)
                    })
                })
            }
        },
        &root,
    );

    assert_eq!(root.text_content(), "fancy");
}

#[test]
fn reactive_attribute_updates_only_that_attribute() {
    let root = HeadlessNode::create_container("app");
    let width = signal(10_i64);

    let _handle = render(
        {
            let width = width.clone();
            move || {
                let width = width.clone();
                el("box")
                    .attr("title", "fixed")
                    .attr_reactive("width", move || AttrValue::Int(width.get()))
                    .build()
            }
        },
        &root,
    );

    let node = root.child(0);
    assert_eq!(node.attr("width"), Some(AttrValue::Int(10)));

    width.set(25);
    assert_eq!(node.attr("width"), Some(AttrValue::Int(25)));
    assert_eq!(node.attr("title"), Some(AttrValue::from("fixed")));
}
