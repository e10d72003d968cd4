//! Minimal interactive demo: a bordered counter with a keyed task list.
//!
//! Keys: `+`/`-` change the counter, `t` toggles the hint, `q`/Esc quits.

use glint::prelude::*;

fn app() -> Content<TermNode> {
    let count = glint::signal(0_i32);
    let show_hint = glint::signal(true);

    let tasks = glint::signal(vec![
        (1_u32, "wire the pipeline"),
        (2, "diff the frames"),
        (3, "ship it"),
    ]);

    let on_key = {
        let count = count.clone();
        let show_hint = show_hint.clone();
        move |payload: &EventPayload| match payload.value.as_text() {
            Some("+") => count.update(|c| c + 1),
            Some("-") => count.update(|c| c - 1),
            Some("t") => show_hint.update(|v| !v),
            _ => {}
        }
    };

    let counter_label = {
        let count = count.clone();
        Content::dynamic_text(move || format!("count: {}", count.get()))
    };

    let hint = when(
        move || show_hint.get(),
        || {
            el("text")
                .attr("dim", true)
                .child("press + / - to count, t to toggle this hint, q to quit")
                .build()
        },
    );

    let list = each(
        move || tasks.get(),
        |task: &(u32, &'static str)| task.0,
        |entry| {
            let entry = entry.clone();
            el("text")
                .child(Content::dynamic_text(move || {
                    format!("{}. {}", entry.index.get() + 1, entry.item.get().1)
                }))
                .build()
        },
    );

    el("box")
        .attr("border", "rounded")
        .attr("padding", 1)
        .attr("gap", 1)
        .on("key", on_key)
        .child(el("text").attr("bold", true).child(counter_label).build())
        .child(hint)
        .child(list)
        .build()
}

fn main() -> Result<(), RenderError> {
    glint::render_terminal(|| component("App", app), TerminalOptions::default())
}
