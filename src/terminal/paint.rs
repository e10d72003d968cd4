//! Painter - laid-out tree to frame buffer.
//!
//! Walks the layout tree in paint order (parents first), filling
//! backgrounds, drawing borders and writing text runs. Text inherits
//! color and attributes from the nearest element ancestor; elements with
//! terminal-default colors leave whatever is already painted beneath
//! them.

use super::buffer::FrameBuffer;
use super::layout::{wrap_text, LayoutTree};
use super::style::{BorderKind, Rgba, TextAttr};

#[derive(Clone, Copy)]
struct Inherited {
    fg: Rgba,
    bg: Rgba,
    attrs: TextAttr,
    wrap: bool,
}

impl Default for Inherited {
    fn default() -> Self {
        Self {
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: TextAttr::NONE,
            wrap: false,
        }
    }
}

/// Paint the laid-out tree into a fresh buffer.
pub(crate) fn paint(tree: &LayoutTree, width: u16, height: u16) -> FrameBuffer {
    let mut buffer = FrameBuffer::new(width, height);
    for child in &tree.children {
        paint_node(&mut buffer, child, Inherited::default());
    }
    buffer
}

fn paint_node(buffer: &mut FrameBuffer, tree: &LayoutTree, inherited: Inherited) {
    let rect = tree.rect;
    if rect.width == 0 || rect.height == 0 {
        return;
    }

    if tree.node.is_text() {
        let text = tree.node.text();
        let lines: Vec<String> = if inherited.wrap {
            wrap_text(&text, rect.width)
        } else {
            text.lines().map(str::to_string).collect()
        };
        for (offset, line) in lines.iter().enumerate().take(rect.height as usize) {
            buffer.draw_text(
                rect.x,
                rect.y + offset as u16,
                line,
                inherited.fg,
                Rgba::TERMINAL_DEFAULT,
                inherited.attrs,
                rect.x.saturating_add(rect.width),
            );
        }
        return;
    }

    let style = tree.node.style();
    let fg = if style.fg.is_terminal_default() {
        inherited.fg
    } else {
        style.fg
    };
    let bg = if style.bg.is_terminal_default() {
        inherited.bg
    } else {
        style.bg
    };
    let attrs = inherited.attrs | style.attrs;

    if !style.bg.is_terminal_default() {
        buffer.fill_rect(rect.x, rect.y, rect.width, rect.height, style.bg);
    }
    if style.border != BorderKind::None {
        buffer.draw_border(rect.x, rect.y, rect.width, rect.height, style.border, fg);
    }

    let next = Inherited {
        fg,
        bg,
        attrs,
        wrap: style.wrap,
    };
    for child in &tree.children {
        paint_node(buffer, child, next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{AttrValue, PlatformNode as _};
    use crate::terminal::layout::compute_layout;
    use crate::terminal::node::TermNode;

    fn paint_tree(root: &TermNode, width: u16, height: u16) -> FrameBuffer {
        let tree = compute_layout(root, width, height).unwrap();
        paint(&tree, width, height)
    }

    #[test]
    fn test_text_painted_at_origin() {
        let root = TermNode::create_container("root");
        let label = TermNode::create_element("text");
        label.append_child(&TermNode::create_text("hi"));
        root.append_child(&label);

        let buffer = paint_tree(&root, 10, 2);
        assert!(buffer.row_text(0).starts_with("hi"));
    }

    #[test]
    fn test_background_filled() {
        let root = TermNode::create_container("root");
        let panel = TermNode::create_element("box");
        panel.set_attribute("width", AttrValue::Int(4));
        panel.set_attribute("height", AttrValue::Int(2));
        panel.set_attribute("bg", AttrValue::from("blue"));
        root.append_child(&panel);

        let buffer = paint_tree(&root, 8, 4);
        assert_eq!(buffer.get(1, 1).map(|c| c.bg), Some(Rgba::BLUE));
        assert_eq!(
            buffer.get(6, 1).map(|c| c.bg),
            Some(Rgba::TERMINAL_DEFAULT)
        );
    }

    #[test]
    fn test_border_and_padded_text() {
        let root = TermNode::create_container("root");
        let panel = TermNode::create_element("box");
        panel.set_attribute("width", AttrValue::Int(8));
        panel.set_attribute("height", AttrValue::Int(3));
        panel.set_attribute("border", AttrValue::Bool(true));
        let label = TermNode::create_element("text");
        label.append_child(&TermNode::create_text("ok"));
        panel.append_child(&label);
        root.append_child(&panel);

        let buffer = paint_tree(&root, 10, 5);
        assert_eq!(buffer.get(0, 0).map(|c| c.ch), Some('┌'));
        // Text starts inside the border.
        assert_eq!(buffer.get(1, 1).map(|c| c.ch), Some('o'));
    }

    #[test]
    fn test_text_color_inherited() {
        let root = TermNode::create_container("root");
        let panel = TermNode::create_element("box");
        panel.set_attribute("fg", AttrValue::from("red"));
        let label = TermNode::create_element("text");
        label.append_child(&TermNode::create_text("x"));
        panel.append_child(&label);
        root.append_child(&panel);

        let buffer = paint_tree(&root, 5, 2);
        assert_eq!(buffer.get(0, 0).map(|c| c.fg), Some(Rgba::RED));
    }
}
