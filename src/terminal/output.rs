//! Differential output - changed cells only, through crossterm.
//!
//! Compares each frame to the previous one and emits commands for the
//! cells that differ, wrapped in a synchronized-update envelope so the
//! terminal presents the frame atomically. Color and attribute state is
//! tracked across cells to avoid redundant escape sequences.

use std::io::{self, Write};

use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::style::{Attribute, Color, Print, SetAttribute, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{execute, queue};

use super::buffer::{FrameBuffer, TermCell};
use super::style::{Rgba, TextAttr};

fn to_color(color: Rgba) -> Color {
    if color.is_terminal_default() {
        Color::Reset
    } else {
        Color::Rgb {
            r: color.r as u8,
            g: color.g as u8,
            b: color.b as u8,
        }
    }
}

/// Differential frame renderer.
pub struct DiffRenderer {
    previous: Option<FrameBuffer>,
    current_fg: Option<Rgba>,
    current_bg: Option<Rgba>,
    current_attrs: Option<TextAttr>,
}

impl DiffRenderer {
    pub fn new() -> Self {
        Self {
            previous: None,
            current_fg: None,
            current_bg: None,
            current_attrs: None,
        }
    }

    /// Forget the previous frame; the next render repaints everything.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    fn apply_style(
        &mut self,
        out: &mut impl Write,
        cell: &TermCell,
    ) -> io::Result<()> {
        if self.current_attrs != Some(cell.attrs) {
            queue!(out, SetAttribute(Attribute::Reset))?;
            if cell.attrs.contains(TextAttr::BOLD) {
                queue!(out, SetAttribute(Attribute::Bold))?;
            }
            if cell.attrs.contains(TextAttr::DIM) {
                queue!(out, SetAttribute(Attribute::Dim))?;
            }
            if cell.attrs.contains(TextAttr::ITALIC) {
                queue!(out, SetAttribute(Attribute::Italic))?;
            }
            if cell.attrs.contains(TextAttr::UNDERLINE) {
                queue!(out, SetAttribute(Attribute::Underlined))?;
            }
            if cell.attrs.contains(TextAttr::INVERSE) {
                queue!(out, SetAttribute(Attribute::Reverse))?;
            }
            if cell.attrs.contains(TextAttr::STRIKETHROUGH) {
                queue!(out, SetAttribute(Attribute::CrossedOut))?;
            }
            self.current_attrs = Some(cell.attrs);
            // Attribute reset clears colors; force them to re-apply.
            self.current_fg = None;
            self.current_bg = None;
        }
        if self.current_fg != Some(cell.fg) {
            queue!(out, SetForegroundColor(to_color(cell.fg)))?;
            self.current_fg = Some(cell.fg);
        }
        if self.current_bg != Some(cell.bg) {
            queue!(out, SetBackgroundColor(to_color(cell.bg)))?;
            self.current_bg = Some(cell.bg);
        }
        Ok(())
    }

    /// Render a frame, emitting only cells that changed since the last
    /// one. Returns true when anything was written.
    pub fn render(&mut self, out: &mut impl Write, buffer: &FrameBuffer) -> io::Result<bool> {
        let mut has_changes = false;
        queue!(out, BeginSynchronizedUpdate)?;
        self.current_fg = None;
        self.current_bg = None;
        self.current_attrs = None;

        let full = match &self.previous {
            Some(previous) => {
                previous.width() != buffer.width() || previous.height() != buffer.height()
            }
            None => true,
        };

        for y in 0..buffer.height() {
            for x in 0..buffer.width() {
                let Some(cell) = buffer.get(x, y) else {
                    continue;
                };
                if cell.is_continuation() {
                    continue;
                }
                let changed = full
                    || self
                        .previous
                        .as_ref()
                        .and_then(|prev| prev.get(x, y))
                        .is_none_or(|prev| prev != cell);
                if !changed {
                    continue;
                }
                has_changes = true;
                queue!(out, MoveTo(x, y))?;
                self.apply_style(out, cell)?;
                queue!(out, Print(cell.ch))?;
            }
        }

        queue!(out, SetAttribute(Attribute::Reset))?;
        queue!(out, EndSynchronizedUpdate)?;
        out.flush()?;
        self.previous = Some(buffer.clone());
        Ok(has_changes)
    }
}

impl Default for DiffRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Enter the alternate screen and hide the cursor.
pub(crate) fn enter_fullscreen(out: &mut impl Write) -> io::Result<()> {
    execute!(out, EnterAlternateScreen, Hide, Clear(ClearType::All))
}

/// Restore the main screen and the cursor.
pub(crate) fn exit_fullscreen(out: &mut impl Write) -> io::Result<()> {
    execute!(out, SetAttribute(Attribute::Reset), Show, LeaveAlternateScreen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diff_skips_unchanged_cells() {
        let mut renderer = DiffRenderer::new();
        let buffer = FrameBuffer::new(4, 2);

        let mut first = Vec::new();
        renderer.render(&mut first, &buffer).unwrap();
        assert!(!first.is_empty(), "first frame paints everything");

        let mut second = Vec::new();
        let wrote = renderer.render(&mut second, &buffer).unwrap();
        assert!(!wrote, "identical frame writes no cells");
    }

    #[test]
    fn test_changed_cell_rendered() {
        let mut renderer = DiffRenderer::new();
        let mut buffer = FrameBuffer::new(4, 2);
        let mut sink = Vec::new();
        renderer.render(&mut sink, &buffer).unwrap();

        if let Some(cell) = buffer.get_mut(1, 0) {
            cell.ch = 'x';
        }
        let wrote = renderer.render(&mut sink, &buffer).unwrap();
        assert!(wrote);
    }

    #[test]
    fn test_resize_forces_full_repaint() {
        let mut renderer = DiffRenderer::new();
        let mut sink = Vec::new();
        renderer.render(&mut sink, &FrameBuffer::new(4, 2)).unwrap();
        let wrote = renderer.render(&mut sink, &FrameBuffer::new(5, 2)).unwrap();
        assert!(wrote, "size change repaints");
    }
}
