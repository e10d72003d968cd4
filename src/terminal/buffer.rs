//! FrameBuffer - the 2D cell grid the painter fills and the output
//! pipeline diffs.
//!
//! Flat row-major storage (`index = y * width + x`) for cache-friendly
//! iteration. Wide characters occupy their width: the first cell carries
//! the character, following cells carry a `'\0'` continuation marker the
//! output pipeline skips.

use unicode_width::UnicodeWidthChar;

use super::style::{Rgba, TextAttr};

/// A single terminal cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermCell {
    pub ch: char,
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: TextAttr,
}

impl TermCell {
    /// Continuation marker for the trailing cells of wide characters.
    pub const CONTINUATION: char = '\0';

    /// True for cells occupied by the tail of a wide character.
    #[inline]
    pub fn is_continuation(&self) -> bool {
        self.ch == Self::CONTINUATION
    }
}

impl Default for TermCell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: TextAttr::NONE,
        }
    }
}

/// A 2D buffer of terminal cells.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBuffer {
    width: u16,
    height: u16,
    cells: Vec<TermCell>,
}

impl FrameBuffer {
    /// Create a buffer filled with default cells.
    pub fn new(width: u16, height: u16) -> Self {
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![TermCell::default(); size],
        }
    }

    #[inline]
    pub fn width(&self) -> u16 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u16 {
        self.height
    }

    #[inline]
    fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.width as usize + x as usize
    }

    #[inline]
    pub fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.width && y < self.height
    }

    /// Cell reference, or `None` out of bounds.
    #[inline]
    pub fn get(&self, x: u16, y: u16) -> Option<&TermCell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// Mutable cell reference, or `None` out of bounds.
    #[inline]
    pub fn get_mut(&mut self, x: u16, y: u16) -> Option<&mut TermCell> {
        if self.in_bounds(x, y) {
            let index = self.index(x, y);
            Some(&mut self.cells[index])
        } else {
            None
        }
    }

    /// Fill a rectangle's background (clipped to the buffer).
    pub fn fill_rect(&mut self, x: u16, y: u16, width: u16, height: u16, bg: Rgba) {
        let right = x.saturating_add(width).min(self.width);
        let bottom = y.saturating_add(height).min(self.height);
        for row in y..bottom {
            for col in x..right {
                let index = self.index(col, row);
                let cell = &mut self.cells[index];
                cell.ch = ' ';
                cell.bg = bg;
                cell.attrs = TextAttr::NONE;
            }
        }
    }

    /// Draw one line of text starting at (x, y), clipped at `clip_right`
    /// and the buffer edge. A terminal-default `bg` leaves the painted
    /// background in place.
    pub fn draw_text(
        &mut self,
        x: u16,
        y: u16,
        text: &str,
        fg: Rgba,
        bg: Rgba,
        attrs: TextAttr,
        clip_right: u16,
    ) {
        if y >= self.height {
            return;
        }
        let right = clip_right.min(self.width);
        let mut col = x;
        for ch in text.chars() {
            let width = ch.width().unwrap_or(0) as u16;
            if width == 0 {
                continue;
            }
            if col + width > right {
                break;
            }
            let index = self.index(col, y);
            let cell = &mut self.cells[index];
            cell.ch = ch;
            cell.fg = fg;
            cell.attrs = attrs;
            if !bg.is_terminal_default() {
                cell.bg = bg;
            }
            for offset in 1..width {
                let index = self.index(col + offset, y);
                let cell = &mut self.cells[index];
                cell.ch = TermCell::CONTINUATION;
                cell.fg = fg;
                cell.attrs = attrs;
                if !bg.is_terminal_default() {
                    cell.bg = bg;
                }
            }
            col += width;
        }
    }

    /// Draw a border just inside the rectangle.
    pub fn draw_border(
        &mut self,
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        kind: super::style::BorderKind,
        fg: Rgba,
    ) {
        if width < 2 || height < 2 {
            return;
        }
        let (tl, tr, bl, br, horizontal, vertical) = kind.chars();
        let right = x + width - 1;
        let bottom = y + height - 1;

        let mut put = |col: u16, row: u16, ch: char| {
            if let Some(cell) = self.get_mut(col, row) {
                cell.ch = ch;
                cell.fg = fg;
                cell.attrs = TextAttr::NONE;
            }
        };

        put(x, y, tl);
        put(right, y, tr);
        put(x, bottom, bl);
        put(right, bottom, br);
        for col in (x + 1)..right {
            put(col, y, horizontal);
            put(col, bottom, horizontal);
        }
        for row in (y + 1)..bottom {
            put(x, row, vertical);
            put(right, row, vertical);
        }
    }

    /// Row as a plain string (test helper; continuation cells skipped).
    pub fn row_text(&self, y: u16) -> String {
        let mut out = String::new();
        for x in 0..self.width {
            if let Some(cell) = self.get(x, y) {
                if !cell.is_continuation() {
                    out.push(cell.ch);
                }
            }
        }
        out
    }
}
