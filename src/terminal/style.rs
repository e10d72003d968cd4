//! Terminal style properties.
//!
//! Style reaches nodes as plain attributes (the renderer's style-map and
//! style-string forms both funnel through `set_attribute`); this module
//! parses those attribute values into the typed properties the layout
//! bridge and the painter consume.

use crate::render::AttrValue;

// =============================================================================
// Color
// =============================================================================

/// RGBA color with 8-bit channels (0-255).
///
/// Integer channels for exact comparison. Special value: r=-1 means
/// "terminal default" (let the terminal pick).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: i16,
    pub g: i16,
    pub b: i16,
    pub a: i16,
}

impl Rgba {
    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            r: r as i16,
            g: g as i16,
            b: b as i16,
            a: 255,
        }
    }

    /// Terminal default color (let the terminal decide).
    pub const TERMINAL_DEFAULT: Self = Self {
        r: -1,
        g: -1,
        b: -1,
        a: -1,
    };

    pub const BLACK: Self = Self::rgb(0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const RED: Self = Self::rgb(205, 49, 49);
    pub const GREEN: Self = Self::rgb(13, 188, 121);
    pub const BLUE: Self = Self::rgb(36, 114, 200);
    pub const YELLOW: Self = Self::rgb(229, 229, 16);
    pub const CYAN: Self = Self::rgb(17, 168, 205);
    pub const MAGENTA: Self = Self::rgb(188, 63, 188);
    pub const GRAY: Self = Self::rgb(128, 128, 128);

    /// Check if this is the terminal default color.
    #[inline]
    pub const fn is_terminal_default(&self) -> bool {
        self.r == -1
    }
}

impl Default for Rgba {
    fn default() -> Self {
        Self::TERMINAL_DEFAULT
    }
}

/// Parse `#rrggbb` or a named color.
pub fn parse_color(text: &str) -> Option<Rgba> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Rgba::rgb(r, g, b));
        }
        return None;
    }
    match text {
        "default" => Some(Rgba::TERMINAL_DEFAULT),
        "black" => Some(Rgba::BLACK),
        "white" => Some(Rgba::WHITE),
        "red" => Some(Rgba::RED),
        "green" => Some(Rgba::GREEN),
        "blue" => Some(Rgba::BLUE),
        "yellow" => Some(Rgba::YELLOW),
        "cyan" => Some(Rgba::CYAN),
        "magenta" => Some(Rgba::MAGENTA),
        "gray" | "grey" => Some(Rgba::GRAY),
        _ => None,
    }
}

// =============================================================================
// Text attributes (bitflags)
// =============================================================================

bitflags::bitflags! {
    /// Text attributes as a bitfield for cheap storage and comparison.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct TextAttr: u8 {
        const NONE = 0;
        const BOLD = 1 << 0;
        const DIM = 1 << 1;
        const ITALIC = 1 << 2;
        const UNDERLINE = 1 << 3;
        const INVERSE = 1 << 4;
        const STRIKETHROUGH = 1 << 5;
    }
}

// =============================================================================
// Layout-facing properties
// =============================================================================

/// A length along one axis.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dim {
    #[default]
    Auto,
    /// Absolute terminal cells.
    Cells(u16),
    /// Percentage of the parent (0-100).
    Percent(f32),
}

/// Main-axis direction of a flex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDir {
    #[default]
    Column,
    Row,
}

/// Main-axis distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MainAlign {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
    SpaceAround,
    SpaceEvenly,
}

/// Cross-axis alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossAlign {
    #[default]
    Stretch,
    Start,
    Center,
    End,
}

/// Border variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderKind {
    #[default]
    None,
    Single,
    Rounded,
    Double,
}

impl BorderKind {
    /// Box-drawing characters: (top-left, top-right, bottom-left,
    /// bottom-right, horizontal, vertical).
    pub fn chars(self) -> (char, char, char, char, char, char) {
        match self {
            BorderKind::None | BorderKind::Single => ('┌', '┐', '└', '┘', '─', '│'),
            BorderKind::Rounded => ('╭', '╮', '╰', '╯', '─', '│'),
            BorderKind::Double => ('╔', '╗', '╚', '╝', '═', '║'),
        }
    }
}

/// Parsed style of one terminal node.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleProps {
    pub width: Dim,
    pub height: Dim,
    pub min_width: Dim,
    pub min_height: Dim,
    pub direction: FlexDir,
    pub justify: MainAlign,
    pub align: CrossAlign,
    pub gap: u16,
    pub padding: u16,
    pub margin: u16,
    pub grow: f32,
    pub shrink: f32,
    pub border: BorderKind,
    pub fg: Rgba,
    pub bg: Rgba,
    pub attrs: TextAttr,
    pub wrap: bool,
}

impl Default for StyleProps {
    fn default() -> Self {
        Self {
            width: Dim::Auto,
            height: Dim::Auto,
            min_width: Dim::Auto,
            min_height: Dim::Auto,
            direction: FlexDir::Column,
            justify: MainAlign::Start,
            align: CrossAlign::Stretch,
            gap: 0,
            padding: 0,
            margin: 0,
            grow: 0.0,
            shrink: 1.0,
            border: BorderKind::None,
            fg: Rgba::TERMINAL_DEFAULT,
            bg: Rgba::TERMINAL_DEFAULT,
            attrs: TextAttr::NONE,
            wrap: false,
        }
    }
}

fn parse_dim(value: &AttrValue) -> Option<Dim> {
    match value {
        AttrValue::Int(cells) => Some(Dim::Cells((*cells).max(0) as u16)),
        AttrValue::Float(cells) => Some(Dim::Cells(cells.max(0.0) as u16)),
        AttrValue::Text(text) => {
            let text = text.trim();
            if text == "auto" {
                Some(Dim::Auto)
            } else if let Some(percent) = text.strip_suffix('%') {
                percent.trim().parse::<f32>().ok().map(Dim::Percent)
            } else {
                text.parse::<u16>().ok().map(Dim::Cells)
            }
        }
        _ => None,
    }
}

fn parse_u16(value: &AttrValue) -> Option<u16> {
    value.as_int().map(|v| v.max(0) as u16)
}

fn set_flag(attrs: &mut TextAttr, flag: TextAttr, value: &AttrValue) {
    if value.as_bool().unwrap_or(false) {
        attrs.insert(flag);
    } else {
        attrs.remove(flag);
    }
}

impl StyleProps {
    /// Apply one attribute. Returns false when the key is not a style
    /// property (the node keeps it as a plain attribute only).
    pub fn apply(&mut self, key: &str, value: &AttrValue) -> bool {
        match key {
            "width" => {
                if let Some(dim) = parse_dim(value) {
                    self.width = dim;
                }
            }
            "height" => {
                if let Some(dim) = parse_dim(value) {
                    self.height = dim;
                }
            }
            "min_width" => {
                if let Some(dim) = parse_dim(value) {
                    self.min_width = dim;
                }
            }
            "min_height" => {
                if let Some(dim) = parse_dim(value) {
                    self.min_height = dim;
                }
            }
            "direction" => {
                self.direction = match value.as_text() {
                    Some("row") => FlexDir::Row,
                    _ => FlexDir::Column,
                };
            }
            "justify" => {
                self.justify = match value.as_text() {
                    Some("center") => MainAlign::Center,
                    Some("end") => MainAlign::End,
                    Some("between") => MainAlign::SpaceBetween,
                    Some("around") => MainAlign::SpaceAround,
                    Some("evenly") => MainAlign::SpaceEvenly,
                    _ => MainAlign::Start,
                };
            }
            "align" => {
                self.align = match value.as_text() {
                    Some("start") => CrossAlign::Start,
                    Some("center") => CrossAlign::Center,
                    Some("end") => CrossAlign::End,
                    _ => CrossAlign::Stretch,
                };
            }
            "gap" => self.gap = parse_u16(value).unwrap_or(0),
            "padding" => self.padding = parse_u16(value).unwrap_or(0),
            "margin" => self.margin = parse_u16(value).unwrap_or(0),
            "grow" => self.grow = value.as_float().unwrap_or(0.0) as f32,
            "shrink" => self.shrink = value.as_float().unwrap_or(1.0) as f32,
            "border" => {
                self.border = match value {
                    AttrValue::Bool(true) => BorderKind::Single,
                    AttrValue::Bool(false) | AttrValue::Null => BorderKind::None,
                    AttrValue::Text(text) => match text.as_str() {
                        "single" => BorderKind::Single,
                        "rounded" => BorderKind::Rounded,
                        "double" => BorderKind::Double,
                        _ => BorderKind::None,
                    },
                    _ => BorderKind::None,
                };
            }
            "fg" => {
                if let Some(color) = value.as_text().and_then(parse_color) {
                    self.fg = color;
                }
            }
            "bg" => {
                if let Some(color) = value.as_text().and_then(parse_color) {
                    self.bg = color;
                }
            }
            "bold" => set_flag(&mut self.attrs, TextAttr::BOLD, value),
            "dim" => set_flag(&mut self.attrs, TextAttr::DIM, value),
            "italic" => set_flag(&mut self.attrs, TextAttr::ITALIC, value),
            "underline" => set_flag(&mut self.attrs, TextAttr::UNDERLINE, value),
            "inverse" => set_flag(&mut self.attrs, TextAttr::INVERSE, value),
            "strikethrough" => set_flag(&mut self.attrs, TextAttr::STRIKETHROUGH, value),
            "wrap" => self.wrap = value.as_bool().unwrap_or(false),
            "style" => {
                if let Some(text) = value.as_text() {
                    self.apply_style_string(text);
                }
            }
            _ => return false,
        }
        true
    }

    /// Parse a `key: value; key: value` style string.
    fn apply_style_string(&mut self, text: &str) {
        for entry in text.split(';') {
            let Some((key, value)) = entry.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let parsed = match value {
                "true" => AttrValue::Bool(true),
                "false" => AttrValue::Bool(false),
                other => match other.parse::<i64>() {
                    Ok(n) => AttrValue::Int(n),
                    Err(_) => AttrValue::Text(other.to_string()),
                },
            };
            self.apply(key, &parsed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_color_forms() {
        assert_eq!(parse_color("#ff0000"), Some(Rgba::rgb(255, 0, 0)));
        assert_eq!(parse_color("red"), Some(Rgba::RED));
        assert_eq!(parse_color("default"), Some(Rgba::TERMINAL_DEFAULT));
        assert_eq!(parse_color("#xyz"), None);
        assert_eq!(parse_color("chartreuse-ish"), None);
    }

    #[test]
    fn test_parse_dimensions() {
        let mut props = StyleProps::default();
        props.apply("width", &AttrValue::Int(40));
        props.apply("height", &AttrValue::Text("50%".into()));
        assert_eq!(props.width, Dim::Cells(40));
        assert_eq!(props.height, Dim::Percent(50.0));
    }

    #[test]
    fn test_style_string() {
        let mut props = StyleProps::default();
        props.apply(
            "style",
            &AttrValue::Text("direction: row; gap: 2; border: rounded; bold: true".into()),
        );
        assert_eq!(props.direction, FlexDir::Row);
        assert_eq!(props.gap, 2);
        assert_eq!(props.border, BorderKind::Rounded);
        assert!(props.attrs.contains(TextAttr::BOLD));
    }

    #[test]
    fn test_unknown_key_not_style() {
        let mut props = StyleProps::default();
        assert!(!props.apply("data-id", &AttrValue::Int(1)));
        assert!(props.apply("gap", &AttrValue::Int(1)));
    }
}
