use crossterm::style::Color;

use crate::error::{Error, Result};

/// Named palette. Node colors are handed out in reveal order and cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub background: Color,
    pub foreground: Color,
    pub accent: Color,
    pub line: Color,
    pub node_colors: [Color; 5],
}

impl Theme {
    pub fn node_color(&self, ordinal: usize) -> Color {
        self.node_colors[ordinal % self.node_colors.len()]
    }
}

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

pub static THEMES: &[Theme] = &[
    Theme {
        name: "default",
        background: rgb(0x1e, 0x1e, 0x2e),
        foreground: rgb(0xe0, 0xe0, 0xe0),
        accent: rgb(0xf9, 0xe2, 0xaf),
        line: rgb(0x6c, 0x70, 0x86),
        node_colors: [
            rgb(0x89, 0xb4, 0xfa),
            rgb(0xa6, 0xe3, 0xa1),
            rgb(0xfa, 0xb3, 0x87),
            rgb(0xcb, 0xa6, 0xf7),
            rgb(0x94, 0xe2, 0xd5),
        ],
    },
    Theme {
        name: "dracula",
        background: rgb(0x28, 0x2a, 0x36),
        foreground: rgb(0xf8, 0xf8, 0xf2),
        accent: rgb(0xf1, 0xfa, 0x8c),
        line: rgb(0x62, 0x72, 0xa4),
        node_colors: [
            rgb(0xbd, 0x93, 0xf9),
            rgb(0x50, 0xfa, 0x7b),
            rgb(0xff, 0x79, 0xc6),
            rgb(0x8b, 0xe9, 0xfd),
            rgb(0xff, 0xb8, 0x6c),
        ],
    },
    Theme {
        name: "nord",
        background: rgb(0x2e, 0x34, 0x40),
        foreground: rgb(0xec, 0xef, 0xf4),
        accent: rgb(0xeb, 0xcb, 0x8b),
        line: rgb(0x4c, 0x56, 0x6a),
        node_colors: [
            rgb(0x88, 0xc0, 0xd0),
            rgb(0xa3, 0xbe, 0x8c),
            rgb(0xb4, 0x8e, 0xad),
            rgb(0x81, 0xa1, 0xc1),
            rgb(0xd0, 0x87, 0x70),
        ],
    },
    Theme {
        name: "mono",
        background: rgb(0x00, 0x00, 0x00),
        foreground: rgb(0xff, 0xff, 0xff),
        accent: rgb(0xff, 0xff, 0xff),
        line: rgb(0x80, 0x80, 0x80),
        node_colors: [
            rgb(0xff, 0xff, 0xff),
            rgb(0xd0, 0xd0, 0xd0),
            rgb(0xa0, 0xa0, 0xa0),
            rgb(0xd0, 0xd0, 0xd0),
            rgb(0xff, 0xff, 0xff),
        ],
    },
];

pub fn theme_names() -> Vec<&'static str> {
    THEMES.iter().map(|t| t.name).collect()
}

pub fn find_theme(name: &str) -> Result<&'static Theme> {
    THEMES
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnknownTheme {
            name: name.to_string(),
            available: theme_names().join(", "),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn find_known_theme() {
        assert_eq!(find_theme("nord").map(|t| t.name).ok(), Some("nord"));
        assert_eq!(find_theme("Dracula").map(|t| t.name).ok(), Some("dracula"));
    }

    #[test]
    fn unknown_theme_lists_names() {
        let err = find_theme("solarized").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("solarized"), "{msg}");
        assert!(msg.contains("default, dracula, nord, mono"), "{msg}");
    }

    #[test]
    fn node_colors_cycle() {
        let theme = &THEMES[0];
        assert_eq!(theme.node_color(0), theme.node_color(5));
        assert_ne!(theme.node_color(0), theme.node_color(1));
    }
}
