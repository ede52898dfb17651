//! Colour themes: btop-style `theme[key]="value"` files mapped onto block and scene colours.

use clap::ValueEnum;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Block colour variant picked on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Theme {
    /// Block colours by sprite colour index (0..6).
    pub blocks: [Color; 6],
    pub bg: Color,
    /// Tray band and borders.
    pub div_line: Color,
    pub main_fg: Color,
    pub title: Color,
    /// Tower drop area shading.
    pub tower_area: Color,
    pub hole: Color,
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

const fn rgb(hex: u32) -> Color {
    Color::Rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

const ONEDARK_BLOCKS: [Color; 6] = [
    rgb(0x98C379),
    rgb(0xE5C07B),
    rgb(0xE06C75),
    rgb(0x61AFEF),
    rgb(0xC678DD),
    rgb(0x56B6C2),
];

const HIGH_CONTRAST_BLOCKS: [Color; 6] = [
    rgb(0x00FF00),
    rgb(0xFFFF00),
    rgb(0xFF0000),
    rgb(0x0088FF),
    rgb(0xFF00FF),
    rgb(0x00FFFF),
];

/// Avoids red/green pairs.
const COLORBLIND_BLOCKS: [Color; 6] = [
    rgb(0x0077BB),
    rgb(0xEE7733),
    rgb(0x009988),
    rgb(0xCC3311),
    rgb(0xEE3377),
    rgb(0xBBBB00),
];

impl Default for Theme {
    fn default() -> Self {
        Self::onedark()
    }
}

impl Theme {
    pub fn onedark() -> Self {
        Self {
            blocks: ONEDARK_BLOCKS,
            bg: rgb(0x282C34),
            div_line: rgb(0x3F444F),
            main_fg: rgb(0xABB2BF),
            title: rgb(0xE5C07B),
            tower_area: rgb(0x31353F),
            hole: rgb(0x1B1D23),
            inactive_fg: rgb(0x5C6370),
        }
    }

    /// Load a theme file, or One Dark when `path` is `None` or missing.
    pub fn load(path: Option<&Path>, palette: Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => {
                debug!(path = %p.display(), "loading theme");
                Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?))
            }
            Some(p) => {
                warn!(path = %p.display(), "theme file not found, using defaults");
                Self::onedark()
            }
            None => Self::onedark(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: Palette) {
        match palette {
            Palette::Normal => {}
            Palette::HighContrast => self.blocks = HIGH_CONTRAST_BLOCKS,
            Palette::Colorblind => self.blocks = COLORBLIND_BLOCKS,
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |keys: &[&str]| keys.iter().find_map(|k| map.get(*k).and_then(|v| parse_hex(v).ok()));
        let base = Self::onedark();
        Self {
            blocks: [
                get(&["mem_box", "cpu_start"]).unwrap_or(base.blocks[0]),
                get(&["title", "cpu_mid"]).unwrap_or(base.blocks[1]),
                get(&["cpu_end", "temp_end"]).unwrap_or(base.blocks[2]),
                get(&["cpu_box"]).unwrap_or(base.blocks[3]),
                get(&["net_box"]).unwrap_or(base.blocks[4]),
                get(&["hi_fg", "proc_misc"]).unwrap_or(base.blocks[5]),
            ],
            bg: get(&["main_bg"]).unwrap_or(base.bg),
            div_line: get(&["div_line"]).unwrap_or(base.div_line),
            main_fg: get(&["main_fg"]).unwrap_or(base.main_fg),
            title: get(&["title"]).unwrap_or(base.title),
            tower_area: get(&["meter_bg"]).unwrap_or(base.tower_area),
            hole: get(&["selected_bg", "meter_bg"]).unwrap_or(base.hole),
            inactive_fg: get(&["inactive_fg"]).unwrap_or(base.inactive_fg),
        }
    }

    #[inline]
    pub fn block_color(&self, index: u8) -> Color {
        self.blocks[index as usize % self.blocks.len()]
    }
}

/// `theme[key]="value"` lines into a map. Comments and malformed lines are skipped.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    s.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let rest = line.strip_prefix("theme[")?;
            let (key, rest) = rest.split_once(']')?;
            let (_, value) = rest.split_once('=')?;
            let value = value.trim().trim_matches('"').trim_matches('\'');
            (!value.is_empty()).then(|| (key.trim().to_string(), value.to_string()))
        })
        .collect()
}

/// `#RRGGBB` or `#RGB` into a ratatui colour.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let digits = s.trim().trim_start_matches('#');
    let invalid = || ThemeError::InvalidHex(digits.to_string());
    if !digits.is_ascii() {
        return Err(invalid());
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&digits[range], 16).map_err(|_| invalid());
    match digits.len() {
        6 => Ok(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?)),
        3 => Ok(Color::Rgb(
            channel(0..1)? * 17,
            channel(1..2)? * 17,
            channel(2..3)? * 17,
        )),
        _ => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_6() {
        let c = parse_hex("#98C379").unwrap();
        assert!(matches!(c, Color::Rgb(0x98, 0xC3, 0x79)));
    }

    #[test]
    fn test_parse_hex_3() {
        let c = parse_hex("#FFF").unwrap();
        assert!(matches!(c, Color::Rgb(255, 255, 255)));
    }

    #[test]
    fn test_parse_hex_rejects_garbage() {
        assert!(matches!(parse_hex("#12345"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("zzzzzz"), Err(ThemeError::InvalidHex(_))));
        assert!(matches!(parse_hex("#ééé"), Err(ThemeError::InvalidHex(_))));
    }

    #[test]
    fn test_parse_theme_line() {
        let map = parse_theme_file(
            r##"# comment
theme[meter_bg]="#31353F"
theme[title]='#FFF'
theme[broken]
"##,
        );
        assert_eq!(map.get("meter_bg"), Some(&"#31353F".to_string()));
        assert_eq!(map.get("title"), Some(&"#FFF".to_string()));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_file_overrides_and_fallbacks() {
        let map = parse_theme_file(r##"theme[title]="#010203""##);
        let theme = Theme::from_map(&map);
        assert_eq!(theme.blocks[1], Color::Rgb(1, 2, 3));
        assert_eq!(theme.title, Color::Rgb(1, 2, 3));
        assert_eq!(theme.blocks[0], Theme::onedark().blocks[0]);
    }

    #[test]
    fn test_palettes_swap_block_colours() {
        let theme = Theme::load(None, Palette::Colorblind).unwrap();
        assert_eq!(theme.blocks, COLORBLIND_BLOCKS);
        assert_eq!(theme.bg, Theme::onedark().bg);
        assert_eq!(theme.block_color(7), COLORBLIND_BLOCKS[1]);
    }
}
