//! Color palette for the terminal host.
//!
//! The config carries hex strings (`[palette]` table); [`Palette`] resolves
//! them into ratatui `Style`s for each semantic role. Defaults are Catppuccin
//! Mocha.

use ratatui::style::{Color, Modifier, Style};
use serde::Deserialize;

// ============================================================================
// Config-side palette
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PaletteConfig {
    pub base: String,
    pub mantle: String,
    pub surface0: String,
    pub surface1: String,
    pub text: String,
    pub subtext0: String,
    pub green: String,
    pub red: String,
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            base: "#1e1e2e".to_string(),
            mantle: "#181825".to_string(),
            surface0: "#313244".to_string(),
            surface1: "#45475a".to_string(),
            text: "#cdd6f4".to_string(),
            subtext0: "#a6adc8".to_string(),
            green: "#a6e3a1".to_string(),
            red: "#f38ba8".to_string(),
        }
    }
}

/// Parse `#rrggbb` (leading `#` optional) into an RGB color.
pub fn parse_hex_color(s: &str) -> Option<Color> {
    let hex = s.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Color::Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

// ============================================================================
// Resolved palette
// ============================================================================

/// Semantic styles used by the renderers.
#[derive(Debug, Clone)]
pub struct Palette {
    pub panel: Style,
    pub border: Style,
    pub border_focused: Style,
    pub title: Style,
    pub text: Style,
    pub muted: Style,
    pub selected: Style,
    pub accent: Style,
    pub error: Style,
    pub gauge: Style,
    pub status_bar: Style,
}

impl Palette {
    /// Resolve a config palette. Unparseable entries fall back to the
    /// default for that role and are logged.
    pub fn from_config(config: &PaletteConfig) -> Self {
        let defaults = PaletteConfig::default();
        let resolve = |name: &str, value: &str, fallback: &str| {
            parse_hex_color(value).unwrap_or_else(|| {
                tracing::warn!(role = name, value = %value, "Invalid palette color, using default");
                parse_hex_color(fallback).unwrap_or(Color::Reset)
            })
        };

        let base = resolve("base", &config.base, &defaults.base);
        let mantle = resolve("mantle", &config.mantle, &defaults.mantle);
        let surface0 = resolve("surface0", &config.surface0, &defaults.surface0);
        let surface1 = resolve("surface1", &config.surface1, &defaults.surface1);
        let text = resolve("text", &config.text, &defaults.text);
        let subtext0 = resolve("subtext0", &config.subtext0, &defaults.subtext0);
        let green = resolve("green", &config.green, &defaults.green);
        let red = resolve("red", &config.red, &defaults.red);

        Self {
            panel: Style::default().bg(mantle).fg(text),
            border: Style::default().fg(surface0),
            border_focused: Style::default().fg(green),
            title: Style::default().fg(text).add_modifier(Modifier::BOLD),
            text: Style::default().fg(text),
            muted: Style::default().fg(subtext0),
            selected: Style::default().bg(surface1).fg(text),
            accent: Style::default().fg(green),
            error: Style::default().fg(red),
            gauge: Style::default().fg(green).bg(surface0),
            status_bar: Style::default().bg(base).fg(subtext0),
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::from_config(&PaletteConfig::default())
    }
}
