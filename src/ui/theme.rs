//! Theme configuration for the dashboard.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::roster::NodeClass;

/// Color and style theme for the dashboard.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for titles and fleet figures.
    pub highlight: Color,
    /// Color for the node holding the leadership token.
    pub leader: Color,
    /// Color for scale nodes in the class column.
    pub scale: Color,
    /// Color for side nodes in the class column.
    pub side: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for header rows in tables.
    pub header: Style,
    /// Style for overview labels.
    pub label: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            leader: Color::Yellow,
            scale: Color::Magenta,
            side: Color::Green,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            leader: Color::Red,
            scale: Color::Magenta,
            side: Color::Green,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            label: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        // Use terminal-light crate to detect background luminance
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    /// Style for a node's class column.
    pub fn class_style(&self, class: Option<NodeClass>) -> Style {
        match class {
            Some(NodeClass::Scale) => Style::default().fg(self.scale),
            Some(NodeClass::Side) => Style::default().fg(self.side),
            None => Style::default(),
        }
    }

    /// Style for a node's name column.
    pub fn node_style(&self, leader: bool) -> Style {
        if leader {
            Style::default().fg(self.leader).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        }
    }
}
