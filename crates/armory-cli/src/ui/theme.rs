//! Colors, icons and column widths shared by all output.

use crossterm::style::Color;

#[derive(Debug, Clone)]
pub struct Colors {
    pub package_name: Color,
    pub version: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub secondary: Color,
}

#[derive(Debug, Clone)]
pub struct Icons {
    pub info: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub skipped: &'static str,
    pub pending: &'static str,
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub name_width: usize,
    pub version_width: usize,
}

#[derive(Debug, Clone)]
pub struct Theme {
    pub colors: Colors,
    pub icons: Icons,
    pub layout: Layout,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            colors: Colors {
                package_name: Color::White,
                version: Color::DarkGrey,
                success: Color::Green,
                warning: Color::Yellow,
                error: Color::Red,
                secondary: Color::DarkGrey,
            },
            icons: Icons {
                info: "ℹ",
                success: "✓",
                warning: "!",
                error: "✗",
                skipped: "-",
                pending: "…",
            },
            layout: Layout {
                name_width: 24,
                version_width: 12,
            },
        }
    }
}
