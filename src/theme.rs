use iced::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── THEME VARIANTS ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThemeVariant {
    CatppuccinLatte,
    CatppuccinMocha,
    GruvboxLight,
    GruvboxDark,
    KanagawaDark,
}

impl ThemeVariant {
    pub const ALL: &[ThemeVariant] = &[
        ThemeVariant::CatppuccinLatte,
        ThemeVariant::CatppuccinMocha,
        ThemeVariant::GruvboxLight,
        ThemeVariant::GruvboxDark,
        ThemeVariant::KanagawaDark,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ThemeVariant::CatppuccinLatte => "Catppuccin Latte",
            ThemeVariant::CatppuccinMocha => "Catppuccin Mocha",
            ThemeVariant::GruvboxLight => "Gruvbox Light",
            ThemeVariant::GruvboxDark => "Gruvbox Dark",
            ThemeVariant::KanagawaDark => "Kanagawa Wave",
        }
    }

    pub fn is_light(&self) -> bool {
        matches!(self, ThemeVariant::CatppuccinLatte | ThemeVariant::GruvboxLight)
    }
}

impl fmt::Display for ThemeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── PALETTE ────────────────────────────────────────────────────

/// All semantic colors the app uses.
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub bg: Color,
    pub panel_bg: Color,
    pub header_bg: Color,
    pub border: Color,
    pub grid: Color,
    pub label: Color,
    pub text: Color,
    pub accent: Color,
    pub red: Color,
    pub yellow: Color,
    /// Release channel bars.
    pub release: Color,
    /// Beta channel bars.
    pub beta: Color,
}

pub fn build_palette(theme: ThemeVariant) -> Palette {
    match theme {
        // ── Catppuccin Latte ──
        ThemeVariant::CatppuccinLatte => Palette {
            bg:        hex(0xef, 0xf1, 0xf5),
            panel_bg:  hex(0xe6, 0xe9, 0xef),
            header_bg: hex(0xdc, 0xe0, 0xe8),
            border:    hex(0xcc, 0xd0, 0xda),
            grid:      Color::from_rgba(0.0, 0.0, 0.0, 0.06),
            label:     hex(0x6c, 0x6f, 0x85),
            text:      hex(0x4c, 0x4f, 0x69),
            accent:    hex(0x1e, 0x66, 0xf5),
            red:       hex(0xd2, 0x0f, 0x39),
            yellow:    hex(0xdf, 0x8e, 0x1d),
            release:   hex(0xfe, 0x64, 0x0b),
            beta:      hex(0x1e, 0x66, 0xf5),
        },
        // ── Catppuccin Mocha ──
        ThemeVariant::CatppuccinMocha => Palette {
            bg:        hex(0x1e, 0x1e, 0x2e),
            panel_bg:  hex(0x18, 0x18, 0x25),
            header_bg: hex(0x11, 0x11, 0x1b),
            border:    hex(0x31, 0x32, 0x44),
            grid:      Color::from_rgba(1.0, 1.0, 1.0, 0.06),
            label:     hex(0xa6, 0xad, 0xc8),
            text:      hex(0xcd, 0xd6, 0xf4),
            accent:    hex(0x89, 0xb4, 0xfa),
            red:       hex(0xf3, 0x8b, 0xa8),
            yellow:    hex(0xf9, 0xe2, 0xaf),
            release:   hex(0xfa, 0xb3, 0x87),
            beta:      hex(0x89, 0xb4, 0xfa),
        },
        // ── Gruvbox Light ──
        ThemeVariant::GruvboxLight => Palette {
            bg:        hex(0xfb, 0xf1, 0xc7),
            panel_bg:  hex(0xf2, 0xe5, 0xbc),
            header_bg: hex(0xeb, 0xdb, 0xb2),
            border:    hex(0xd5, 0xc4, 0xa1),
            grid:      Color::from_rgba(0.0, 0.0, 0.0, 0.06),
            label:     hex(0x66, 0x5c, 0x54),
            text:      hex(0x3c, 0x38, 0x36),
            accent:    hex(0x07, 0x66, 0x78),
            red:       hex(0x9d, 0x00, 0x06),
            yellow:    hex(0xb5, 0x76, 0x14),
            release:   hex(0xaf, 0x3a, 0x03),
            beta:      hex(0x07, 0x66, 0x78),
        },
        // ── Gruvbox Dark ──
        ThemeVariant::GruvboxDark => Palette {
            bg:        hex(0x28, 0x28, 0x28),
            panel_bg:  hex(0x1d, 0x20, 0x21),
            header_bg: hex(0x17, 0x19, 0x1a),
            border:    hex(0x3c, 0x38, 0x36),
            grid:      Color::from_rgba(1.0, 1.0, 1.0, 0.06),
            label:     hex(0xa8, 0x99, 0x84),
            text:      hex(0xeb, 0xdb, 0xb2),
            accent:    hex(0x83, 0xa5, 0x98),
            red:       hex(0xfb, 0x49, 0x34),
            yellow:    hex(0xfa, 0xbd, 0x2f),
            release:   hex(0xfe, 0x80, 0x19),
            beta:      hex(0x83, 0xa5, 0x98),
        },
        // ── Kanagawa Wave ──
        ThemeVariant::KanagawaDark => Palette {
            bg:        hex(0x1f, 0x1f, 0x28),
            panel_bg:  hex(0x16, 0x16, 0x1d),
            header_bg: hex(0x10, 0x10, 0x16),
            border:    hex(0x36, 0x36, 0x46),
            grid:      Color::from_rgba(1.0, 1.0, 1.0, 0.06),
            label:     hex(0x72, 0x73, 0x8c),
            text:      hex(0xdc, 0xd7, 0xba),
            accent:    hex(0x7e, 0x9c, 0xd8),
            red:       hex(0xc3, 0x46, 0x43),
            yellow:    hex(0xdb, 0xa4, 0x5a),
            release:   hex(0xff, 0xa0, 0x66),
            beta:      hex(0x7e, 0x9c, 0xd8),
        },
    }
}

const fn hex(r: u8, g: u8, b: u8) -> Color {
    Color::from_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
}
