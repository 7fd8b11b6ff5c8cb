use ratatui::style::Color;

use crate::catalog::DEFAULT_CHARACTER;

/// Colors for the header region (character name, story title, character dots).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderTheme {
    pub background: Color,
    pub title: Color,
    pub subtitle: Color,
}

/// Colors for the main stage, including the content-kind indicator badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTheme {
    pub background: Color,
    pub border: Color,
    pub indicator: Color,
    pub indicator_text: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DotColors {
    pub active: Color,
    pub adjacent: Color,
    pub inactive: Color,
}

/// Colors for the story-point navigation strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavTheme {
    pub background: Color,
    pub title: Color,
    pub subtitle: Color,
    pub dots: DotColors,
}

/// Colors for the audio dock (shared by the bottom strip and focused mode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DockTheme {
    pub background: Color,
    pub title: Color,
    pub time_text: Color,
    pub progress_track: Color,
    pub progress_fill: Color,
    pub play_button: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModalTheme {
    pub background: Color,
    pub title: Color,
    pub subtitle: Color,
    pub content: Color,
    pub close_button: Color,
}

/// Complete per-character style record. Consumed only by the render layer;
/// carries no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub header: HeaderTheme,
    pub stage: StageTheme,
    pub nav: NavTheme,
    pub dock: DockTheme,
    pub modal: ModalTheme,
    pub focused_dock: DockTheme,
}

/// Eren Yeager: red accents over dark grey.
const CRIMSON: Theme = {
    const BG_DARK: Color = Color::Rgb(26, 26, 26);
    const BG_PANEL: Color = Color::Rgb(44, 44, 44);
    const RED: Color = Color::Rgb(220, 38, 38);
    const RED_SOFT: Color = Color::Rgb(239, 68, 68);
    const RED_DIM: Color = Color::Rgb(120, 38, 38);
    const TRACK: Color = Color::Rgb(55, 65, 81);
    const TEXT: Color = Color::Rgb(229, 231, 235);
    Theme {
        header: HeaderTheme {
            background: BG_PANEL,
            title: RED,
            subtitle: RED_SOFT,
        },
        stage: StageTheme {
            background: BG_DARK,
            border: RED_DIM,
            indicator: RED,
            indicator_text: Color::White,
        },
        nav: NavTheme {
            background: BG_PANEL,
            title: RED,
            subtitle: RED_SOFT,
            dots: DotColors {
                active: RED,
                adjacent: RED_SOFT,
                inactive: RED_DIM,
            },
        },
        dock: DockTheme {
            background: BG_PANEL,
            title: RED,
            time_text: RED_SOFT,
            progress_track: TRACK,
            progress_fill: RED,
            play_button: RED,
        },
        modal: ModalTheme {
            background: BG_DARK,
            title: RED,
            subtitle: RED_SOFT,
            content: TEXT,
            close_button: RED,
        },
        focused_dock: DockTheme {
            background: BG_DARK,
            title: RED,
            time_text: RED_SOFT,
            progress_track: TRACK,
            progress_fill: RED,
            play_button: RED,
        },
    }
};

/// Mikasa Ackerman: amber accents over dark brown.
const AMBER: Theme = {
    const BG_DARK: Color = Color::Rgb(41, 27, 8);
    const BG_PANEL: Color = Color::Rgb(69, 45, 13);
    const AMBER_BRIGHT: Color = Color::Rgb(245, 158, 11);
    const AMBER_SOFT: Color = Color::Rgb(217, 119, 6);
    const AMBER_DEEP: Color = Color::Rgb(146, 64, 14);
    const AMBER_DIM: Color = Color::Rgb(120, 53, 15);
    const ORANGE: Color = Color::Rgb(249, 115, 22);
    Theme {
        header: HeaderTheme {
            background: BG_PANEL,
            title: AMBER_BRIGHT,
            subtitle: AMBER_SOFT,
        },
        stage: StageTheme {
            background: BG_DARK,
            border: AMBER_DEEP,
            indicator: AMBER_BRIGHT,
            indicator_text: Color::White,
        },
        nav: NavTheme {
            background: BG_PANEL,
            title: AMBER_BRIGHT,
            subtitle: AMBER_SOFT,
            dots: DotColors {
                active: AMBER_BRIGHT,
                adjacent: ORANGE,
                inactive: AMBER_DIM,
            },
        },
        dock: DockTheme {
            background: BG_PANEL,
            title: AMBER_BRIGHT,
            time_text: AMBER_SOFT,
            progress_track: AMBER_DIM,
            progress_fill: AMBER_BRIGHT,
            play_button: AMBER_BRIGHT,
        },
        modal: ModalTheme {
            background: BG_DARK,
            title: AMBER_BRIGHT,
            subtitle: AMBER_SOFT,
            content: Color::Rgb(254, 243, 199),
            close_button: AMBER_BRIGHT,
        },
        focused_dock: DockTheme {
            background: BG_DARK,
            title: AMBER_BRIGHT,
            time_text: AMBER_SOFT,
            progress_track: AMBER_DIM,
            progress_fill: ORANGE,
            play_button: AMBER_BRIGHT,
        },
    }
};

/// Theme for a character; unmapped names resolve to the default character's
/// theme, never failing.
pub fn theme_for_character(name: &str) -> Theme {
    match name {
        "Mikasa Ackerman" => AMBER,
        _ => theme_for_default(),
    }
}

fn theme_for_default() -> Theme {
    debug_assert!(!DEFAULT_CHARACTER.is_empty());
    CRIMSON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CHARACTERS;

    #[test]
    fn every_character_resolves_to_a_theme() {
        for name in CHARACTERS {
            // Resolution must never panic and must hand back a full record.
            let theme = theme_for_character(name);
            assert_ne!(theme.nav.dots.active, theme.nav.dots.inactive);
        }
    }

    #[test]
    fn unknown_names_use_the_default_theme() {
        assert_eq!(theme_for_character("nobody"), CRIMSON);
        assert_eq!(theme_for_character("Levi Ackerman"), CRIMSON);
    }

    #[test]
    fn mikasa_uses_the_amber_palette() {
        let theme = theme_for_character("Mikasa Ackerman");
        assert_eq!(theme.header.title, Color::Rgb(245, 158, 11));
    }
}
