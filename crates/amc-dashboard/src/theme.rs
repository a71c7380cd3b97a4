use ratatui::style::{Color, Modifier, Style};

#[derive(Clone, Copy)]
pub struct Theme {
    pub bg: Color,
    pub surface: Color,
    pub border: Color,
    pub title: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub ok: Color,
    pub warn: Color,
    pub critical: Color,
}

pub fn mission_theme() -> Theme {
    Theme {
        bg: Color::Rgb(15, 12, 36),
        surface: Color::Rgb(27, 22, 58),
        border: Color::Rgb(88, 80, 140),
        title: Color::Rgb(103, 232, 249),
        text: Color::Rgb(226, 232, 240),
        muted: Color::Rgb(196, 181, 253),
        accent: Color::Rgb(192, 132, 252),
        ok: Color::Rgb(74, 222, 128),
        warn: Color::Rgb(250, 204, 21),
        critical: Color::Rgb(248, 113, 113),
    }
}

pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(67, 56, 122))
    .fg(Color::White)
    .add_modifier(Modifier::BOLD);

pub fn health_color(score: u8, theme: Theme) -> Color {
    match score {
        80..=100 => theme.ok,
        50..=79 => theme.warn,
        _ => theme.critical,
    }
}

/// Color for a usage ratio in 0..=1 where higher is worse.
pub fn load_color(ratio: f64, theme: Theme) -> Color {
    if ratio >= 0.9 {
        theme.critical
    } else if ratio >= 0.7 {
        theme.warn
    } else {
        theme.ok
    }
}

pub fn availability_color(up: bool, theme: Theme) -> Color {
    if up {
        theme.ok
    } else {
        theme.critical
    }
}
