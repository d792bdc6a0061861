#![no_std]

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Black,
    DarkGray,
    Red,
    LightRed,
    Green,
    LightGreen,
    Yellow,
    LightYellow,
    Blue,
    LightBlue,
    Magenta,
    LightMagenta,
    Cyan,
    LightCyan,
    White,
    LightGray,
    Default,
}

impl Color {
    fn code(self) -> (u8, bool) {
        match self {
            Self::Black => (0, false),
            Self::DarkGray => (0, true),
            Self::Red => (1, false),
            Self::LightRed => (1, true),
            Self::Green => (2, false),
            Self::LightGreen => (2, true),
            Self::Yellow => (3, false),
            Self::LightYellow => (3, true),
            Self::Blue => (4, false),
            Self::LightBlue => (4, true),
            Self::Magenta => (5, false),
            Self::LightMagenta => (5, true),
            Self::Cyan => (6, false),
            Self::LightCyan => (6, true),
            Self::White => (7, false),
            Self::LightGray => (7, true),
            Self::Default => (9, false),
        }
    }

    fn fg(self) -> u8 {
        let (code, light) = self.code();
        if light { code + 90 } else { code + 30 }
    }
}

/// Displays a value in bold with the given foreground colour.
///
/// Colouring can be switched off with [`enabled`](Self::enabled), in which
/// case the value is displayed unchanged.
pub struct WithFg<T> {
    color: Color,
    value: T,
    enabled: bool,
}

impl<T> fmt::Display for WithFg<T>
where
    T: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = &self.value;
        if !self.enabled {
            return write!(f, "{value}");
        }
        let fg = self.color.fg();
        write!(f, "\x1B[{fg};1m{value}\x1B[0m")
    }
}

impl<T> WithFg<T> {
    pub fn new(color: Color, value: T) -> Self {
        Self {
            color,
            value,
            enabled: true,
        }
    }

    #[must_use]
    pub fn enabled(self, enabled: bool) -> Self {
        Self { enabled, ..self }
    }
}
