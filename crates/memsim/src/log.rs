use core::{
    fmt,
    str::FromStr,
    sync::atomic::{AtomicBool, AtomicU8, Ordering},
};

use ansi_term::{Color, WithFg};

static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);
static COLOR: AtomicBool = AtomicBool::new(true);

macro_rules! log {
    ($level:expr, $($arg:tt)*) => {
        $crate::log::log($level, format_args!($($arg)*))
    };
}

macro_rules! trace {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Trace, $($arg)*)
    };
}

macro_rules! debug {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Debug, $($arg)*)
    };
}

macro_rules! info {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Info, $($arg)*)
    };
}

macro_rules! warn {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Warn, $($arg)*)
    };
}

macro_rules! error {
    ($($arg:tt)*) => {
        log!($crate::log::LogLevel::Error, $($arg)*)
    };
}

/// Sets the most verbose level that is still printed.
pub fn init(max_level: LogLevel, color: bool) {
    MAX_LEVEL.store(max_level as u8, Ordering::Relaxed);
    COLOR.store(color, Ordering::Relaxed);
}

#[must_use]
pub fn enabled(level: LogLevel) -> bool {
    level as u8 >= MAX_LEVEL.load(Ordering::Relaxed)
}

pub fn log(level: LogLevel, message: fmt::Arguments) {
    if !enabled(level) {
        return;
    }
    let color = COLOR.load(Ordering::Relaxed);
    eprintln!("{} {message}", LevelFormat { level, color });
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("invalid log level `{s}`")),
        }
    }
}

struct LevelFormat {
    level: LogLevel,
    color: bool,
}

impl fmt::Display for LevelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let color = match self.level {
            LogLevel::Trace => Color::Magenta,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        };
        let msg = match self.level {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => " INFO",
            LogLevel::Warn => " WARN",
            LogLevel::Error => "ERROR",
        };
        write!(f, "{}", WithFg::new(color, msg).enabled(self.color))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_levels() {
        assert_eq!("trace".parse::<LogLevel>(), Ok(LogLevel::Trace));
        assert_eq!("error".parse::<LogLevel>(), Ok(LogLevel::Error));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_level_order() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_level_format() {
        let plain = LevelFormat {
            level: LogLevel::Info,
            color: false,
        };
        assert_eq!(plain.to_string(), " INFO");

        let colored = LevelFormat {
            level: LogLevel::Error,
            color: true,
        };
        assert_eq!(colored.to_string(), "\x1B[31;1mERROR\x1B[0m");
    }
}
