#![no_std]

extern crate alloc;

use alloc::{boxed::Box, string::String};
use core::{error::Error, fmt};

use ansi_term::{Color, WithFg};
use snafu::{GenerateImplicitData, Snafu};

/// The source location where an error was constructed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Location(&'static core::panic::Location<'static>);

impl Default for Location {
    #[track_caller]
    fn default() -> Self {
        Self(core::panic::Location::caller())
    }
}

impl GenerateImplicitData for Location {
    #[track_caller]
    fn generate() -> Self {
        Self::default()
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Snafu)]
#[snafu(whatever, display("{message}"))]
pub struct GenericError {
    message: String,
    #[snafu(implicit)]
    location: Location,
    #[snafu(source(from(Box<dyn core::error::Error>, Some)))]
    source: Option<Box<dyn core::error::Error>>,
}

impl GenericError {
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}

/// Renders an error together with its chain of sources.
pub struct Report<E> {
    error: E,
    color: bool,
}

impl<E> fmt::Debug for Report<E>
where
    E: Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<E> fmt::Display for Report<E>
where
    E: Error,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Error: {}", self.red(&self.error))?;
        let mut source = self.error.source();
        if source.is_some() {
            writeln!(f)?;
            writeln!(f, "Caused by:")?;
        }
        let mut index = 0;
        while let Some(s) = source {
            writeln!(f, "{index:4}: {}", self.red(s))?;
            source = s.source();
            index += 1;
        }
        Ok(())
    }
}

impl<E> Report<E> {
    pub fn new(error: E) -> Self {
        Self { error, color: true }
    }

    fn red<T>(&self, value: T) -> WithFg<T> {
        WithFg::new(Color::Red, value).enabled(self.color)
    }

    /// Enables or disables ANSI colours in the rendered report.
    #[must_use]
    pub fn with_color(self, color: bool) -> Self {
        Self { color, ..self }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::ToString as _;

    use snafu::{FromString as _, ResultExt as _};

    use super::*;

    #[derive(Debug, Snafu)]
    enum InnerError {
        #[snafu(display("inner failure"))]
        Inner,
    }

    fn fails() -> Result<(), GenericError> {
        InnerSnafu.fail::<()>().whatever_context("outer failure")
    }

    #[test]
    fn test_report_lists_sources() {
        let report = Report::new(fails().unwrap_err()).with_color(false);
        assert_eq!(
            report.to_string(),
            "Error: outer failure\n\nCaused by:\n   0: inner failure\n"
        );
    }

    #[test]
    fn test_report_without_source() {
        let err = GenericError::without_source("nothing to see".into());
        let report = Report::new(err).with_color(false);
        assert_eq!(report.to_string(), "Error: nothing to see\n");
    }

    #[test]
    fn test_location_points_at_caller() {
        let err = fails().unwrap_err();
        assert!(err.location().to_string().contains("lib.rs"));
    }
}
