use std::fmt;

use crate::types::Location;

/// Errors produced when parsing DSL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    message: String,
    location: Location,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, location: Location) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }

    /// Build an error pointing at a byte offset into `input`.
    pub(crate) fn at_offset(input: &str, offset: usize, message: impl Into<String>) -> Self {
        Self::new(message, locate(input, offset))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }
}

/// 1-based line and column of a byte offset.
pub(crate) fn locate(input: &str, offset: usize) -> Location {
    let offset = offset.min(input.len());
    let before = &input[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    Location { line, column }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}
