//! Diagnostics shared by every stage of the Karel toolchain.
//!
//! A [`Diagnostic`] pins a human-readable message to a character offset in the
//! source text. Lexing and parsing stop at the first diagnostic; semantic
//! analysis collects several and reports them sorted by position.
//!
//! # Examples
//!
//! ```rust
//! use karel_syntax::error::{Diagnostic, Result, error_at};
//!
//! fn expect_positive(n: i32, position: usize) -> Result<i32> {
//!     if n > 0 {
//!         Ok(n)
//!     } else {
//!         error_at(position, format!("{} is not positive", n))
//!     }
//! }
//!
//! let diagnostic = expect_positive(0, 7).unwrap_err();
//! assert_eq!(diagnostic.position, 7);
//! assert_eq!(diagnostic.to_string(), "0 is not positive at 7");
//! ```

use std::fmt;

use serde::Serialize;

/// A problem found in Karel source code.
///
/// # Fields
///
/// - `position`: 0-based character offset where the problem starts
/// - `message`: Human-readable description, possibly spanning several lines
/// - `highlight_len`: Optional number of characters an editor should mark,
///   used when only part of a word is wrong (e.g. a misspelled suffix)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Character offset in the source text (0-based)
    pub position: usize,

    /// Human-readable error message
    pub message: String,

    /// Number of characters to highlight starting at `position`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight_len: Option<usize>,
}

impl Diagnostic {
    /// Creates a diagnostic at the given character offset.
    ///
    /// ```rust
    /// use karel_syntax::Diagnostic;
    ///
    /// let diagnostic = Diagnostic::new(12, "missing ;");
    /// assert_eq!(diagnostic.highlight_len, None);
    /// ```
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
            highlight_len: None,
        }
    }

    /// Creates a diagnostic that marks `highlight_len` characters.
    pub fn with_highlight(position: usize, message: impl Into<String>, highlight_len: usize) -> Self {
        Self {
            position,
            message: message.into(),
            highlight_len: Some(highlight_len),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for Diagnostic {}

/// A specialized `Result` type for lexing and parsing.
///
/// Uses [`Diagnostic`] as the error type; the first diagnostic aborts the
/// compile attempt.
pub type Result<T> = std::result::Result<T, Diagnostic>;

/// Convenience function to create an error result at a source position.
///
/// Shorthand for `Err(Diagnostic::new(position, msg))`.
///
/// ```rust
/// use karel_syntax::error::{Result, error_at};
///
/// fn reject(position: usize) -> Result<()> {
///     error_at(position, "illegal character @")
/// }
///
/// assert!(reject(3).is_err());
/// ```
pub fn error_at<T>(position: usize, msg: impl Into<String>) -> Result<T> {
    Err(Diagnostic::new(position, msg))
}

/// Maps a character offset to a 1-based `(line, column)` pair.
///
/// Offsets past the end of `source` map to the position just after the last
/// character.
///
/// ```rust
/// use karel_syntax::error::line_and_column;
///
/// assert_eq!(line_and_column("void main() {\n}", 14), (2, 1));
/// ```
pub fn line_and_column(source: &str, position: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for c in source.chars().take(position) {
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
