//! Token definitions for the Karel language.
//!
//! Tokens are the smallest meaningful units of Karel source code: the five
//! keywords, punctuation, number literals and identifiers. Predicate names such
//! as `onBeeper` and the literals `true`/`false` are plain identifiers at this
//! level; the parser gives them their meaning.
//!
//! # Examples
//!
//! ```rust
//! use karel_syntax::{Token, TokenKind};
//!
//! let keyword = Token::new(TokenKind::Void, 0, "void");
//! let name = Token::new(TokenKind::Identifier, 5, "main");
//!
//! assert_eq!(keyword.end(), 4);
//! assert_eq!(name.to_string(), "main");
//! ```

use std::fmt;
use std::ops::RangeInclusive;

use crate::error::{error_at, Result};

/// Token types that can be produced by the Karel lexer.
///
/// Keywords are recognized by exact lexeme lookup (see [`TokenKind::keyword`]);
/// every other letter/underscore run is an [`Identifier`](TokenKind::Identifier).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // === Keywords ===
    /// `void`, starts a command definition or a parameter
    Void,
    /// `repeat`
    Repeat,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,

    // === Punctuation ===
    /// `(`
    OpeningParen,
    /// `)`
    ClosingParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `{`
    OpeningBrace,
    /// `}`
    ClosingBrace,
    /// `!`
    Bang,
    /// `&&`
    AmpersandAmpersand,
    /// `||`
    BarBar,

    // === Literals ===
    /// A run of decimal digits without sign
    Number,
    /// A letter/underscore run that is not a keyword
    Identifier,

    /// Terminal marker, returned again on every further request
    EndOfInput,
}

impl TokenKind {
    /// Canonical spelling used in diagnostics such as `missing ;`.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Void => "void",
            TokenKind::Repeat => "repeat",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::While => "while",
            TokenKind::OpeningParen => "(",
            TokenKind::ClosingParen => ")",
            TokenKind::Comma => ",",
            TokenKind::Semicolon => ";",
            TokenKind::OpeningBrace => "{",
            TokenKind::ClosingBrace => "}",
            TokenKind::Bang => "!",
            TokenKind::AmpersandAmpersand => "&&",
            TokenKind::BarBar => "||",
            TokenKind::Number => "NUMBER",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::EndOfInput => "END OF INPUT",
        }
    }

    /// Looks up a keyword by its exact lexeme.
    ///
    /// ```rust
    /// use karel_syntax::TokenKind;
    ///
    /// assert_eq!(TokenKind::keyword("while"), Some(TokenKind::While));
    /// assert_eq!(TokenKind::keyword("While"), None);
    /// assert_eq!(TokenKind::keyword("onBeeper"), None);
    /// ```
    pub fn keyword(lexeme: &str) -> Option<TokenKind> {
        match lexeme {
            "void" => Some(TokenKind::Void),
            "repeat" => Some(TokenKind::Repeat),
            "if" => Some(TokenKind::If),
            "else" => Some(TokenKind::Else),
            "while" => Some(TokenKind::While),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A token together with the source text it was scanned from.
///
/// # Fields
///
/// - `kind`: The syntactic category of the token
/// - `position`: 0-based character offset of the first character
/// - `lexeme`: The exact source text of the token (empty for end of input)
///
/// Tokens are immutable once scanned. AST nodes keep the tokens they were
/// built from so later stages can point diagnostics and the debugger at the
/// right place in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The syntactic category of this token
    pub kind: TokenKind,

    /// Character offset in the source text (0-based)
    pub position: usize,

    /// Exact source text
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, position: usize, lexeme: impl Into<String>) -> Self {
        Self {
            kind,
            position,
            lexeme: lexeme.into(),
        }
    }

    /// Offset just past the last character of this token.
    pub fn end(&self) -> usize {
        self.position + self.lexeme.chars().count()
    }

    /// Fails with a diagnostic positioned at the start of this token.
    pub fn error<T>(&self, msg: impl Into<String>) -> Result<T> {
        error_at(self.position, msg)
    }

    /// Parses a `NUMBER` lexeme, requiring it to lie within `range`.
    ///
    /// Values that overflow are reported the same way as values outside the
    /// range, quoting the source text.
    ///
    /// ```rust
    /// use karel_syntax::{Token, TokenKind};
    ///
    /// let nine = Token::new(TokenKind::Number, 7, "9");
    /// assert_eq!(nine.to_int(2..=4095).unwrap(), 9);
    ///
    /// let huge = Token::new(TokenKind::Number, 7, "99999999999");
    /// let diagnostic = huge.to_int(2..=4095).unwrap_err();
    /// assert_eq!(diagnostic.message, "99999999999 out of range 2..4095");
    /// ```
    pub fn to_int(&self, range: RangeInclusive<u16>) -> Result<u16> {
        match self.lexeme.parse::<u16>() {
            Ok(n) if range.contains(&n) => Ok(n),
            _ => self.error(format!(
                "{} out of range {}..{}",
                self.lexeme,
                range.start(),
                range.end()
            )),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Number | TokenKind::Identifier => f.write_str(&self.lexeme),
            kind => f.write_str(kind.describe()),
        }
    }
}
