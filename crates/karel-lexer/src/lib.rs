//! Karel lexer: converts source text into tokens.
//!
//! The lexer is pull-based: [`Lexer::next_token`] scans exactly one token per
//! call, skipping whitespace and comments first. Once the input is exhausted it
//! keeps returning [`TokenKind::EndOfInput`]. The first malformed character
//! aborts scanning with a [`Diagnostic`](karel_syntax::Diagnostic).
use karel_syntax::error::{error_at, Result};
use karel_syntax::token::{Token, TokenKind};
use tracing::debug;

/// Streaming character scanner that produces tokens with positions.
pub struct Lexer {
    src: Vec<char>,
    pos: usize,
}

impl Lexer {
    /// Create a new lexer over the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            src: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }
    fn peek_next(&self) -> Option<char> {
        self.src.get(self.pos + 1).copied()
    }
    fn advance(&mut self) -> Option<char> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn lexeme(&self, start: usize) -> String {
        self.src[start..self.pos].iter().collect()
    }

    fn verbatim(&mut self, kind: TokenKind, len: usize) -> Token {
        let start = self.pos;
        self.pos += len;
        Token::new(kind, start, self.lexeme(start))
    }

    /// Skips whitespace, `// line` and `/* block */` comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() || c == '\u{b}' => {
                    self.advance();
                }
                Some('/') => match self.peek_next() {
                    Some('/') => {
                        while let Some(c) = self.advance() {
                            if c == '\n' {
                                break;
                            }
                        }
                    }
                    Some('*') => {
                        let start = self.pos;
                        self.pos += 2;
                        loop {
                            match self.advance() {
                                Some('*') if self.peek() == Some('/') => {
                                    self.advance();
                                    break;
                                }
                                Some(_) => {}
                                None => return error_at(start, "unclosed comment: missing */"),
                            }
                        }
                    }
                    _ => return error_at(self.pos + 1, "comments start with // or /*"),
                },
                _ => return Ok(()),
            }
        }
    }

    fn read_number(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        Token::new(TokenKind::Number, start, self.lexeme(start))
    }

    fn read_ident_or_keyword(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }
        let lexeme = self.lexeme(start);
        let kind = TokenKind::keyword(&lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, start, lexeme)
    }

    /// Scan the next token. `EndOfInput` is terminal and returned again on
    /// every later call.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_trivia()?;
        let token = match self.peek() {
            None => Token::new(TokenKind::EndOfInput, self.pos, ""),
            Some('(') => self.verbatim(TokenKind::OpeningParen, 1),
            Some(')') => self.verbatim(TokenKind::ClosingParen, 1),
            Some(',') => self.verbatim(TokenKind::Comma, 1),
            Some(';') => self.verbatim(TokenKind::Semicolon, 1),
            Some('{') => self.verbatim(TokenKind::OpeningBrace, 1),
            Some('}') => self.verbatim(TokenKind::ClosingBrace, 1),
            Some('!') => self.verbatim(TokenKind::Bang, 1),
            Some('&') => {
                if self.peek_next() != Some('&') {
                    return error_at(self.pos + 1, "logical and is &&");
                }
                self.verbatim(TokenKind::AmpersandAmpersand, 2)
            }
            Some('|') => {
                if self.peek_next() != Some('|') {
                    return error_at(self.pos + 1, "logical or is ||");
                }
                self.verbatim(TokenKind::BarBar, 2)
            }
            Some(c) if c.is_ascii_digit() => self.read_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.read_ident_or_keyword(),
            Some(other) => return error_at(self.pos, format!("illegal character {}", other)),
        };
        Ok(token)
    }

    /// Tokenize the entire input into a vector of tokens ending with `EndOfInput`.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EndOfInput;
            tokens.push(token);
            if done {
                break;
            }
        }
        debug!(count = tokens.len(), "tokenized source");
        Ok(tokens)
    }
}
