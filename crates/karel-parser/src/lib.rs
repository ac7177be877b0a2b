pub mod parser;
pub mod sema;

pub use parser::{Parser, EXPECTED_VOID};
pub use sema::Sema;

use karel_lexer::Lexer;
use karel_syntax::ast::Program;
use karel_syntax::error::Result;

/// Lexes and parses `source`, running the inline semantic checks.
pub fn parse(source: &str) -> Result<Program> {
    Parser::new(Lexer::new(source))?.parse_program()
}
