//! Recursive-descent parser for Karel programs.
//!
//! The parser pulls tokens from the [`Lexer`] on demand and keeps one token of
//! lookahead. It fails fast: the first problem becomes the [`Diagnostic`] of the
//! whole parse. Completed commands and calls are handed to [`Sema`] as they are
//! parsed, and the inline checks finish once the whole program is known.
//!
//! [`Diagnostic`]: karel_syntax::Diagnostic

use karel_lexer::Lexer;
use karel_syntax::ast::*;
use karel_syntax::error::{error_at, Result};
use karel_syntax::suggest::{did_you_mean, PREDICATES};
use karel_syntax::token::{Token, TokenKind};
use tracing::debug;

use crate::sema::Sema;

/// Template shown whenever something other than a command definition appears
/// at the top level.
pub const EXPECTED_VOID: &str = "Command definitions look like this:

void commandNameHere()
{
    // your code here

}";

pub struct Parser {
    lexer: Lexer,
    token: Token,
    lookahead: Token,
    previous: Token,
    previous_end: usize,
    current_command: String,
    sema: Sema,
}

impl Parser {
    /// Primes the current and lookahead tokens.
    pub fn new(mut lexer: Lexer) -> Result<Self> {
        let token = lexer.next_token()?;
        let lookahead = lexer.next_token()?;
        Ok(Self {
            lexer,
            previous: Token::new(TokenKind::EndOfInput, 0, ""),
            token,
            lookahead,
            previous_end: 0,
            current_command: String::new(),
            sema: Sema::new(),
        })
    }

    fn current(&self) -> TokenKind {
        self.token.kind
    }

    fn next(&mut self) -> Result<()> {
        let following = self.lexer.next_token()?;
        let lookahead = std::mem::replace(&mut self.lookahead, following);
        self.previous = std::mem::replace(&mut self.token, lookahead);
        self.previous_end = self.previous.end();
        Ok(())
    }

    fn accept(&mut self) -> Result<Token> {
        self.next()?;
        Ok(self.previous.clone())
    }

    fn expect(&mut self, expected: TokenKind) -> Result<Token> {
        if self.current() != expected {
            return error_at(self.previous_end, format!("missing {}", expected));
        }
        self.accept()
    }

    fn empty_parens(&mut self) -> Result<()> {
        self.expect(TokenKind::OpeningParen)?;
        self.expect(TokenKind::ClosingParen)?;
        Ok(())
    }

    fn illegal_start_of<T>(&self, rule: &str) -> Result<T> {
        self.token.error(format!("illegal start of {}", rule))
    }

    /// `program := command+`
    pub fn parse_program(&mut self) -> Result<Program> {
        if self.current() != TokenKind::Void {
            return self.token.error(EXPECTED_VOID);
        }
        let mut commands = Vec::new();
        while self.current() != TokenKind::EndOfInput {
            commands.push(self.command()?);
        }
        self.sema.check_calls()?;
        debug!(commands = commands.len(), "parsed program");
        Ok(Program { commands })
    }

    fn command(&mut self) -> Result<Command> {
        let previous_closing_brace = self.previous.clone();
        match self.current() {
            TokenKind::Void => {
                let void = self.accept()?;
                let identifier = self.expect(TokenKind::Identifier)?;
                let parameters = self.parameters()?;
                self.current_command = identifier.lexeme.clone();
                let body = self.block()?;
                let command = Command {
                    void,
                    identifier,
                    parameters,
                    body,
                };
                self.sema.command(&command)?;
                Ok(command)
            }

            TokenKind::ClosingBrace => self
                .token
                .error("remove }\n\nThis closing brace has no opening partner"),

            kind @ (TokenKind::Repeat | TokenKind::While | TokenKind::If) => {
                previous_closing_brace.error(format!(
                    "|\n|\n|\nremove }}\n\nThe command {}() ends here,\nbut the following {}-statement\nstill belongs inside a command",
                    self.current_command, kind
                ))
            }

            TokenKind::Identifier => {
                let identifier = self.accept()?;
                self.empty_parens()?;
                if self.current() == TokenKind::Semicolon {
                    previous_closing_brace.error(format!(
                        "|\n|\n|\nremove }}\n\nThe command {}() ends here,\nbut the following call {}();\nstill belongs inside a command",
                        self.current_command, identifier.lexeme
                    ))
                } else {
                    identifier.error(EXPECTED_VOID)
                }
            }

            _ => self.token.error(EXPECTED_VOID),
        }
    }

    /// `'(' ('void' IDENTIFIER '(' ')' (',' ...)*)? ')'`
    fn parameters(&mut self) -> Result<Vec<Token>> {
        self.expect(TokenKind::OpeningParen)?;
        let mut parameters = Vec::new();
        if self.current() == TokenKind::Void {
            loop {
                self.expect(TokenKind::Void)?;
                parameters.push(self.expect(TokenKind::Identifier)?);
                self.empty_parens()?;
                if self.current() != TokenKind::Comma {
                    break;
                }
                self.next()?;
            }
        }
        self.expect(TokenKind::ClosingParen)?;
        Ok(parameters)
    }

    fn block(&mut self) -> Result<Block> {
        let opening_brace = self.expect(TokenKind::OpeningBrace)?;
        let mut statements = Vec::new();
        while self.current() != TokenKind::ClosingBrace {
            statements.push(self.statement()?);
        }
        let closing_brace = self.accept()?;
        Ok(Block {
            opening_brace,
            statements,
            closing_brace,
        })
    }

    fn statement(&mut self) -> Result<Statement> {
        match self.current() {
            TokenKind::Identifier => {
                let call = self.call()?;
                self.sema.call(&call);
                Ok(Statement::Call(call))
            }

            TokenKind::Repeat => {
                let repeat = self.accept()?;
                self.expect(TokenKind::OpeningParen)?;
                let times = self.expect(TokenKind::Number)?.to_int(2..=4095)?;
                self.expect(TokenKind::ClosingParen)?;
                let body = self.block()?;
                Ok(Statement::Repeat(Repeat { repeat, times, body }))
            }

            TokenKind::While => {
                let while_token = self.accept()?;
                let condition = self.parenthesized_condition()?;
                let body = self.block()?;
                Ok(Statement::While(While {
                    while_token,
                    condition,
                    body,
                }))
            }

            TokenKind::If => Ok(Statement::IfThenElse(self.if_then_else()?)),

            TokenKind::Void => {
                let void = self.accept()?;
                let identifier = self.expect(TokenKind::Identifier)?;
                self.empty_parens()?;
                if self.current() == TokenKind::OpeningBrace {
                    void.error(format!(
                        "missing }}\n\nCannot define command {}()\nINSIDE command {}()\n\nCommand definitions do not nest",
                        identifier.lexeme, self.current_command
                    ))
                } else {
                    void.error(format!(
                        "remove void\n\nYou want to CALL {}(), not DEFINE it, right?",
                        identifier.lexeme
                    ))
                }
            }

            TokenKind::EndOfInput => self.token.error("missing }"),

            _ => self.illegal_start_of("statement"),
        }
    }

    /// `IDENTIFIER '(' (IDENTIFIER (',' IDENTIFIER)*)? ')' ';'`
    fn call(&mut self) -> Result<Call> {
        let target = self.accept()?;
        self.expect(TokenKind::OpeningParen)?;
        let mut arguments = Vec::new();
        if self.current() == TokenKind::Identifier {
            arguments.push(self.accept()?);
            while self.current() == TokenKind::Comma {
                self.next()?;
                arguments.push(self.expect(TokenKind::Identifier)?);
            }
        }
        self.expect(TokenKind::ClosingParen)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Call { target, arguments })
    }

    fn if_then_else(&mut self) -> Result<IfThenElse> {
        let if_token = self.expect(TokenKind::If)?;
        let condition = self.parenthesized_condition()?;
        let then_block = self.block()?;
        let else_branch = if self.current() != TokenKind::Else {
            None
        } else {
            self.next()?;
            let branch = match self.current() {
                TokenKind::OpeningBrace => Statement::Block(self.block()?),
                TokenKind::If => Statement::IfThenElse(self.if_then_else()?),
                _ => return self.previous.error("else must be followed by { or if"),
            };
            Some(Box::new(branch))
        };
        Ok(IfThenElse {
            if_token,
            condition,
            then_block,
            else_branch,
        })
    }

    fn parenthesized_condition(&mut self) -> Result<Condition> {
        self.expect(TokenKind::OpeningParen)?;
        let condition = self.disjunction()?;
        self.expect(TokenKind::ClosingParen)?;
        Ok(condition)
    }

    /// `conjunction ('||' disjunction)?`, so `||` nests to the right.
    fn disjunction(&mut self) -> Result<Condition> {
        let left = self.conjunction()?;
        if self.current() != TokenKind::BarBar {
            return Ok(left);
        }
        let or = self.accept()?;
        let right = self.disjunction()?;
        Ok(Condition::Disjunction(Box::new(left), or, Box::new(right)))
    }

    fn conjunction(&mut self) -> Result<Condition> {
        let left = self.primary_condition()?;
        if self.current() != TokenKind::AmpersandAmpersand {
            return Ok(left);
        }
        let and = self.accept()?;
        let right = self.conjunction()?;
        Ok(Condition::Conjunction(Box::new(left), and, Box::new(right)))
    }

    fn primary_condition(&mut self) -> Result<Condition> {
        match self.current() {
            TokenKind::Identifier => match self.token.lexeme.as_str() {
                "false" => Ok(Condition::False(self.accept()?)),
                "true" => Ok(Condition::True(self.accept()?)),
                name => match Predicate::from_name(name) {
                    Some(predicate) => {
                        let token = self.accept()?;
                        self.empty_parens()?;
                        Ok(Condition::Predicate(predicate, token))
                    }
                    None => Err(did_you_mean(&self.token, None, PREDICATES)),
                },
            },

            TokenKind::Bang => {
                let not = self.accept()?;
                let operand = self.primary_condition()?;
                Ok(Condition::Not(not, Box::new(operand)))
            }

            TokenKind::OpeningParen => self.parenthesized_condition(),

            _ => self.illegal_start_of("condition"),
        }
    }
}
