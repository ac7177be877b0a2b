//! AST (abstract syntax tree) types for the Karel language.
//!
//! Nodes keep the tokens they were parsed from; those tokens are used for
//! diagnostics and for mapping bytecode back to source positions.

use crate::token::Token;

/// Entire program: one or more command definitions.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub commands: Vec<Command>,
}

/// `void name(void p(), ...) { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub void: Token,
    pub identifier: Token,
    pub parameters: Vec<Token>,
    pub body: Block,
}

impl Command {
    pub fn name(&self) -> &str {
        &self.identifier.lexeme
    }

    /// Index of the parameter called `name`, if this command declares one.
    pub fn parameter_index(&self, name: &str) -> Option<usize> {
        self.parameters.iter().position(|p| p.lexeme == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub opening_brace: Token,
    pub statements: Vec<Statement>,
    pub closing_brace: Token,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Call(Call),
    Repeat(Repeat),
    IfThenElse(IfThenElse),
    While(While),
    Block(Block),
}

/// `target(arg, ...);`
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub target: Token,
    pub arguments: Vec<Token>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Repeat {
    pub repeat: Token,
    pub times: u16,
    pub body: Block,
}

/// `else` holds a statement rather than a block so that `else if` chains
/// need no extra nesting.
#[derive(Debug, Clone, PartialEq)]
pub struct IfThenElse {
    pub if_token: Token,
    pub condition: Condition,
    pub then_block: Block,
    pub else_branch: Option<Box<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub while_token: Token,
    pub condition: Condition,
    pub body: Block,
}

/// The five builtin world queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Predicate {
    OnBeeper,
    BeeperAhead,
    LeftIsClear,
    FrontIsClear,
    RightIsClear,
}

impl Predicate {
    pub fn from_name(name: &str) -> Option<Predicate> {
        match name {
            "onBeeper" => Some(Predicate::OnBeeper),
            "beeperAhead" => Some(Predicate::BeeperAhead),
            "leftIsClear" => Some(Predicate::LeftIsClear),
            "frontIsClear" => Some(Predicate::FrontIsClear),
            "rightIsClear" => Some(Predicate::RightIsClear),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    False(Token),
    True(Token),
    Predicate(Predicate, Token),
    Not(Token, Box<Condition>),
    Conjunction(Box<Condition>, Token, Box<Condition>),
    Disjunction(Box<Condition>, Token, Box<Condition>),
}

impl Block {
    /// Visits every statement in this block in source order, descending into
    /// nested blocks, loop bodies and both branches of conditionals.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Statement)) {
        for statement in &self.statements {
            statement.walk(visit);
        }
    }
}

impl Statement {
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Statement)) {
        visit(self);
        match self {
            Statement::Call(_) => {}
            Statement::Repeat(repeat) => repeat.body.walk(visit),
            Statement::While(whl) => whl.body.walk(visit),
            Statement::Block(block) => block.walk(visit),
            Statement::IfThenElse(ite) => {
                ite.then_block.walk(visit);
                if let Some(else_branch) = &ite.else_branch {
                    else_branch.walk(visit);
                }
            }
        }
    }
}
