//! Inline semantic checks that run while a program is being parsed.
//!
//! Definitions are checked immediately: a command may neither be defined twice
//! nor reuse the name of a builtin. Calls are only recorded, because they may
//! refer to commands defined further down; [`Sema::check_calls`] resolves them
//! once the whole program has been read.

use std::collections::HashMap;

use karel_syntax::ast::{Call, Command};
use karel_syntax::error::Result;
use karel_syntax::suggest::{did_you_mean, BUILTIN_COMMANDS};
use karel_syntax::token::Token;

/// Calls made inside one command, together with that command's parameters.
struct Caller {
    parameters: Vec<Token>,
    calls: Vec<Call>,
}

pub struct Sema {
    /// Known command names with their parameter counts. Builtins take none.
    commands: HashMap<String, usize>,
    calls_in_current_command: Vec<Call>,
    callers: Vec<Caller>,
}

impl Default for Sema {
    fn default() -> Self {
        Self::new()
    }
}

impl Sema {
    pub fn new() -> Self {
        Self {
            commands: BUILTIN_COMMANDS.iter().map(|name| (name.to_string(), 0)).collect(),
            calls_in_current_command: Vec::new(),
            callers: Vec::new(),
        }
    }

    /// Registers a completed command definition.
    pub fn command(&mut self, command: &Command) -> Result<()> {
        let name = command.name();
        if self.commands.contains_key(name) {
            return command.identifier.error(format!("duplicate command {}", name));
        }
        self.commands.insert(name.to_string(), command.parameters.len());
        self.callers.push(Caller {
            parameters: command.parameters.clone(),
            calls: std::mem::take(&mut self.calls_in_current_command),
        });
        Ok(())
    }

    /// Records a call for resolution at the end of the program.
    pub fn call(&mut self, call: &Call) {
        self.calls_in_current_command.push(call.clone());
    }

    /// Resolves every recorded call, caller by caller.
    ///
    /// Inside a caller its parameters shadow commands of the same name and
    /// take no arguments themselves.
    pub fn check_calls(&mut self) -> Result<()> {
        let callers = std::mem::take(&mut self.callers);
        for caller in &callers {
            let mut shadowed: Vec<(&str, Option<usize>)> = Vec::new();
            for parameter in &caller.parameters {
                let name = parameter.lexeme.as_str();
                if shadowed.iter().any(|(seen, _)| *seen == name) {
                    self.restore(shadowed);
                    return parameter.error(format!("duplicate parameter {}", name));
                }
                shadowed.push((name, self.commands.insert(name.to_string(), 0)));
            }

            let checked = caller.calls.iter().try_for_each(|call| self.check_call(call));
            self.restore(shadowed);
            checked?;
        }
        self.callers = callers;
        Ok(())
    }

    fn check_call(&self, call: &Call) -> Result<()> {
        let parameter_count = self.lookup(&call.target)?;
        let argument_count = call.arguments.len();
        if parameter_count != argument_count {
            return call.target.error(format!(
                "{} takes {} arguments, not {}",
                call.target.lexeme, parameter_count, argument_count
            ));
        }
        for argument in &call.arguments {
            if self.lookup(argument)? != 0 {
                return argument.error("cannot pass higher-order commands");
            }
        }
        Ok(())
    }

    fn restore(&mut self, shadowed: Vec<(&str, Option<usize>)>) {
        for (name, previous) in shadowed.into_iter().rev() {
            match previous {
                Some(count) => self.commands.insert(name.to_string(), count),
                None => self.commands.remove(name),
            };
        }
    }

    fn lookup(&self, target: &Token) -> Result<usize> {
        match self.commands.get(&target.lexeme) {
            Some(&count) => Ok(count),
            None => {
                let headline = format!("undefined command {}", target.lexeme);
                Err(did_you_mean(
                    target,
                    Some(&headline),
                    self.commands.keys().map(String::as_str),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::parse;
    use rstest::rstest;

    #[rstest]
    #[case::duplicate_command(
        "void main() { pickBeeper(); } void main() { dropBeeper(); }",
        "duplicate command main"
    )]
    #[case::redefine_builtin(
        "void turnRight() { turnLeft(); turnLeft(); turnLeft(); }",
        "duplicate command turnRight"
    )]
    #[case::undefined_command("void main() { a(); } void b() { }", "Did you mean b?")]
    #[case::too_many_arguments(
        "void main() { first(moveForward); } void first() { }",
        "first takes 0 arguments, not 1"
    )]
    #[case::too_few_arguments(
        "void main() { second(); } void second(void f()) { }",
        "second takes 1 arguments, not 0"
    )]
    #[case::third_order("void main() { second(second); } void second(void f()) { }", "cannot pass higher-order commands")]
    #[case::parameter_shadows_own_command("void f(void f()) { f(f); }", "f takes 0 arguments, not 1")]
    #[case::shadowing_ends_with_command("void f(void f()) { } void main() { f(); }", "f takes 1 arguments, not 0")]
    #[case::duplicate_parameter("void f(void g(), void g()) { }", "duplicate parameter g")]
    #[case::undefined_argument("void main() { twice(trunLeft); } void twice(void a()) { }", "Did you mean turnLeft?")]
    fn rejected(#[case] source: &str, #[case] expected: &str) {
        let diagnostic = parse(source).unwrap_err();
        assert!(
            diagnostic.message.contains(expected),
            "{:?} does not contain {:?}",
            diagnostic.message,
            expected
        );
    }

    #[test]
    fn forward_calls_resolve_at_end_of_program() {
        assert!(parse("void main() { later(); } void later() { turnLeft(); }").is_ok());
    }

    #[test]
    fn parameters_are_callable_inside_their_command_only() {
        assert!(parse("void twice(void a()) { a(); a(); } void main() { twice(turnLeft); }").is_ok());
        let diagnostic = parse("void twice(void a()) { a(); } void main() { a(); }").unwrap_err();
        assert!(diagnostic.message.starts_with("undefined command a"));
    }

    #[test]
    fn undefined_command_names_the_call_site() {
        let source = "void main() { a(); } void b() { }";
        let diagnostic = parse(source).unwrap_err();
        assert_eq!(diagnostic.message, "undefined command a\n\nDid you mean b?");
        assert_eq!(diagnostic.position, 14);
    }
}
