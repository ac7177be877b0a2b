//! Whole-program analysis: call graph, reachability and curriculum gating.
//!
//! This runs after parsing and may be configured with a different entry point
//! and level than the run that parsed the program, so it re-checks duplicate
//! definitions and undefined calls on its own. Unlike the parser it collects
//! every problem and reports them sorted by source position.

use std::collections::HashMap;

use karel_bytecode::Action;
use karel_syntax::ast::{Command, Program, Statement};
use karel_syntax::error::Diagnostic;
use karel_syntax::suggest::{did_you_mean, BUILTIN_COMMANDS};
use karel_syntax::token::Token;
use tracing::debug;

use crate::level::CurriculumLevel;

pub struct Analysis<'a> {
    program: &'a Program,
    entry_point: &'a str,
    level: CurriculumLevel,
    /// Name to index of its first definition.
    commands: HashMap<&'a str, usize>,
    /// Per command index, the user commands it calls or passes, in source order.
    callees: Vec<Vec<usize>>,
    reachable: Vec<usize>,
}

impl<'a> Analysis<'a> {
    /// Analyzes `program` for a run starting at `entry_point`.
    pub fn new(program: &'a Program, entry_point: &'a str, level: CurriculumLevel) -> Self {
        let mut commands = HashMap::new();
        for (index, command) in program.commands.iter().enumerate() {
            commands.entry(command.name()).or_insert(index);
        }
        let mut analysis = Self {
            program,
            entry_point,
            level,
            commands,
            callees: Vec::new(),
            reachable: Vec::new(),
        };
        analysis.callees = program
            .commands
            .iter()
            .map(|command| analysis.commands_called_by(command))
            .collect();
        analysis.reachable = match analysis.commands.get(entry_point) {
            Some(&entry) => analysis.reachable_from(entry),
            None => Vec::new(),
        };
        debug!(
            entry = entry_point,
            reachable = analysis.reachable.len(),
            "analyzed call graph"
        );
        analysis
    }

    pub fn command(&self, name: &str) -> Option<&'a Command> {
        self.commands.get(name).map(|&index| &self.program.commands[index])
    }

    /// User commands called or passed as arguments by `command`; builtins
    /// and the command's own parameters are not part of the graph.
    pub fn callees_of(&self, command: &Command) -> Vec<&'a Command> {
        match self.commands.get(command.name()) {
            Some(&index) => self.callees[index]
                .iter()
                .map(|&callee| &self.program.commands[callee])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Commands reachable from the entry point, entry point first, each once.
    pub fn reachable_commands(&self) -> Vec<&'a Command> {
        self.reachable
            .iter()
            .map(|&index| &self.program.commands[index])
            .collect()
    }

    fn commands_called_by(&self, command: &Command) -> Vec<usize> {
        let mut callees = Vec::new();
        let mut add = |token: &Token| {
            if command.parameter_index(&token.lexeme).is_none() {
                if let Some(&index) = self.commands.get(token.lexeme.as_str()) {
                    callees.push(index);
                }
            }
        };
        command.body.walk(&mut |statement| {
            if let Statement::Call(call) = statement {
                add(&call.target);
                call.arguments.iter().for_each(&mut add);
            }
        });
        callees
    }

    fn reachable_from(&self, start: usize) -> Vec<usize> {
        let mut visited = vec![false; self.program.commands.len()];
        let mut order = Vec::new();
        self.visit(start, &mut visited, &mut order);
        order
    }

    fn visit(&self, current: usize, visited: &mut [bool], order: &mut Vec<usize>) {
        visited[current] = true;
        order.push(current);
        for &callee in &self.callees[current] {
            if !visited[callee] {
                self.visit(callee, visited, order);
            }
        }
    }

    /// Every semantic problem, sorted by position.
    pub fn errors(&self) -> Vec<Diagnostic> {
        let mut errors = Vec::new();
        errors.extend(self.duplicate_commands());
        errors.extend(self.undefined_commands());
        errors.extend(self.entry_point_problems());
        errors.extend(self.illegal_while_loops());
        errors.extend(self.illegal_recursion());
        errors.sort_by_key(|diagnostic| diagnostic.position);
        errors
    }

    fn duplicate_commands(&self) -> Vec<Diagnostic> {
        let mut errors = Vec::new();
        for (index, command) in self.program.commands.iter().enumerate() {
            let identifier = &command.identifier;
            let first = self.commands[command.name()];
            if first != index {
                let original = self.program.commands[first].identifier.position;
                errors.push(Diagnostic::new(
                    identifier.position,
                    format!(
                        "duplicate command {} was already defined at {}",
                        identifier.lexeme, original
                    ),
                ));
            } else if Action::from_name(command.name()).is_some() {
                errors.push(Diagnostic::new(
                    identifier.position,
                    format!("duplicate command {} is a builtin command", identifier.lexeme),
                ));
            }
        }
        errors
    }

    fn undefined_commands(&self) -> Vec<Diagnostic> {
        let mut errors = Vec::new();
        for command in &self.program.commands {
            let mut check = |token: &Token| {
                let name = token.lexeme.as_str();
                let known = command.parameter_index(name).is_some()
                    || self.commands.contains_key(name)
                    || Action::from_name(name).is_some();
                if !known {
                    let headline = format!("undefined command {}", name);
                    let candidates = self.commands.keys().copied().chain(BUILTIN_COMMANDS);
                    errors.push(did_you_mean(token, Some(&headline), candidates));
                }
            };
            command.body.walk(&mut |statement| {
                if let Statement::Call(call) = statement {
                    check(&call.target);
                    call.arguments.iter().for_each(&mut check);
                }
            });
        }
        errors
    }

    fn entry_point_problems(&self) -> Vec<Diagnostic> {
        match self.command(self.entry_point) {
            None => vec![Diagnostic::new(
                0,
                format!("entry command {}() is not defined", self.entry_point),
            )],
            Some(entry) if !entry.parameters.is_empty() => vec![Diagnostic::new(
                entry.identifier.position,
                format!("entry command {}() cannot take parameters", self.entry_point),
            )],
            Some(_) => Vec::new(),
        }
    }

    fn illegal_while_loops(&self) -> Vec<Diagnostic> {
        if self.level >= CurriculumLevel::Loops {
            return Vec::new();
        }
        let mut errors = Vec::new();
        for command in self.reachable_commands() {
            command.body.walk(&mut |statement| {
                if let Statement::While(whl) = statement {
                    errors.push(Diagnostic::new(
                        whl.while_token.position,
                        format!(
                            "while loops are not allowed until the {} level",
                            CurriculumLevel::Loops
                        ),
                    ));
                }
            });
        }
        errors
    }

    fn illegal_recursion(&self) -> Vec<Diagnostic> {
        if self.level >= CurriculumLevel::Recursion {
            return Vec::new();
        }
        self.recursive_commands()
            .into_iter()
            .map(|command| {
                Diagnostic::new(
                    command.identifier.position,
                    format!(
                        "recursion is not allowed until the {} level",
                        CurriculumLevel::Recursion
                    ),
                )
            })
            .collect()
    }

    /// Reachable commands that can reach themselves again.
    pub fn recursive_commands(&self) -> Vec<&'a Command> {
        self.reachable
            .iter()
            .filter(|&&start| {
                self.callees[start]
                    .iter()
                    .any(|&callee| self.reachable_from(callee).contains(&start))
            })
            .map(|&index| &self.program.commands[index])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use karel_parser::parse;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn names(commands: Vec<&Command>) -> Vec<&str> {
        commands.into_iter().map(Command::name).collect()
    }

    fn errors(source: &str, level: CurriculumLevel) -> Vec<Diagnostic> {
        let program = parse(source).unwrap();
        let entry = program.commands[0].name().to_string();
        Analysis::new(&program, &entry, level).errors()
    }

    #[test]
    fn orphan_is_unreachable() {
        let program = parse(
            "void main() { a(); b(); }
             void a() { b(); }
             void b() { }
             void c() { }",
        )
        .unwrap();
        let analysis = Analysis::new(&program, "main", CurriculumLevel::Basics);

        let main = analysis.command("main").unwrap();
        let a = analysis.command("a").unwrap();
        assert_eq!(names(analysis.callees_of(main)), ["a", "b"]);
        assert_eq!(names(analysis.callees_of(a)), ["b"]);
        assert_eq!(names(analysis.reachable_commands()), ["main", "a", "b"]);
        assert!(analysis.errors().is_empty());
    }

    #[test]
    fn reachability_is_depth_first_from_the_chosen_entry() {
        let program = parse(
            "void x() { y(); z(); }
             void y() { z(); w(); }
             void z() { }
             void w() { x(); }",
        )
        .unwrap();
        let analysis = Analysis::new(&program, "y", CurriculumLevel::Recursion);
        assert_eq!(names(analysis.reachable_commands()), ["y", "z", "w", "x"]);
    }

    #[test]
    fn arguments_are_call_graph_edges() {
        let program = parse(
            "void main() { twice(hop); }
             void twice(void action()) { action(); action(); }
             void hop() { moveForward(); }",
        )
        .unwrap();
        let analysis = Analysis::new(&program, "main", CurriculumLevel::Basics);
        assert_eq!(names(analysis.reachable_commands()), ["main", "twice", "hop"]);
        let twice = analysis.command("twice").unwrap();
        assert!(analysis.callees_of(twice).is_empty());
    }

    #[rstest]
    #[case::week_one_while(
        "void karelsFirstProgram() { moveToWall(); } void moveToWall() { while (frontIsClear()) { moveForward(); } }",
        CurriculumLevel::Basics,
        "while loop"
    )]
    #[case::direct_recursion_basics(
        "void first() { moveToWall(); } void moveToWall() { if (frontIsClear()) { moveForward(); moveToWall(); } }",
        CurriculumLevel::Basics,
        "recursion"
    )]
    #[case::direct_recursion_loops(
        "void first() { moveToWall(); } void moveToWall() { if (frontIsClear()) { moveForward(); moveToWall(); } }",
        CurriculumLevel::Loops,
        "recursion"
    )]
    #[case::indirect_recursion(
        "void main() { a(); } void a() { b(); } void b() { a(); }",
        CurriculumLevel::Loops,
        "recursion"
    )]
    fn gated_constructs(#[case] source: &str, #[case] level: CurriculumLevel, #[case] expected: &str) {
        let errors = errors(source, level);
        assert!(!errors.is_empty());
        for error in errors {
            assert!(error.message.contains(expected), "{}", error.message);
        }
    }

    #[rstest]
    #[case::while_at_loops(
        "void hang() { moveToWall(); } void moveToWall() { while (frontIsClear()) { moveForward(); } }",
        CurriculumLevel::Loops
    )]
    #[case::recursion_at_recursion(
        "void party() { moveToWall(); } void moveToWall() { if (frontIsClear()) { moveForward(); moveToWall(); } }",
        CurriculumLevel::Recursion
    )]
    #[case::unreachable_while_is_ignored(
        "void main() { } void unused() { while (true) { } }",
        CurriculumLevel::Basics
    )]
    fn permitted_constructs(#[case] source: &str, #[case] level: CurriculumLevel) {
        assert_eq!(errors(source, level), vec![]);
    }

    #[test]
    fn indirect_recursion_reports_each_cycle_member_in_order() {
        let source = "void main() { a(); } void a() { b(); } void b() { a(); }";
        let positions: Vec<usize> = errors(source, CurriculumLevel::Basics)
            .iter()
            .map(|e| e.position)
            .collect();
        assert_eq!(positions, [26, 44]);
    }

    #[test]
    fn duplicates_and_undefined_calls_are_rechecked() {
        // The parser already rejects both, so splice two separately parsed
        // programs together.
        let mut commands = parse("void main() { b(); } void b() { }").unwrap().commands;
        let stray = parse("void b() { x(); } void x() { }").unwrap().commands.remove(0);
        commands.push(stray);
        let program = Program { commands };

        let errors = Analysis::new(&program, "main", CurriculumLevel::Basics).errors();
        let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
        assert_eq!(
            messages,
            [
                "duplicate command b was already defined at 26",
                "undefined command x\n\nDid you mean b?",
            ]
        );
    }

    #[test]
    fn missing_entry_point() {
        let program = parse("void main() { }").unwrap();
        let errors = Analysis::new(&program, "start", CurriculumLevel::Basics).errors();
        assert_eq!(errors, vec![Diagnostic::new(0, "entry command start() is not defined")]);
    }

    #[test]
    fn entry_point_cannot_take_parameters() {
        let program = parse("void main(void f()) { f(); }").unwrap();
        let errors = Analysis::new(&program, "main", CurriculumLevel::Basics).errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("cannot take parameters"));
    }
}
