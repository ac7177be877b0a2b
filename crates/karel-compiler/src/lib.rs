//! Karel compiler: AST -> bytecode.
//!
//! [`compile`] runs the whole front end. Parsing stops at the first problem;
//! whole-program analysis then reports everything it finds, and only a clean
//! program reaches code generation.

pub mod analysis;
mod builder;
pub mod compiler;
pub mod level;

pub use analysis::Analysis;
pub use compiler::CodeGenerator;
pub use level::CurriculumLevel;

use karel_bytecode::Program;
use karel_syntax::ast::Command;
use karel_syntax::error::Diagnostic;

/// Compiles `source` for a run starting at `entry_point`, or at the first
/// command of the program when none is given.
///
/// ```rust
/// use karel_compiler::{compile, CurriculumLevel};
///
/// let program = compile("void main() { turnLeft(); }", None, CurriculumLevel::Basics).unwrap();
/// assert_eq!(program.disassemble(), "100: TRNL\n101: RET\n");
/// ```
pub fn compile(
    source: &str,
    entry_point: Option<&str>,
    level: CurriculumLevel,
) -> Result<Program, Vec<Diagnostic>> {
    let ast = karel_parser::parse(source).map_err(|diagnostic| vec![diagnostic])?;
    let entry_point = match entry_point {
        Some(name) => name,
        None => ast.commands.first().map_or("main", Command::name),
    };
    let analysis = Analysis::new(&ast, entry_point, level);
    let errors = analysis.errors();
    if !errors.is_empty() {
        return Err(errors);
    }
    CodeGenerator::new()
        .generate(&analysis.reachable_commands())
        .map_err(|diagnostic| vec![diagnostic])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn messages(result: Result<Program, Vec<Diagnostic>>) -> Vec<String> {
        result.unwrap_err().into_iter().map(|d| d.message).collect()
    }

    #[test]
    fn parse_errors_are_reported_alone() {
        let errors = compile("void main() { moveForward() }", None, CurriculumLevel::Basics).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("missing ;"), "{}", errors[0].message);
    }

    #[test]
    fn analysis_errors_are_all_reported() {
        let source = "void main() { while (onBeeper()) { pickBeeper(); } main(); }";
        assert_eq!(
            messages(compile(source, None, CurriculumLevel::Basics)),
            [
                "recursion is not allowed until the recursion level",
                "while loops are not allowed until the loops level",
            ]
        );
        assert!(compile(source, None, CurriculumLevel::Recursion).is_ok());
    }

    #[test]
    fn entry_point_defaults_to_the_first_command() {
        let source = "void first() { turnLeft(); } void second() { turnRight(); }";
        let default = compile(source, None, CurriculumLevel::Basics).unwrap();
        assert_eq!(default.disassemble(), "100: TRNL\n101: RET\n");
        let chosen = compile(source, Some("second"), CurriculumLevel::Basics).unwrap();
        assert_eq!(chosen.disassemble(), "100: TRNR\n101: RET\n");
    }

    #[test]
    fn unknown_entry_point() {
        assert_eq!(
            messages(compile("void main() {}", Some("solve"), CurriculumLevel::Basics)),
            ["entry command solve() is not defined"]
        );
    }

    #[test]
    fn compiled_instructions_carry_source_positions() {
        let program = compile("void main() { turnLeft(); }", None, CurriculumLevel::Basics).unwrap();
        let positions: Vec<Option<usize>> = program.code().iter().map(|i| i.position).collect();
        assert_eq!(positions, [Some(14), Some(26)]);
    }
}
