//! Bytecode generation from the analyzed AST.

use std::collections::HashMap;

use karel_bytecode::{
    predicate_opcode, Action, CallTarget, Instruction, Program, AND, ELSE, FALSE, JUMP, LOOP,
    MAX_PROGRAM_SIZE, NOT, OR, PUSH, RETURN, TRUE,
};
use karel_syntax::ast::{Block, Call, Command, Condition, Statement};
use karel_syntax::error::{Diagnostic, Result};
use karel_syntax::token::Token;
use tracing::debug;

use crate::builder::CodeBuilder;

/// Emits the commands it is given back to back, the first one at the entry
/// point. Calls are emitted with dense command ids and rewritten to
/// addresses once every command has been placed.
pub struct CodeGenerator<'a> {
    builder: CodeBuilder,
    ids: HashMap<&'a str, u16>,
    /// Command id to the address of its first instruction.
    start: HashMap<u16, usize>,
    /// Addresses of instructions whose operand is still a command id.
    pending: Vec<usize>,
}

impl Default for CodeGenerator<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CodeGenerator<'a> {
    pub fn new() -> Self {
        Self {
            builder: CodeBuilder::new(),
            ids: HashMap::new(),
            start: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// `commands` must already have passed analysis: every called name is a
    /// parameter, a builtin or one of `commands`.
    pub fn generate(mut self, commands: &[&'a Command]) -> Result<Program> {
        for &command in commands {
            self.command(command);
        }
        let size = self.builder.here();
        if size > MAX_PROGRAM_SIZE {
            let position = commands.first().map_or(0, |c| c.identifier.position);
            return Err(Diagnostic::new(position, "program too long"));
        }
        self.translate_calls()?;
        debug!(commands = commands.len(), size, "generated bytecode");
        Ok(Program::new(self.builder.finish()))
    }

    fn id(&mut self, name: &'a str) -> u16 {
        let next = self.ids.len() as u16;
        *self.ids.entry(name).or_insert(next)
    }

    fn translate_calls(&mut self) -> Result<()> {
        for at in std::mem::take(&mut self.pending) {
            let instruction = self.builder.instruction(at);
            let Some(&address) = self.start.get(&instruction.target()) else {
                return Err(unknown_bytecode(instruction));
            };
            self.builder.retarget(at, address);
        }
        Ok(())
    }

    fn command(&mut self, command: &'a Command) {
        let id = self.id(command.name());
        self.start.insert(id, self.builder.here());
        self.block(command, &command.body);
        self.builder.emit(RETURN, &command.body.closing_brace);
    }

    fn block(&mut self, command: &'a Command, block: &'a Block) {
        for statement in &block.statements {
            self.statement(command, statement);
        }
    }

    fn statement(&mut self, command: &'a Command, statement: &'a Statement) {
        match statement {
            Statement::Block(block) => self.block(command, block),
            Statement::IfThenElse(ite) => {
                self.condition(&ite.condition);
                let over_then = self.builder.prepare_conditional_jump(ELSE, &ite.if_token);
                self.block(command, &ite.then_block);
                match &ite.else_branch {
                    None => self.builder.patch_to_here(over_then),
                    Some(else_branch) => {
                        let over_else = self
                            .builder
                            .prepare_forward_jump(JUMP, &ite.then_block.closing_brace);
                        self.builder.patch_to_here(over_then);
                        self.statement(command, else_branch);
                        self.builder.patch_to_here(over_else);
                    }
                }
            }
            Statement::While(whl) => {
                let back = self.builder.here() as u16;
                self.condition(&whl.condition);
                let over = self.builder.prepare_conditional_jump(ELSE, &whl.while_token);
                self.block(command, &whl.body);
                self.builder.emit(JUMP | back, &whl.body.closing_brace);
                self.builder.patch_to_here(over);
            }
            Statement::Repeat(repeat) => {
                self.builder.emit(PUSH | repeat.times, &repeat.repeat);
                let back = self.builder.here() as u16;
                self.block(command, &repeat.body);
                self.builder.emit(LOOP | back, &repeat.body.closing_brace);
            }
            Statement::Call(call) => self.call(command, call),
        }
    }

    fn call(&mut self, command: &'a Command, call: &'a Call) {
        for argument in &call.arguments {
            let target = self.resolve(command, &argument.lexeme);
            self.emit_target(target.argument_bytecode(), target, argument);
        }
        let target = self.resolve(command, &call.target.lexeme);
        self.emit_target(target.call_bytecode(), target, &call.target);
    }

    /// Parameters shadow builtins, builtins shadow user commands.
    fn resolve(&mut self, command: &Command, name: &'a str) -> CallTarget {
        if let Some(index) = command.parameter_index(name) {
            CallTarget::Parameter((command.parameters.len() - index) as u16)
        } else if let Some(action) = Action::from_name(name) {
            CallTarget::Builtin(action)
        } else {
            CallTarget::Direct(self.id(name))
        }
    }

    fn emit_target(&mut self, bytecode: u16, target: CallTarget, token: &Token) {
        let at = self.builder.emit(bytecode, token);
        if target.needs_patch() {
            self.pending.push(at);
        }
    }

    fn condition(&mut self, condition: &Condition) {
        match condition {
            Condition::False(token) => {
                self.builder.emit(FALSE, token);
            }
            Condition::True(token) => {
                self.builder.emit(TRUE, token);
            }
            Condition::Predicate(predicate, token) => {
                self.builder.emit(predicate_opcode(*predicate), token);
            }
            Condition::Not(not, p) => {
                self.condition(p);
                self.builder.emit(NOT, not);
            }
            Condition::Conjunction(p, and, q) => {
                self.condition(p);
                self.condition(q);
                self.builder.emit(AND, and);
            }
            Condition::Disjunction(p, or, q) => {
                self.condition(p);
                self.condition(q);
                self.builder.emit(OR, or);
            }
        }
    }
}

fn unknown_bytecode(instruction: Instruction) -> Diagnostic {
    Diagnostic::new(
        instruction.position.unwrap_or(0),
        format!("unknown bytecode {:04x}", instruction.bytecode),
    )
}

#[cfg(test)]
mod tests {
    use karel_bytecode::*;
    use pretty_assertions::assert_eq;

    use crate::{compile, CurriculumLevel};

    fn assert_bytecode(source: &str, expected: &[u16]) {
        let program = compile(source, None, CurriculumLevel::Recursion).unwrap();
        let expected: Vec<String> = expected.iter().map(|b| format!("{:04x}", b)).collect();
        let actual: Vec<String> =
            program.code().iter().map(|i| format!("{:04x}", i.bytecode)).collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn basic_commands() {
        assert_bytecode(
            "void main() { moveForward(); turnLeft(); turnAround(); turnRight(); pickBeeper(); dropBeeper(); }",
            &[MOVE_FORWARD, TURN_LEFT, TURN_AROUND, TURN_RIGHT, PICK_BEEPER, DROP_BEEPER, RETURN],
        );
    }

    #[test]
    fn calls_are_patched_to_addresses() {
        assert_bytecode(
            "
            void main() {
                moveForward();
                turns();
                moveForward();
                beepers();
                moveForward();
            }

            void turns() {
                turnLeft();
                turnAround();
                turnRight();
            }

            void beepers() {
                pickBeeper();
                dropBeeper();
            }
            ",
            &[
                MOVE_FORWARD,
                CALL | 0x106,
                MOVE_FORWARD,
                CALL | 0x10a,
                MOVE_FORWARD,
                RETURN,
                TURN_LEFT,
                TURN_AROUND,
                TURN_RIGHT,
                RETURN,
                PICK_BEEPER,
                DROP_BEEPER,
                RETURN,
            ],
        );
    }

    #[test]
    fn repeat() {
        assert_bytecode(
            "void main() { repeat (9) { moveForward(); } }",
            &[PUSH | 9, MOVE_FORWARD, LOOP | 0x101, RETURN],
        );
    }

    #[test]
    fn nested_repeat() {
        assert_bytecode(
            "void main() { repeat (4) { repeat (9) { moveForward(); } } }",
            &[PUSH | 4, PUSH | 9, MOVE_FORWARD, LOOP | 0x102, LOOP | 0x101, RETURN],
        );
    }

    #[test]
    fn if_then() {
        assert_bytecode(
            "void main() { if (onBeeper()) { pickBeeper(); } }",
            &[ON_BEEPER, ELSE | 0x103, PICK_BEEPER, RETURN],
        );
        assert_bytecode(
            "void main() { if (!onBeeper()) { dropBeeper(); } }",
            &[ON_BEEPER, THEN | 0x103, DROP_BEEPER, RETURN],
        );
    }

    #[test]
    fn if_then_else() {
        assert_bytecode(
            "void main() { if (onBeeper()) { pickBeeper(); } else { dropBeeper(); } }",
            &[ON_BEEPER, ELSE | 0x104, PICK_BEEPER, JUMP | 0x105, DROP_BEEPER, RETURN],
        );
        assert_bytecode(
            "void main() { if (!onBeeper()) { dropBeeper(); } else { pickBeeper(); } }",
            &[ON_BEEPER, THEN | 0x104, DROP_BEEPER, JUMP | 0x105, PICK_BEEPER, RETURN],
        );
    }

    #[test]
    fn conjunction_keeps_inner_negations() {
        assert_bytecode(
            "void main() { if (!leftIsClear() && !frontIsClear() && !rightIsClear()) { turnAround(); } }",
            &[
                LEFT_IS_CLEAR,
                NOT,
                FRONT_IS_CLEAR,
                NOT,
                RIGHT_IS_CLEAR,
                NOT,
                AND,
                AND,
                ELSE | 0x10a,
                TURN_AROUND,
                RETURN,
            ],
        );
    }

    #[test]
    fn negated_disjunction_flips_the_branch() {
        assert_bytecode(
            "void main() { if (!(leftIsClear() || frontIsClear() || rightIsClear())) { turnAround(); } }",
            &[
                LEFT_IS_CLEAR,
                FRONT_IS_CLEAR,
                RIGHT_IS_CLEAR,
                OR,
                OR,
                THEN | 0x107,
                TURN_AROUND,
                RETURN,
            ],
        );
    }

    #[test]
    fn else_if_chain() {
        assert_bytecode(
            "
            void main() {
                if (leftIsClear()) {
                    turnLeft();
                } else if (frontIsClear()) {
                } else if (rightIsClear()) {
                    turnRight();
                } else {
                    turnAround();
                }
            }
            ",
            &[
                LEFT_IS_CLEAR,
                ELSE | 0x104,
                TURN_LEFT,
                JUMP | 0x10c,
                FRONT_IS_CLEAR,
                ELSE | 0x107,
                JUMP | 0x10c,
                RIGHT_IS_CLEAR,
                ELSE | 0x10b,
                TURN_RIGHT,
                JUMP | 0x10c,
                TURN_AROUND,
                RETURN,
            ],
        );
    }

    #[test]
    fn while_loop() {
        assert_bytecode(
            "void hangTheLampions() { while (beeperAhead()) { moveForward(); pickBeeper(); } }",
            &[BEEPER_AHEAD, ELSE | 0x105, MOVE_FORWARD, PICK_BEEPER, JUMP | 0x100, RETURN],
        );
    }

    #[test]
    fn recursion() {
        assert_bytecode(
            "
            void partyAgain() {
                if (!frontIsClear()) {
                    turnAround();
                } else {
                    moveForward();
                    partyAgain();
                    moveForward();
                }
            }
            ",
            &[
                FRONT_IS_CLEAR,
                THEN | 0x104,
                TURN_AROUND,
                JUMP | 0x107,
                MOVE_FORWARD,
                CALL | 0x100,
                MOVE_FORWARD,
                RETURN,
            ],
        );
    }

    #[test]
    fn negation_parity() {
        assert_bytecode(
            "void main() { if (!!!onBeeper()) { dropBeeper(); } }",
            &[ON_BEEPER, THEN | 0x103, DROP_BEEPER, RETURN],
        );
        assert_bytecode(
            "void main() { if (!!!!frontIsClear()) { moveForward(); } }",
            &[FRONT_IS_CLEAR, ELSE | 0x103, MOVE_FORWARD, RETURN],
        );
    }

    #[test]
    fn boolean_literals() {
        assert_bytecode(
            "void hangTheLampions() { while (true) { turnLeft(); } }",
            &[TRUE, ELSE | 0x104, TURN_LEFT, JUMP | 0x100, RETURN],
        );
        assert_bytecode(
            "void main() { if (false) { turnAround(); moveForward(); turnAround(); } }",
            &[FALSE, ELSE | 0x105, TURN_AROUND, MOVE_FORWARD, TURN_AROUND, RETURN],
        );
    }

    #[test]
    fn builtin_arguments_are_passed_by_opcode() {
        assert_bytecode(
            "void main() { twice(turnLeft); } void twice(void action()) { action(); action(); }",
            &[PASS | TURN_LEFT, CALL | 0x103, RETURN, CALP | 1, CALP | 1, RETURN],
        );
    }

    #[test]
    fn command_arguments_are_patched_like_calls() {
        assert_bytecode(
            "void main() { twice(hop); } void twice(void a()) { a(); a(); } void hop() { moveForward(); }",
            &[PASS | 0x106, CALL | 0x103, RETURN, CALP | 1, CALP | 1, RETURN, MOVE_FORWARD, RETURN],
        );
    }

    #[test]
    fn parameters_are_forwarded_counting_from_the_last() {
        assert_bytecode(
            "
            void main() { outer(turnLeft, turnRight); }
            void outer(void a(), void b()) { inner(b); a(); }
            void inner(void c()) { c(); }
            ",
            &[
                PASS | TURN_LEFT,
                PASS | TURN_RIGHT,
                CALL | 0x104,
                RETURN,
                FWRD | 1,
                CALL | 0x108,
                CALP | 2,
                RETURN,
                CALP | 1,
                RETURN,
            ],
        );
    }

    #[test]
    fn only_reachable_commands_are_emitted() {
        let source = "void unused() { turnLeft(); } void main() { moveForward(); }";
        let program = compile(source, Some("main"), CurriculumLevel::Basics).unwrap();
        assert_eq!(program.disassemble(), "100: MOVE\n101: RET\n");
    }

    #[test]
    fn no_negation_feeds_a_branch() {
        let sources = [
            "void main() { while (!!frontIsClear() && !onBeeper()) { moveForward(); } }",
            "void main() { if (!(true || !false)) { turnLeft(); } else if (!!!rightIsClear()) { turnRight(); } }",
            "void main() { if (!leftIsClear() || !beeperAhead()) { turnAround(); } }",
        ];
        for source in sources {
            let program = compile(source, None, CurriculumLevel::Loops).unwrap();
            for pair in program.code().windows(2) {
                let branches = matches!(pair[1].category(), ELSE | THEN);
                assert!(!(branches && pair[0].bytecode == NOT), "{}", program.disassemble());
            }
        }
    }

    #[test]
    fn generation_is_deterministic() {
        let source = "
            void main() { a(); b(); a(); }
            void b() { repeat (3) { a(); } c(turnLeft); }
            void a() { moveForward(); }
            void c(void x()) { x(); }
        ";
        let first = compile(source, None, CurriculumLevel::Basics).unwrap();
        let second = compile(source, None, CurriculumLevel::Basics).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn overlong_programs_are_rejected() {
        let body = "moveForward();".repeat(MAX_PROGRAM_SIZE);
        let source = format!("void main() {{ {} }}", body);
        let errors = compile(&source, None, CurriculumLevel::Basics).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "program too long");
    }
}
