//! Instruction buffers, compiled programs and goal replays.

use std::fmt::Write as _;
use std::ops::Index;

use crate::builtin::Action;
use crate::instruction::{Instruction, ENTRY_POINT, RETURN};

/// Fresh buffer holding only the reserved prefix: `ENTRY_POINT` synthetic
/// `RETURN`s. Code generation appends to it.
pub fn instruction_buffer() -> Vec<Instruction> {
    vec![Instruction::synthetic(RETURN); ENTRY_POINT]
}

/// A complete executable instruction array, entry point at [`ENTRY_POINT`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    instructions: Vec<Instruction>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self { instructions }
    }

    /// Builds a synthetic replay of `actions`: one instruction per action,
    /// then a final `RETURN`. Nothing in it carries a source position.
    ///
    /// ```rust
    /// use karel_bytecode::{Action, Program};
    ///
    /// let goal = Program::goal(&[Action::TurnLeft, Action::MoveForward]);
    /// assert_eq!(goal.disassemble(), "100: TRNL\n101: MOVE\n102: RET\n");
    /// ```
    pub fn goal(actions: &[Action]) -> Self {
        let mut instructions = instruction_buffer();
        instructions.extend(actions.iter().map(|a| Instruction::synthetic(a.opcode())));
        instructions.push(Instruction::synthetic(RETURN));
        Self::new(instructions)
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Only the compiled part, starting at the entry point.
    pub fn code(&self) -> &[Instruction] {
        self.instructions.get(ENTRY_POINT..).unwrap_or(&[])
    }

    pub fn get(&self, address: usize) -> Option<&Instruction> {
        self.instructions.get(address)
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// `address: mnemonic` lines for every compiled instruction.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (offset, instruction) in self.code().iter().enumerate() {
            let _ = writeln!(out, "{:03x}: {}", ENTRY_POINT + offset, instruction);
        }
        out
    }
}

impl Index<usize> for Program {
    type Output = Instruction;

    fn index(&self, address: usize) -> &Instruction {
        &self.instructions[address]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_reserves_the_goal_prefix() {
        let buffer = instruction_buffer();
        assert_eq!(buffer.len(), ENTRY_POINT);
        assert!(buffer.iter().all(|i| i.bytecode == RETURN && !i.compiled_from_source()));
    }

    #[test]
    fn goal_programs_are_synthetic() {
        let goal = Program::goal(&[Action::PickBeeper, Action::TurnAround]);
        assert_eq!(goal.len(), ENTRY_POINT + 3);
        assert!(goal.code().iter().all(|i| i.position.is_none()));
        assert_eq!(goal[ENTRY_POINT + 2].bytecode, RETURN);
    }
}
