//! Instruction buffer with forward-jump patching for codegen.

use karel_bytecode::{instruction_buffer, Instruction, BRANCH_FLIP, NOT};
use karel_syntax::token::Token;

pub(crate) struct CodeBuilder {
    code: Vec<Instruction>,
}

impl CodeBuilder {
    /// Starts after the reserved goal prefix.
    pub(crate) fn new() -> Self {
        Self { code: instruction_buffer() }
    }

    pub(crate) fn finish(self) -> Vec<Instruction> {
        self.code
    }

    pub(crate) fn emit(&mut self, bytecode: u16, token: &Token) -> usize {
        self.code.push(Instruction::new(bytecode, Some(token.position)));
        self.code.len() - 1
    }

    pub(crate) fn here(&self) -> usize {
        self.code.len()
    }

    pub(crate) fn instruction(&self, at: usize) -> Instruction {
        self.code[at]
    }

    pub(crate) fn retarget(&mut self, at: usize, target: usize) {
        self.code[at] = self.code[at].with_target(target as u16);
    }

    pub(crate) fn patch_to_here(&mut self, at: usize) {
        let target = self.here();
        self.retarget(at, target);
    }

    /// Drops the `NOT`s that would feed the next branch and returns the mask
    /// that flips that branch once per dropped `NOT`.
    fn remove_negations(&mut self) -> u16 {
        let mut parity = 0;
        while self.code.last().is_some_and(|last| last.bytecode == NOT) {
            self.code.pop();
            parity ^= BRANCH_FLIP;
        }
        parity
    }

    /// Emits a placeholder branch of `category` and returns its address for
    /// [`CodeBuilder::patch_to_here`].
    pub(crate) fn prepare_conditional_jump(&mut self, category: u16, token: &Token) -> usize {
        let parity = self.remove_negations();
        self.emit(category ^ parity, token)
    }

    pub(crate) fn prepare_forward_jump(&mut self, category: u16, token: &Token) -> usize {
        self.emit(category, token)
    }
}
