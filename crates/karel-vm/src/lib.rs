//! Karel VM: executes Karel bytecode one pause point at a time.
//!
//! The VM never runs on its own. Every call to [`Vm::step_into`],
//! [`Vm::step_over`], [`Vm::step_return`] or [`Vm::run`] does a bounded
//! amount of work and hands control back to the caller.

pub mod display;
pub mod vm;

pub use display::{format_stack, format_stack_value};
pub use vm::{Vm, DEFAULT_TIMEOUT};

use karel_bytecode::Instruction;
use karel_world::WorldError;
use thiserror::Error;

/// Outcome of a successful stepping operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Stopped in front of the next instruction; more work remains.
    Paused,
    /// The entry command returned.
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// An action failed; `pc` still points at it.
    #[error(transparent)]
    World(#[from] WorldError),
    #[error("infinite loop detected")]
    InfiniteLoop { position: Option<usize> },
    #[error("stack underflow at {pc:03x}")]
    StackUnderflow { pc: usize },
    #[error("illegal bytecode {bytecode:04x} at {pc:03x}")]
    IllegalBytecode { bytecode: u16, pc: usize },
    #[error("argument at {pc:03x} is not a command")]
    NotACommand { pc: usize },
    #[error("program counter {pc:03x} is outside the program")]
    OutOfBounds { pc: usize },
}

/// Debugger hooks. Every method defaults to doing nothing.
pub trait Observer {
    /// Called before control enters a command. `callee_return` is the
    /// `RETURN` that ends the callee, so a call stack view can show where the
    /// called command's body closes.
    fn on_call(&mut self, _call: &Instruction, _callee_return: &Instruction) {}

    fn on_return(&mut self) {}

    fn on_infinite_loop(&mut self) {}
}

impl Observer for () {}
