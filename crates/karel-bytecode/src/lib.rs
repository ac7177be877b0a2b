//! Bytecode for the Karel virtual machine.
//!
//! This crate defines the packed 16-bit instruction encoding, the builtin
//! opcode tables, the program container with its reserved goal prefix, and the
//! tagged values that live on the VM operand stack.

pub mod builtin;
pub mod call;
pub mod instruction;
pub mod program;
pub mod value;

pub use builtin::{predicate_from_opcode, predicate_opcode, Action};
pub use call::CallTarget;
pub use instruction::*;
pub use program::{instruction_buffer, Program};
pub use value::StackValue;

pub use karel_syntax::Predicate;
