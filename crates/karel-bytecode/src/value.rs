//! Values on the VM operand stack.

/// One tagged stack entry.
///
/// Return addresses are always at least [`ENTRY_POINT`](crate::ENTRY_POINT),
/// which keeps them visually distinct from loop counters in a stack trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackValue {
    ReturnAddress(u16),
    LoopCounter(u16),
    Boolean(bool),
    /// A command passed as an argument: a builtin opcode below the entry
    /// point, or the address of a compiled command.
    Command(u16),
}
