//! Compile-time resolution of call targets and command arguments.

use crate::builtin::Action;
use crate::instruction::{CALL, CALP, FWRD, PASS};

/// What a name in call or argument position refers to inside one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallTarget {
    /// A user command, identified by its dense id until addresses are known
    Direct(u16),
    Builtin(Action),
    /// The enclosing command's parameter, `k` counted from the last one (1)
    Parameter(u16),
}

impl CallTarget {
    /// Bytecode for calling this target.
    pub fn call_bytecode(self) -> u16 {
        match self {
            CallTarget::Direct(id) => CALL | id,
            CallTarget::Builtin(action) => action.opcode(),
            CallTarget::Parameter(k) => CALP | k,
        }
    }

    /// Bytecode for passing this target as an argument.
    pub fn argument_bytecode(self) -> u16 {
        match self {
            CallTarget::Direct(id) => PASS | id,
            CallTarget::Builtin(action) => PASS | action.opcode(),
            CallTarget::Parameter(k) => FWRD | k,
        }
    }

    /// Whether the emitted operand is a command id that must later be
    /// rewritten to an address.
    pub fn needs_patch(self) -> bool {
        matches!(self, CallTarget::Direct(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{MOVE_FORWARD, TURN_LEFT};

    #[test]
    fn builtins_compile_inline() {
        assert_eq!(CallTarget::Builtin(Action::MoveForward).call_bytecode(), MOVE_FORWARD);
        assert_eq!(CallTarget::Builtin(Action::TurnLeft).argument_bytecode(), PASS | TURN_LEFT);
        assert!(!CallTarget::Builtin(Action::TurnLeft).needs_patch());
    }

    #[test]
    fn parameters_are_indirect() {
        assert_eq!(CallTarget::Parameter(2).call_bytecode(), CALP | 2);
        assert_eq!(CallTarget::Parameter(1).argument_bytecode(), FWRD | 1);
        assert!(CallTarget::Direct(3).needs_patch());
    }
}
