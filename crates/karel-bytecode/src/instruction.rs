//! Packed 16-bit instruction encoding.
//!
//! The top four bits of a bytecode select the category, the low twelve bits
//! carry the operand (an address, a repeat count or a parameter index).
//! Category `NORM` instructions have no operand; their whole bytecode is the
//! opcode.

use std::fmt;

use karel_syntax::Predicate;

use crate::builtin::{predicate_from_opcode, Action};

/// Address of the first compiled instruction. Lower addresses are reserved so
/// that return addresses on the stack never look like booleans or counters.
pub const ENTRY_POINT: usize = 256;

/// Largest program the 12-bit operand can address.
pub const MAX_PROGRAM_SIZE: usize = 0x1000;

pub const RETURN: u16 = 0x0000;

pub const MOVE_FORWARD: u16 = 0x0001;
pub const TURN_LEFT: u16 = 0x0002;
pub const TURN_AROUND: u16 = 0x0003;
pub const TURN_RIGHT: u16 = 0x0004;
pub const PICK_BEEPER: u16 = 0x0005;
pub const DROP_BEEPER: u16 = 0x0006;

pub const ON_BEEPER: u16 = 0x0007;
pub const BEEPER_AHEAD: u16 = 0x0008;
pub const LEFT_IS_CLEAR: u16 = 0x0009;
pub const FRONT_IS_CLEAR: u16 = 0x000a;
pub const RIGHT_IS_CLEAR: u16 = 0x000b;

pub const FALSE: u16 = 0x000c;
pub const TRUE: u16 = 0x000d;
pub const NOT: u16 = 0x000e;
pub const AND: u16 = 0x000f;
pub const OR: u16 = 0x0010;

pub const NORM: u16 = 0x0000;

pub const PASS: u16 = 0x1000;
pub const FWRD: u16 = 0x2000;
pub const CALP: u16 = 0x3000;

pub const PUSH: u16 = 0x8000;
pub const LOOP: u16 = 0x9000;
pub const CALL: u16 = 0xa000;

pub const JUMP: u16 = 0xb000;
pub const ELSE: u16 = 0xc000;
pub const THEN: u16 = 0xd000;

/// XOR mask that turns `ELSE` into `THEN` and back.
pub const BRANCH_FLIP: u16 = ELSE ^ THEN;

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Return,
    Action(Action),
    Query(Predicate),
    False,
    True,
    Not,
    And,
    Or,
    /// Push a command reference (builtin opcode or command address)
    Pass(u16),
    /// Re-push the enclosing command's `k`-th argument, counted from the last
    Forward(u16),
    /// Call through the enclosing command's `k`-th argument
    CallParameter(u16),
    Push(u16),
    Loop(u16),
    Call(u16),
    Jump(u16),
    /// Branch if the popped boolean is false
    Else(u16),
    /// Branch if the popped boolean is true
    Then(u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub bytecode: u16,
    /// Source offset this instruction was compiled from; `None` for the
    /// reserved prefix and goal programs.
    pub position: Option<usize>,
}

impl Instruction {
    pub fn new(bytecode: u16, position: Option<usize>) -> Self {
        Self { bytecode, position }
    }

    /// An instruction with no source position.
    pub fn synthetic(bytecode: u16) -> Self {
        Self::new(bytecode, None)
    }

    pub fn category(&self) -> u16 {
        self.bytecode & 0xf000
    }

    pub fn target(&self) -> u16 {
        self.bytecode & 0x0fff
    }

    pub fn with_target(&self, target: u16) -> Self {
        Self::new(self.category() | (target & 0x0fff), self.position)
    }

    pub fn compiled_from_source(&self) -> bool {
        self.position.is_some()
    }

    pub fn decode(&self) -> Option<Op> {
        let target = self.target();
        let op = match self.category() {
            NORM => match self.bytecode {
                RETURN => Op::Return,
                FALSE => Op::False,
                TRUE => Op::True,
                NOT => Op::Not,
                AND => Op::And,
                OR => Op::Or,
                opcode => match (Action::from_opcode(opcode), predicate_from_opcode(opcode)) {
                    (Some(action), _) => Op::Action(action),
                    (None, Some(predicate)) => Op::Query(predicate),
                    (None, None) => return None,
                },
            },
            PASS => Op::Pass(target),
            FWRD => Op::Forward(target),
            CALP => Op::CallParameter(target),
            PUSH => Op::Push(target),
            LOOP => Op::Loop(target),
            CALL => Op::Call(target),
            JUMP => Op::Jump(target),
            ELSE => Op::Else(target),
            THEN => Op::Then(target),
            _ => return None,
        };
        Some(op)
    }

    /// Whether the stepping debugger stops in front of this instruction.
    ///
    /// World actions always pause. Returns, queries, boolean literals, calls,
    /// pushes and loops pause only when compiled from source, so goal replays
    /// run through them. Branches, jumps, argument passing and boolean
    /// operators never pause.
    pub fn should_pause(&self) -> bool {
        match self.decode() {
            Some(Op::Action(_)) => true,
            Some(
                Op::Return
                | Op::Query(_)
                | Op::False
                | Op::True
                | Op::Push(_)
                | Op::Loop(_)
                | Op::Call(_)
                | Op::CallParameter(_),
            ) => self.compiled_from_source(),
            Some(
                Op::Not
                | Op::And
                | Op::Or
                | Op::Pass(_)
                | Op::Forward(_)
                | Op::Jump(_)
                | Op::Else(_)
                | Op::Then(_),
            ) => false,
            None => false,
        }
    }

    /// Four-letter assembler name, with a hex operand where there is one.
    pub fn mnemonic(&self) -> String {
        let Some(op) = self.decode() else {
            return format!("?{:04x}", self.bytecode);
        };
        match op {
            Op::Return => "RET".into(),
            Op::Action(action) => action_mnemonic(action).into(),
            Op::Query(predicate) => query_mnemonic(predicate).into(),
            Op::False => "FALS".into(),
            Op::True => "TRUE".into(),
            Op::Not => "NOT".into(),
            Op::And => "AND".into(),
            Op::Or => "OR".into(),
            Op::Pass(t) => format!("PASS {:03x}", t),
            Op::Forward(t) => format!("FWRD {:03x}", t),
            Op::CallParameter(t) => format!("CALP {:03x}", t),
            Op::Push(t) => format!("PUSH {:03x}", t),
            Op::Loop(t) => format!("LOOP {:03x}", t),
            Op::Call(t) => format!("CALL {:03x}", t),
            Op::Jump(t) => format!("JUMP {:03x}", t),
            Op::Else(t) => format!("ELSE {:03x}", t),
            Op::Then(t) => format!("THEN {:03x}", t),
        }
    }
}

pub fn action_mnemonic(action: Action) -> &'static str {
    match action {
        Action::MoveForward => "MOVE",
        Action::TurnLeft => "TRNL",
        Action::TurnAround => "TRNA",
        Action::TurnRight => "TRNR",
        Action::PickBeeper => "PICK",
        Action::DropBeeper => "DROP",
    }
}

fn query_mnemonic(predicate: Predicate) -> &'static str {
    match predicate {
        Predicate::OnBeeper => "BEEP",
        Predicate::BeeperAhead => "HEAD",
        Predicate::LeftIsClear => "LCLR",
        Predicate::FrontIsClear => "FCLR",
        Predicate::RightIsClear => "RCLR",
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOAL: Option<usize> = None;
    const HUMAN: Option<usize> = Some(1);

    fn pauses(bytecode: u16, position: Option<usize>) -> bool {
        Instruction::new(bytecode, position).should_pause()
    }

    #[test]
    fn actions_always_pause() {
        for bytecode in MOVE_FORWARD..=DROP_BEEPER {
            assert!(pauses(bytecode, GOAL));
            assert!(pauses(bytecode, HUMAN));
        }
    }

    #[test]
    fn queries_pause_only_in_source_programs() {
        for bytecode in ON_BEEPER..=TRUE {
            assert!(!pauses(bytecode, GOAL));
            assert!(pauses(bytecode, HUMAN));
        }
    }

    #[test]
    fn goal_bookkeeping_never_pauses() {
        for bytecode in [RETURN, PUSH, LOOP, CALL, CALP, JUMP, ELSE, THEN] {
            assert!(!pauses(bytecode, GOAL), "{:04x}", bytecode);
        }
    }

    #[test]
    fn source_bookkeeping_pauses_except_branches() {
        for bytecode in [RETURN, PUSH | 2, LOOP | 0x100, CALL | 0x100, CALP | 1] {
            assert!(pauses(bytecode, HUMAN), "{:04x}", bytecode);
        }
        for bytecode in [JUMP, ELSE, THEN, NOT, AND, OR, PASS | 1, FWRD | 1] {
            assert!(!pauses(bytecode, HUMAN), "{:04x}", bytecode);
        }
    }

    #[test]
    fn mnemonics() {
        let listing: Vec<String> = [RETURN, MOVE_FORWARD, FRONT_IS_CLEAR, FALSE, OR, PUSH | 9, ELSE | 0x103, PASS | 2]
            .into_iter()
            .map(|b| Instruction::synthetic(b).mnemonic())
            .collect();
        assert_eq!(
            listing,
            ["RET", "MOVE", "FCLR", "FALS", "OR", "PUSH 009", "ELSE 103", "PASS 002"]
        );
        assert_eq!(Instruction::synthetic(0x0042).mnemonic(), "?0042");
        assert_eq!(Instruction::synthetic(0xf000).decode(), None);
    }

    #[test]
    fn branch_flip_swaps_polarity() {
        assert_eq!((ELSE | 0x123) ^ BRANCH_FLIP, THEN | 0x123);
        assert_eq!(Instruction::synthetic(JUMP | 0x100).with_target(0x1ab).bytecode, JUMP | 0x1ab);
    }
}
