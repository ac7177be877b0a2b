//! Builtin actions and queries and their fixed opcodes.

use karel_syntax::Predicate;

use crate::instruction::*;

/// One of the six world-mutating builtin commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveForward,
    TurnLeft,
    TurnAround,
    TurnRight,
    PickBeeper,
    DropBeeper,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::MoveForward,
        Action::TurnLeft,
        Action::TurnAround,
        Action::TurnRight,
        Action::PickBeeper,
        Action::DropBeeper,
    ];

    pub fn from_name(name: &str) -> Option<Action> {
        match name {
            "moveForward" => Some(Action::MoveForward),
            "turnLeft" => Some(Action::TurnLeft),
            "turnAround" => Some(Action::TurnAround),
            "turnRight" => Some(Action::TurnRight),
            "pickBeeper" => Some(Action::PickBeeper),
            "dropBeeper" => Some(Action::DropBeeper),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Action::MoveForward => "moveForward",
            Action::TurnLeft => "turnLeft",
            Action::TurnAround => "turnAround",
            Action::TurnRight => "turnRight",
            Action::PickBeeper => "pickBeeper",
            Action::DropBeeper => "dropBeeper",
        }
    }

    pub fn opcode(self) -> u16 {
        match self {
            Action::MoveForward => MOVE_FORWARD,
            Action::TurnLeft => TURN_LEFT,
            Action::TurnAround => TURN_AROUND,
            Action::TurnRight => TURN_RIGHT,
            Action::PickBeeper => PICK_BEEPER,
            Action::DropBeeper => DROP_BEEPER,
        }
    }

    pub fn from_opcode(opcode: u16) -> Option<Action> {
        Action::ALL.into_iter().find(|action| action.opcode() == opcode)
    }
}

pub fn predicate_opcode(predicate: Predicate) -> u16 {
    match predicate {
        Predicate::OnBeeper => ON_BEEPER,
        Predicate::BeeperAhead => BEEPER_AHEAD,
        Predicate::LeftIsClear => LEFT_IS_CLEAR,
        Predicate::FrontIsClear => FRONT_IS_CLEAR,
        Predicate::RightIsClear => RIGHT_IS_CLEAR,
    }
}

pub fn predicate_from_opcode(opcode: u16) -> Option<Predicate> {
    match opcode {
        ON_BEEPER => Some(Predicate::OnBeeper),
        BEEPER_AHEAD => Some(Predicate::BeeperAhead),
        LEFT_IS_CLEAR => Some(Predicate::LeftIsClear),
        FRONT_IS_CLEAR => Some(Predicate::FrontIsClear),
        RIGHT_IS_CLEAR => Some(Predicate::RightIsClear),
        _ => None,
    }
}
