//! Karel VM core.

use std::sync::Arc;
use std::time::{Duration, Instant};

use karel_bytecode::{Action, Instruction, Op, Predicate, Program, StackValue, ENTRY_POINT, RETURN};
use karel_world::{World, WorldCell, WorldError};
use tracing::{debug, trace, warn};

use crate::{Observer, Step, VmError};

/// How long `step_over`, `step_return` and `run` may take before the
/// program is assumed to loop forever.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Instructions `run` executes between two clock checks.
const RUN_SLICE: usize = 1000;

pub struct Vm<O: Observer = ()> {
    program: Program,
    world: Arc<WorldCell>,
    observer: O,
    pc: usize,
    stack: Vec<StackValue>,
    call_depth: usize,
    timeout: Duration,
    finished: bool,
}

impl Vm<()> {
    pub fn new(program: Program, world: Arc<WorldCell>) -> Self {
        Self::with_observer(program, world, ())
    }
}

impl<O: Observer> Vm<O> {
    pub fn with_observer(program: Program, world: Arc<WorldCell>, observer: O) -> Self {
        Self {
            program,
            world,
            observer,
            pc: ENTRY_POINT,
            stack: Vec::new(),
            call_depth: 0,
            timeout: DEFAULT_TIMEOUT,
            finished: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Operand stack, bottom first.
    pub fn stack(&self) -> &[StackValue] {
        &self.stack
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn world(&self) -> &Arc<WorldCell> {
        &self.world
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn current_instruction(&self) -> Option<&Instruction> {
        self.program.get(self.pc)
    }

    /// Executes one visible step. With the debugger hidden, instructions
    /// that do not pause run silently before and after it.
    pub fn step_into(&mut self, debugger_visible: bool) -> Result<Step, VmError> {
        if !debugger_visible && self.run_until_pause()? == Step::Finished {
            return Ok(Step::Finished);
        }
        if self.execute_one()? == Step::Finished {
            return Ok(Step::Finished);
        }
        if !debugger_visible {
            return self.run_until_pause();
        }
        Ok(Step::Paused)
    }

    /// Steps once, then keeps going until any command entered meanwhile has
    /// returned.
    pub fn step_over(&mut self) -> Result<Step, VmError> {
        self.step_until(self.call_depth as isize)
    }

    /// Runs until the current command returns to its caller.
    pub fn step_return(&mut self) -> Result<Step, VmError> {
        self.step_until(self.call_depth as isize - 1)
    }

    /// Runs to completion within the timeout.
    pub fn run(&mut self) -> Result<(), VmError> {
        let start = Instant::now();
        loop {
            for _ in 0..RUN_SLICE {
                if self.execute_one()? == Step::Finished {
                    return Ok(());
                }
            }
            if start.elapsed() >= self.timeout {
                return Err(self.infinite_loop());
            }
        }
    }

    fn step_until(&mut self, target_depth: isize) -> Result<Step, VmError> {
        let start = Instant::now();
        if self.step_into(false)? == Step::Finished {
            return Ok(Step::Finished);
        }
        while self.call_depth as isize > target_depth {
            if start.elapsed() >= self.timeout {
                return Err(self.infinite_loop());
            }
            if self.execute_one()? == Step::Finished {
                return Ok(Step::Finished);
            }
        }
        Ok(Step::Paused)
    }

    fn infinite_loop(&mut self) -> VmError {
        self.observer.on_infinite_loop();
        let position = self.current_instruction().and_then(|i| i.position);
        warn!(pc = self.pc, ?position, timeout = ?self.timeout, "infinite loop detected");
        VmError::InfiniteLoop { position }
    }

    fn run_until_pause(&mut self) -> Result<Step, VmError> {
        while !self.finished && !self.fetch()?.should_pause() {
            if self.execute_one()? == Step::Finished {
                return Ok(Step::Finished);
            }
        }
        Ok(if self.finished { Step::Finished } else { Step::Paused })
    }

    fn fetch(&self) -> Result<Instruction, VmError> {
        self.current_instruction()
            .copied()
            .ok_or(VmError::OutOfBounds { pc: self.pc })
    }

    fn execute_one(&mut self) -> Result<Step, VmError> {
        if self.finished {
            return Ok(Step::Finished);
        }
        let instruction = self.fetch()?;
        trace!(pc = self.pc, %instruction, depth = self.call_depth, "execute");
        let op = instruction.decode().ok_or(VmError::IllegalBytecode {
            bytecode: instruction.bytecode,
            pc: self.pc,
        })?;
        match op {
            Op::Return => return self.execute_return(),
            Op::Action(action) => {
                self.world.update(|world| perform(action, world))?;
                self.pc += 1;
            }
            Op::Query(predicate) => {
                let status = query(predicate, &self.world.load());
                self.push_and_advance(StackValue::Boolean(status));
            }
            Op::False => self.push_and_advance(StackValue::Boolean(false)),
            Op::True => self.push_and_advance(StackValue::Boolean(true)),
            Op::Not => {
                let p = self.pop_boolean()?;
                self.push_and_advance(StackValue::Boolean(!p));
            }
            Op::And => {
                let q = self.pop_boolean()?;
                let p = self.pop_boolean()?;
                self.push_and_advance(StackValue::Boolean(p && q));
            }
            Op::Or => {
                let q = self.pop_boolean()?;
                let p = self.pop_boolean()?;
                self.push_and_advance(StackValue::Boolean(p || q));
            }
            Op::Pass(reference) => self.push_and_advance(StackValue::Command(reference)),
            Op::Forward(k) => {
                let reference = self.argument(k)?;
                self.push_and_advance(StackValue::Command(reference));
            }
            Op::CallParameter(k) => {
                let reference = self.argument(k)?;
                match Action::from_opcode(reference) {
                    Some(action) => {
                        self.world.update(|world| perform(action, world))?;
                        self.pc += 1;
                    }
                    None if usize::from(reference) >= ENTRY_POINT => {
                        self.call(instruction, usize::from(reference))?
                    }
                    None => return Err(VmError::NotACommand { pc: self.pc }),
                }
            }
            Op::Push(times) => self.push_and_advance(StackValue::LoopCounter(times)),
            Op::Loop(back) => match self.stack.pop() {
                Some(StackValue::LoopCounter(remaining)) if remaining > 1 => {
                    self.stack.push(StackValue::LoopCounter(remaining - 1));
                    self.pc = usize::from(back);
                }
                Some(StackValue::LoopCounter(_)) => self.pc += 1,
                _ => return Err(VmError::StackUnderflow { pc: self.pc }),
            },
            Op::Call(target) => self.call(instruction, usize::from(target))?,
            Op::Jump(target) => self.pc = usize::from(target),
            Op::Else(target) => {
                let status = self.pop_boolean()?;
                self.pc = if status { self.pc + 1 } else { usize::from(target) };
            }
            Op::Then(target) => {
                let status = self.pop_boolean()?;
                self.pc = if status { usize::from(target) } else { self.pc + 1 };
            }
        }
        Ok(Step::Paused)
    }

    fn push_and_advance(&mut self, value: StackValue) {
        self.stack.push(value);
        self.pc += 1;
    }

    fn pop_boolean(&mut self) -> Result<bool, VmError> {
        match self.stack.pop() {
            Some(StackValue::Boolean(status)) => Ok(status),
            _ => Err(VmError::StackUnderflow { pc: self.pc }),
        }
    }

    /// The current command's `k`-th argument, counted back from the return
    /// address.
    fn argument(&self, k: u16) -> Result<u16, VmError> {
        let frame = self
            .stack
            .iter()
            .rposition(|value| matches!(value, StackValue::ReturnAddress(_)))
            .ok_or(VmError::StackUnderflow { pc: self.pc })?;
        let index = frame
            .checked_sub(usize::from(k))
            .ok_or(VmError::StackUnderflow { pc: self.pc })?;
        match self.stack[index] {
            StackValue::Command(reference) => Ok(reference),
            _ => Err(VmError::NotACommand { pc: self.pc }),
        }
    }

    fn call(&mut self, instruction: Instruction, target: usize) -> Result<(), VmError> {
        let callee_return = self
            .program
            .instructions()
            .get(target..)
            .and_then(|code| code.iter().find(|i| i.bytecode == RETURN))
            .copied()
            .ok_or(VmError::OutOfBounds { pc: target })?;
        self.observer.on_call(&instruction, &callee_return);
        self.stack.push(StackValue::ReturnAddress(self.pc as u16));
        self.call_depth += 1;
        self.pc = target;
        Ok(())
    }

    /// Pops the return address and the arguments below it. An empty stack
    /// means the entry command itself is returning.
    fn execute_return(&mut self) -> Result<Step, VmError> {
        if self.stack.is_empty() {
            self.finished = true;
            debug!(pc = self.pc, "program finished");
            return Ok(Step::Finished);
        }
        self.observer.on_return();
        let Some(StackValue::ReturnAddress(caller)) = self.stack.pop() else {
            return Err(VmError::StackUnderflow { pc: self.pc });
        };
        while let Some(StackValue::Command(_)) = self.stack.last() {
            self.stack.pop();
        }
        self.pc = usize::from(caller) + 1;
        self.call_depth -= 1;
        Ok(Step::Paused)
    }
}

fn perform(action: Action, world: &World) -> Result<World, WorldError> {
    match action {
        Action::MoveForward => world.move_forward(),
        Action::TurnLeft => Ok(world.turn_left()),
        Action::TurnAround => Ok(world.turn_around()),
        Action::TurnRight => Ok(world.turn_right()),
        Action::PickBeeper => world.pick_beeper(),
        Action::DropBeeper => world.drop_beeper(),
    }
}

fn query(predicate: Predicate, world: &World) -> bool {
    match predicate {
        Predicate::OnBeeper => world.on_beeper(),
        Predicate::BeeperAhead => world.beeper_ahead(),
        Predicate::LeftIsClear => world.left_is_clear(),
        Predicate::FrontIsClear => world.front_is_clear(),
        Predicate::RightIsClear => world.right_is_clear(),
    }
}
