//! Pretty-printer for operand stack entries.

use karel_bytecode::{action_mnemonic, Action, StackValue};

/// Renders one stack entry for a stack trace. Addresses print in hex and
/// counters in decimal, both right-aligned to four columns.
pub fn format_stack_value(value: &StackValue) -> String {
    match *value {
        StackValue::ReturnAddress(address) => format!("{:4x}", address),
        StackValue::LoopCounter(remaining) => format!("{:4}", remaining),
        StackValue::Boolean(false) => "false".to_string(),
        StackValue::Boolean(true) => "true".to_string(),
        StackValue::Command(reference) => match Action::from_opcode(reference) {
            Some(action) => action_mnemonic(action).to_string(),
            None => format!("@{:03x}", reference),
        },
    }
}

/// The whole stack, top first, one entry per line.
pub fn format_stack(stack: &[StackValue]) -> String {
    let mut s = String::new();
    for value in stack.iter().rev() {
        s.push_str(&format_stack_value(value));
        s.push('\n');
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use karel_bytecode::TURN_RIGHT;

    #[test]
    fn entries_are_right_aligned() {
        assert_eq!(format_stack_value(&StackValue::ReturnAddress(0x102)), " 102");
        assert_eq!(format_stack_value(&StackValue::LoopCounter(9)), "   9");
        assert_eq!(format_stack_value(&StackValue::Boolean(true)), "true");
    }

    #[test]
    fn command_references() {
        assert_eq!(format_stack_value(&StackValue::Command(TURN_RIGHT)), "TRNR");
        assert_eq!(format_stack_value(&StackValue::Command(0x10a)), "@10a");
    }

    #[test]
    fn stack_prints_top_first() {
        let stack = [StackValue::ReturnAddress(0x100), StackValue::Boolean(false)];
        assert_eq!(format_stack(&stack), "false\n 100\n");
    }
}
