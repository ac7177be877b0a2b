use owo_colors::OwoColorize;

use karel_syntax::error::{line_and_column, Diagnostic};

/// Prints `diagnostic` with the offending source line and a caret marker.
/// The first line of the message is the headline; further lines are shown
/// as guidance below the marker.
pub fn render_error(kind: &str, source: &str, diagnostic: &Diagnostic) {
    let mut lines = diagnostic
        .message
        .lines()
        .filter(|l| !matches!(l.trim(), "" | "|"));
    let headline = lines.next().unwrap_or("");
    eprintln!("{}: {}", kind.red().bold(), headline.red());

    let (line, col) = line_and_column(source, diagnostic.position);
    eprintln!("  --> line {}, column {}", line, col);
    if let Some(src_line) = source.lines().nth(line - 1) {
        let line_num_str = format!("{:3} | ", line);
        eprintln!("     |");
        eprintln!("{}{}", line_num_str.bright_black(), src_line);

        let mut marker = String::new();
        marker.push_str(&" ".repeat(line_num_str.len()));
        marker.push_str(&" ".repeat(col - 1));
        marker.push_str(&"^".repeat(diagnostic.highlight_len.unwrap_or(1).max(1)));
        eprintln!("{}{}", marker.red(), " error here".red());
        eprintln!("     |");
    }

    for rest in lines {
        eprintln!("  {}", rest.yellow());
    }
    provide_error_suggestions(&diagnostic.message);
}

pub fn provide_error_suggestions(err_msg: &str) {
    // Curriculum gates
    if err_msg.contains("while loops are not allowed") {
        eprintln!("{}", "💡 Help: repeat (n) { ... } covers a fixed number of steps.".yellow());
        eprintln!("    {}", "Pass --level loops to allow while loops".bright_black());
    } else if err_msg.contains("recursion is not allowed") {
        eprintln!("{}", "💡 Help: this command calls itself, directly or through other commands.".yellow());
        eprintln!("    {}", "Pass --level recursion to allow it".bright_black());
    }
    // Entry point
    else if err_msg.contains("entry command") {
        eprintln!("{}", "💡 Help: choose the command to start with via --entry NAME.".yellow());
        eprintln!("    {}", "Without --entry the first command in the file is used".bright_black());
    }
    // World errors
    else if err_msg.contains("cannot move through wall") {
        eprintln!("{}", "💡 Help: check frontIsClear() before moveForward().".yellow());
        eprintln!("    {}", "Example: if (frontIsClear()) { moveForward(); }".bright_black());
    } else if err_msg.contains("there is no beeper to pick") {
        eprintln!("{}", "💡 Help: check onBeeper() before pickBeeper().".yellow());
    } else if err_msg.contains("cannot drop another beeper") {
        eprintln!("{}", "💡 Help: a cell holds at most one beeper; check onBeeper() first.".yellow());
    }
    // Runaway programs
    else if err_msg.contains("infinite loop detected") {
        eprintln!("{}", "💡 Help: the program did not finish in time.".yellow());
        eprintln!("    {}", "Make sure every while loop changes what its condition checks".bright_black());
        eprintln!("    {}", "Raise the limit with --timeout-ms if the program is just slow".bright_black());
    }
    // VM defects
    else if err_msg.contains("stack underflow") || err_msg.contains("illegal bytecode") {
        eprintln!("{}", "💡 Help: Internal VM error - this might be a compiler bug.".yellow());
        eprintln!("    {}", "Run `karel disasm` on the file and include the listing in a bug report".bright_black());
    }
}
