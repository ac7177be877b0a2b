mod common;

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use owo_colors::OwoColorize;
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

use karel_bytecode::Program;
use karel_compiler::{compile, CurriculumLevel};
use karel_syntax::error::{line_and_column, Diagnostic};
use karel_vm::{Step, Vm, VmError};
use karel_world::WorldCell;

use common::render_error;

#[derive(Parser, Debug)]
#[command(name = "karel")]
#[command(about = "Compile, inspect and run Karel programs")]
#[command(version)]
struct Cli {
    /// Log compiler and VM activity (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Report every diagnostic in a program
    Check {
        #[command(flatten)]
        source: SourceArgs,

        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Print the bytecode listing
    Disasm {
        #[command(flatten)]
        source: SourceArgs,
    },
    /// Execute in an empty room and print the final world
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Print every pause point instead of running straight through
        #[arg(long)]
        step: bool,

        /// Give up after this many milliseconds
        #[arg(long, env = "KAREL_TIMEOUT_MS", default_value_t = 10_000)]
        timeout_ms: u64,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Path to the program
    file: PathBuf,

    /// Command to start with; defaults to the first one in the file
    #[arg(long, env = "KAREL_ENTRY")]
    entry: Option<String>,

    /// Curriculum level: basics, loops or recursion
    #[arg(long, env = "KAREL_LEVEL", default_value = "recursion")]
    level: CurriculumLevel,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_source(path: &Path) -> String {
    if !path.exists() {
        eprintln!(
            "{}: {}",
            "error".red().bold(),
            format!("File not found: {}", path.display()).red()
        );
        process::exit(1);
    }
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!(
                "{}: {}",
                "error".red().bold(),
                format!("Failed to read {}: {}", path.display(), e).red()
            );
            process::exit(1);
        }
    }
}

/// Compiles or exits after printing the diagnostics.
fn compile_or_exit(args: &SourceArgs, src: &str) -> Program {
    match compile(src, args.entry.as_deref(), args.level) {
        Ok(program) => program,
        Err(diagnostics) => {
            for diagnostic in &diagnostics {
                render_error("Compile error", src, diagnostic);
            }
            process::exit(1);
        }
    }
}

fn diagnostics_json(src: &str, diagnostics: &[Diagnostic]) -> serde_json::Value {
    let entries = diagnostics
        .iter()
        .map(|d| {
            let (line, column) = line_and_column(src, d.position);
            serde_json::json!({
                "position": d.position,
                "line": line,
                "column": column,
                "highlight_len": d.highlight_len.unwrap_or(1),
                "message": d.message,
            })
        })
        .collect();
    serde_json::Value::Array(entries)
}

fn check(args: &SourceArgs, format: Format) {
    let src = read_source(&args.file);
    let result = compile(&src, args.entry.as_deref(), args.level);
    match (format, result) {
        (Format::Json, Ok(_)) => println!("[]"),
        (Format::Json, Err(diagnostics)) => {
            println!("{:#}", diagnostics_json(&src, &diagnostics));
            process::exit(1);
        }
        (Format::Text, Ok(program)) => {
            println!(
                "{}: {} ({} instructions)",
                args.file.display(),
                "ok".green(),
                program.code().len()
            );
        }
        (Format::Text, Err(diagnostics)) => {
            for diagnostic in &diagnostics {
                render_error("Compile error", &src, diagnostic);
            }
            eprintln!("{} error(s) in {}", diagnostics.len(), args.file.display());
            process::exit(1);
        }
    }
}

fn disasm(args: &SourceArgs) {
    let src = read_source(&args.file);
    let program = compile_or_exit(args, &src);
    print!("{}", program.disassemble());
}

fn run(args: &SourceArgs, step: bool, timeout_ms: u64) {
    let src = read_source(&args.file);
    let program = compile_or_exit(args, &src);
    let world = Arc::new(WorldCell::default());
    let mut vm = Vm::new(program, Arc::clone(&world)).with_timeout(Duration::from_millis(timeout_ms));

    let outcome = if step { step_through(&mut vm, &src, timeout_ms) } else { vm.run() };
    if let Err(e) = outcome {
        let position = match e {
            VmError::InfiniteLoop { position } => position,
            _ => vm.current_instruction().and_then(|i| i.position),
        };
        let kind = match e {
            VmError::World(_) | VmError::InfiniteLoop { .. } => "Runtime error",
            _ => "VM error",
        };
        eprint!("{}", world.load().render());
        render_error(kind, &src, &Diagnostic::new(position.unwrap_or(0), e.to_string()));
        process::exit(1);
    }
    print!("{}", world.load().render());
}

/// Prints one line per pause point until the program finishes.
fn step_through(vm: &mut Vm, src: &str, timeout_ms: u64) -> Result<(), VmError> {
    let deadline = std::time::Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if let Some(instruction) = vm.current_instruction().filter(|i| i.should_pause()) {
            let (line, _) = line_and_column(src, instruction.position.unwrap_or(0));
            println!("{:03x}  {:<8}  line {}", vm.pc(), instruction.mnemonic(), line);
        }
        if vm.step_into(false)? == Step::Finished {
            return Ok(());
        }
        if std::time::Instant::now() >= deadline {
            return Err(VmError::InfiniteLoop {
                position: vm.current_instruction().and_then(|i| i.position),
            });
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!(?cli, "parsed arguments");

    match &cli.command {
        Command::Check { source, format } => check(source, *format),
        Command::Disasm { source } => disasm(source),
        Command::Run { source, step, timeout_ms } => run(source, *step, *timeout_ms),
    }
}
