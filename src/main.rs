use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, NamedSource, Report, WrapErr};
use simple_logger::SimpleLogger;

use rasp::env::Config;
use rasp::{Assembler, CommandReader, Debugger, Loader, Machine, Profiler, Terminal};

/// Rasp assembles, runs and debugs programs for the RASP (random-access stored-program) machine.
#[derive(Parser)]
#[command(version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assemble a RASP program into an executable `.rx` file
    Assemble {
        /// Assembly file to assemble
        name: PathBuf,
        /// Inline debugging information into the executable
        #[arg(short, long)]
        debug: bool,
        /// Destination of the executable, `<FILE>.rx` by default
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Execute a RASP executable, reading from stdin and printing to stdout
    Execute {
        /// Executable file to run
        name: PathBuf,
        /// Report the number of cycles and memory cells used
        #[arg(short = 'p', long)]
        use_profiler: bool,
    },
    /// Start the interactive debugger on a RASP executable
    Debug {
        /// Executable file to debug
        name: PathBuf,
        /// Assembly source, `<FILE>.asm` by default
        #[arg(long)]
        asm_source: Option<PathBuf>,
        /// Read debugger commands from argument
        #[arg(short, long)]
        command: Option<String>,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Show version and other details
    Version,
}

/// Process exit status. Each failure maps to exactly one of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Ok = 0,
    SourceNotFound = 1,
    ExecutableNotFound = 2,
    SyntaxError = 3,
    UnknownError = 4,
}

struct Failure {
    status: Status,
    report: Report,
}

impl Failure {
    fn new(status: Status, report: impl Into<Report>) -> Self {
        Self {
            status,
            report: report.into(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let config = Config::from_env();

    if let Err(error) = SimpleLogger::new().with_level(config.log_level).init() {
        eprintln!("Unable to initialise logging: {error}");
    }
    let _ = miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(rasp::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }));

    let result = match args.command {
        Command::Assemble {
            name,
            debug,
            output,
        } => assemble(&name, debug, output),
        Command::Execute { name, use_profiler } => execute(&name, use_profiler, &config),
        Command::Debug {
            name,
            asm_source,
            command,
            minimal,
        } => debug(&name, asm_source, command, minimal, &config),
        Command::Version => {
            version();
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::from(Status::Ok as u8),
        Err(Failure { status, report }) => {
            eprintln!("{report:?}");
            ExitCode::from(status as u8)
        }
    }
}

enum MsgColor {
    Green,
    Cyan,
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    let right = format!("target {}", right.display());
    message(color, left, &right);
}

/// Status messages go to stderr, so that stdout holds the program's output only.
fn message<S>(color: MsgColor, left: S, right: S)
where
    S: Colorize + std::fmt::Display,
{
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
    };
    eprintln!("{left:>12} {right}");
}

fn read_file(path: &Path, status: Status) -> Result<String, Failure> {
    fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("Unable to read `{}`", path.display()))
        .map_err(|report| Failure::new(status, report))
}

fn assemble(name: &Path, debug: bool, output: Option<PathBuf>) -> Result<(), Failure> {
    file_message(MsgColor::Green, "Assembling", name);
    let source = read_file(name, Status::SourceNotFound)?;

    let program = rasp::parse(&source).map_err(|error| {
        let source = NamedSource::new(name.display().to_string(), source.clone());
        Failure::new(Status::SyntaxError, Report::new(error).with_source_code(source))
    })?;
    let executable = Assembler::default()
        .assemble(&program, debug)
        .map_err(|error| Failure::new(Status::SyntaxError, error))?;

    let output = output.unwrap_or_else(|| name.with_extension("rx"));
    Loader::save_as(&executable, &output)
        .map_err(|error| Failure::new(Status::UnknownError, error))?;
    file_message(MsgColor::Green, "Wrote", &output);
    Ok(())
}

fn execute(name: &Path, use_profiler: bool, config: &Config) -> Result<(), Failure> {
    let mut machine = Machine::with_capacity(config.memory_capacity);
    let profiler = Rc::new(RefCell::new(Profiler::new()));
    if use_profiler {
        machine.attach(profiler.clone());
    }

    let text = read_file(name, Status::ExecutableNotFound)?;
    Loader::restore(&text, machine.memory_mut())
        .map_err(|error| Failure::new(Status::UnknownError, error))?;
    machine
        .run()
        .map_err(|error| Failure::new(Status::UnknownError, error))?;

    if use_profiler {
        let profiler = profiler.borrow();
        println!("---");
        println!("Time: {} cycle(s)", profiler.cycle_count());
        println!("Memory: {} cell(s)", profiler.used_memory());
    }
    Ok(())
}

fn debug(
    name: &Path,
    asm_source: Option<PathBuf>,
    command: Option<String>,
    minimal: bool,
    config: &Config,
) -> Result<(), Failure> {
    let mut machine = Machine::with_capacity(config.memory_capacity);
    let text = read_file(name, Status::ExecutableNotFound)?;
    let map = Loader::restore(&text, machine.memory_mut())
        .map_err(|error| Failure::new(Status::UnknownError, error))?;

    // An explicit source must exist, the default one may not
    let source = match asm_source {
        Some(path) => Some(read_file(&path, Status::SourceNotFound)?),
        None => {
            let path = name.with_extension("asm");
            path.is_file()
                .then(|| read_file(&path, Status::SourceNotFound))
                .transpose()?
        }
    };
    if map.is_none() {
        message(
            MsgColor::Cyan,
            "Note",
            "no debug information, assemble with `--debug` to use lines and symbols",
        );
    }

    let mut reader = CommandReader::from(command);
    let mut debugger = Debugger::new(&mut machine, Terminal::stderr(minimal))
        .with_map(map)
        .with_source(source.as_deref());
    debugger.start(&mut reader);
    Ok(())
}

fn version() {
    println!(
        "rasp {} -- {}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION")
    );
    println!("MIT license");
}
