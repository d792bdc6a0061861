use core::{fmt, num::NonZeroUsize, str::FromStr};
use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::PathBuf,
    process,
};

use allocator::Compaction;
use argh::FromArgs;
use snafu::{ResultExt as _, whatever};
use snafu_utils::{GenericError, Report};
use transaction::{Interpreter, Outcome, TransactionError};

use self::log::LogLevel;

#[macro_use]
mod log;

const DEFAULT_MEMORY_SIZE: NonZeroUsize = match NonZeroUsize::new(64 * 1024 * 1024) {
    Some(size) => size,
    None => panic!("default memory size must be non-zero"),
};

/// Replays an allocation transaction log and writes the final memory status.
#[derive(Debug, FromArgs)]
struct Args {
    /// transaction log to replay (default: `input.txt`)
    #[argh(positional, default = "PathBuf::from(\"input.txt\")")]
    input: PathBuf,

    /// where to write the status report, `-` for stdout (default: `output.txt`)
    #[argh(option, short = 'o', default = "Output::default()")]
    output: Output,
    /// size of the simulated address space in bytes (default: 64 MiB)
    #[argh(option, short = 'm', default = "DEFAULT_MEMORY_SIZE")]
    memory_size: NonZeroUsize,
    /// log level (`trace`, `debug`, `info`, `warn` or `error`)
    #[argh(option, default = "LogLevel::Warn")]
    log_level: LogLevel,
    /// disable coloured diagnostics
    #[argh(switch)]
    no_color: bool,
    /// verify allocator invariants after every transaction
    #[argh(switch)]
    check: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Output {
    Stdout,
    Path(PathBuf),
}

impl Default for Output {
    fn default() -> Self {
        Self::Path(PathBuf::from("output.txt"))
    }
}

impl FromStr for Output {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err("empty output path".into()),
            "-" => Ok(Self::Stdout),
            _ => Ok(Self::Path(PathBuf::from(s))),
        }
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "<stdout>"),
            Self::Path(path) => write!(f, "{}", path.display()),
        }
    }
}

impl Output {
    fn open(&self) -> io::Result<Box<dyn Write>> {
        match self {
            Self::Stdout => Ok(Box::new(io::stdout().lock())),
            Self::Path(path) => Ok(Box::new(BufWriter::new(File::create(path)?))),
        }
    }
}

fn main() {
    let args: Args = argh::from_env();
    log::init(args.log_level, !args.no_color);

    if let Err(err) = run(&args) {
        let report = Report::new(err).with_color(!args.no_color);
        eprintln!("{report}");
        process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), GenericError> {
    let input = File::open(&args.input).with_whatever_context(|_| {
        format!("failed to open input file, path={}", args.input.display())
    })?;
    let mut output = args
        .output
        .open()
        .with_whatever_context(|_| format!("failed to open output file, path={}", args.output))?;

    info!(
        "replaying {} with {} bytes of memory",
        args.input.display(),
        args.memory_size
    );

    let mut interpreter = Interpreter::new(args.memory_size);
    let mut violations = 0_usize;
    let summary = interpreter
        .run(BufReader::new(input), |interpreter, number, line, result| {
            report_line(number, line, &result);
            if args.check {
                if let Err(err) = interpreter.allocator().check_invariants() {
                    error!("line {number}: invariant violated: {err}");
                    violations += 1;
                }
            }
        })
        .whatever_context("failed to replay transaction log")?;

    info!(
        "processed {} line(s): {} executed, {} failed",
        summary.lines, summary.executed, summary.failed
    );

    write!(output, "{}", interpreter.allocator().status())
        .and_then(|()| output.flush())
        .with_whatever_context(|_| format!("failed to write status report, path={}", args.output))?;

    if violations > 0 {
        whatever!("allocator invariants were violated {violations} time(s)");
    }
    Ok(())
}

fn report_line(number: usize, line: &str, result: &Result<Outcome, TransactionError>) {
    trace!("line {number}: {line:?}");
    match result {
        Ok(outcome) => {
            if let Outcome::Allocated {
                compaction: Some(compaction),
                ..
            } = outcome
            {
                info!("line {number}: memory compacted");
                for relocation in &compaction.relocations {
                    debug!("  moved {relocation}");
                }
            }
            debug!("line {number}: {} => {outcome}", line.trim());
        }
        Err(err) => {
            if let Some(compaction) = failed_compaction(err) {
                info!(
                    "line {number}: memory compacted, {} block(s) moved",
                    compaction.relocations.len()
                );
            }
            warn!("line {number}: {} ({})", err, err.kind());
        }
    }
}

fn failed_compaction(err: &TransactionError) -> Option<&Compaction> {
    match err {
        TransactionError::Allocator { source } => source.compaction(),
        _ => None,
    }
}
