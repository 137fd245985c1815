mod cli;
mod sink;

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local};
use clap::Parser;
use cli::{Cli, Commands, PlanArgs, SweepArgs};
use sink::TextSink;
use subsetsum_rs::checkpoint::{CheckpointStore, JsonFileStore};
use subsetsum_rs::combinator::{Slice, plan_slices};
use subsetsum_rs::config::Config;
use subsetsum_rs::error::SubsetSumError;
use subsetsum_rs::pipeline::{RunSummary, SweepDriver};
use tracing_appender::non_blocking;
use tracing_subscriber::{EnvFilter, prelude::*};

const CTIME_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

fn init_tracing(log_file: Option<&Path>, quiet: bool) -> Result<()> {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Report lines own stdout, so logs go to stderr.
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(io::stderr);

    if let Some(path) = log_file {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| anyhow!("failed to create log directory {parent:?}: {err}"))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| anyhow!("failed to open log file {path:?}: {err}"))?;
        let (non_blocking_writer, guard) = non_blocking(file);
        // Leak the guard so the non-blocking writer stays alive for the
        // duration of the process without additional plumbing.
        let _guard = Box::leak(Box::new(guard));
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(non_blocking_writer);
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .with(file_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .try_init()
            .map_err(|err| anyhow!("failed to initialize tracing: {err}"))
    }
}

/// Quote an argument for a POSIX shell when it holds anything beyond a
/// conservative set of safe characters.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', "'\\''"))
    }
}

fn repro_command(args: &[String]) -> String {
    let quoted: Vec<String> = args.iter().map(|arg| shell_quote(arg)).collect();
    format!("cargo run --release -p subsetsum_cli -- {}", quoted.join(" "))
}

fn log_invocation(log_file: Option<&PathBuf>) {
    let cwd = std::env::current_dir().ok();
    let argv: Vec<String> = std::env::args_os()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();

    tracing::info!("==================== new subsetsum_cli run ====================");
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        cwd = ?cwd,
        log_file = ?log_file,
        argv = ?argv,
        "subsetsum_cli invoked"
    );
    if argv.len() >= 2 {
        tracing::info!("cargo_repro_command={}", repro_command(&argv[1..]));
    }
}

/// Print a parameter error the way the command line reports misuse: on
/// stderr with a usage hint, exiting cleanly.
fn report_usage_error(err: &SubsetSumError) {
    eprintln!("ERROR, {err}.");
    eprintln!("USAGE:");
    eprintln!("\tsubsetsum_cli sweep <M> <N> [<START> <COUNT>]");
    eprintln!("\tsubsetsum_cli --help for every option");
}

/// Split usage errors (printed, exit 0) from everything else.
fn handle_library_error(err: SubsetSumError) -> Result<()> {
    if err.is_usage() {
        report_usage_error(&err);
        Ok(())
    } else {
        Err(err.into())
    }
}

fn print_summary(out: &mut impl Write, config: &Config, summary: &RunSummary) -> io::Result<()> {
    match (config.slice, summary.expected) {
        (Some(slice), _) => writeln!(out, "expected to compute {} sets", slice.count)?,
        (None, Some(expected)) => writeln!(
            out,
            "the expected total number of sets is: {:.6}, (exact calculation: {})",
            expected.estimate, expected.exact
        )?,
        (None, None) => {}
    }
    if let Some(mismatch) = &summary.precision_mismatch {
        writeln!(out, "note: {mismatch}")?;
    }
    let tally = summary.tally;
    writeln!(
        out,
        "{} total sets, {} sets passed, {} sets failed, {:.6} success rate.",
        tally.total(),
        tally.pass,
        tally.fail,
        tally.success_rate()
    )
}

fn run_sweep(args: SweepArgs) -> Result<()> {
    let color = args.color;
    let timestamps = args.timestamps;
    let config = args.into_config();

    let driver = match SweepDriver::new(config) {
        Ok(driver) => driver,
        Err(err) => return handle_library_error(err),
    };
    let config = driver.config().clone();
    let checkpoint_path = config.checkpoint.clone();

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    writeln!(
        out,
        "max_set_value: {}, subset_size: {}",
        config.max_value, config.subset_size
    )?;
    let started: DateTime<Local> = Local::now();
    if timestamps {
        writeln!(out, "start time: {}", started.format(CTIME_FORMAT))?;
    }

    let mut store = checkpoint_path.as_ref().map(JsonFileStore::new);
    let mut sink = TextSink::new(out, color);
    let result = driver.run(
        &mut sink,
        store.as_mut().map(|store| store as &mut dyn CheckpointStore),
    );
    sink.flush()?;
    let mut out = sink.into_inner();

    let summary = match result {
        Ok(summary) => summary,
        Err(err) => {
            out.flush()?;
            return handle_library_error(err).with_context(|| match &checkpoint_path {
                Some(path) => format!("sweep failed (checkpoint {})", path.display()),
                None => "sweep failed".to_string(),
            });
        }
    };

    print_summary(&mut out, &config, &summary)?;
    if timestamps {
        let ended = Local::now();
        writeln!(out, "end time: {}", ended.format(CTIME_FORMAT))?;
        writeln!(
            out,
            "running time: {}",
            ended.signed_duration_since(started).num_seconds()
        )?;
    }
    out.flush().context("failed to flush report output")
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let config = Config::new(args.max_value, args.subset_size);
    let total = match config.validate() {
        Ok(total) => total,
        Err(err) => return handle_library_error(err),
    };
    let count = u64::try_from(total).map_err(|_| SubsetSumError::IndexOverflow(total))?;
    let slices = plan_slices(Slice::new(0, count), args.slices);
    tracing::info!(
        total_subsets = %subsetsum_rs::report::format_int(total),
        slices = slices.len(),
        "Planned slices"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.json {
        let payload = serde_json::to_string_pretty(&slices).context("failed to encode plan")?;
        writeln!(out, "{payload}")?;
    } else {
        for slice in &slices {
            writeln!(
                out,
                "{} {} {} {}",
                args.max_value, args.subset_size, slice.start, slice.count
            )?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // Help, version and argument errors all exit cleanly.
            err.print()?;
            return Ok(());
        }
    };

    let (log_file, quiet) = match &cli.command {
        Commands::Sweep(args) => (args.log_file.clone(), args.quiet),
        Commands::Plan(_) => (None, false),
    };

    init_tracing(log_file.as_deref(), quiet)?;
    log_invocation(log_file.as_ref());

    match cli.command {
        Commands::Sweep(args) => run_sweep(args),
        Commands::Plan(args) => run_plan(args),
    }
}
