#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process;

use precinct::coordinator::Execution;
use precinct::driver::config::{RunConfig, RunMode};
use precinct::driver::run;
use precinct::{Label, LogPartitionProgress, PartitionKey, PartitionObserver};

#[derive(Parser)]
#[command(
    name = "precinct",
    about = "Per-district random forest predictions for incident categories",
    long_about = "Partitions incident records by police district, grows one random forest \
                 per district and writes a one-hot category submission for the test set."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct RunArgs {
    /// Use the complete data files instead of the development sample
    #[arg(long)]
    full: bool,

    /// TOML file overriding the default run configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the input files and receiving the submission
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Submission file name, relative to the data directory
    #[arg(long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Process partitions one at a time
    #[arg(long)]
    sequential: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train per-district forests and write predictions for the test set
    #[command(about = "Train per-district forests and predict (outputs: submission.csv)")]
    Run(RunArgs),

    /// Display version and build information
    #[command(about = "Display version and build information")]
    Version,
}

/// Drives a progress bar from partition callbacks and mirrors them to the log.
struct ProgressBarObserver {
    bar: ProgressBar,
    log: LogPartitionProgress,
}

impl ProgressBarObserver {
    fn new() -> Self {
        Self {
            bar: create_progress_bar("Growing forests"),
            log: LogPartitionProgress,
        }
    }
}

impl PartitionObserver for ProgressBarObserver {
    fn on_partition_start(&self, key: &PartitionKey, train_rows: usize, test_rows: usize) {
        self.bar.inc_length(1);
        self.log.on_partition_start(key, train_rows, test_rows);
    }

    fn on_partition_complete(&self, key: &PartitionKey, predictions: &[Label]) {
        self.bar.set_message(format!("finished {key}"));
        self.bar.inc(1);
        self.log.on_partition_complete(key, predictions);
    }

    fn on_reassembled(&self, total_rows: usize) {
        self.bar
            .finish_with_message(format!("{total_rows} rows predicted"));
        self.log.on_reassembled(total_rows);
    }
}

fn create_progress_bar(message: &str) -> ProgressBar {
    let draw_target = if std::io::stderr().is_terminal() {
        ProgressDrawTarget::stderr_with_hz(20)
    } else {
        ProgressDrawTarget::hidden()
    };

    let pb = ProgressBar::with_draw_target(Some(0), draw_target);
    let style = ProgressStyle::with_template(
        "\n> [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .map(|style| style.progress_chars("█▉▊▋▌▍▎▏  "))
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let Cli { command } = cli;

    let result: Result<(), Box<dyn Error>> = match command {
        Some(Commands::Run(args)) => run_pipeline(args),
        Some(Commands::Version) => {
            print_version_info();
            Ok(())
        }
        None => Cli::command()
            .print_help()
            .map(|()| println!())
            .map_err(Into::into),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run_pipeline(args: RunArgs) -> Result<(), Box<dyn Error>> {
    let RunArgs {
        full,
        config,
        data_dir,
        output,
        sequential,
    } = args;

    let mut run_config = match config {
        Some(path) => RunConfig::load(&path)?,
        None => RunConfig::default(),
    };
    if let Some(data_dir) = data_dir {
        run_config.data_dir = data_dir;
    }
    if let Some(output) = output {
        run_config.output = output;
    }
    if sequential {
        run_config.execution = Execution::Sequential;
    }

    let mode = RunMode::from_full_flag(full);
    eprintln!(
        "> Reading {} and {}",
        run_config.train_path(mode).display(),
        run_config.test_path(mode).display()
    );

    let observer = ProgressBarObserver::new();
    let summary = run(&run_config, mode, &observer)?;

    eprintln!(
        "> Predicted {} test rows from {} training rows across {} partitions",
        summary.test_rows, summary.train_rows, summary.partitions
    );
    eprintln!("> Submission written to {}", summary.output.display());
    Ok(())
}

fn print_version_info() {
    let version = env!("CARGO_PKG_VERSION");
    let release_tag = option_env!("PRECINCT_RELEASE_TAG");
    let build_timestamp: u64 = env!("PRECINCT_BUILD_TIMESTAMP").parse().unwrap_or(0);

    println!("precinct {}", version);

    match release_tag {
        Some(tag) => println!("Release: {}", tag),
        None => println!("Release: development build"),
    }

    if build_timestamp > 0 {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        if now > build_timestamp {
            println!("Built: {}", format_duration_ago(now - build_timestamp));
        } else {
            println!("Built: just now");
        }
    }
}

/// Format seconds into a human-readable duration like "2.4 hours ago"
fn format_duration_ago(seconds: u64) -> String {
    const MINUTE: u64 = 60;
    const HOUR: u64 = 60 * MINUTE;
    const DAY: u64 = 24 * HOUR;
    const WEEK: u64 = 7 * DAY;

    let (amount, unit) = match seconds {
        s if s < MINUTE => return format!("{s} seconds ago"),
        s if s < HOUR => (s as f64 / MINUTE as f64, "minutes"),
        s if s < DAY => (s as f64 / HOUR as f64, "hours"),
        s if s < WEEK => (s as f64 / DAY as f64, "days"),
        s => (s as f64 / WEEK as f64, "weeks"),
    };
    format!("{amount:.1} {unit} ago")
}
