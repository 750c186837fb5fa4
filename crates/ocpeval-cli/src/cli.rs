use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "ocpeval - evaluate atomistic property predictions against reference targets and manage target normalizers.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate prediction batches against target batches and report the metrics table.
    Eval(EvalArgs),
    /// Fit, inspect, or apply a target normalizer.
    Normalizer(NormalizerArgs),
}

/// Arguments for the `eval` subcommand.
#[derive(Args, Debug)]
pub struct EvalArgs {
    /// JSON file holding an array of prediction batches.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub prediction: PathBuf,

    /// JSON file holding an array of target batches, paired by position with the predictions.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub target: PathBuf,

    #[command(flatten)]
    pub metrics: MetricSource,

    /// Metrics table (JSON) from an earlier run to extend instead of starting empty.
    #[arg(long, value_name = "PATH")]
    pub prior: Option<PathBuf>,

    /// Write the resulting metrics table as JSON.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Skip batches that fail evaluation instead of aborting.
    #[arg(long)]
    pub skip_invalid: bool,
}

/// Where the evaluator's metric set comes from. Exactly one must be given.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct MetricSource {
    /// Built-in task whose default metrics to compute (s2ef, is2rs, is2re).
    #[arg(long, value_name = "TASK")]
    pub task: Option<String>,

    /// Evaluator configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Arguments for the `normalizer` subcommand.
#[derive(Args, Debug)]
pub struct NormalizerArgs {
    #[command(subcommand)]
    pub command: NormalizerCommands,
}

#[derive(Subcommand, Debug)]
pub enum NormalizerCommands {
    /// Fit per-column mean and standard deviation to a sample matrix and save them.
    Fit {
        /// JSON matrix (array of rows) of target samples.
        #[arg(short, long, required = true, value_name = "PATH")]
        samples: PathBuf,
        /// Where to write the normalizer state (TOML).
        #[arg(short, long, required = true, value_name = "PATH")]
        output: PathBuf,
    },
    /// Print the statistics held by a saved normalizer.
    Show {
        /// Normalizer state file (TOML, or a `mean,std` CSV archive).
        #[arg(required = true, value_name = "PATH")]
        normalizer: PathBuf,
    },
    /// Normalize (or denormalize) a JSON matrix and print the result as JSON.
    Apply {
        /// Normalizer state file (TOML, or a `mean,std` CSV archive).
        #[arg(short, long, required = true, value_name = "PATH")]
        normalizer: PathBuf,
        /// JSON matrix (array of rows) to transform.
        #[arg(short, long, required = true, value_name = "PATH")]
        input: PathBuf,
        /// Map normalized values back to the original scale.
        #[arg(long)]
        inverse: bool,
    },
}
