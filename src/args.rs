use clap::{ArgAction, Parser};

const CMD_NAME: &str = "ssub";
const DEFAULT_CONFIG: &str = "submit.yaml";

/// Stores our command-line args format.
#[derive(Parser, Debug)]
#[command(name = CMD_NAME, version, about = None, long_about = None)]
pub struct Args {
    /// Submission config file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG)]
    #[arg(env = "SLICE_SUBMIT_CONFIG")]
    pub config: String,

    /// Number of sub-runs (overrides `sub_runs` in the config file)
    #[arg(long, value_name = "N")]
    pub count: Option<usize>,

    /// Only process the given sub-run index (repeatable)
    #[arg(short, long = "sub-run", value_name = "INDEX")]
    pub sub_runs: Vec<usize>,

    /// Output base directory (overrides `paths.output_base` in the config file)
    #[arg(short, long, value_name = "DIR")]
    #[arg(env = "SLICE_SUBMIT_OUTPUT")]
    pub output: Option<String>,

    /// Bypass user confirmation
    #[arg(short, long)]
    pub yes: bool,

    /// Print additional debugging info (repeat for more)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Dry run; print info but don't modify anything.
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Write descriptors and scripts, but don't hand them to the scheduler
    #[arg(long)]
    pub no_submit: bool,

    /// Stop at the first sub-run that fails
    #[arg(long)]
    pub fail_fast: bool,
}
