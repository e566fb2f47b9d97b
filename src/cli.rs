use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    /// JSON file describing the L-system
    pub file: PathBuf,

    /// Rounds of rewriting to apply to the axiom
    #[arg(short = 'n', long, value_name = "ITERATIONS", default_value_t = 1, allow_negative_numbers = true)]
    pub iterations: i64,

    /// Render the result and save it as SVG
    #[arg(short, long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Append drawable results to this log
    #[arg(long, value_name = "LOG", env = "LSYS_HISTORY")]
    pub history: Option<PathBuf>,

    /// Seed for stochastic rules (default: random)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Do not print the derived string
    #[arg(short, long)]
    pub quiet: bool,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, value_name = "LEVEL", default_value = "warn")]
    pub log_level: String
}
