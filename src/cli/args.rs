//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};

use crate::cli::commands::{
    completions::CompletionsArgs, estimate::EstimateArgs, reference::ReferenceArgs,
    schedule::ScheduleArgs, shift::ShiftArgs, simulate::SimulateArgs,
};

#[derive(Parser)]
#[command(name = "pave")]
#[command(author, version, about = "Paving cost and schedule estimator")]
#[command(long_about = "Estimate paving jobs from a YAML description: CPM schedule, shift billing, production tiers, trucking, mobilization, confidence scoring and cost risk simulation.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "auto")]
    pub format: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output (debug logging on stderr)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full estimate pipeline for an estimate file
    Estimate(EstimateArgs),

    /// Compute the CPM schedule only
    Schedule(ScheduleArgs),

    /// Monte Carlo cost risk over the estimate total
    Simulate(SimulateArgs),

    /// Bill a raw-hours figure into shift-days
    Shift(ShiftArgs),

    /// Validate and summarize reference tables
    Reference(ReferenceArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Output format
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// Styled summary with tables for terminals
    #[default]
    Auto,
    /// Full YAML document
    Yaml,
    /// JSON for programmatic use
    Json,
    /// Comma-separated rows
    Csv,
}
