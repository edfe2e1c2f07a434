use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "lifeline")]
#[command(about = "Worker thread lifecycle demo", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $LIFELINE_CONFIG or config/lifeline.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start event loops, drive them from a scripted console, and shut them down
    Run(RunArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Number of event loop workers (overrides demo.viewers)
    #[arg(long)]
    pub viewers: Option<usize>,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}
