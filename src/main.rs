mod cli;

use clap::Parser;
use cli::{Cli, Commands, RunArgs};
use lifeline::config::Config;
use lifeline::{demo, observability};
use tracing::info;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    observability::init_tracing(&config.telemetry.log_filter);

    match cli.command {
        Commands::Run(args) => run(&mut config, args)?,
        Commands::Config => print!("{}", config.to_toml()?),
    }

    Ok(())
}

fn run(config: &mut Config, args: RunArgs) -> Result<(), AnyError> {
    if let Some(viewers) = args.viewers {
        config.demo.viewers = viewers;
        config.validate()?;
    }

    let report = demo::run(config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for worker in std::iter::once(&report.console).chain(&report.viewers) {
            info!(
                worker = %worker.name,
                state = %worker.state,
                terminated = worker.terminated,
                exited = worker.exited,
                outcome = ?worker.outcome,
                "Worker finished"
            );
        }
        info!(metrics = ?report.metrics, "Demo complete");
    }

    if !report.is_clean() {
        return Err("some workers did not shut down cleanly".into());
    }
    Ok(())
}
