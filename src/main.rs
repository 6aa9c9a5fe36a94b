//! Attrition ML - Main Entry Point
//!
//! Without a subcommand, runs the full training pipeline with defaults from
//! the environment.

use attrition_ml::cli::{cmd_inspect, cmd_predict, cmd_train, Cli, Commands, TrainArgs};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attrition_ml=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Train(args)) => {
            cmd_train(&args)?;
        }
        Some(Commands::Predict { model, data_dir, config, top, json }) => {
            cmd_predict(model.as_deref(), data_dir.as_deref(), config.as_deref(), top, json)?;
        }
        Some(Commands::Inspect { model, top }) => {
            cmd_inspect(model.as_deref(), top)?;
        }
        None => {
            cmd_train(&TrainArgs::default())?;
        }
    }

    Ok(())
}
