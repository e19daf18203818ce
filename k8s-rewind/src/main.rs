use anyhow::Context;
use clap::Parser;
use cli::{Commands, GlobalArgs, LogLevel};
use commands::{history::history, rollback::rollback};
use config::RewindConfig;
use env_logger::Target;
use log::LevelFilter;

use crate::cli::Cli;

mod cli;
mod commands;
mod config;
mod output;
mod prompt;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    configure_logging(&cli.global_args);

    let config = RewindConfig::load(cli.global_args.config.as_deref())
        .context("Couldn't load k8s-rewind configuration!")?;

    match cli.command {
        Commands::Rollback(args) => rollback(&cli.global_args, args, &config).await?,
        Commands::History(args) => history(&cli.global_args, args).await?,
    }

    Ok(())
}

fn configure_logging(global_args: &GlobalArgs) {
    let log_level = global_args.get_log_level();
    let mut logger = env_logger::builder();

    logger
        .format_timestamp(None)
        .format_module_path(matches!(log_level, LogLevel::Trace))
        .format_target(false)
        .format_level(false)
        .target(Target::Stderr);

    if let LogLevel::Normal = log_level {
        logger.filter(Some("k8s_rewind"), LevelFilter::Info);
        logger.filter(Some("k8s_rewind_core"), LevelFilter::Info);
    }

    if let LogLevel::Verbose = log_level {
        logger.filter(Some("k8s_rewind"), LevelFilter::Debug);
        logger.filter(Some("k8s_rewind_core"), LevelFilter::Debug);
    }

    if let LogLevel::Trace = log_level {
        logger.filter(None, LevelFilter::Debug);
    }

    logger.init();
}
