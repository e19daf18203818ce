use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use k8s_rewind_core::policy::RollbackPolicy;

pub const DEFAULT_NAMESPACE: &str = "default";

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// kubernetes namespace to work with
    #[arg(short = 'n', long, global = true, default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,
    /// override default kubeconfig
    #[arg(long, global = true)]
    pub kube_config: Option<String>,
    /// override default kubeconfig context
    #[arg(long, global = true)]
    pub kube_context: Option<String>,
    /// override default k8s-rewind config path (~/.kube/rewind-config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose_logging: bool,
    /// enable trace output (more detailed than verbose, overrides it if present)
    #[arg(long = "trace", global = true)]
    pub trace_logging: bool,
}

impl GlobalArgs {
    pub fn get_log_level(&self) -> LogLevel {
        if self.trace_logging {
            return LogLevel::Trace;
        }

        if self.verbose_logging {
            return LogLevel::Verbose;
        }

        LogLevel::Normal
    }
}

pub enum LogLevel {
    Normal,
    Verbose,
    Trace,
}

#[derive(Debug, Subcommand)]
#[command(arg_required_else_help = true)]
pub enum Commands {
    /// roll back every deployment in the namespace and write a report
    #[command(alias = "r")]
    Rollback(RollbackArgs),
    /// show the rollout history of deployments in the namespace
    #[command(alias = "h")]
    History(HistoryArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
    JsonPretty,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Names,
    Table,
    TableWithHeaders,
    Json,
    JsonPretty,
    Yaml,
}

#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// revision to roll back to: '-1' for the previous one or an explicit revision number
    ///
    /// relative offsets other than '-1' (e.g. '+1') are accepted but every
    /// deployment gets skipped. You'll be asked interactively if this isn't set.
    #[arg(short = 'r', long, allow_hyphen_values = true)]
    pub revision: Option<RollbackPolicy>,
    /// change cause recorded on every deployment (asked interactively if unset)
    #[arg(short = 'm', long, value_parser = parse_change_cause)]
    pub change_cause: Option<String>,
    /// only roll back deployments matching this label selector
    #[arg(short = 'l', long)]
    pub selector: Option<String>,
    /// where to write the rollback report
    #[arg(long)]
    pub report_file: Option<PathBuf>,
    /// give up waiting for a single rollout after this many seconds
    #[arg(long)]
    pub timeout: Option<u64>,
    /// format of the report printed to stdout
    #[arg(short = 'o', long, value_enum, default_value_t = ReportFormat::Text)]
    pub output: ReportFormat,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// deployment to show, all deployments in the namespace if unset
    pub name: Option<String>,
    /// only show deployments matching this label selector
    #[arg(short = 'l', long)]
    pub selector: Option<String>,
    /// output format
    #[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::TableWithHeaders)]
    pub output: OutputFormat,
}

pub fn parse_change_cause(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("change cause can't be empty".to_owned());
    }

    Ok(value.to_owned())
}
