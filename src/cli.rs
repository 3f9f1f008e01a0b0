//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

use commonrepo::output::OutputConfig;

use crate::commands;

/// commonrepo - Propagate shared files from upstream repositories
#[derive(Parser, Debug)]
#[command(name = "commonrepo")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level; RUST_LOG takes precedence when set
    #[arg(long, global = true, value_name = "LEVEL", value_enum, default_value = "warn")]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the targets the repository's own configuration publishes
    Ls(commands::ls::LsArgs),

    /// Print the resolved upstream chain as locator@ref lines
    Upstreams(commands::upstreams::UpstreamsArgs),

    /// Compose every upstream's targets and write them into the repository
    Apply(commands::apply::ApplyArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(self.log_level);
        let output = OutputConfig::from_env_and_flag(&self.color);
        output.install();

        match self.command {
            Commands::Ls(args) => commands::ls::execute(args),
            Commands::Upstreams(args) => commands::upstreams::execute(args),
            Commands::Apply(args) => commands::apply::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

fn init_logging(level: LogLevel) {
    let env = env_logger::Env::default().default_filter_or(level.as_filter());
    // a second init (e.g. in tests) keeps the first logger
    let _ = env_logger::Builder::from_env(env).format_timestamp(None).try_init();
}
