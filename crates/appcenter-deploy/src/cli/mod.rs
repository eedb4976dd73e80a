//! CLI definition and command handling

pub mod commands;
pub mod output;

use std::ffi::OsString;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};

use commands::DeployCommand;

use crate::export::Exporter;

/// appcenter-deploy - publish a mobile binary to App Center
///
/// Every option can also be given through the environment variable shown in
/// its help, which is how CI steps usually configure it.
#[derive(Debug, Parser)]
#[command(name = "appcenter-deploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log request and response bodies
    #[arg(
        long,
        env = "DEBUG",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub debug: bool,

    /// Suppress output except errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(long, env = "APPCENTER_OUTPUT_FORMAT", default_value = "text")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub deploy: DeployCommand,
}

/// Output format for CLI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output
    Json,
}

impl Cli {
    /// Parse arguments, recording a failed run when they are invalid
    ///
    /// Help and version requests are not failures and export nothing.
    pub fn parse_or_mark_failed<I, T>(args: I, exporter: &Exporter) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        Self::try_parse_from(args).map_err(|e| {
            if e.use_stderr() {
                exporter.mark_failed();
            }
            e
        })
    }

    /// Execute the CLI command
    pub fn execute(&self) -> anyhow::Result<()> {
        self.deploy.execute(self)
    }

    /// Whether progress lines should be printed
    pub fn show_progress(&self) -> bool {
        !self.quiet && self.format == OutputFormat::Text
    }
}
