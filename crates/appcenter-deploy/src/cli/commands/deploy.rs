//! Deploy command - upload a binary and distribute the release

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use console::style;
use tracing::info;

use appcenter::pipeline::{self, DeployStep};
use appcenter::{App, AppCenterClient, ClientConfig, PollPolicy, ReleaseOptions};

use crate::cli::{output, Cli, OutputFormat};
use crate::export::{Exporter, EXPORT_FILE_ENV};

/// Upload a binary to App Center and distribute it
#[derive(Debug, Args)]
pub struct DeployCommand {
    /// Path to the binary (IPA, APK or AAB)
    #[arg(long, env = "APP_PATH")]
    pub app_path: PathBuf,

    /// App name as it appears in App Center URLs
    #[arg(long, env = "APP_NAME")]
    pub app_name: String,

    /// User or organization owning the app
    #[arg(long, env = "OWNER_NAME")]
    pub owner_name: String,

    /// App Center API token
    #[arg(long, env = "API_TOKEN", hide_env_values = true)]
    pub api_token: String,

    /// Force testers to install the release
    #[arg(
        long,
        env = "MANDATORY",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub mandatory: bool,

    /// Notify testers about the release
    #[arg(
        long,
        env = "NOTIFY_TESTERS",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub notify_testers: bool,

    /// ProGuard mapping file or zipped dSYM to upload as symbols
    #[arg(long, env = "MAPPING_PATH")]
    pub mapping_path: Option<String>,

    /// Release notes
    #[arg(long, env = "RELEASE_NOTES")]
    pub release_notes: Option<String>,

    /// Distribution group names, one per line
    #[arg(long, env = "DISTRIBUTION_GROUP", default_value = "")]
    pub distribution_group: String,

    /// Distribution store names, one per line
    #[arg(long, env = "DISTRIBUTION_STORE", default_value = "")]
    pub distribution_store: String,

    /// Tester emails, one per line
    #[arg(long, env = "DISTRIBUTION_TESTER", default_value = "")]
    pub distribution_tester: String,

    /// Build version attached to the upload
    #[arg(long, env = "BUILD_VERSION")]
    pub build_version: Option<String>,

    /// Build number attached to the upload
    #[arg(long, env = "BUILD_NUMBER")]
    pub build_number: Option<String>,

    /// App Center API URL
    #[arg(long, env = "APPCENTER_API_URL", default_value = appcenter::DEFAULT_API_URL)]
    pub api_url: String,

    /// Readiness polls before giving up
    #[arg(long, env = "APPCENTER_POLL_MAX_ATTEMPTS", default_value_t = 120)]
    pub poll_max_attempts: u32,

    /// Seconds to wait for the release to get ready
    #[arg(long, env = "APPCENTER_POLL_TIMEOUT", default_value_t = 1800)]
    pub poll_timeout: u64,

    /// File the result variables are appended to as KEY=value lines
    #[arg(long, env = EXPORT_FILE_ENV)]
    pub export_file: Option<PathBuf>,
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl DeployCommand {
    pub fn execute(&self, cli: &Cli) -> anyhow::Result<()> {
        info!(app = %self.app_name, owner = %self.owner_name, "executing deploy command");

        let exporter = Exporter::new(self.export_file.clone());
        let result = tokio::runtime::Runtime::new()
            .context("Failed to start the async runtime")
            .and_then(|runtime| runtime.block_on(self.run(cli, &exporter)));

        if result.is_err() {
            exporter.mark_failed();
        }
        result
    }

    async fn run(&self, cli: &Cli, exporter: &Exporter) -> anyhow::Result<()> {
        let options = self.release_options();
        let client = AppCenterClient::new(self.client_config(cli.debug))?;
        let app = client.app(options.app.clone());

        if cli.show_progress() {
            println!();
            println!("{}", output::header("Deploying to App Center"));
            println!("  App: {}", style(format!("{}/{}", self.owner_name, self.app_name)).cyan());
            println!("  File: {}", style(self.app_path.display()).cyan());
            if !options.group_names.is_empty() {
                println!("  Groups: {}", style(options.group_names.join(", ")).dim());
            }
            if !options.store_names.is_empty() {
                println!("  Stores: {}", style(options.store_names.join(", ")).dim());
            }
            if !options.testers.is_empty() {
                println!(
                    "  Testers: {}",
                    style(format!("{} recipients", options.testers.len())).dim()
                );
            }
            println!();
        }

        let show_progress = cli.show_progress();
        let outcome = pipeline::deploy(&app, &options, |step: DeployStep<'_>| {
            if show_progress {
                output::info(&step.to_string());
            }
        })
        .await
        .with_context(|| format!("Failed to deploy {}", self.app_path.display()))?;

        let outputs = outcome.outputs(&options.app);
        exporter.export_all(&outputs)?;

        if cli.format == OutputFormat::Json {
            println!("{}", serde_json::to_string_pretty(&outputs)?);
        } else if !cli.quiet {
            println!();
            output::success(&format!(
                "Release {} is ready",
                style(outcome.published.release.id).cyan()
            ));
            output::outputs(&outputs);
        }

        Ok(())
    }

    fn release_options(&self) -> ReleaseOptions {
        let app = App::new(self.owner_name.trim(), self.app_name.trim());
        let mut options = ReleaseOptions::new(app, &self.app_path);

        options.mandatory = self.mandatory;
        options.notify_testers = self.notify_testers;
        options.build_version = non_empty(&self.build_version);
        options.build_number = non_empty(&self.build_number);
        options.group_names = pipeline::split_list(&self.distribution_group);
        options.store_names = pipeline::split_list(&self.distribution_store);
        options.testers = pipeline::split_list(&self.distribution_tester);
        options.release_notes = self.release_notes.clone().filter(|n| !n.trim().is_empty());
        options.symbol_path = non_empty(&self.mapping_path).map(PathBuf::from);

        options
    }

    fn client_config(&self, debug: bool) -> ClientConfig {
        let mut config = ClientConfig::new(self.api_token.trim()).with_base_url(&self.api_url);
        config.debug = debug;
        config.poll = PollPolicy {
            max_attempts: self.poll_max_attempts,
            timeout: Duration::from_secs(self.poll_timeout),
            ..PollPolicy::default()
        };
        config
    }
}
