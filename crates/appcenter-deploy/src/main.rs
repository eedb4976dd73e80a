//! appcenter-deploy - publish a mobile binary to App Center

mod cli;
mod exit_codes;
mod export;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use cli::{output, Cli};
use export::Exporter;

fn main() {
    let cli = match Cli::parse_or_mark_failed(std::env::args_os(), &Exporter::from_env()) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    let guard = init_tracing(cli.debug);

    let code = match cli.execute() {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            exit_codes::for_error(&e)
        }
    };

    // pending run log records are written when the guard drops
    drop(guard);
    std::process::exit(code);
}

/// Human-readable events go to stderr, at `warn` unless `--debug` or RUST_LOG
/// say otherwise. When a home directory is available, the tool's own events
/// are also kept as JSON at debug level, every API request line included.
fn init_tracing(debug: bool) -> Option<WorkerGuard> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "warn" }));
    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let (run_log, guard) = match run_log_writer() {
        Some((writer, guard)) => {
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_filter(EnvFilter::new("appcenter=debug,appcenter_deploy=debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(run_log)
        .init();

    guard
}

/// Daily rolling file under ~/.appcenter-deploy/logs
fn run_log_writer() -> Option<(NonBlocking, WorkerGuard)> {
    let dir = dirs::home_dir()?.join(".appcenter-deploy").join("logs");
    std::fs::create_dir_all(&dir).ok()?;

    let appender = tracing_appender::rolling::daily(dir, "deploy.log");
    Some(tracing_appender::non_blocking(appender))
}
