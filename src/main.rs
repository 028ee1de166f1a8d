use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;

use testgantt::config::{self, Config};
use testgantt::input::{self, InputSource};
use testgantt::present::Mode;
use testgantt::Outcome;

const USAGE_HINT: &str = "Process closed without input: you should pipe the output of your test command into this program.
For example: go test -json ./... | testgantt";

#[derive(Parser)]
#[command(
    name = "testgantt",
    about = "Gantt-style timeline of go test -json output",
    version,
    long_about = None
)]
struct Cli {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Don't echo consumed input lines to stderr
    #[arg(long)]
    dont_pass_output: bool,

    /// Keep serving after the browser has opened the page
    #[arg(long)]
    keep_running: bool,

    /// Print the HTML to stdout instead of opening a browser
    #[arg(long)]
    print_html: bool,

    /// Read the event stream from a file instead of stdin
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,

    /// Tests at or below this duration are not shown in the chart [default: 100µs]
    #[arg(long, value_name = "DURATION", value_parser = config::parse_duration)]
    duration_cutoff: Option<Duration>,

    /// TOML configuration file
    #[arg(long, value_name = "PATH", env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Arguments for `go test -json` when no input is piped in
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    test_args: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr: stdout carries the page with --print-html.
    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    let code = match runtime.block_on(run(cli)) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    };

    // A cancelled stdin read can't be interrupted; don't wait for it.
    runtime.shutdown_timeout(Duration::from_millis(100));
    code
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let mut config = Config::load_or_default(cli.config.as_deref())?;
    if cli.dont_pass_output {
        config.pass_output = false;
    }
    if cli.keep_running {
        config.keep_running = true;
    }
    if let Some(cutoff) = cli.duration_cutoff {
        config.duration_cutoff = cutoff;
    }

    let source = InputSource::select(cli.from_file, input::stdin_is_piped(), cli.test_args)?;
    let mode = if cli.print_html { Mode::Emit } else { Mode::Serve };

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let outcome = testgantt::run(&config, source, mode, &cancel).await?;
    if outcome == Outcome::Cancelled {
        println!("{USAGE_HINT}");
    }

    let code = outcome.exit_code();
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}

async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::warn!(error = %e, "failed to listen for ctrl-c");
                return;
            }
        }
        _ = terminate => {}
    }

    tracing::debug!("interrupted");
    cancel.cancel();
}
