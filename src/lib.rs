//! testgantt -- a Gantt-style timeline of `go test -json` runs.
//!
//! The pipeline reads the event stream line by line ([`event`], [`ingest`]),
//! folds it into per-test execution intervals ([`timeline`]), projects those
//! into chart traces ([`chart`]) and renders a self-contained HTML page
//! ([`report`]) that is either written to stdout or served to a browser
//! ([`present`]).

pub mod chart;
pub mod config;
pub mod duration;
pub mod event;
pub mod ingest;
pub mod input;
pub mod present;
pub mod report;
pub mod timeline;

use std::io::Write;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;
use crate::ingest::{ingest, Ingested};
use crate::input::InputSource;
use crate::present::{Mode, ServeOptions};
use crate::report::Report;

/// How a run of the pipeline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Interrupted while reading input; nothing was rendered.
    Cancelled,
    Finished {
        /// Exit code of a spawned test command that failed.
        child_exit: Option<i32>,
        /// Whether any test in the input failed.
        failed: bool,
    },
}

impl Outcome {
    /// Process exit status: the child's failure code first, then 1 for
    /// failed tests, otherwise 0.
    pub fn exit_code(&self) -> i32 {
        match *self {
            Outcome::Cancelled => 0,
            Outcome::Finished {
                child_exit: Some(code),
                ..
            } if code != 0 => code,
            Outcome::Finished { failed: true, .. } => 1,
            Outcome::Finished { .. } => 0,
        }
    }
}

/// Read events from `source`, build the timeline and present it.
pub async fn run(
    config: &Config,
    source: InputSource,
    mode: Mode,
    cancel: &CancellationToken,
) -> Result<Outcome> {
    let mut input = source.open().await?;

    let mut stderr = std::io::stderr();
    let echo: Option<&mut (dyn Write + Send)> = if config.pass_output {
        Some(&mut stderr as &mut (dyn Write + Send))
    } else {
        None
    };

    let timeline = match ingest(input.reader(), echo, config.cutoff(), cancel).await? {
        Ingested::Complete(timeline) if !cancel.is_cancelled() => timeline,
        _ => return Ok(Outcome::Cancelled),
    };
    let child_exit = input.finish().await?;

    let report = Report::new(&timeline);
    info!(
        passed = report.passed(),
        failed = report.failed(),
        pauses = timeline.pauses().len(),
        duration = report.duration(),
        "parsed test events"
    );

    match mode {
        Mode::Emit => {
            let mut stdout = std::io::stdout().lock();
            present::emit(&report, &mut stdout)?;
        }
        Mode::Serve => {
            present::serve(
                report,
                &ServeOptions::from(config),
                cancel,
                present::browser::open,
            )
            .await?;
        }
    }

    Ok(Outcome::Finished {
        child_exit,
        failed: timeline.failed(),
    })
}
