//! Output of a rendered [`Report`]: written to a sink, or served to a browser.

pub mod browser;
pub mod server;

use std::io::{self, Write};

use thiserror::Error;

use crate::report::{RenderError, Report};

pub use server::{serve, LoadOutcome, ServeOptions};

#[derive(Debug, Error)]
pub enum PresentError {
    #[error("error rendering html")]
    Render(#[from] RenderError),

    #[error("failed to write html")]
    Write(#[source] io::Error),

    #[error("error creating listener")]
    Bind(#[source] io::Error),

    #[error("error opening browser")]
    Browser(#[source] io::Error),

    #[error("error serving")]
    Serve(#[source] io::Error),
}

/// How the report is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Write the page to stdout.
    Emit,
    /// Serve the page on an ephemeral port and open it in the default browser.
    Serve,
}

/// Render `report` without the load hook and write it to `sink`.
pub fn emit(report: &Report, sink: &mut impl Write) -> Result<(), PresentError> {
    let html = report.render(false)?;
    sink.write_all(html.as_bytes()).map_err(PresentError::Write)?;
    sink.flush().map_err(PresentError::Write)
}
