//! Pull loop from a raw byte stream into a finalized [`Timeline`].

use std::io::{self, Write};

use chrono::TimeDelta;
use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::event::codec::EventCodec;
use crate::timeline::{Timeline, TimelineBuilder};

/// How the input stream ended.
#[derive(Debug)]
pub enum Ingested {
    Complete(Timeline),
    /// Cancelled before the end of the stream; nothing should be rendered.
    Cancelled,
}

/// Read `reader` line by line until EOF or cancellation.
///
/// Every consumed line is copied to `echo`, if given, before it is decoded.
/// Only I/O errors on the reader or the echo sink are returned; undecodable
/// lines are skipped.
pub async fn ingest<R>(
    reader: R,
    mut echo: Option<&mut (dyn Write + Send)>,
    cutoff: TimeDelta,
    cancel: &CancellationToken,
) -> io::Result<Ingested>
where
    R: AsyncRead + Unpin,
{
    let mut lines = FramedRead::new(reader, EventCodec::new());
    let mut builder = TimelineBuilder::new();
    let mut events = 0usize;

    loop {
        let next = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("input cancelled before end of stream");
                return Ok(Ingested::Cancelled);
            }

            next = lines.next() => next,
        };

        let Some(line) = next.transpose()? else {
            break;
        };

        if let Some(out) = echo.as_mut() {
            out.write_all(&line.raw)?;
            out.write_all(b"\n")?;
        }

        if let Some(event) = &line.event {
            builder.apply(event);
            events += 1;
        }
    }

    debug!(events, "input stream ended");
    Ok(Ingested::Complete(builder.finish(cutoff)))
}
