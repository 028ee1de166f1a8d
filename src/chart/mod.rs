//! Projection of a [`Timeline`] into horizontal bar traces.
//!
//! Each retained run becomes one trace with an optional pause segment and a
//! run segment. The serialized shape of [`Trace`] is what the page hands to
//! `Plotly.newPlot`.

pub mod color;

use chrono::TimeDelta;
use serde::Serialize;
use tracing::debug;

use crate::duration::{chart_seconds, format_millis};
use crate::timeline::Timeline;

/// Bar thickness, uniform for every segment.
const BAR_WIDTH: f64 = 0.9;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Marker {
    pub color: Vec<String>,
}

/// One test's worth of chart data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub y: Vec<String>,
    /// Segment widths, in seconds.
    pub x: Vec<f64>,
    pub orientation: &'static str,
    /// Segment offsets from the start of the timeline, in seconds.
    pub base: Vec<f64>,
    /// Hover text per segment.
    pub text: Vec<String>,
    pub textposition: &'static str,
    pub width: Vec<f64>,
    pub marker: Marker,
    pub hoverinfo: &'static str,
}

impl Default for Trace {
    fn default() -> Self {
        Self {
            kind: "bar",
            y: Vec::new(),
            x: Vec::new(),
            orientation: "h",
            base: Vec::new(),
            text: Vec::new(),
            textposition: "inside",
            width: Vec::new(),
            marker: Marker::default(),
            hoverinfo: "text",
        }
    }
}

impl Trace {
    pub fn add_segment(
        &mut self,
        text: String,
        y: &str,
        offset: TimeDelta,
        duration: TimeDelta,
        color: String,
    ) {
        self.y.push(y.to_string());
        self.x.push(chart_seconds(duration));
        self.base.push(chart_seconds(offset));
        self.text.push(text);
        self.width.push(BAR_WIDTH);
        self.marker.color.push(color);
    }

    pub fn segments(&self) -> usize {
        self.y.len()
    }
}

/// Build one trace per run, ordered by earliest start. Tests that only
/// appear in the pause map are skipped.
pub fn project(timeline: &Timeline) -> Vec<Trace> {
    let mut traces = Vec::with_capacity(timeline.runs().len());

    for name in timeline.names_by_start() {
        let Some(run) = timeline.runs().get(&name) else {
            debug!(test = %name, "test was paused but never ran");
            continue;
        };

        let label = name.short_label();
        let mut y = label.clone();
        if !run.passed {
            y.push_str(" (failed)");
        }

        let mut trace = Trace::default();

        if let Some(pause) = timeline.pauses().get(&name) {
            let duration = pause.duration();
            trace.add_segment(
                format!("{label} PAUSE ({})", format_millis(duration)),
                &y,
                timeline.offset(pause.start),
                duration,
                color::PAUSE.to_string(),
            );
        }

        let duration = run.duration();
        trace.add_segment(
            format!("{label} RUN ({})", format_millis(duration)),
            &y,
            timeline.offset(run.start),
            duration,
            color::run_color(run, timeline.max_duration()),
        );

        debug!(test = %name, segments = trace.segments(), "projected trace");
        traces.push(trace);
    }

    traces
}
