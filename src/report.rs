//! HTML report rendering.

use askama::Template;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::chart::{self, Trace};
use crate::duration::format_millis;
use crate::timeline::Timeline;

/// Plotting library, inlined into every page so the report never fetches
/// anything over the network.
const PLOTLY_JS: &str = include_str!("../assets/plotly.min.js");

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("error marshalling {what}")]
    Json {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("error executing template")]
    Template(#[from] askama::Error),
}

#[derive(Template)]
#[template(path = "report.html", escape = "none")]
struct ReportPage<'a> {
    plotly: &'a str,
    charts_json: &'a str,
    settings_json: &'a str,
    call_on_load: bool,
    passed: usize,
    failed: usize,
    duration: &'a str,
}

/// Everything the page needs, computed once from a finalized timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    traces: Vec<Trace>,
    passed: usize,
    failed: usize,
    duration: String,
}

impl Report {
    pub fn new(timeline: &Timeline) -> Self {
        let mut traces = chart::project(timeline);
        // The plot draws the first trace at the bottom.
        traces.reverse();

        let (passed, failed) = timeline.counts();

        Self {
            traces,
            passed,
            failed,
            duration: format_millis(timeline.wall_clock()),
        }
    }

    /// Traces in presentation order: the earliest-started test comes last.
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }

    pub fn passed(&self) -> usize {
        self.passed
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    /// Wall-clock duration of the run, rounded to the millisecond.
    pub fn duration(&self) -> &str {
        &self.duration
    }

    /// Render the page. With `call_on_load` the page requests `/loaded` once
    /// the browser has finished loading it.
    pub fn render(&self, call_on_load: bool) -> Result<String, RenderError> {
        let settings = json!({
            "showlegend": false,
            "yaxis": { "visible": false },
            "xaxis": { "ticksuffix": "s" },
        });

        let charts_json = serde_json::to_string_pretty(&self.traces).map_err(|source| {
            RenderError::Json {
                what: "charts",
                source,
            }
        })?;
        let settings_json = serde_json::to_string_pretty(&settings).map_err(|source| {
            RenderError::Json {
                what: "settings",
                source,
            }
        })?;

        debug!(charts = %charts_json, "generated chart data");

        let charts_json = escape_script_json(&charts_json);
        let settings_json = escape_script_json(&settings_json);

        let page = ReportPage {
            plotly: PLOTLY_JS,
            charts_json: &charts_json,
            settings_json: &settings_json,
            call_on_load,
            passed: self.passed,
            failed: self.failed,
            duration: &self.duration,
        };

        Ok(page.render()?)
    }
}

/// Replace `<`, `>` and `&` with their `\uXXXX` escapes so a JSON literal can
/// sit inside an inline `<script>` without ending it. Those characters only
/// occur inside JSON strings, where the escapes decode to the same text.
fn escape_script_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Action, TestEvent};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + TimeDelta::milliseconds(millis)
    }

    fn event(millis: i64, action: Action, test: &str) -> TestEvent {
        TestEvent {
            time: Some(at(millis)),
            action: Some(action),
            package: "a/b".to_string(),
            test: test.to_string(),
        }
    }

    fn report(events: &[TestEvent]) -> Report {
        Report::new(&Timeline::from_events(events, TimeDelta::microseconds(100)))
    }

    #[test]
    fn test_empty_report() {
        let report = report(&[]);
        let html = report.render(false).unwrap();

        assert!(report.traces().is_empty());
        assert!(html.contains("<title>Test Results (0s 0 passed, 0 failed)</title>"));
        assert!(!html.contains("fetch('/loaded')"));
    }

    #[test]
    fn test_traces_are_reversed() {
        let report = report(&[
            event(0, Action::Run, "A"),
            event(500, Action::Run, "B"),
            event(1000, Action::Pass, "A"),
            event(1000, Action::Fail, "B"),
        ]);

        let labels: Vec<&str> = report.traces().iter().map(|t| t.y[0].as_str()).collect();
        assert_eq!(labels, ["b.B (failed)", "b.A"]);
        assert_eq!((report.passed(), report.failed()), (1, 1));
        assert_eq!(report.duration(), "1s");
    }

    #[test]
    fn test_render_embeds_data() {
        let report = report(&[event(0, Action::Run, "T"), event(1500, Action::Pass, "T")]);
        let html = report.render(true).unwrap();

        assert!(html.contains("<title>Test Results (1.5s 1 passed, 0 failed)</title>"));
        assert!(html.contains(r#""text": [
      "b.T RUN (1.5s)"
    ]"#));
        assert!(html.contains(r#""ticksuffix": "s""#));
        assert!(html.contains("fetch('/loaded')"));
        assert!(html.contains(PLOTLY_JS));
    }

    #[test]
    fn test_render_is_stable() {
        let report = report(&[event(0, Action::Run, "T"), event(1500, Action::Pass, "T")]);
        assert_eq!(report.render(false).unwrap(), report.render(false).unwrap());
    }

    #[test]
    fn test_test_name_cannot_close_script() {
        let name = "TestX/</script><script>alert(1)</script>";
        let report = report(&[event(0, Action::Run, name), event(1000, Action::Pass, name)]);
        let html = report.render(false).unwrap();

        assert!(!html.contains("</script><script>alert(1)"));
        assert!(html.contains(r"b.TestX/\u003c/script\u003e\u003cscript\u003ealert(1)"));

        // The escaped literal still decodes to the original label.
        let escaped = escape_script_json(&serde_json::to_string(report.traces()).unwrap());
        let traces: serde_json::Value = serde_json::from_str(&escaped).unwrap();
        assert_eq!(traces[0]["y"][0], format!("b.{name}"));
    }

    #[test]
    fn test_escape_script_json() {
        assert_eq!(
            escape_script_json(r#"{"a":"x<y && y>z"}"#),
            r#"{"a":"x\u003cy \u0026\u0026 y\u003ez"}"#
        );
        assert_eq!(escape_script_json(r#"{"a":1}"#), r#"{"a":1}"#);
    }
}
