//! Bar colors.

use chrono::TimeDelta;

use crate::timeline::Execution;

/// Fill for pause segments.
pub const PAUSE: &str = "rgba(108,122,137,1)";

/// Fill for runs that did not pass.
pub const FAILED: &str = "rgba(255, 0, 0, 100)";

/// Map `position` in `[0, 1]` onto the fast-to-slow gradient. Values outside
/// the range are clamped; NaN is treated as 0.
pub fn gradient(position: f64) -> String {
    let position = if position.is_nan() {
        0.0
    } else {
        position.clamp(0.0, 1.0)
    };

    let r = (60.0 * position).round() as u8;
    let g = (180.0 * (1.0 - position)).round() as u8;
    let b = (200.0 + 30.0 * position).round() as u8;

    format!("rgba({r}, {g}, {b}, 100)")
}

/// Color of a run segment: red if it didn't pass, otherwise its duration
/// relative to the slowest run.
pub fn run_color(run: &Execution, max_duration: TimeDelta) -> String {
    if !run.passed {
        return FAILED.to_string();
    }

    let max = max_duration.num_nanoseconds().unwrap_or(i64::MAX);
    if max <= 0 {
        return gradient(0.0);
    }
    let duration = run.duration().num_nanoseconds().unwrap_or(i64::MAX);
    gradient(duration as f64 / max as f64)
}
