//! Rounding and display of durations.

use chrono::TimeDelta;

const NANOS_PER_MILLI: i64 = 1_000_000;
const NANOS_PER_SEC: i64 = 1_000_000_000;

fn nanos(delta: TimeDelta) -> i64 {
    delta.num_nanoseconds().unwrap_or(if delta < TimeDelta::zero() {
        i64::MIN
    } else {
        i64::MAX
    })
}

/// Round `nanos` to the nearest multiple of `unit`, halfway values away from zero.
fn round_nanos(nanos: i64, unit: i64) -> i64 {
    if unit <= 0 {
        return nanos;
    }
    let remainder = (nanos % unit).abs();
    let round_up = remainder.saturating_add(remainder) >= unit;
    match (nanos < 0, round_up) {
        (false, false) => nanos - remainder,
        (false, true) => nanos.saturating_add(unit - remainder),
        (true, false) => nanos + remainder,
        (true, true) => nanos.saturating_sub(unit - remainder),
    }
}

/// Round `delta` to a multiple of `unit`.
pub fn round(delta: TimeDelta, unit: TimeDelta) -> TimeDelta {
    TimeDelta::nanoseconds(round_nanos(nanos(delta), nanos(unit)))
}

/// Seconds as a float, after rounding to 10ms so bars don't jitter.
pub fn chart_seconds(delta: TimeDelta) -> f64 {
    let nanos = nanos(round(delta, TimeDelta::milliseconds(10)));
    let seconds = nanos / NANOS_PER_SEC;
    let fraction = nanos % NANOS_PER_SEC;
    seconds as f64 + fraction as f64 / 1e9
}

/// Compact display rounded to the millisecond: `0s`, `150ms`, `1.5s`,
/// `2m3.456s`, `1h0m0s`.
pub fn format_millis(delta: TimeDelta) -> String {
    let nanos = nanos(round(delta, TimeDelta::milliseconds(1)));
    let millis = (nanos / NANOS_PER_MILLI).unsigned_abs();
    if millis == 0 {
        return "0s".to_string();
    }

    let mut out = String::new();
    if nanos < 0 {
        out.push('-');
    }
    if millis < 1000 {
        out.push_str(&format!("{millis}ms"));
        return out;
    }

    let hours = millis / 3_600_000;
    let minutes = millis / 60_000 % 60;
    let seconds = millis / 1000 % 60;
    let fraction = millis % 1000;

    if hours > 0 {
        out.push_str(&format!("{hours}h"));
    }
    if hours > 0 || minutes > 0 {
        out.push_str(&format!("{minutes}m"));
    }
    out.push_str(&seconds.to_string());
    if fraction > 0 {
        let digits = format!("{fraction:03}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out.push('s');
    out
}
