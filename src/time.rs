//! Playback time helpers.
//!
//! Every position in this crate is expressed in media-server ticks
//! (100 ns units) so values line up with chapter and detection payloads.

pub const TICKS_PER_SECOND: i64 = 10_000_000;
pub const TICKS_PER_MILLISECOND: i64 = 10_000;

pub fn ticks_to_secs(ticks: i64) -> f64 {
    ticks as f64 / TICKS_PER_SECOND as f64
}

/// Seconds to ticks, rounded to the nearest tick. Negative and NaN inputs map to 0.
pub fn secs_to_ticks(secs: f64) -> i64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * TICKS_PER_SECOND as f64).round() as i64
}

/// Render ticks as `M:SS` or `H:MM:SS`.
pub fn format_timestamp(ticks: i64) -> String {
    let total = ticks.max(0) / TICKS_PER_SECOND;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
