/// Audio music-energy spectrum: downsampling, hover lookup and SVG paths
///
/// The analysis job emits one `{t, music}` sample per audio window. A long
/// event easily has thousands of windows, far more than the timeline has
/// pixels, so samples are reduced to display buckets by taking the max of each
/// bucket. Max keeps a short loud spike visible where averaging would flatten it.
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// One spectrum sample from the analysis job
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpectrumPoint {
    /// Window start in seconds
    pub t: f64,
    /// Music probability in [0, 1]
    pub music: f64,
}

/// A downsampled point ready to plot
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPoint {
    /// Horizontal position as a fraction of the timeline, in [0, 1]
    pub x: f64,
    pub value: f64,
}

/// Reduce `points` to at most `buckets` display points.
pub fn downsample(points: &[SpectrumPoint], duration_secs: f64, buckets: usize) -> Vec<DisplayPoint> {
    if points.is_empty() || buckets == 0 || !(duration_secs > 0.0) {
        return Vec::new();
    }

    if points.len() <= buckets {
        return points
            .iter()
            .map(|p| DisplayPoint {
                x: (p.t / duration_secs).clamp(0.0, 1.0),
                value: p.music,
            })
            .collect();
    }

    let bucket_secs = duration_secs / buckets as f64;
    let mut peaks = vec![0.0f64; buckets];

    for p in points {
        let slot = (p.t / bucket_secs).floor();
        let slot = if slot.is_finite() { slot.clamp(0.0, (buckets - 1) as f64) as usize } else { 0 };
        peaks[slot] = peaks[slot].max(p.music);
    }

    peaks
        .into_iter()
        .enumerate()
        .map(|(i, value)| DisplayPoint {
            x: (i as f64 + 0.5) / buckets as f64,
            value,
        })
        .collect()
}

/// Sample closest in time to `t`.
pub fn nearest_sample(points: &[SpectrumPoint], t: f64) -> Option<&SpectrumPoint> {
    points
        .iter()
        .min_by(|a, b| (a.t - t).abs().total_cmp(&(b.t - t).abs()))
}

/// Vertical position for a value, leaving `top_margin` pixels above a full-scale point.
fn value_to_y(value: f64, height: f64, top_margin: f64) -> f64 {
    let usable = (height - top_margin).max(0.0);
    top_margin + (1.0 - value.clamp(0.0, 1.0)) * usable
}

/// Open polyline through the display points.
pub fn line_path(points: &[DisplayPoint], width: f64, height: f64, top_margin: f64) -> String {
    let mut path = String::new();
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(
            path,
            "{}{:.2},{:.2} ",
            cmd,
            p.x * width,
            value_to_y(p.value, height, top_margin)
        );
    }
    path.trim_end().to_string()
}

/// Closed area under the curve, anchored to the bottom edge.
pub fn area_path(points: &[DisplayPoint], width: f64, height: f64, top_margin: f64) -> String {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return String::new();
    };

    let mut path = format!("M{:.2},{:.2} ", first.x * width, height);
    for p in points {
        let _ = write!(
            path,
            "L{:.2},{:.2} ",
            p.x * width,
            value_to_y(p.value, height, top_margin)
        );
    }
    let _ = write!(path, "L{:.2},{:.2} Z", last.x * width, height);
    path
}

/// Memoized downsample keyed by bucket count, duration and a fingerprint of
/// the source samples (length, first and last `t`).
#[derive(Debug, Default)]
pub struct SpectrumCache {
    key: Option<CacheKey>,
    points: Vec<DisplayPoint>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    buckets: usize,
    duration_bits: u64,
    len: usize,
    first_t: u64,
    last_t: u64,
}

impl CacheKey {
    fn of(source: &[SpectrumPoint], duration_secs: f64, buckets: usize) -> Self {
        Self {
            buckets,
            duration_bits: duration_secs.to_bits(),
            len: source.len(),
            first_t: source.first().map_or(0, |p| p.t.to_bits()),
            last_t: source.last().map_or(0, |p| p.t.to_bits()),
        }
    }
}

impl SpectrumCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.points.clear();
    }

    pub fn get(&mut self, source: &[SpectrumPoint], duration_secs: f64, buckets: usize) -> &[DisplayPoint] {
        let key = CacheKey::of(source, duration_secs, buckets);
        if self.key != Some(key) {
            self.points = downsample(source, duration_secs, buckets);
            self.key = Some(key);
        }
        &self.points
    }
}
