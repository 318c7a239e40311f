/// Unified timeline view-model
///
/// Everything drawn on the timeline shares one horizontal mapping between
/// pixels and ticks at the current zoom. From top to bottom the lanes are:
/// trickplay thumbnails, visual detection markers, the audio lane (music
/// spectrum with bell ticks, or plain audio markers) and chapters. A playhead
/// spans all of them. The model is pure layout: it produces positions, tiles
/// and paths, and `svg` turns a model into a document.

pub mod resize;
pub mod svg;

pub use resize::{resize_channel, ResizeNotifier, ResizeObserver};

use crate::analysis::{AnalysisResults, Detection, DetectionType};
use crate::chapters::{chapter_spans, sort_chapters, Chapter};
use crate::config::TimelineConfig;
use crate::spectrum::{self, nearest_sample, SpectrumCache, SpectrumPoint};
use crate::time::{format_timestamp, ticks_to_secs};
use crate::trickplay::{pixel_offset_to_ticks, ticks_to_pixel_offset, SpriteTile, TrickplayInfo};

/// Pixels per spectrum bucket
const SPECTRUM_PX_PER_BUCKET: f64 = 2.0;

const CHAPTER_COLORS: [&str; 6] = ["#2563eb", "#16a34a", "#dc2626", "#9333ea", "#ea580c", "#0891b2"];

/// Discrete zoom multiplier, always a power of two in `[1, max]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zoom {
    level: u32,
    max: u32,
}

impl Zoom {
    pub fn new(max: u32) -> Self {
        Self { level: 1, max: max.max(1) }
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn can_zoom_in(&self) -> bool {
        self.level * 2 <= self.max
    }

    pub fn can_zoom_out(&self) -> bool {
        self.level > 1
    }

    pub fn zoom_in(&mut self) -> bool {
        if !self.can_zoom_in() {
            return false;
        }
        self.level *= 2;
        true
    }

    pub fn zoom_out(&mut self) -> bool {
        if !self.can_zoom_out() {
            return false;
        }
        self.level /= 2;
        true
    }

    /// Set a level, rounded down to a power of two and clamped to the limits.
    pub fn set_level(&mut self, level: u32) {
        let clamped = level.clamp(1, self.max);
        self.level = 1 << (31 - clamped.leading_zeros());
    }
}

/// How the timeline width is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    /// One slot per trickplay thumbnail
    Thumbnails,
    /// No thumbnails; width follows the container
    Waveform,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneKind {
    Thumbnails,
    Visual,
    Audio,
    Chapters,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lane {
    pub kind: LaneKind,
    pub y: f64,
    pub height: f64,
}

impl Lane {
    fn contains(&self, y: f64) -> bool {
        y >= self.y && y < self.y + self.height
    }
}

/// A thumbnail position; `tile` is only set inside the virtualized window
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailSlot {
    pub index: u32,
    pub x: f64,
    pub width: f64,
    pub tile: Option<SpriteTile>,
}

/// A detection tick on a marker lane
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    /// Index into the merged detection list
    pub detection_index: usize,
    pub kind: DetectionType,
    pub ticks: i64,
    pub x: f64,
    pub opacity: f64,
    pub color: &'static str,
}

/// Contents of the audio lane
#[derive(Debug, Clone, PartialEq)]
pub enum AudioLane {
    Spectrum {
        area_path: String,
        line_path: String,
        bells: Vec<Marker>,
    },
    Markers(Vec<Marker>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSegment {
    pub chapter_id: i64,
    pub title: String,
    pub x: f64,
    pub width: f64,
    pub color: &'static str,
}

/// Floating preview under the pointer
#[derive(Debug, Clone, PartialEq)]
pub struct HoverPreview {
    pub x: f64,
    pub ticks: i64,
    pub time_label: String,
    pub tile: Option<SpriteTile>,
    /// Music level of the nearest spectrum sample
    pub music: Option<f64>,
}

/// What a click on the timeline resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineAction {
    Seek(i64),
    OpenDetection(usize),
    OpenChapter(i64),
}

/// Opacity for a marker: faint for weak detections, solid for confident ones
fn marker_opacity(confidence: f64) -> f64 {
    0.35 + 0.65 * confidence.clamp(0.0, 1.0)
}

pub struct TimelineModel {
    config: TimelineConfig,
    duration_ticks: i64,
    trickplay: Option<TrickplayInfo>,
    zoom: Zoom,
    container_width: f64,
    scroll_offset: f64,
    position_ticks: i64,
    detections: Vec<Detection>,
    spectrum: Vec<SpectrumPoint>,
    spectrum_cache: SpectrumCache,
    chapters: Vec<Chapter>,
    resize_notifier: ResizeNotifier,
    resize_observer: ResizeObserver,
}

impl TimelineModel {
    /// Inline timeline, zoom capped at `max_zoom`
    pub fn new(config: TimelineConfig, duration_ticks: i64, trickplay: Option<TrickplayInfo>) -> Self {
        let max = config.max_zoom;
        Self::with_zoom_limit(config, duration_ticks, trickplay, max)
    }

    /// Dedicated detail view, zoom capped at `detail_max_zoom`
    pub fn detail(config: TimelineConfig, duration_ticks: i64, trickplay: Option<TrickplayInfo>) -> Self {
        let max = config.detail_max_zoom;
        Self::with_zoom_limit(config, duration_ticks, trickplay, max)
    }

    fn with_zoom_limit(
        config: TimelineConfig,
        duration_ticks: i64,
        trickplay: Option<TrickplayInfo>,
        max_zoom: u32,
    ) -> Self {
        let container_width = config.container_width.max(0.0);
        let (resize_notifier, resize_observer) = resize_channel(container_width);
        Self {
            config,
            duration_ticks: duration_ticks.max(0),
            trickplay,
            zoom: Zoom::new(max_zoom),
            container_width,
            scroll_offset: 0.0,
            position_ticks: 0,
            detections: Vec::new(),
            spectrum: Vec::new(),
            spectrum_cache: SpectrumCache::new(),
            chapters: Vec::new(),
            resize_notifier,
            resize_observer,
        }
    }

    // --- inputs ---

    pub fn set_duration(&mut self, duration_ticks: i64) {
        self.duration_ticks = duration_ticks.max(0);
        self.spectrum_cache.invalidate();
        self.clamp_scroll();
    }

    pub fn set_trickplay(&mut self, trickplay: Option<TrickplayInfo>) {
        self.trickplay = trickplay;
        self.spectrum_cache.invalidate();
        self.clamp_scroll();
    }

    /// Replace detections and spectrum from a results snapshot (`None` clears them).
    pub fn set_results(&mut self, results: Option<&AnalysisResults>) {
        match results {
            Some(results) => {
                self.detections = results.merged();
                self.spectrum = results.spectrum().to_vec();
            }
            None => {
                self.detections.clear();
                self.spectrum.clear();
            }
        }
        self.spectrum_cache.invalidate();
    }

    pub fn set_chapters(&mut self, mut chapters: Vec<Chapter>) {
        sort_chapters(&mut chapters);
        self.chapters = chapters;
    }

    pub fn set_position(&mut self, ticks: i64) {
        self.position_ticks = ticks.clamp(0, self.duration_ticks);
    }

    /// Handle for the host to report container size changes
    pub fn resize_notifier(&self) -> ResizeNotifier {
        self.resize_notifier.clone()
    }

    /// Apply a pending width from the resize observer. Returns `true` if layout changed.
    pub fn apply_pending_resize(&mut self) -> bool {
        match self.resize_observer.take_change() {
            Some(width) => {
                self.set_container_width(width);
                true
            }
            None => false,
        }
    }

    pub fn set_container_width(&mut self, width: f64) {
        self.container_width = width.max(0.0);
        if self.mode() == LayoutMode::Waveform {
            self.spectrum_cache.invalidate();
        }
        self.clamp_scroll();
    }

    pub fn scroll_to(&mut self, offset: f64) {
        self.scroll_offset = offset;
        self.clamp_scroll();
    }

    pub fn zoom_in(&mut self) -> bool {
        self.change_zoom(|z| z.zoom_in())
    }

    pub fn zoom_out(&mut self) -> bool {
        self.change_zoom(|z| z.zoom_out())
    }

    pub fn set_zoom(&mut self, level: u32) -> bool {
        self.change_zoom(|z| {
            let before = z.level();
            z.set_level(level);
            z.level() != before
        })
    }

    /// Change zoom keeping the time at the viewport centre in place.
    fn change_zoom(&mut self, apply: impl FnOnce(&mut Zoom) -> bool) -> bool {
        let old_width = self.lane_width();
        let centre = self.scroll_offset + self.container_width / 2.0;
        let fraction = if old_width > 0.0 { centre / old_width } else { 0.0 };

        if !apply(&mut self.zoom) {
            return false;
        }

        self.spectrum_cache.invalidate();
        self.scroll_offset = fraction * self.lane_width() - self.container_width / 2.0;
        self.clamp_scroll();
        true
    }

    fn clamp_scroll(&mut self) {
        let max = (self.lane_width() - self.container_width).max(0.0);
        self.scroll_offset = if self.scroll_offset.is_finite() {
            self.scroll_offset.clamp(0.0, max)
        } else {
            0.0
        };
    }

    // --- accessors ---

    pub fn zoom(&self) -> Zoom {
        self.zoom
    }

    pub fn duration_ticks(&self) -> i64 {
        self.duration_ticks
    }

    pub fn position_ticks(&self) -> i64 {
        self.position_ticks
    }

    pub fn scroll_offset(&self) -> f64 {
        self.scroll_offset
    }

    pub fn container_width(&self) -> f64 {
        self.container_width
    }

    pub fn trickplay(&self) -> Option<&TrickplayInfo> {
        self.trickplay.as_ref()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn detection(&self, index: usize) -> Option<&Detection> {
        self.detections.get(index)
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    pub fn mode(&self) -> LayoutMode {
        match &self.trickplay {
            Some(tp) if tp.thumbnail_count > 0 => LayoutMode::Thumbnails,
            _ => LayoutMode::Waveform,
        }
    }

    // --- geometry ---

    /// Width of one thumbnail slot at the current zoom
    pub fn slot_width(&self) -> f64 {
        self.config.thumb_width * self.zoom.level() as f64
    }

    /// Total scrollable width of every lane
    pub fn lane_width(&self) -> f64 {
        match (&self.trickplay, self.mode()) {
            (Some(tp), LayoutMode::Thumbnails) => tp.thumbnail_count as f64 * self.slot_width(),
            _ => self.container_width * self.zoom.level() as f64,
        }
    }

    pub fn x_for_ticks(&self, ticks: i64) -> f64 {
        ticks_to_pixel_offset(ticks, self.lane_width(), self.duration_ticks)
    }

    pub fn ticks_for_x(&self, x: f64) -> i64 {
        pixel_offset_to_ticks(x, self.lane_width(), self.duration_ticks)
    }

    pub fn playhead_x(&self) -> f64 {
        self.x_for_ticks(self.position_ticks)
    }

    pub fn thumbnail_lane_height(&self) -> f64 {
        match (&self.trickplay, self.mode()) {
            (Some(tp), LayoutMode::Thumbnails) => tp.display_height(self.config.thumb_width),
            _ => 0.0,
        }
    }

    /// Lanes top to bottom. The thumbnail lane is omitted in waveform mode.
    pub fn lanes(&self) -> Vec<Lane> {
        let mut lanes = Vec::with_capacity(4);
        let mut y = 0.0;
        let mut push = |kind, height: f64| {
            lanes.push(Lane { kind, y, height });
            y += height;
        };

        if self.mode() == LayoutMode::Thumbnails {
            push(LaneKind::Thumbnails, self.thumbnail_lane_height());
        }
        push(LaneKind::Visual, self.config.visual_lane_height);
        push(LaneKind::Audio, self.config.audio_lane_height);
        push(LaneKind::Chapters, self.config.chapter_lane_height);
        lanes
    }

    pub fn total_height(&self) -> f64 {
        self.lanes().last().map(|l| l.y + l.height).unwrap_or(0.0)
    }

    pub fn lane(&self, kind: LaneKind) -> Option<Lane> {
        self.lanes().into_iter().find(|l| l.kind == kind)
    }

    /// Thumbnail indices backed by an image: visible range plus overscan on each side.
    pub fn visible_thumb_range(&self) -> Option<(u32, u32)> {
        let count = self.trickplay.as_ref().map(|tp| tp.thumbnail_count).unwrap_or(0);
        let slot = self.slot_width();
        if count == 0 || slot <= 0.0 {
            return None;
        }

        let last = count - 1;
        let first_visible = ((self.scroll_offset / slot).floor() as u32).min(last);
        let last_visible = (((self.scroll_offset + self.container_width) / slot).floor() as u32).min(last);
        let overscan = self.config.overscan;

        Some((
            first_visible.saturating_sub(overscan),
            last_visible.saturating_add(overscan).min(last),
        ))
    }

    /// Every thumbnail slot; only those in the visible range carry a tile.
    pub fn thumbnail_slots(&self) -> Vec<ThumbnailSlot> {
        let Some(tp) = self.trickplay.as_ref().filter(|tp| tp.thumbnail_count > 0) else {
            return Vec::new();
        };
        let slot = self.slot_width();
        let range = self.visible_thumb_range();

        (0..tp.thumbnail_count)
            .map(|index| {
                let in_range = range.is_some_and(|(start, end)| index >= start && index <= end);
                ThumbnailSlot {
                    index,
                    x: index as f64 * slot,
                    width: slot,
                    tile: in_range.then(|| tp.tile(index, self.config.thumb_width)),
                }
            })
            .collect()
    }

    fn marker(&self, index: usize, detection: &Detection) -> Marker {
        Marker {
            detection_index: index,
            kind: detection.kind,
            ticks: detection.timestamp_ticks,
            x: self.x_for_ticks(detection.timestamp_ticks),
            opacity: marker_opacity(detection.confidence),
            color: detection.kind.color(),
        }
    }

    fn markers_where(&self, keep: impl Fn(DetectionType) -> bool) -> Vec<Marker> {
        self.detections
            .iter()
            .enumerate()
            .filter(|(_, d)| keep(d.kind))
            .map(|(i, d)| self.marker(i, d))
            .collect()
    }

    pub fn visual_markers(&self) -> Vec<Marker> {
        self.markers_where(DetectionType::is_visual)
    }

    /// Markers that can be clicked on the audio lane
    fn audio_click_targets(&self) -> Vec<Marker> {
        if self.spectrum.is_empty() {
            self.markers_where(DetectionType::is_audio)
        } else {
            self.markers_where(|k| k == DetectionType::Bell)
        }
    }

    fn spectrum_buckets(&self) -> usize {
        (self.lane_width() / SPECTRUM_PX_PER_BUCKET).ceil().max(0.0) as usize
    }

    /// Audio lane: spectrum curve with bell ticks, or discrete markers when no spectrum exists.
    pub fn audio_lane(&mut self) -> AudioLane {
        if self.spectrum.is_empty() {
            return AudioLane::Markers(self.markers_where(DetectionType::is_audio));
        }

        let width = self.lane_width();
        let height = self.config.audio_lane_height;
        let margin = self.config.spectrum_top_margin;
        let buckets = self.spectrum_buckets();
        let duration_secs = ticks_to_secs(self.duration_ticks);

        let points = self.spectrum_cache.get(&self.spectrum, duration_secs, buckets);
        let area_path = spectrum::area_path(points, width, height, margin);
        let line_path = spectrum::line_path(points, width, height, margin);

        AudioLane::Spectrum {
            area_path,
            line_path,
            bells: self.markers_where(|k| k == DetectionType::Bell),
        }
    }

    pub fn chapter_segments(&self) -> Vec<ChapterSegment> {
        chapter_spans(&self.chapters, self.duration_ticks)
            .into_iter()
            .enumerate()
            .map(|(i, span)| {
                let x = self.x_for_ticks(span.start_ticks);
                let end = self.x_for_ticks(span.end_ticks);
                ChapterSegment {
                    chapter_id: span.chapter.id,
                    title: span.chapter.title.clone(),
                    x,
                    width: (end - x).max(0.0),
                    color: CHAPTER_COLORS[i % CHAPTER_COLORS.len()],
                }
            })
            .collect()
    }

    // --- interaction ---

    pub fn lane_at(&self, y: f64) -> Option<LaneKind> {
        self.lanes().into_iter().find(|l| l.contains(y)).map(|l| l.kind)
    }

    /// Preview for a pointer at lane offset `x`.
    pub fn hover(&self, x: f64) -> HoverPreview {
        let x = x.clamp(0.0, self.lane_width());
        let ticks = self.ticks_for_x(x);
        let secs = ticks_to_secs(ticks);

        HoverPreview {
            x,
            ticks,
            time_label: format_timestamp(ticks),
            tile: self
                .trickplay
                .as_ref()
                .filter(|tp| tp.thumbnail_count > 0)
                .map(|tp| tp.tile_for_time(secs, self.config.thumb_width)),
            music: nearest_sample(&self.spectrum, secs).map(|p| p.music),
        }
    }

    fn nearest_marker(&self, markers: Vec<Marker>, x: f64) -> Option<Marker> {
        let tolerance = self.config.marker_hit_tolerance;
        markers
            .into_iter()
            .filter(|m| (m.x - x).abs() <= tolerance)
            .min_by(|a, b| (a.x - x).abs().total_cmp(&(b.x - x).abs()))
    }

    /// Resolve a click at lane offset `x` and height `y`.
    ///
    /// Markers and chapter segments take the click; anywhere else seeks.
    pub fn click(&self, x: f64, y: f64) -> TimelineAction {
        let hit = match self.lane_at(y) {
            Some(LaneKind::Visual) => self
                .nearest_marker(self.visual_markers(), x)
                .map(|m| TimelineAction::OpenDetection(m.detection_index)),
            Some(LaneKind::Audio) => self
                .nearest_marker(self.audio_click_targets(), x)
                .map(|m| TimelineAction::OpenDetection(m.detection_index)),
            Some(LaneKind::Chapters) => self
                .chapter_segments()
                .into_iter()
                .find(|s| x >= s.x && x < s.x + s.width)
                .map(|s| TimelineAction::OpenChapter(s.chapter_id)),
            Some(LaneKind::Thumbnails) | None => None,
        };

        hit.unwrap_or_else(|| TimelineAction::Seek(self.ticks_for_x(x)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::TICKS_PER_SECOND;

    const HOUR: i64 = 3600 * TICKS_PER_SECOND;

    fn trickplay() -> TrickplayInfo {
        TrickplayInfo {
            resolution: Some(320),
            width: 320,
            height: 180,
            tile_width: 10,
            tile_height: 10,
            thumbnail_count: 360,
            interval: 10_000,
            base_url: "/tp/".to_string(),
        }
    }

    fn config() -> TimelineConfig {
        TimelineConfig {
            thumb_width: 160.0,
            container_width: 1600.0,
            ..TimelineConfig::default()
        }
    }

    fn detection(kind: DetectionType, secs: i64, confidence: f64) -> Detection {
        Detection {
            kind,
            timestamp_ticks: secs * TICKS_PER_SECOND,
            confidence,
        }
    }

    fn chapter(id: i64, title: &str, secs: i64) -> Chapter {
        Chapter {
            id,
            video_item_id: 1,
            match_id: None,
            title: title.to_string(),
            start_ticks: secs * TICKS_PER_SECOND,
            end_ticks: None,
        }
    }

    #[test]
    fn test_zoom_limits() {
        let mut zoom = Zoom::new(8);
        assert!(!zoom.zoom_out());
        assert!(zoom.zoom_in() && zoom.zoom_in() && zoom.zoom_in());
        assert_eq!(zoom.level(), 8);
        assert!(!zoom.zoom_in());

        zoom.set_level(13);
        assert_eq!(zoom.level(), 8);
        zoom.set_level(3);
        assert_eq!(zoom.level(), 2);
        zoom.set_level(0);
        assert_eq!(zoom.level(), 1);

        assert_eq!(Zoom::new(16).max(), 16);
    }

    #[test]
    fn test_lane_width_follows_zoom() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        assert_eq!(model.mode(), LayoutMode::Thumbnails);
        assert_eq!(model.lane_width(), 360.0 * 160.0);

        model.zoom_in();
        assert_eq!(model.lane_width(), 360.0 * 160.0 * 2.0);
    }

    #[test]
    fn test_waveform_width_follows_container() {
        let mut model = TimelineModel::new(config(), HOUR, None);
        assert_eq!(model.mode(), LayoutMode::Waveform);
        assert_eq!(model.lane_width(), 1600.0);
        model.zoom_in();
        assert_eq!(model.lane_width(), 3200.0);

        let notifier = model.resize_notifier();
        notifier.notify(1000.0);
        assert!(model.apply_pending_resize());
        assert_eq!(model.lane_width(), 2000.0);
        assert!(!model.apply_pending_resize());
    }

    #[test]
    fn test_detail_view_allows_16x() {
        let mut model = TimelineModel::detail(config(), HOUR, Some(trickplay()));
        while model.zoom_in() {}
        assert_eq!(model.zoom().level(), 16);
    }

    #[test]
    fn test_virtualized_range_includes_overscan() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        assert_eq!(model.visible_thumb_range(), Some((0, 12)));

        model.scroll_to(160.0 * 100.0);
        assert_eq!(model.visible_thumb_range(), Some((98, 112)));

        let slots = model.thumbnail_slots();
        assert_eq!(slots.len(), 360);
        assert!(slots[97].tile.is_none());
        assert!(slots[98].tile.is_some());
        assert!(slots[112].tile.is_some());
        assert!(slots[113].tile.is_none());
        assert!(slots.iter().all(|s| s.width == 160.0));
    }

    #[test]
    fn test_scroll_is_clamped() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        model.scroll_to(1e9);
        assert_eq!(model.scroll_offset(), 360.0 * 160.0 - 1600.0);
        model.scroll_to(-50.0);
        assert_eq!(model.scroll_offset(), 0.0);
    }

    #[test]
    fn test_zoom_keeps_centre_time() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        model.scroll_to(20_000.0);
        let centre = model.ticks_for_x(model.scroll_offset() + 800.0);
        model.zoom_in();
        let after = model.ticks_for_x(model.scroll_offset() + 800.0);
        assert!((centre - after).abs() <= TICKS_PER_SECOND);
    }

    #[test]
    fn test_lanes_stack_top_to_bottom() {
        let model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        let kinds: Vec<LaneKind> = model.lanes().iter().map(|l| l.kind).collect();
        assert_eq!(
            kinds,
            vec![LaneKind::Thumbnails, LaneKind::Visual, LaneKind::Audio, LaneKind::Chapters]
        );
        assert_eq!(model.lane(LaneKind::Visual).unwrap().y, 90.0);
        assert_eq!(model.total_height(), 90.0 + 18.0 + 40.0 + 22.0);

        let waveform = TimelineModel::new(config(), HOUR, None);
        assert_eq!(waveform.lanes()[0].kind, LaneKind::Visual);
    }

    #[test]
    fn test_marker_opacity_tracks_confidence() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        let results = AnalysisResults {
            visual: vec![
                detection(DetectionType::SceneChange, 1800, 1.0),
                detection(DetectionType::DarkFrame, 900, 0.0),
            ],
            ..AnalysisResults::default()
        };
        model.set_results(Some(&results));

        let markers = model.visual_markers();
        assert_eq!(markers[0].kind, DetectionType::DarkFrame);
        assert_eq!(markers[0].opacity, 0.35);
        assert_eq!(markers[1].opacity, 1.0);
        assert_eq!(markers[1].x, 360.0 * 160.0 / 2.0);
    }

    #[test]
    fn test_audio_lane_prefers_spectrum() {
        let mut model = TimelineModel::new(config(), HOUR, None);
        let mut results = AnalysisResults {
            audio: vec![
                detection(DetectionType::Bell, 600, 0.9),
                detection(DetectionType::MusicStart, 300, 0.8),
            ],
            ..AnalysisResults::default()
        };
        model.set_results(Some(&results));
        match model.audio_lane() {
            AudioLane::Markers(markers) => assert_eq!(markers.len(), 2),
            other => panic!("expected markers, got {:?}", other),
        }

        results.audio_spectrum = Some(
            (0..120)
                .map(|i| SpectrumPoint { t: i as f64 * 30.0, music: 0.5 })
                .collect(),
        );
        model.set_results(Some(&results));
        match model.audio_lane() {
            AudioLane::Spectrum { area_path, bells, .. } => {
                assert!(area_path.starts_with('M'));
                assert_eq!(bells.len(), 1);
                assert_eq!(bells[0].kind, DetectionType::Bell);
            }
            other => panic!("expected spectrum, got {:?}", other),
        }
    }

    #[test]
    fn test_open_chapter_extends_to_next_chapter() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        model.set_chapters(vec![chapter(2, "Match 1", 1800), chapter(1, "Entrance", 900)]);

        let segments = model.chapter_segments();
        assert_eq!(segments[0].chapter_id, 1);
        assert_eq!(segments[0].x, model.x_for_ticks(900 * TICKS_PER_SECOND));
        assert_eq!(segments[0].x + segments[0].width, model.x_for_ticks(1800 * TICKS_PER_SECOND));
        assert_eq!(segments[1].x + segments[1].width, model.lane_width());
    }

    #[test]
    fn test_click_on_marker_opens_detection() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        let results = AnalysisResults {
            visual: vec![detection(DetectionType::SceneChange, 1800, 0.9)],
            ..AnalysisResults::default()
        };
        model.set_results(Some(&results));

        let visual_y = model.lane(LaneKind::Visual).unwrap().y + 1.0;
        let marker_x = model.visual_markers()[0].x;

        assert_eq!(model.click(marker_x + 2.0, visual_y), TimelineAction::OpenDetection(0));
        assert_eq!(
            model.click(marker_x + 200.0, visual_y),
            TimelineAction::Seek(model.ticks_for_x(marker_x + 200.0))
        );
        assert_eq!(
            model.click(marker_x, 10.0),
            TimelineAction::Seek(1800 * TICKS_PER_SECOND)
        );
    }

    #[test]
    fn test_click_on_chapter_lane() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        model.set_chapters(vec![chapter(4, "Main Event", 1800)]);
        let y = model.lane(LaneKind::Chapters).unwrap().y + 2.0;

        assert_eq!(model.click(model.lane_width() * 0.75, y), TimelineAction::OpenChapter(4));
        assert_eq!(
            model.click(model.lane_width() * 0.25, y),
            TimelineAction::Seek(900 * TICKS_PER_SECOND)
        );
    }

    #[test]
    fn test_click_beyond_lane_is_clamped() {
        let model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        assert_eq!(model.click(1e7, 5.0), TimelineAction::Seek(HOUR));
        assert_eq!(model.click(-10.0, 5.0), TimelineAction::Seek(0));
    }

    #[test]
    fn test_hover_preview() {
        let mut model = TimelineModel::new(config(), HOUR, Some(trickplay()));
        let results = AnalysisResults {
            audio_spectrum: Some(vec![
                SpectrumPoint { t: 0.0, music: 0.1 },
                SpectrumPoint { t: 1800.0, music: 0.8 },
                SpectrumPoint { t: 3000.0, music: 0.3 },
            ]),
            ..AnalysisResults::default()
        };
        model.set_results(Some(&results));

        let preview = model.hover(model.lane_width() / 2.0 + 10.0);
        assert_eq!(preview.time_label, "30:00");
        assert_eq!(preview.music, Some(0.8));
        assert_eq!(preview.tile.map(|t| t.thumb_index), Some(180));
    }

    #[test]
    fn test_zero_duration_video_is_safe() {
        let mut model = TimelineModel::new(config(), 0, None);
        model.set_position(500);
        assert_eq!(model.position_ticks(), 0);
        assert_eq!(model.playhead_x(), 0.0);
        assert_eq!(model.click(300.0, 5.0), TimelineAction::Seek(0));
        assert!(model.thumbnail_slots().is_empty());
        assert!(model.visible_thumb_range().is_none());
    }
}
