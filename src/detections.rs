/// Tabular view over the detection set
///
/// Filtering only hides rows; the detection list itself is never modified.
use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::{Detection, DetectionType};
use crate::chapters::ChapterDraft;
use crate::time::format_timestamp;

/// One rendered row
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionRow {
    /// Index into the merged, time-ordered detection list
    pub index: usize,
    /// Seek target when the timestamp is clicked
    pub ticks: i64,
    pub timestamp: String,
    pub kind: DetectionType,
    pub badge: &'static str,
    pub confidence_pct: u32,
    /// Title the accept action will prefill
    pub suggested_title: &'static str,
}

/// What a click on a row asks the host to do
#[derive(Debug, Clone, PartialEq)]
pub enum RowAction {
    Seek(i64),
    Accept(ChapterDraft),
}

/// Per-type visibility toggles over a merged detection list
#[derive(Debug, Clone)]
pub struct DetectionListView {
    detections: Vec<Detection>,
    hidden: BTreeSet<DetectionType>,
}

impl Default for DetectionListView {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DetectionListView {
    /// Build a view; detections are ordered by timestamp.
    pub fn new(mut detections: Vec<Detection>) -> Self {
        detections.sort_by_key(|d| d.timestamp_ticks);
        Self {
            detections,
            hidden: BTreeSet::new(),
        }
    }

    /// Replace the detection set, keeping the current toggles.
    pub fn set_detections(&mut self, mut detections: Vec<Detection>) {
        detections.sort_by_key(|d| d.timestamp_ticks);
        self.detections = detections;
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn is_visible(&self, kind: DetectionType) -> bool {
        !self.hidden.contains(&kind)
    }

    pub fn set_visible(&mut self, kind: DetectionType, visible: bool) {
        if visible {
            self.hidden.remove(&kind);
        } else {
            self.hidden.insert(kind);
        }
    }

    /// Flip a type's visibility and return the new value.
    pub fn toggle(&mut self, kind: DetectionType) -> bool {
        let visible = !self.is_visible(kind);
        self.set_visible(kind, visible);
        visible
    }

    pub fn show_all(&mut self) {
        self.hidden.clear();
    }

    /// Counts per type across the whole set, for filter chips
    pub fn counts(&self) -> BTreeMap<DetectionType, usize> {
        let mut counts = BTreeMap::new();
        for d in &self.detections {
            *counts.entry(d.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn rows(&self) -> Vec<DetectionRow> {
        self.detections
            .iter()
            .enumerate()
            .filter(|(_, d)| self.is_visible(d.kind))
            .map(|(index, d)| DetectionRow {
                index,
                ticks: d.timestamp_ticks,
                timestamp: format_timestamp(d.timestamp_ticks),
                kind: d.kind,
                badge: d.kind.label(),
                confidence_pct: (d.confidence.clamp(0.0, 1.0) * 100.0).round() as u32,
                suggested_title: d.kind.default_chapter_title(),
            })
            .collect()
    }

    /// Seek action for a row's timestamp
    pub fn seek(&self, index: usize) -> Option<RowAction> {
        self.detections.get(index).map(|d| RowAction::Seek(d.timestamp_ticks))
    }

    /// Accept-as-chapter action for a row
    pub fn accept(&self, index: usize) -> Option<RowAction> {
        self.detections
            .get(index)
            .map(|d| RowAction::Accept(ChapterDraft::for_detection(d)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(kind: DetectionType, secs: i64, confidence: f64) -> Detection {
        Detection {
            kind,
            timestamp_ticks: secs * 10_000_000,
            confidence,
        }
    }

    fn sample() -> DetectionListView {
        DetectionListView::new(vec![
            detection(DetectionType::Bell, 620, 0.914),
            detection(DetectionType::SceneChange, 30, 0.5),
            detection(DetectionType::MusicStart, 300, 0.77),
            detection(DetectionType::DarkFrame, 900, 0.9),
        ])
    }

    #[test]
    fn test_rows_are_time_ordered_and_all_visible_by_default() {
        let view = sample();
        let rows = view.rows();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].kind, DetectionType::SceneChange);
        assert_eq!(rows[2].timestamp, "10:20");
        assert_eq!(rows[2].confidence_pct, 91);
        assert_eq!(rows[2].suggested_title, "Match Start");
    }

    #[test]
    fn test_filter_is_presentational() {
        let mut view = sample();
        assert!(!view.toggle(DetectionType::SceneChange));
        view.set_visible(DetectionType::DarkFrame, false);

        let rows = view.rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].index, 1);
        assert_eq!(view.detections().len(), 4);

        view.show_all();
        assert_eq!(view.rows().len(), 4);
    }

    #[test]
    fn test_row_actions() {
        let view = sample();
        assert_eq!(view.seek(0), Some(RowAction::Seek(300_000_000)));
        match view.accept(2) {
            Some(RowAction::Accept(draft)) => {
                assert_eq!(draft.title, "Match Start");
                assert_eq!(draft.detection.timestamp_ticks, 6_200_000_000);
            }
            other => panic!("unexpected action: {:?}", other),
        }
        assert!(view.accept(99).is_none());
    }

    #[test]
    fn test_counts() {
        let view = sample();
        let counts = view.counts();
        assert_eq!(counts.get(&DetectionType::Bell), Some(&1));
        assert_eq!(counts.get(&DetectionType::GraphicsChange), None);
    }
}
