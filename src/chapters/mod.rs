/// Chapter model and ordering rules
///
/// Chapters are the durable markers an operator keeps. They can be created by
/// hand or promoted from a detection, but they keep no link back to the
/// detection: detections are thrown away on every re-run.

pub mod promotion;

pub use promotion::{
    create_and_refresh, delete_and_refresh, update_and_refresh, ChapterDraft, ChapterPromotion,
    PromotionOutcome, PromotionState,
};

use serde::{Deserialize, Serialize};

use crate::time::format_timestamp;

/// Represents a single persisted chapter of a video
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    pub id: i64,
    /// Owning video item
    pub video_item_id: i64,
    /// Linked match, when the chapter marks a match on the card
    #[serde(default)]
    pub match_id: Option<i64>,
    pub title: String,
    pub start_ticks: i64,
    /// Explicit end; open chapters run to the next chapter
    #[serde(default)]
    pub end_ticks: Option<i64>,
}

/// Body of a chapter create request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewChapter {
    pub title: String,
    pub start_ticks: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<i64>,
}

impl NewChapter {
    pub fn new(title: impl Into<String>, start_ticks: i64) -> Self {
        Self {
            title: title.into(),
            start_ticks: start_ticks.max(0),
            match_id: None,
        }
    }
}

/// Body of a chapter update request. Only the fields that are set change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChapterUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_ticks: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_id: Option<i64>,
}

impl ChapterUpdate {
    pub fn rename(title: impl Into<String>) -> Self {
        Self::default().with_title(title)
    }

    pub fn move_to(start_ticks: i64) -> Self {
        Self::default().with_start(start_ticks)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_start(mut self, start_ticks: i64) -> Self {
        self.start_ticks = Some(start_ticks.max(0));
        self
    }

    pub fn with_match(mut self, match_id: i64) -> Self {
        self.match_id = Some(match_id);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.start_ticks.is_none() && self.match_id.is_none()
    }

    /// Apply the set fields to a local copy
    pub fn apply_to(&self, chapter: &mut Chapter) {
        if let Some(title) = &self.title {
            chapter.title = title.clone();
        }
        if let Some(start) = self.start_ticks {
            chapter.start_ticks = start;
        }
        if let Some(match_id) = self.match_id {
            chapter.match_id = Some(match_id);
        }
    }
}

/// A chapter with its display end resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterSpan<'a> {
    pub chapter: &'a Chapter,
    pub start_ticks: i64,
    pub end_ticks: i64,
}

impl Chapter {
    pub fn label(&self) -> String {
        format!("{} {}", format_timestamp(self.start_ticks), self.title)
    }
}

/// Order chapters by start time. Ties keep id order so output is stable.
pub fn sort_chapters(chapters: &mut [Chapter]) {
    chapters.sort_by_key(|c| (c.start_ticks, c.id));
}

/// Insert or replace `chapter`, keeping the list sorted.
pub fn merge_chapter(chapters: &mut Vec<Chapter>, chapter: Chapter) {
    chapters.retain(|c| c.id != chapter.id);
    chapters.push(chapter);
    sort_chapters(chapters);
}

/// Resolve display ends: `end_ticks`, else the next chapter's start, else the timeline end.
///
/// Expects `chapters` sorted by start.
pub fn chapter_spans(chapters: &[Chapter], timeline_end_ticks: i64) -> Vec<ChapterSpan<'_>> {
    chapters
        .iter()
        .enumerate()
        .map(|(i, chapter)| {
            let end = chapter
                .end_ticks
                .or_else(|| chapters.get(i + 1).map(|next| next.start_ticks))
                .unwrap_or(timeline_end_ticks);
            ChapterSpan {
                chapter,
                start_ticks: chapter.start_ticks,
                end_ticks: end.max(chapter.start_ticks),
            }
        })
        .collect()
}

/// Overwrite every end so each chapter stops where the next begins and the
/// last stops at the video duration.
pub fn fill_open_ends(chapters: &mut [Chapter], duration_ticks: Option<i64>) {
    sort_chapters(chapters);
    let starts: Vec<i64> = chapters.iter().map(|c| c.start_ticks).collect();
    for (i, chapter) in chapters.iter_mut().enumerate() {
        chapter.end_ticks = starts.get(i + 1).copied().or(duration_ticks);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chapter(id: i64, title: &str, start: i64, end: Option<i64>) -> Chapter {
        Chapter {
            id,
            video_item_id: 7,
            match_id: None,
            title: title.to_string(),
            start_ticks: start,
            end_ticks: end,
        }
    }

    #[test]
    fn test_open_chapter_ends_at_next_start() {
        let chapters = vec![
            chapter(1, "Entrance", 100, None),
            chapter(2, "Match Start", 400, None),
        ];
        let spans = chapter_spans(&chapters, 1_000);
        assert_eq!(spans[0].end_ticks, 400);
        assert_eq!(spans[1].end_ticks, 1_000);
    }

    #[test]
    fn test_explicit_end_wins() {
        let chapters = vec![
            chapter(1, "Promo", 100, Some(250)),
            chapter(2, "Match Start", 400, None),
        ];
        let spans = chapter_spans(&chapters, 1_000);
        assert_eq!(spans[0].end_ticks, 250);
    }

    #[test]
    fn test_sort_and_merge() {
        let mut chapters = vec![
            chapter(3, "Main Event", 900, None),
            chapter(1, "Opener", 100, None),
        ];
        sort_chapters(&mut chapters);
        assert_eq!(chapters[0].id, 1);

        merge_chapter(&mut chapters, chapter(5, "Match Start", 500, None));
        let ids: Vec<i64> = chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 5, 3]);

        merge_chapter(&mut chapters, chapter(5, "Match Start", 50, None));
        let ids: Vec<i64> = chapters.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![5, 1, 3]);
    }

    #[test]
    fn test_fill_open_ends() {
        let mut chapters = vec![
            chapter(2, "B", 500, None),
            chapter(1, "A", 0, Some(10)),
        ];
        fill_open_ends(&mut chapters, Some(2_000));
        assert_eq!(chapters[0].end_ticks, Some(500));
        assert_eq!(chapters[1].end_ticks, Some(2_000));
    }

    #[test]
    fn test_chapter_update_sends_only_set_fields() {
        let rename = serde_json::to_value(ChapterUpdate::rename("Main Event")).unwrap();
        assert_eq!(rename, serde_json::json!({"title": "Main Event"}));

        let moved = serde_json::to_value(ChapterUpdate::move_to(-5).with_match(42)).unwrap();
        assert_eq!(moved, serde_json::json!({"start_ticks": 0, "match_id": 42}));

        assert!(ChapterUpdate::default().is_empty());
        assert!(!ChapterUpdate::rename("x").is_empty());
    }

    #[test]
    fn test_chapter_update_apply_keeps_unset_fields() {
        let mut c = chapter(4, "Entrance", 100, Some(300));
        ChapterUpdate::move_to(250).apply_to(&mut c);
        assert_eq!(c.title, "Entrance");
        assert_eq!(c.start_ticks, 250);
        assert_eq!(c.end_ticks, Some(300));
    }

    #[test]
    fn test_new_chapter_serialization_skips_empty_match() {
        let body = serde_json::to_value(NewChapter::new("Match Start", 150_000_000)).unwrap();
        assert_eq!(body, serde_json::json!({"title": "Match Start", "start_ticks": 150_000_000}));
    }
}
