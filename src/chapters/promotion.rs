/// Turning a detection into a persisted chapter
///
/// The operator picks a detection, edits a prefilled title and confirms. The
/// chapter is saved at the detection's timestamp and the chapter list reloaded.
/// Only one draft exists at a time. A failed save is logged and the workflow
/// returns to idle without touching the list.
use tracing::{info, warn};

use super::{merge_chapter, Chapter, ChapterUpdate, NewChapter};
use crate::analysis::Detection;
use crate::api::{ChapterApi, VideoId};
use crate::error::{Result, TimelineError};

/// Title being edited for a selected detection
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterDraft {
    pub detection: Detection,
    pub title: String,
}

impl ChapterDraft {
    pub fn for_detection(detection: &Detection) -> Self {
        Self {
            detection: detection.clone(),
            title: detection.kind.default_chapter_title().to_string(),
        }
    }

    /// Request body for this draft; a blank title falls back to the type default
    pub fn to_new_chapter(&self) -> NewChapter {
        let title = self.title.trim();
        let title = if title.is_empty() {
            self.detection.kind.default_chapter_title()
        } else {
            title
        };
        NewChapter::new(title, self.detection.timestamp_ticks)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum PromotionState {
    #[default]
    Idle,
    EditingTitle(ChapterDraft),
}

/// Result of confirming a draft
#[derive(Debug, Clone, PartialEq)]
pub enum PromotionOutcome {
    Created(Chapter),
    Failed(String),
}

/// Accept/dismiss workflow for promoting detections
#[derive(Debug, Default)]
pub struct ChapterPromotion {
    state: PromotionState,
}

impl ChapterPromotion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &PromotionState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, PromotionState::Idle)
    }

    pub fn draft(&self) -> Option<&ChapterDraft> {
        match &self.state {
            PromotionState::EditingTitle(draft) => Some(draft),
            PromotionState::Idle => None,
        }
    }

    /// Open a draft for `detection`. Fails if another draft is open.
    pub fn select(&mut self, detection: &Detection) -> Result<&ChapterDraft> {
        if !self.is_idle() {
            return Err(TimelineError::PromotionBusy);
        }
        self.state = PromotionState::EditingTitle(ChapterDraft::for_detection(detection));
        self.draft().ok_or(TimelineError::NoDraft)
    }

    pub fn set_title(&mut self, title: &str) -> Result<()> {
        match &mut self.state {
            PromotionState::EditingTitle(draft) => {
                draft.title = title.to_string();
                Ok(())
            }
            PromotionState::Idle => Err(TimelineError::NoDraft),
        }
    }

    /// Dismiss the open draft, if any.
    pub fn cancel(&mut self) -> Option<ChapterDraft> {
        match std::mem::take(&mut self.state) {
            PromotionState::EditingTitle(draft) => Some(draft),
            PromotionState::Idle => None,
        }
    }

    /// Persist the open draft and refresh `chapters`.
    ///
    /// Always leaves the workflow idle. Save failures are reported in the outcome,
    /// not as an error; only a missing draft is an error.
    pub async fn confirm(
        &mut self,
        api: &dyn ChapterApi,
        video_id: VideoId,
        chapters: &mut Vec<Chapter>,
    ) -> Result<PromotionOutcome> {
        let draft = self.cancel().ok_or(TimelineError::NoDraft)?;
        let body = draft.to_new_chapter();
        Ok(create_and_refresh(api, video_id, &body, chapters).await)
    }
}

/// Save a chapter, merge it into `chapters` right away, then reload from the server.
pub async fn create_and_refresh(
    api: &dyn ChapterApi,
    video_id: VideoId,
    body: &NewChapter,
    chapters: &mut Vec<Chapter>,
) -> PromotionOutcome {
    let created = match api.create_chapter(video_id, body).await {
        Ok(chapter) => chapter,
        Err(e) => {
            warn!("❌ Failed to create chapter '{}' for video {}: {}", body.title, video_id, e);
            return PromotionOutcome::Failed(e.to_string());
        }
    };

    info!("📝 Created chapter '{}' at {} ticks", created.title, created.start_ticks);
    merge_chapter(chapters, created.clone());

    match api.list_chapters(video_id).await {
        Ok(mut fresh) => {
            super::sort_chapters(&mut fresh);
            *chapters = fresh;
        }
        Err(e) => warn!("⚠️ Chapter reload failed for video {}, keeping local list: {}", video_id, e),
    }

    PromotionOutcome::Created(created)
}

/// Rename or move a chapter, merge the server's copy, then reload.
///
/// A move can change the order, so the merged list is re-sorted before the reload.
pub async fn update_and_refresh(
    api: &dyn ChapterApi,
    video_id: VideoId,
    chapter_id: i64,
    update: &ChapterUpdate,
    chapters: &mut Vec<Chapter>,
) -> Result<Chapter> {
    if update.is_empty() {
        return Err(TimelineError::EmptyChapterUpdate);
    }

    let updated = api.update_chapter(video_id, chapter_id, update).await?;
    info!(
        "✏️ Updated chapter {} on video {}: '{}' at {} ticks",
        updated.id, video_id, updated.title, updated.start_ticks
    );
    merge_chapter(chapters, updated.clone());

    match api.list_chapters(video_id).await {
        Ok(mut fresh) => {
            super::sort_chapters(&mut fresh);
            *chapters = fresh;
        }
        Err(e) => warn!("⚠️ Chapter reload failed for video {}, keeping local list: {}", video_id, e),
    }
    Ok(updated)
}

/// Delete a chapter and reload the list. The local copy drops it even if the reload fails.
pub async fn delete_and_refresh(
    api: &dyn ChapterApi,
    video_id: VideoId,
    chapter_id: i64,
    chapters: &mut Vec<Chapter>,
) -> Result<()> {
    api.delete_chapter(video_id, chapter_id).await?;
    chapters.retain(|c| c.id != chapter_id);
    info!("🗑️ Deleted chapter {} from video {}", chapter_id, video_id);

    match api.list_chapters(video_id).await {
        Ok(mut fresh) => {
            super::sort_chapters(&mut fresh);
            *chapters = fresh;
        }
        Err(e) => warn!("⚠️ Chapter reload failed for video {}: {}", video_id, e),
    }
    Ok(())
}
