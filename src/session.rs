/// One open video: analysis job, timeline, detection list and chapters
///
/// The host player owns a `VideoSession` while a video is open. It forwards
/// playback position and pointer events in, and receives seek requests and a
/// "detections ready" notification out. Poller state is pulled into the
/// derived views by `sync`, which the host calls after each poller update.
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::analysis::{
    AnalysisPhase, AnalysisPoller, AnalysisResults, Detection, PollerSnapshot,
};
use crate::api::{AnalysisApi, ChapterApi, PlayerApi, VideoId};
use crate::chapters::{
    create_and_refresh, delete_and_refresh, fill_open_ends, sort_chapters, update_and_refresh,
    Chapter, ChapterDraft, ChapterPromotion, ChapterUpdate, NewChapter, PromotionOutcome,
};
use crate::config::Config;
use crate::detections::DetectionListView;
use crate::error::{Result, TimelineError};
use crate::timeline::{TimelineAction, TimelineModel};

pub type SeekCallback = Box<dyn Fn(i64) + Send + Sync>;
pub type DetectionsReadyCallback = Box<dyn Fn(&[Detection]) + Send + Sync>;

pub struct VideoSession<B> {
    video_id: VideoId,
    title: Option<String>,
    api: Arc<B>,
    poller: AnalysisPoller,
    updates: watch::Receiver<PollerSnapshot>,
    results: Option<Arc<AnalysisResults>>,
    timeline: TimelineModel,
    detections: DetectionListView,
    promotion: ChapterPromotion,
    chapters: Vec<Chapter>,
    on_seek: Option<SeekCallback>,
    on_detections_ready: Option<DetectionsReadyCallback>,
}

impl<B> VideoSession<B>
where
    B: AnalysisApi + ChapterApi + PlayerApi + 'static,
{
    /// Load player info and the current analysis state together.
    pub async fn open(video_id: VideoId, api: Arc<B>, config: &Config) -> Result<Self> {
        let analysis_api: Arc<dyn AnalysisApi> = api.clone();
        let mut poller = AnalysisPoller::new(video_id, analysis_api, config.polling.interval());

        let (player, state) = futures::try_join!(api.player_info(video_id), poller.attach())?;
        info!(
            "🎬 Opened video {} ({}), analysis {:?}",
            video_id,
            player.video.title.as_deref().unwrap_or("untitled"),
            state
        );

        let mut chapters = player.chapters.clone();
        sort_chapters(&mut chapters);

        let mut timeline = TimelineModel::new(
            config.timeline.clone(),
            player.duration_ticks(),
            player.trickplay.clone(),
        );
        timeline.set_chapters(chapters.clone());

        let updates = poller.subscribe();
        let mut session = Self {
            video_id,
            title: player.video.title,
            api,
            poller,
            updates,
            results: None,
            timeline,
            detections: DetectionListView::default(),
            promotion: ChapterPromotion::new(),
            chapters,
            on_seek: None,
            on_detections_ready: None,
        };
        session.sync();
        Ok(session)
    }

    pub fn on_seek(&mut self, callback: impl Fn(i64) + Send + Sync + 'static) {
        self.on_seek = Some(Box::new(callback));
    }

    pub fn on_detections_ready(&mut self, callback: impl Fn(&[Detection]) + Send + Sync + 'static) {
        self.on_detections_ready = Some(Box::new(callback));
    }

    pub fn video_id(&self) -> VideoId {
        self.video_id
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn snapshot(&self) -> PollerSnapshot {
        self.poller.snapshot()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_polling()
    }

    pub fn timeline(&self) -> &TimelineModel {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut TimelineModel {
        &mut self.timeline
    }

    pub fn detection_list(&self) -> &DetectionListView {
        &self.detections
    }

    pub fn detection_list_mut(&mut self) -> &mut DetectionListView {
        &mut self.detections
    }

    pub fn promotion(&self) -> &ChapterPromotion {
        &self.promotion
    }

    pub fn chapters(&self) -> &[Chapter] {
        &self.chapters
    }

    /// Chapters with every end filled in from the next start or the video duration.
    pub fn chapters_with_ends(&self) -> Vec<Chapter> {
        let mut chapters = self.chapters.clone();
        let duration = self.timeline.duration_ticks();
        fill_open_ends(&mut chapters, (duration > 0).then_some(duration));
        chapters
    }

    /// Pull the latest poller snapshot into the timeline and list.
    ///
    /// Returns `true` when the result set changed.
    pub fn sync(&mut self) -> bool {
        let snapshot = self.updates.borrow_and_update().clone();
        let unchanged = match (&self.results, &snapshot.results) {
            (Some(old), Some(new)) => Arc::ptr_eq(old, new),
            (None, None) => true,
            _ => false,
        };
        if unchanged {
            return false;
        }

        self.results = snapshot.results;
        self.timeline.set_results(self.results.as_deref());
        self.detections
            .set_detections(self.results.as_deref().map(AnalysisResults::merged).unwrap_or_default());

        if self.results.is_some() {
            debug!("{} detections ready for video {}", self.detections.detections().len(), self.video_id);
            if let Some(callback) = &self.on_detections_ready {
                callback(self.detections.detections());
            }
        }
        true
    }

    /// Wait for the next poller update and apply it. Returns `false` once the poller is gone.
    pub async fn next_update(&mut self) -> bool {
        if self.updates.changed().await.is_err() {
            return false;
        }
        self.sync();
        true
    }

    /// Wait until the job settles, then apply the final snapshot.
    pub async fn wait_until_settled(&mut self) -> PollerSnapshot {
        let snapshot = self.poller.wait_until_settled().await;
        self.sync();
        snapshot
    }

    pub async fn start_analysis(&mut self, phase: AnalysisPhase) -> Result<()> {
        self.poller.start(phase).await?;
        self.sync();
        Ok(())
    }

    pub async fn clear_analysis(&mut self) -> Result<bool> {
        let cleared = self.poller.clear().await?;
        self.sync();
        Ok(cleared)
    }

    /// Banner text when the audio phase was skipped
    pub fn audio_banner(&self) -> Option<String> {
        self.results
            .as_ref()
            .and_then(|r| r.skip_reason())
            .map(|reason| reason.banner_message())
    }

    /// Failure text of the last run, or the transport error that halted polling
    pub fn error_message(&self) -> Option<String> {
        let snapshot = self.poller.snapshot();
        snapshot
            .last_error
            .or_else(|| snapshot.status.failure_message().map(str::to_string))
    }

    /// Playback moved on the player side; no seek is emitted.
    pub fn set_position(&mut self, ticks: i64) {
        self.timeline.set_position(ticks);
    }

    /// Move the playhead and ask the host to seek.
    pub fn seek(&mut self, ticks: i64) {
        self.timeline.set_position(ticks);
        let target = self.timeline.position_ticks();
        if let Some(callback) = &self.on_seek {
            callback(target);
        }
    }

    /// Route a timeline click. Seeks are performed; opens are returned for the host.
    pub fn click(&mut self, x: f64, y: f64) -> TimelineAction {
        let action = self.timeline.click(x, y);
        if let TimelineAction::Seek(ticks) = action {
            self.seek(ticks);
        }
        action
    }

    /// Open a chapter draft for the detection at `index` in the merged list.
    pub fn accept_detection(&mut self, index: usize) -> Result<&ChapterDraft> {
        let detection = self
            .detections
            .detections()
            .get(index)
            .cloned()
            .ok_or(TimelineError::DetectionNotFound(index))?;
        self.promotion.select(&detection)
    }

    pub fn set_draft_title(&mut self, title: &str) -> Result<()> {
        self.promotion.set_title(title)
    }

    pub fn cancel_draft(&mut self) -> Option<ChapterDraft> {
        self.promotion.cancel()
    }

    pub async fn confirm_draft(&mut self) -> Result<PromotionOutcome> {
        let outcome = self
            .promotion
            .confirm(self.api.as_ref(), self.video_id, &mut self.chapters)
            .await?;
        self.timeline.set_chapters(self.chapters.clone());
        Ok(outcome)
    }

    /// Add a chapter typed in by the operator.
    pub async fn create_manual(&mut self, title: &str, start_ticks: i64) -> PromotionOutcome {
        let body = NewChapter::new(title.trim(), start_ticks);
        let outcome = create_and_refresh(self.api.as_ref(), self.video_id, &body, &mut self.chapters).await;
        self.timeline.set_chapters(self.chapters.clone());
        outcome
    }

    /// Rename or move a chapter; the timeline picks up the new order.
    pub async fn update_chapter(&mut self, chapter_id: i64, update: &ChapterUpdate) -> Result<Chapter> {
        let updated =
            update_and_refresh(self.api.as_ref(), self.video_id, chapter_id, update, &mut self.chapters)
                .await?;
        self.timeline.set_chapters(self.chapters.clone());
        Ok(updated)
    }

    pub async fn delete_chapter(&mut self, chapter_id: i64) -> Result<()> {
        delete_and_refresh(self.api.as_ref(), self.video_id, chapter_id, &mut self.chapters).await?;
        self.timeline.set_chapters(self.chapters.clone());
        Ok(())
    }

    /// Navigate away: stop polling and drop any open draft.
    pub fn close(&mut self) {
        self.poller.stop();
        self.promotion.cancel();
        info!("👋 Closed video {}", self.video_id);
    }
}
