/// Drives one video's analysis job from start to a terminal state
///
/// A single tokio task polls the status endpoint on a fixed interval. Ticks run
/// one after another inside that task, so two polls for the same video never
/// overlap. Every state change goes through a `watch` channel tagged with a
/// generation number; stopping, clearing or restarting bumps the generation and
/// any response that belongs to an older generation is dropped.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::{AnalysisPhase, AnalysisResults, AnalysisState, AnalysisStatus};
use crate::api::{AnalysisApi, VideoId};
use crate::error::{Result, TimelineError};

/// Floor for the poll period; a zero period would panic the ticker
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Reactive view of the job: latest status plus results once completed
#[derive(Debug, Clone, Default)]
pub struct PollerSnapshot {
    pub status: AnalysisStatus,
    pub results: Option<Arc<AnalysisResults>>,
    /// Transport error that halted polling, if any
    pub last_error: Option<String>,
    pub generation: u64,
}

impl PollerSnapshot {
    /// Nothing more will happen without operator input
    pub fn is_settled(&self) -> bool {
        !self.status.status.is_running() || self.last_error.is_some()
    }
}

/// Shared pieces handed to the polling task
#[derive(Clone)]
struct PollContext {
    video_id: VideoId,
    api: Arc<dyn AnalysisApi>,
    state: Arc<watch::Sender<PollerSnapshot>>,
    generation: u64,
}

impl PollContext {
    fn is_current(&self) -> bool {
        self.state.borrow().generation == self.generation
    }

    /// Apply `f` only while this context's generation is still current.
    fn update(&self, f: impl FnOnce(&mut PollerSnapshot)) -> bool {
        let generation = self.generation;
        self.state.send_if_modified(|snap| {
            if snap.generation != generation {
                return false;
            }
            f(snap);
            true
        })
    }

    async fn fetch_results(&self, status: AnalysisStatus) {
        match self.api.results(self.video_id).await {
            Ok(results) => {
                info!(
                    "✅ Analysis results for video {}: {} visual, {} audio detections",
                    self.video_id,
                    results.visual.len(),
                    results.audio.len()
                );
                self.update(|snap| {
                    snap.status = status;
                    snap.results = Some(Arc::new(results));
                });
            }
            Err(e) => {
                warn!("❌ Failed to fetch analysis results for video {}: {}", self.video_id, e);
                self.update(|snap| {
                    snap.status = status;
                    snap.last_error = Some(e.to_string());
                });
            }
        }
    }

    async fn run(self, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !self.is_current() {
                debug!("Poller for video {} superseded, exiting", self.video_id);
                return;
            }

            let status = match self.api.status(self.video_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!("❌ Status poll failed for video {}, polling halted: {}", self.video_id, e);
                    self.update(|snap| snap.last_error = Some(e.to_string()));
                    return;
                }
            };

            debug!(
                "Poll video {}: {:?} {}",
                self.video_id,
                status.status,
                status.message.as_deref().unwrap_or("")
            );

            let state = status.status;
            match state {
                AnalysisState::RunningVisual | AnalysisState::RunningAudio => {
                    if !self.update(|snap| snap.status = status) {
                        return;
                    }
                }
                AnalysisState::Completed => {
                    if self.is_current() {
                        self.fetch_results(status).await;
                    }
                    return;
                }
                AnalysisState::Failed => {
                    warn!(
                        "⚠️ Analysis failed for video {}: {}",
                        self.video_id,
                        status.failure_message().unwrap_or_default()
                    );
                    self.update(|snap| snap.status = status);
                    return;
                }
                AnalysisState::None => {
                    // Server no longer knows about the run; treat it as aborted.
                    info!("🔕 Analysis for video {} aborted server-side", self.video_id);
                    self.update(|snap| snap.status = status);
                    return;
                }
            }
        }
    }
}

/// Poller for a single video
pub struct AnalysisPoller {
    video_id: VideoId,
    api: Arc<dyn AnalysisApi>,
    interval: Duration,
    state: Arc<watch::Sender<PollerSnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl AnalysisPoller {
    /// Intervals below one millisecond are raised to it.
    pub fn new(video_id: VideoId, api: Arc<dyn AnalysisApi>, interval: Duration) -> Self {
        let (tx, _rx) = watch::channel(PollerSnapshot::default());
        if interval < MIN_POLL_INTERVAL {
            warn!("Poll interval {:?} too short, using {:?}", interval, MIN_POLL_INTERVAL);
        }
        Self {
            video_id,
            api,
            interval: interval.max(MIN_POLL_INTERVAL),
            state: Arc::new(tx),
            task: None,
        }
    }

    pub fn video_id(&self) -> VideoId {
        self.video_id
    }

    pub fn subscribe(&self) -> watch::Receiver<PollerSnapshot> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> PollerSnapshot {
        self.state.borrow().clone()
    }

    pub fn is_polling(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Load whatever the server already knows about this video.
    ///
    /// A run in progress resumes polling; a completed run has its results fetched.
    pub async fn attach(&mut self) -> Result<AnalysisState> {
        let ctx = self.reset_context();
        let status = self.api.status(self.video_id).await?;
        let state = status.status;

        match state {
            AnalysisState::Completed => ctx.fetch_results(status).await,
            _ => {
                if !ctx.update(|snap| snap.status = status) {
                    return Ok(self.snapshot().status.status);
                }
                if state.is_running() {
                    info!("🔄 Resuming analysis polling for video {}", self.video_id);
                    self.spawn(ctx);
                }
            }
        }

        Ok(state)
    }

    /// Request a new run. Refused while a run is in progress and still being tracked.
    ///
    /// A run whose polling halted on a transport error counts as settled and can
    /// be restarted.
    pub async fn start(&mut self, phase: AnalysisPhase) -> Result<()> {
        let (current, settled) = {
            let snap = self.state.borrow();
            (snap.status.status, snap.is_settled())
        };
        if !settled {
            return Err(TimelineError::AnalysisInProgress(current));
        }

        let ctx = self.reset_context();
        self.api.start(self.video_id, phase).await?;

        let initial = phase.initial_state();
        let label = if initial == AnalysisState::RunningAudio { "audio" } else { "visual" };
        let started = ctx.update(|snap| {
            snap.status = AnalysisStatus {
                status: initial,
                message: Some(format!("Starting {} analysis...", label)),
                ..AnalysisStatus::default()
            };
            snap.results = None;
            snap.last_error = None;
        });

        if started {
            info!("🚀 Analysis started for video {} (phase: {})", self.video_id, phase.as_str());
            self.spawn(ctx);
        }
        Ok(())
    }

    /// Discard a finished or stalled run. Returns `false` when there was nothing to clear.
    pub async fn clear(&mut self) -> Result<bool> {
        let (current, halted) = {
            let snap = self.state.borrow();
            (snap.status.status, snap.last_error.is_some())
        };
        if !current.is_terminal() && !halted {
            debug!("Clear ignored for video {} in state {:?}", self.video_id, current);
            return Ok(false);
        }

        self.api.clear(self.video_id).await?;
        self.reset_context();
        self.state.send_modify(|snap| {
            snap.status = AnalysisStatus::default();
            snap.results = None;
            snap.last_error = None;
        });

        info!("🗑️ Cleared analysis for video {}", self.video_id);
        Ok(true)
    }

    /// Stop polling and ignore anything still in flight.
    pub fn stop(&mut self) {
        self.reset_context();
    }

    /// Wait until the job is terminal or polling halted on an error.
    pub async fn wait_until_settled(&self) -> PollerSnapshot {
        let mut rx = self.subscribe();
        let settled = rx.wait_for(|snap| snap.is_settled()).await;
        match settled {
            Ok(snap) => snap.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// Abort the current task and start a fresh generation.
    fn reset_context(&mut self) -> PollContext {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.state.send_modify(|snap| snap.generation += 1);

        PollContext {
            video_id: self.video_id,
            api: Arc::clone(&self.api),
            state: Arc::clone(&self.state),
            generation: self.state.borrow().generation,
        }
    }

    fn spawn(&mut self, ctx: PollContext) {
        let period = self.interval;
        self.task = Some(tokio::spawn(ctx.run(period)));
    }
}

impl Drop for AnalysisPoller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Detection, DetectionType};
    use crate::api::StartAck;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedApi {
        statuses: Mutex<VecDeque<Result<AnalysisStatus>>>,
        start_calls: AtomicUsize,
        status_calls: AtomicUsize,
        results_calls: AtomicUsize,
        clear_calls: AtomicUsize,
    }

    impl ScriptedApi {
        fn with(statuses: Vec<Result<AnalysisStatus>>) -> Arc<Self> {
            Arc::new(Self {
                statuses: Mutex::new(statuses.into()),
                ..Self::default()
            })
        }
    }

    fn running() -> Result<AnalysisStatus> {
        Ok(AnalysisStatus::with_state(AnalysisState::RunningVisual))
    }

    #[async_trait]
    impl AnalysisApi for ScriptedApi {
        async fn start(&self, _video_id: VideoId, _phase: AnalysisPhase) -> Result<StartAck> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            Ok(StartAck::default())
        }

        async fn status(&self, _video_id: VideoId) -> Result<AnalysisStatus> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            self.statuses.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(TimelineError::Api { status: 500, body: "script exhausted".to_string() })
            })
        }

        async fn results(&self, _video_id: VideoId) -> Result<AnalysisResults> {
            self.results_calls.fetch_add(1, Ordering::SeqCst);
            Ok(AnalysisResults {
                audio: vec![Detection {
                    kind: DetectionType::Bell,
                    timestamp_ticks: 150_000_000,
                    confidence: 0.9,
                }],
                ..AnalysisResults::default()
            })
        }

        async fn clear(&self, _video_id: VideoId) -> Result<()> {
            self.clear_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn poller(api: &Arc<ScriptedApi>) -> AnalysisPoller {
        let api: Arc<dyn AnalysisApi> = api.clone();
        AnalysisPoller::new(7, api, Duration::from_secs(2))
    }

    #[tokio::test(start_paused = true)]
    async fn test_results_fetched_once_then_polling_stops() {
        let api = ScriptedApi::with(vec![
            running(),
            running(),
            running(),
            Ok(AnalysisStatus::with_state(AnalysisState::Completed)),
        ]);
        let mut poller = poller(&api);

        poller.start(AnalysisPhase::Both).await.unwrap();
        assert_eq!(poller.snapshot().status.status, AnalysisState::RunningVisual);

        let snap = poller.wait_until_settled().await;
        assert_eq!(snap.status.status, AnalysisState::Completed);
        assert_eq!(snap.results.as_ref().map(|r| r.audio.len()), Some(1));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 4);
        assert_eq!(api.results_calls.load(Ordering::SeqCst), 1);
        assert!(!poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_phase_starts_in_running_audio() {
        let api = ScriptedApi::with(vec![]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Audio).await.unwrap();
        assert_eq!(poller.snapshot().status.status, AnalysisState::RunningAudio);
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_error_is_terminal() {
        let api = ScriptedApi::with(vec![
            running(),
            Err(TimelineError::Api { status: 502, body: "bad gateway".to_string() }),
            running(),
        ]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Both).await.unwrap();

        let snap = poller.wait_until_settled().await;
        assert!(snap.last_error.as_deref().unwrap().contains("bad gateway"));
        assert_eq!(snap.status.status, AnalysisState::RunningVisual);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_can_restart_after_poll_error() {
        let api = ScriptedApi::with(vec![
            Err(TimelineError::Api { status: 502, body: "down".to_string() }),
            Ok(AnalysisStatus::with_state(AnalysisState::Completed)),
        ]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Both).await.unwrap();

        let snap = poller.wait_until_settled().await;
        assert_eq!(snap.status.status, AnalysisState::RunningVisual);
        assert!(snap.last_error.is_some());

        poller.start(AnalysisPhase::Both).await.unwrap();
        assert_eq!(api.start_calls.load(Ordering::SeqCst), 2);
        assert!(poller.snapshot().last_error.is_none());

        let snap = poller.wait_until_settled().await;
        assert_eq!(snap.status.status, AnalysisState::Completed);
        assert_eq!(api.results_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_after_poll_error_resets_state() {
        let api = ScriptedApi::with(vec![Err(TimelineError::Api { status: 502, body: "down".to_string() })]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Visual).await.unwrap();
        poller.wait_until_settled().await;

        assert!(poller.clear().await.unwrap());
        assert_eq!(api.clear_calls.load(Ordering::SeqCst), 1);
        let snap = poller.snapshot();
        assert_eq!(snap.status.status, AnalysisState::None);
        assert!(snap.last_error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let api = ScriptedApi::with(vec![
            running(),
            Ok(AnalysisStatus::with_state(AnalysisState::Completed)),
        ]);
        let api_dyn: Arc<dyn AnalysisApi> = api.clone();
        let mut poller = AnalysisPoller::new(1, api_dyn, Duration::ZERO);
        poller.start(AnalysisPhase::Both).await.unwrap();

        let snap = poller.wait_until_settled().await;
        assert_eq!(snap.status.status, AnalysisState::Completed);
        assert!(snap.last_error.is_none());
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_none_while_running_is_treated_as_abort() {
        let api = ScriptedApi::with(vec![running(), Ok(AnalysisStatus::with_state(AnalysisState::None))]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Visual).await.unwrap();

        let snap = poller.wait_until_settled().await;
        assert_eq!(snap.status.status, AnalysisState::None);
        assert!(snap.last_error.is_none());
        assert!(snap.results.is_none());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 2);
        assert_eq!(api.results_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_status_surfaces_error() {
        let mut failed = AnalysisStatus::with_state(AnalysisState::Failed);
        failed.error = Some("Analysis timed out".to_string());
        let api = ScriptedApi::with(vec![Ok(failed)]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Both).await.unwrap();

        let snap = poller.wait_until_settled().await;
        assert_eq!(snap.status.failure_message(), Some("Analysis timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_is_noop_unless_terminal() {
        let api = ScriptedApi::with(vec![]);
        let mut poller = poller(&api);

        assert!(!poller.clear().await.unwrap());
        assert_eq!(api.clear_calls.load(Ordering::SeqCst), 0);

        poller.start(AnalysisPhase::Both).await.unwrap();
        assert!(!poller.clear().await.unwrap());
        assert_eq!(api.clear_calls.load(Ordering::SeqCst), 0);
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_after_completion_discards_results() {
        let api = ScriptedApi::with(vec![Ok(AnalysisStatus::with_state(AnalysisState::Completed))]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Both).await.unwrap();
        poller.wait_until_settled().await;

        assert!(poller.clear().await.unwrap());
        let snap = poller.snapshot();
        assert_eq!(snap.status.status, AnalysisState::None);
        assert!(snap.results.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_refused_while_running() {
        let api = ScriptedApi::with(vec![]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Both).await.unwrap();

        let err = poller.start(AnalysisPhase::Audio).await.unwrap_err();
        assert!(matches!(err, TimelineError::AnalysisInProgress(AnalysisState::RunningVisual)));
        assert_eq!(api.start_calls.load(Ordering::SeqCst), 1);
        poller.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_polling() {
        let api = ScriptedApi::with(vec![running(), running(), running()]);
        let mut poller = poller(&api);
        poller.start(AnalysisPhase::Both).await.unwrap();
        tokio::time::sleep(Duration::from_millis(2_500)).await;
        poller.stop();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(api.status_calls.load(Ordering::SeqCst), 1);
        assert!(!poller.is_polling());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_updates_are_dropped() {
        let api = ScriptedApi::with(vec![]);
        let mut poller = poller(&api);
        let stale = poller.reset_context();
        poller.stop();

        assert!(!stale.update(|snap| snap.status = AnalysisStatus::with_state(AnalysisState::Completed)));
        assert_eq!(poller.snapshot().status.status, AnalysisState::None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attach_resumes_running_job() {
        let api = ScriptedApi::with(vec![
            running(),
            Ok(AnalysisStatus::with_state(AnalysisState::Completed)),
        ]);
        let mut poller = poller(&api);

        assert_eq!(poller.attach().await.unwrap(), AnalysisState::RunningVisual);
        assert!(poller.is_polling());

        let snap = poller.wait_until_settled().await;
        assert_eq!(snap.status.status, AnalysisState::Completed);
        assert_eq!(api.results_calls.load(Ordering::SeqCst), 1);
    }
}
