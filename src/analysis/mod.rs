/// Analysis job data model and polling
///
/// The analysis job runs server-side in two phases (visual, then audio). This
/// module holds the payload types it reports and the poller that drives it to
/// a terminal state.

pub mod poller;

pub use poller::{AnalysisPoller, PollerSnapshot};

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::spectrum::SpectrumPoint;
use crate::time::format_timestamp;

/// Kind of moment a detection marks
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DetectionType {
    SceneChange,
    DarkFrame,
    GraphicsChange,
    Bell,
    MusicStart,
}

impl DetectionType {
    pub const ALL: [DetectionType; 5] = [
        DetectionType::SceneChange,
        DetectionType::DarkFrame,
        DetectionType::GraphicsChange,
        DetectionType::Bell,
        DetectionType::MusicStart,
    ];

    pub fn is_visual(self) -> bool {
        matches!(
            self,
            DetectionType::SceneChange | DetectionType::DarkFrame | DetectionType::GraphicsChange
        )
    }

    pub fn is_audio(self) -> bool {
        !self.is_visual()
    }

    /// Short badge text for lists and markers
    pub fn label(self) -> &'static str {
        match self {
            DetectionType::SceneChange => "Scene",
            DetectionType::DarkFrame => "Dark",
            DetectionType::GraphicsChange => "Graphics",
            DetectionType::Bell => "Bell",
            DetectionType::MusicStart => "Music",
        }
    }

    /// Marker colour used by the timeline
    pub fn color(self) -> &'static str {
        match self {
            DetectionType::SceneChange => "#60a5fa",
            DetectionType::DarkFrame => "#a78bfa",
            DetectionType::GraphicsChange => "#34d399",
            DetectionType::Bell => "#f59e0b",
            DetectionType::MusicStart => "#f472b6",
        }
    }

    /// Chapter title offered when this detection is promoted
    pub fn default_chapter_title(self) -> &'static str {
        match self {
            DetectionType::Bell => "Match Start",
            DetectionType::MusicStart => "Entrance",
            DetectionType::SceneChange | DetectionType::DarkFrame | DetectionType::GraphicsChange => {
                "Segment Break"
            }
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DetectionType::SceneChange => "scene_change",
            DetectionType::DarkFrame => "dark_frame",
            DetectionType::GraphicsChange => "graphics_change",
            DetectionType::Bell => "bell",
            DetectionType::MusicStart => "music_start",
        }
    }
}

/// One instant of interest reported by the analysis job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    #[serde(rename = "type")]
    pub kind: DetectionType,
    pub timestamp_ticks: i64,
    pub confidence: f64,
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({:.0}%)",
            format_timestamp(self.timestamp_ticks),
            self.kind.label(),
            self.confidence * 100.0
        )
    }
}

/// Which phases a run should execute
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisPhase {
    #[default]
    Both,
    Visual,
    Audio,
}

impl AnalysisPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisPhase::Both => "both",
            AnalysisPhase::Visual => "visual",
            AnalysisPhase::Audio => "audio",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "both" => Some(AnalysisPhase::Both),
            "visual" => Some(AnalysisPhase::Visual),
            "audio" => Some(AnalysisPhase::Audio),
            _ => None,
        }
    }

    /// State shown while this phase is starting. Audio-only runs skip the visual label.
    pub fn initial_state(self) -> AnalysisState {
        match self {
            AnalysisPhase::Audio => AnalysisState::RunningAudio,
            AnalysisPhase::Both | AnalysisPhase::Visual => AnalysisState::RunningVisual,
        }
    }
}

/// Job lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisState {
    #[default]
    None,
    RunningVisual,
    RunningAudio,
    Completed,
    Failed,
}

impl AnalysisState {
    pub fn is_running(self) -> bool {
        matches!(self, AnalysisState::RunningVisual | AnalysisState::RunningAudio)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AnalysisState::Completed | AnalysisState::Failed)
    }
}

/// Status snapshot returned by each poll
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnalysisStatus {
    pub status: AnalysisState,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub progress: Option<u32>,
    #[serde(default)]
    pub total_steps: Option<u32>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub audio_skip_reason: Option<String>,
}

impl AnalysisStatus {
    pub fn with_state(status: AnalysisState) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Progress as a fraction, when the job reports step counts
    pub fn fraction(&self) -> Option<f64> {
        match (self.progress, self.total_steps) {
            (Some(done), Some(total)) if total > 0 => Some((done as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }

    /// Operator-facing failure text, verbatim from the job
    pub fn failure_message(&self) -> Option<&str> {
        if self.status != AnalysisState::Failed {
            return None;
        }
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .or(Some("Analysis failed"))
    }
}

/// Detections and spectrum of a completed run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AnalysisResults {
    #[serde(default)]
    pub visual: Vec<Detection>,
    #[serde(default)]
    pub audio: Vec<Detection>,
    #[serde(default)]
    pub audio_spectrum: Option<Vec<SpectrumPoint>>,
    #[serde(default)]
    pub audio_window_secs: Option<f64>,
    #[serde(default)]
    pub audio_skip_reason: Option<String>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub completed_at: Option<chrono::NaiveDateTime>,
}

/// Accepts naive ISO timestamps and RFC 3339 ones with an offset (stored as UTC).
/// Unparseable values become `None` rather than failing the whole payload.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<Option<chrono::NaiveDateTime>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| parse_timestamp(&value)))
}

fn parse_timestamp(value: &str) -> Option<chrono::NaiveDateTime> {
    if let Ok(stamp) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(stamp.naive_utc());
    }
    value.parse::<chrono::NaiveDateTime>().ok()
}

impl AnalysisResults {
    /// Visual and audio detections in one list ordered by time
    pub fn merged(&self) -> Vec<Detection> {
        let mut all: Vec<Detection> = self.visual.iter().chain(self.audio.iter()).cloned().collect();
        all.sort_by_key(|d| d.timestamp_ticks);
        all
    }

    pub fn spectrum(&self) -> &[SpectrumPoint] {
        self.audio_spectrum.as_deref().unwrap_or(&[])
    }

    pub fn skip_reason(&self) -> Option<AudioSkipReason> {
        self.audio_skip_reason.as_deref().map(AudioSkipReason::parse)
    }
}

/// Why the audio phase produced no data. Never fatal; visual results stay usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSkipReason {
    MlAudioDisabled,
    NoPathMapping,
    MlServiceUnavailable,
    FileNotFound(String),
    Error(String),
    Other(String),
}

impl AudioSkipReason {
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some(("file_not_found", rest)) => AudioSkipReason::FileNotFound(rest.trim().to_string()),
            Some(("error", rest)) => AudioSkipReason::Error(rest.trim().to_string()),
            _ => match raw {
                "ml_audio_disabled" => AudioSkipReason::MlAudioDisabled,
                "no_path_mapping" => AudioSkipReason::NoPathMapping,
                "ml_service_unavailable" => AudioSkipReason::MlServiceUnavailable,
                "file_not_found" => AudioSkipReason::FileNotFound(String::new()),
                other => AudioSkipReason::Other(other.to_string()),
            },
        }
    }

    /// Banner text shown above the timeline
    pub fn banner_message(&self) -> String {
        match self {
            AudioSkipReason::MlAudioDisabled => {
                "Audio analysis is disabled. Enable ML audio in settings to detect bells and entrance music.".to_string()
            }
            AudioSkipReason::NoPathMapping => {
                "Audio analysis skipped: no path mapping is configured, so the video file could not be read locally.".to_string()
            }
            AudioSkipReason::MlServiceUnavailable => {
                "Audio analysis skipped: the ML audio service is unavailable.".to_string()
            }
            AudioSkipReason::FileNotFound(path) if path.is_empty() => {
                "Audio analysis skipped: the video file was not found.".to_string()
            }
            AudioSkipReason::FileNotFound(path) => {
                format!("Audio analysis skipped: file not found at {}.", path)
            }
            AudioSkipReason::Error(detail) => format!("Audio analysis failed: {}", detail),
            AudioSkipReason::Other(raw) => format!("Audio analysis skipped ({}).", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_deserialize_with_optional_fields() {
        let json = r#"{
            "visual": [{"type": "scene_change", "timestamp_ticks": 300000000, "confidence": 0.8}],
            "audio": [{"type": "bell", "timestamp_ticks": 150000000, "confidence": 0.93}],
            "audio_spectrum": [{"t": 0, "music": 0.1}, {"t": 30, "music": 0.7}],
            "audio_window_secs": 30,
            "completed_at": "2024-03-01T20:15:00.123456"
        }"#;

        let results: AnalysisResults = serde_json::from_str(json).unwrap();
        assert_eq!(results.visual[0].kind, DetectionType::SceneChange);
        assert_eq!(results.spectrum().len(), 2);
        assert!(results.completed_at.is_some());
        assert!(results.skip_reason().is_none());

        let merged = results.merged();
        assert_eq!(merged[0].kind, DetectionType::Bell);
        assert_eq!(merged[1].kind, DetectionType::SceneChange);
    }

    #[test]
    fn test_completed_at_accepts_offsets() {
        let utc: AnalysisResults = serde_json::from_str(r#"{"completed_at": "2024-03-01T20:15:00Z"}"#).unwrap();
        let offset: AnalysisResults =
            serde_json::from_str(r#"{"completed_at": "2024-03-01T22:15:00+02:00"}"#).unwrap();
        let naive: AnalysisResults = serde_json::from_str(r#"{"completed_at": "2024-03-01T20:15:00"}"#).unwrap();

        assert!(utc.completed_at.is_some());
        assert_eq!(utc.completed_at, offset.completed_at);
        assert_eq!(utc.completed_at, naive.completed_at);
    }

    #[test]
    fn test_completed_at_missing_or_garbled() {
        let missing: AnalysisResults = serde_json::from_str(r#"{"visual": []}"#).unwrap();
        assert_eq!(missing.completed_at, None);

        let null: AnalysisResults = serde_json::from_str(r#"{"completed_at": null}"#).unwrap();
        assert_eq!(null.completed_at, None);

        let garbled: AnalysisResults =
            serde_json::from_str(r#"{"completed_at": "yesterday", "audio_window_secs": 30}"#).unwrap();
        assert_eq!(garbled.completed_at, None);
        assert_eq!(garbled.audio_window_secs, Some(30.0));
    }

    #[test]
    fn test_status_deserialize() {
        let status: AnalysisStatus = serde_json::from_str(
            r#"{"status": "running_audio", "progress": 30, "total_steps": 120, "message": "Analyzing audio"}"#,
        )
        .unwrap();
        assert_eq!(status.status, AnalysisState::RunningAudio);
        assert_eq!(status.fraction(), Some(0.25));

        let bare: AnalysisStatus = serde_json::from_str(r#"{"status": "none"}"#).unwrap();
        assert_eq!(bare, AnalysisStatus::with_state(AnalysisState::None));
    }

    #[test]
    fn test_phase_initial_state() {
        assert_eq!(AnalysisPhase::Audio.initial_state(), AnalysisState::RunningAudio);
        assert_eq!(AnalysisPhase::Both.initial_state(), AnalysisState::RunningVisual);
        assert_eq!(AnalysisPhase::Visual.initial_state(), AnalysisState::RunningVisual);
    }

    #[test]
    fn test_failure_message_prefers_error() {
        let mut status = AnalysisStatus::with_state(AnalysisState::Failed);
        status.message = Some("Analysis failed: boom".to_string());
        assert_eq!(status.failure_message(), Some("Analysis failed: boom"));
        status.error = Some("boom".to_string());
        assert_eq!(status.failure_message(), Some("boom"));
        assert_eq!(AnalysisStatus::default().failure_message(), None);
    }

    #[test]
    fn test_skip_reason_parsing() {
        assert_eq!(AudioSkipReason::parse("no_path_mapping"), AudioSkipReason::NoPathMapping);
        assert_eq!(
            AudioSkipReason::parse("file_not_found:/media/wwe/raw.mkv"),
            AudioSkipReason::FileNotFound("/media/wwe/raw.mkv".to_string())
        );
        assert_eq!(
            AudioSkipReason::parse("error: decoder crashed"),
            AudioSkipReason::Error("decoder crashed".to_string())
        );
        assert!(AudioSkipReason::parse("error:timeout").banner_message().contains("timeout"));
        assert_eq!(AudioSkipReason::parse("mystery"), AudioSkipReason::Other("mystery".to_string()));
    }

    #[test]
    fn test_default_titles() {
        assert_eq!(DetectionType::Bell.default_chapter_title(), "Match Start");
        assert_eq!(DetectionType::MusicStart.default_chapter_title(), "Entrance");
        assert_eq!(DetectionType::DarkFrame.default_chapter_title(), "Segment Break");
        assert_eq!(DetectionType::parse("graphics_change"), Some(DetectionType::GraphicsChange));
    }
}
