/// Titantron Timeline - match-boundary detection timeline
///
/// Client-side core for reviewing long wrestling event recordings: polls the
/// backend analysis job, lays out a zoomable timeline of trickplay thumbnails,
/// detection markers, music spectrum and chapters, and turns detections the
/// operator accepts into persisted chapters.

pub mod analysis;
pub mod api;
pub mod chapters;
pub mod config;
pub mod detections;
pub mod error;
pub mod session;
pub mod spectrum;
pub mod time;
pub mod timeline;
pub mod trickplay;

// Re-export main types for easy access
pub use crate::analysis::{
    AnalysisPhase, AnalysisPoller, AnalysisResults, AnalysisState, AnalysisStatus, AudioSkipReason,
    Detection, DetectionType, PollerSnapshot,
};
pub use crate::api::{AnalysisApi, ChapterApi, HttpApiClient, PlayerApi, PlayerInfo, VideoId};
pub use crate::chapters::{
    Chapter, ChapterDraft, ChapterPromotion, ChapterUpdate, NewChapter, PromotionOutcome,
};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::detections::{DetectionListView, DetectionRow, RowAction};
pub use crate::error::{Result, TimelineError};
pub use crate::session::VideoSession;
pub use crate::spectrum::{DisplayPoint, SpectrumPoint};
pub use crate::timeline::{TimelineAction, TimelineModel};
pub use crate::trickplay::{SpriteTile, TrickplayInfo};
