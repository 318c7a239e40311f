//! Backend API seam
//!
//! The analysis job, chapter store and player metadata live behind HTTP. The
//! traits here are what the rest of the crate talks to; `HttpApiClient` is the
//! reqwest implementation and tests swap in in-memory doubles.

use async_trait::async_trait;

use crate::analysis::{AnalysisPhase, AnalysisResults, AnalysisStatus};
use crate::chapters::{Chapter, ChapterUpdate, NewChapter};
use crate::error::Result;

pub mod client;
pub mod models;

pub use client::HttpApiClient;
pub use models::{PlayerInfo, PlayerVideo, StartAck};

/// Identifier of a video item in the library
pub type VideoId = i64;

/// Analysis job endpoints
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn start(&self, video_id: VideoId, phase: AnalysisPhase) -> Result<StartAck>;
    async fn status(&self, video_id: VideoId) -> Result<AnalysisStatus>;
    async fn results(&self, video_id: VideoId) -> Result<AnalysisResults>;
    async fn clear(&self, video_id: VideoId) -> Result<()>;
}

/// Chapter store endpoints
#[async_trait]
pub trait ChapterApi: Send + Sync {
    async fn list_chapters(&self, video_id: VideoId) -> Result<Vec<Chapter>>;
    async fn create_chapter(&self, video_id: VideoId, chapter: &NewChapter) -> Result<Chapter>;
    async fn update_chapter(&self, video_id: VideoId, chapter_id: i64, update: &ChapterUpdate) -> Result<Chapter>;
    async fn delete_chapter(&self, video_id: VideoId, chapter_id: i64) -> Result<()>;
}

/// Player metadata endpoint
#[async_trait]
pub trait PlayerApi: Send + Sync {
    async fn player_info(&self, video_id: VideoId) -> Result<PlayerInfo>;
}
