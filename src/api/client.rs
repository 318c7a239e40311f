//! reqwest implementation of the backend API traits

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::models::{ErrorBody, PlayerInfo, StartAck};
use super::{AnalysisApi, ChapterApi, PlayerApi, VideoId};
use crate::analysis::{AnalysisPhase, AnalysisResults, AnalysisStatus};
use crate::chapters::{sort_chapters, Chapter, ChapterUpdate, NewChapter};
use crate::config::ServerConfig;
use crate::error::{Result, TimelineError};

/// HTTP client for the analysis, chapter and player endpoints
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    base: Url,
    client: Client,
}

impl HttpApiClient {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            base: api_base(&config.base_url, &config.api_prefix)?,
            client,
        })
    }

    /// Full URL for a path relative to the API prefix
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(path)?;
        debug!("{} {}", method, url);
        Ok(self.client.request(method, url))
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = check_status(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

/// Join server URL and prefix into a base that always ends with `/`
fn api_base(base_url: &str, api_prefix: &str) -> Result<Url> {
    let mut joined = base_url.trim_end_matches('/').to_string();
    let prefix = api_prefix.trim_matches('/');
    if !prefix.is_empty() {
        joined.push('/');
        joined.push_str(prefix);
    }
    joined.push('/');
    Ok(Url::parse(&joined)?)
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    let body = serde_json::from_str::<ErrorBody>(&text)
        .map(|e| e.detail)
        .unwrap_or(text);
    Err(TimelineError::Api { status, body })
}

#[async_trait]
impl AnalysisApi for HttpApiClient {
    async fn start(&self, video_id: VideoId, phase: AnalysisPhase) -> Result<StartAck> {
        let builder = self
            .request(Method::POST, &format!("analysis/{}/start", video_id))?
            .query(&[("phase", phase.as_str())]);

        // 202 acks may come back without a body
        let text = check_status(builder.send().await?).await?.text().await?;
        if text.trim().is_empty() {
            return Ok(StartAck::default());
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn status(&self, video_id: VideoId) -> Result<AnalysisStatus> {
        let builder = self.request(Method::GET, &format!("analysis/{}/status", video_id))?;
        self.send_json(builder).await
    }

    async fn results(&self, video_id: VideoId) -> Result<AnalysisResults> {
        let builder = self.request(Method::GET, &format!("analysis/{}/results", video_id))?;
        self.send_json(builder).await
    }

    async fn clear(&self, video_id: VideoId) -> Result<()> {
        let builder = self.request(Method::DELETE, &format!("analysis/{}", video_id))?;
        self.send_empty(builder).await
    }
}

#[async_trait]
impl ChapterApi for HttpApiClient {
    async fn list_chapters(&self, video_id: VideoId) -> Result<Vec<Chapter>> {
        let builder = self.request(Method::GET, &format!("videos/{}/chapters", video_id))?;
        let mut chapters: Vec<Chapter> = self.send_json(builder).await?;
        sort_chapters(&mut chapters);
        Ok(chapters)
    }

    async fn create_chapter(&self, video_id: VideoId, chapter: &NewChapter) -> Result<Chapter> {
        let builder = self
            .request(Method::POST, &format!("videos/{}/chapters", video_id))?
            .json(chapter);
        self.send_json(builder).await
    }

    async fn update_chapter(&self, video_id: VideoId, chapter_id: i64, update: &ChapterUpdate) -> Result<Chapter> {
        let builder = self
            .request(Method::PUT, &format!("videos/{}/chapters/{}", video_id, chapter_id))?
            .json(update);
        self.send_json(builder).await
    }

    async fn delete_chapter(&self, video_id: VideoId, chapter_id: i64) -> Result<()> {
        let builder = self.request(
            Method::DELETE,
            &format!("videos/{}/chapters/{}", video_id, chapter_id),
        )?;
        self.send_empty(builder).await
    }
}

#[async_trait]
impl PlayerApi for HttpApiClient {
    async fn player_info(&self, video_id: VideoId) -> Result<PlayerInfo> {
        let builder = self.request(Method::GET, &format!("player/{}/info", video_id))?;
        let mut info: PlayerInfo = self.send_json(builder).await?;
        sort_chapters(&mut info.chapters);
        Ok(info)
    }
}
