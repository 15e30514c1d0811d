// Seams between the session and the outside world

use std::path::PathBuf;

use async_trait::async_trait;

use super::errors::Result;
use super::models::{JobRequest, ProgressReport, RetrievedFile, VideoMetadata};
use super::view::View;

/// The download service's HTTP surface
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// Name of the backend (for logging)
    fn name(&self) -> &'static str;

    /// `POST /get_video_info`
    async fn get_video_info(&self, url: &str) -> Result<VideoMetadata>;

    /// `POST /download_video`, returns the job id
    async fn submit_download(&self, request: &JobRequest) -> Result<String>;

    /// `GET /download_progress/{id}`
    async fn get_progress(&self, download_id: &str) -> Result<ProgressReport>;

    /// `GET /download_file/{id}`
    async fn fetch_file(&self, download_id: &str) -> Result<RetrievedFile>;
}

/// Where views are drawn and finished files end up
#[async_trait]
pub trait Presenter: Send + Sync {
    fn render(&self, view: &View);

    /// Hand a retrieved file to the user, returns where it was stored
    async fn deliver(&self, file: RetrievedFile) -> Result<PathBuf>;
}
