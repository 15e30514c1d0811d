// Data models shared by the controller, the backend and the view

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Treat an explicit `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Video metadata returned by `POST /get_video_info`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub uploader: String,
    /// Length in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<FormatDescriptor>,
}

/// One encoding variant the server can produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatDescriptor {
    pub format_id: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ext: String,
    #[serde(default)]
    pub resolution: Option<String>,
    /// Bytes; some extractors report an estimate as a float
    #[serde(default)]
    pub filesize: Option<f64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl FormatDescriptor {
    pub fn media_kind(&self) -> Option<MediaKind> {
        match self.kind.as_deref() {
            Some("video") => Some(MediaKind::Video),
            Some("audio") => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the user asked the server to pick.
///
/// `Auto` is sent as `null` and leaves the choice to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityToken {
    Auto,
    Expr(String),
}

impl QualityToken {
    pub fn expr(token: impl Into<String>) -> Self {
        Self::Expr(token.into())
    }

    pub fn as_wire(&self) -> Option<String> {
        match self {
            Self::Auto => None,
            Self::Expr(s) => Some(s.clone()),
        }
    }

    fn is_set(&self) -> bool {
        match self {
            Self::Auto => true,
            Self::Expr(s) => !s.trim().is_empty(),
        }
    }
}

/// The user's three-step choice
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    pub media_kind: Option<MediaKind>,
    pub quality: Option<QualityToken>,
    pub container: Option<String>,
}

impl SelectionState {
    pub fn has_quality(&self) -> bool {
        self.quality.as_ref().is_some_and(QualityToken::is_set)
    }

    pub fn has_container(&self) -> bool {
        self.container.as_deref().is_some_and(|c| !c.trim().is_empty())
    }

    pub fn is_complete(&self) -> bool {
        self.media_kind.is_some() && self.has_quality() && self.has_container()
    }
}

/// Server-side job state as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Downloading,
    Converting,
    Finished,
    Error,
    /// Poll attempt cap exceeded, client-side only
    TimedOut,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Error | Self::TimedOut)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadJob {
    pub id: String,
    pub progress_percent: f64,
    pub status: JobStatus,
    /// Label shown under the progress bar
    pub status_label: String,
    pub error_message: Option<String>,
    /// Poll ticks issued so far
    pub attempts: u32,
}

impl DownloadJob {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            progress_percent: 0.0,
            status: JobStatus::Queued,
            status_label: "Preparing download...".to_string(),
            error_message: None,
            attempts: 0,
        }
    }
}

/// Body of `POST /get_video_info`
#[derive(Debug, Clone, Serialize)]
pub struct InfoRequest {
    pub url: String,
}

/// Body of `POST /download_video`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRequest {
    pub url: String,
    pub format_id: Option<String>,
    pub audio_only: bool,
    pub file_format: Option<String>,
}

/// Any endpoint may answer with a body-level error
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobAccepted {
    pub download_id: String,
}

/// One answer of `GET /download_progress/{id}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProgressReport {
    #[serde(default)]
    pub progress: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl ProgressReport {
    pub fn at(progress: f64) -> Self {
        Self {
            progress: Some(progress),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    pub fn failed(message: &str) -> Self {
        Self {
            error: Some(message.to_string()),
            ..Default::default()
        }
    }
}

/// File returned by `GET /download_file/{id}`
#[derive(Debug, Clone)]
pub struct RetrievedFile {
    /// Name from `Content-Disposition`, if the server sent one
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}
