// HTTP backend for the download service

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::{Client, Response};
use tracing::{debug, warn};

use super::errors::{ClientError, Result};
use super::models::{
    ErrorBody, InfoRequest, JobAccepted, JobRequest, ProgressReport, RetrievedFile, VideoMetadata,
};
use super::traits::BackendApi;
use super::utils::content_disposition_filename;
use crate::config::ClientConfig;

pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder =
            Client::builder().timeout(Duration::from_secs(u64::from(config.timeout_seconds)));

        if let Some(proxy_url) = config.proxy.as_deref() {
            debug!(target: "ytdown::backend", proxy = proxy_url, "using proxy");
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.server().to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn job_endpoint(&self, route: &str, download_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            route,
            urlencoding::encode(download_id)
        )
    }

    /// Read the whole body and the optional body-level error
    async fn read_body(response: Response) -> Result<(reqwest::StatusCode, String, ErrorBody)> {
        let status = response.status();
        let text = response.text().await?;
        let error = serde_json::from_str::<ErrorBody>(&text).unwrap_or_default();
        Ok((status, text, error))
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn get_video_info(&self, url: &str) -> Result<VideoMetadata> {
        debug!(target: "ytdown::backend", url, "requesting video info");

        let response = self
            .client
            .post(self.endpoint("/get_video_info"))
            .json(&InfoRequest {
                url: url.to_string(),
            })
            .send()
            .await?;

        let (status, text, error) = Self::read_body(response).await?;
        if !status.is_success() {
            warn!(
                target: "ytdown::backend",
                status = status.as_u16(),
                body = %text,
                "video info request failed"
            );
            return Err(ClientError::Server {
                status: status.as_u16(),
            });
        }

        if let Some(message) = error.error {
            return Err(ClientError::Extraction {
                message,
                code: error.error_code,
            });
        }

        let metadata: VideoMetadata = serde_json::from_str(&text)?;
        debug!(
            target: "ytdown::backend",
            title = %metadata.title,
            formats = metadata.formats.len(),
            "video info received"
        );
        Ok(metadata)
    }

    async fn submit_download(&self, request: &JobRequest) -> Result<String> {
        debug!(target: "ytdown::backend", ?request, "submitting download");

        let response = self
            .client
            .post(self.endpoint("/download_video"))
            .json(request)
            .send()
            .await?;

        let (status, text, error) = Self::read_body(response).await?;
        if !status.is_success() {
            return Err(ClientError::Submission(
                error
                    .error
                    .unwrap_or_else(|| "Failed to start download".to_string()),
            ));
        }
        if let Some(message) = error.error {
            return Err(ClientError::Submission(message));
        }

        let accepted: JobAccepted = serde_json::from_str(&text)?;
        if accepted.download_id.trim().is_empty() {
            return Err(ClientError::Submission(
                "Server returned an empty download id".to_string(),
            ));
        }
        Ok(accepted.download_id)
    }

    async fn get_progress(&self, download_id: &str) -> Result<ProgressReport> {
        let response = self
            .client
            .get(self.job_endpoint("download_progress", download_id))
            .send()
            .await?;

        let (status, text, error) = Self::read_body(response).await?;
        if !status.is_success() {
            warn!(
                target: "ytdown::backend",
                status = status.as_u16(),
                error = error.error.as_deref().unwrap_or(&text),
                "progress request failed"
            );
            return Err(ClientError::Server {
                status: status.as_u16(),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn fetch_file(&self, download_id: &str) -> Result<RetrievedFile> {
        let response = self
            .client
            .get(self.job_endpoint("download_file", download_id))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let (_, text, error) = Self::read_body(response).await?;
            warn!(
                target: "ytdown::backend",
                status = status.as_u16(),
                error = error.error.as_deref().unwrap_or(&text),
                "file retrieval failed"
            );
            return Err(ClientError::Server {
                status: status.as_u16(),
            });
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(content_disposition_filename);
        let bytes = response.bytes().await?.to_vec();

        debug!(
            target: "ytdown::backend",
            filename = filename.as_deref().unwrap_or("<none>"),
            size = bytes.len(),
            "file retrieved"
        );
        Ok(RetrievedFile { filename, bytes })
    }
}
