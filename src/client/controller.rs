// Selection/progress controller
//
// Pure state machine for the analyze -> select -> submit -> poll workflow.
// No I/O happens here: the session feeds it server answers and renders
// `view::project` of the result after every step.

use std::collections::HashMap;

use super::errors::{ClientError, Result, SelectionStep};
use super::format_selector::{ContainerOption, FormatSelector, QualityOption};
use super::models::{
    DownloadJob, FormatDescriptor, JobRequest, JobStatus, MediaKind, ProgressReport, QualityToken,
    SelectionState, VideoMetadata,
};
use super::platform::Platform;

/// Which page layout the controller drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiVariant {
    /// Format -> quality -> file format, all three required
    #[default]
    Simple,
    /// Quick download button plus an advanced options panel; unset
    /// fields fall back to defaults
    QuickAdvanced,
}

/// How a download was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Download button of the simple layout
    Standard,
    /// Quick download with 720p / mp4 defaults
    Quick,
    /// Advanced panel with 1080p / mp4 defaults
    Custom,
}

/// What the poll loop should do on a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStart {
    Poll,
    TimedOut,
    /// Job was replaced or already finished
    Stale,
}

/// Result of applying one progress report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Finished,
    Failed(String),
    Stale,
}

pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

#[derive(Debug, Clone)]
pub struct Controller {
    variant: UiVariant,
    max_attempts: u32,
    active_platform: Platform,
    urls: HashMap<Platform, String>,
    busy: bool,
    metadata: Option<VideoMetadata>,
    options_visible: bool,
    selection: SelectionState,
    job: Option<DownloadJob>,
    progress_visible: bool,
    error: Option<String>,
}

impl Default for Controller {
    fn default() -> Self {
        Self::new(UiVariant::default(), DEFAULT_MAX_ATTEMPTS)
    }
}

impl Controller {
    pub fn new(variant: UiVariant, max_attempts: u32) -> Self {
        Self {
            variant,
            max_attempts,
            active_platform: Platform::default(),
            urls: HashMap::new(),
            busy: false,
            metadata: None,
            options_visible: false,
            selection: Self::initial_selection(variant),
            job: None,
            progress_visible: false,
            error: None,
        }
    }

    fn initial_selection(variant: UiVariant) -> SelectionState {
        match variant {
            UiVariant::Simple => SelectionState::default(),
            UiVariant::QuickAdvanced => SelectionState {
                media_kind: Some(MediaKind::Video),
                ..Default::default()
            },
        }
    }

    // ---- read access for the view -------------------------------------

    pub fn variant(&self) -> UiVariant {
        self.variant
    }

    pub fn active_platform(&self) -> Platform {
        self.active_platform
    }

    pub fn url(&self, platform: Platform) -> &str {
        self.urls.get(&platform).map(String::as_str).unwrap_or("")
    }

    pub fn active_url(&self) -> &str {
        self.url(self.active_platform)
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn metadata(&self) -> Option<&VideoMetadata> {
        self.metadata.as_ref()
    }

    pub fn options_visible(&self) -> bool {
        self.options_visible
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn job(&self) -> Option<&DownloadJob> {
        self.job.as_ref()
    }

    pub fn progress_visible(&self) -> bool {
        self.progress_visible
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn formats(&self) -> &[FormatDescriptor] {
        self.metadata
            .as_ref()
            .map(|m| m.formats.as_slice())
            .unwrap_or(&[])
    }

    // ---- tabs ---------------------------------------------------------

    pub fn set_url(&mut self, platform: Platform, url: impl Into<String>) {
        self.urls.insert(platform, url.into());
    }

    /// Activate another tab. Returns the id of the job whose progress
    /// display was abandoned, if any.
    pub fn switch_platform(&mut self, platform: Platform) -> Option<String> {
        self.active_platform = platform;
        self.abandon_job()
    }

    // ---- errors -------------------------------------------------------

    fn show_error(&mut self, message: String, hide_options: bool) {
        self.error = Some(message);
        if hide_options {
            self.options_visible = false;
        }
        self.progress_visible = false;
    }

    /// Record a failure that ends the current phase and return it
    pub fn fail(&mut self, err: ClientError) -> ClientError {
        let hide_options = !matches!(err, ClientError::IncompleteSelection { .. });
        self.show_error(err.user_message(), hide_options);
        err
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    // ---- phase (a): analysis ------------------------------------------

    /// Validate the URL and enter the busy state. Returns the trimmed URL
    /// to send to the metadata endpoint.
    pub fn begin_analyze(&mut self, url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(self.fail(ClientError::validation("Please enter a valid URL")));
        }

        self.set_url(self.active_platform, url);
        self.busy = true;
        self.options_visible = false;
        self.abandon_job();
        self.error = None;
        Ok(url.to_string())
    }

    /// Leave the busy state. Safe to call more than once.
    pub fn end_busy(&mut self) {
        self.busy = false;
    }

    /// Apply the metadata endpoint's answer
    pub fn finish_analyze(&mut self, result: Result<VideoMetadata>) -> Result<()> {
        self.end_busy();
        match result {
            Ok(metadata) => {
                self.metadata = Some(metadata);
                self.selection = Self::initial_selection(self.variant);
                self.options_visible = true;
                self.error = None;
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    // ---- phase (b): selection -----------------------------------------

    /// Pick video or audio. Clears quality and container.
    pub fn select_media_kind(&mut self, kind: MediaKind) -> Vec<QualityOption> {
        self.selection.media_kind = Some(kind);
        self.selection.quality = None;
        self.selection.container = None;
        self.quality_options()
    }

    pub fn select_quality(&mut self, token: QualityToken) -> Result<Vec<ContainerOption>> {
        if self.selection.media_kind.is_none() {
            return Err(self.fail(ClientError::IncompleteSelection {
                missing: vec![SelectionStep::Format],
            }));
        }
        self.selection.quality = Some(token);
        Ok(self.container_options())
    }

    pub fn select_container(&mut self, format: &str) -> Result<()> {
        if self.selection.media_kind.is_none() {
            return Err(self.fail(ClientError::IncompleteSelection {
                missing: vec![SelectionStep::Format],
            }));
        }
        self.selection.container = Some(format.trim().to_string());
        Ok(())
    }

    /// Quality options for the current media kind and layout
    pub fn quality_options(&self) -> Vec<QualityOption> {
        let Some(kind) = self.selection.media_kind else {
            return Vec::new();
        };
        match self.variant {
            UiVariant::Simple => FormatSelector::quality_options(kind, self.formats()),
            UiVariant::QuickAdvanced => {
                FormatSelector::advanced_quality_options(kind, self.formats())
            }
        }
    }

    /// Container options; the simple layout only offers them once a
    /// quality was picked
    pub fn container_options(&self) -> Vec<ContainerOption> {
        let Some(kind) = self.selection.media_kind else {
            return Vec::new();
        };
        match self.variant {
            UiVariant::Simple if self.selection.has_quality() => {
                FormatSelector::container_options(kind, self.formats())
            }
            UiVariant::Simple => Vec::new(),
            UiVariant::QuickAdvanced => FormatSelector::advanced_container_options(kind),
        }
    }

    pub fn missing_steps(&self) -> Vec<SelectionStep> {
        let mut missing = Vec::new();
        if self.selection.media_kind.is_none() {
            missing.push(SelectionStep::Format);
        }
        if !self.selection.has_quality() {
            missing.push(SelectionStep::Quality);
        }
        if !self.selection.has_container() {
            missing.push(SelectionStep::FileFormat);
        }
        missing
    }

    pub fn download_enabled(&self) -> bool {
        match self.variant {
            UiVariant::Simple => self.selection.is_complete(),
            UiVariant::QuickAdvanced => self.selection.media_kind.is_some(),
        }
    }

    // ---- phase (c): submission ----------------------------------------

    /// Check preconditions and build the job request. Shows the progress
    /// panel at 0% on success.
    pub fn prepare_submission(&mut self, mode: SubmitMode) -> Result<JobRequest> {
        let selection = match self.variant {
            UiVariant::Simple => {
                let missing = self.missing_steps();
                if !missing.is_empty() {
                    return Err(self.fail(ClientError::IncompleteSelection { missing }));
                }
                self.selection.clone()
            }
            UiVariant::QuickAdvanced => self.selection_with_defaults(mode),
        };

        let url = self.active_url().trim().to_string();
        if url.is_empty() {
            return Err(self.fail(ClientError::validation("Please enter a video URL")));
        }

        let kind = selection.media_kind.unwrap_or(MediaKind::Video);
        let request = JobRequest {
            url,
            format_id: selection.quality.as_ref().and_then(QualityToken::as_wire),
            audio_only: kind == MediaKind::Audio,
            file_format: selection.container.clone(),
        };

        self.job = None;
        self.error = None;
        self.progress_visible = true;
        Ok(request)
    }

    fn selection_with_defaults(&self, mode: SubmitMode) -> SelectionState {
        let kind = self.selection.media_kind.unwrap_or(MediaKind::Video);
        let quick = mode != SubmitMode::Custom;

        let quality = match &self.selection.quality {
            Some(token) if self.selection.has_quality() => token.clone(),
            _ => QualityToken::expr(FormatSelector::default_quality(kind, quick)),
        };
        let container = if self.selection.has_container() {
            self.selection.container.clone()
        } else {
            Some(FormatSelector::default_container(kind).to_string())
        };

        SelectionState {
            media_kind: Some(kind),
            quality: Some(quality),
            container,
        }
    }

    /// The server accepted the job
    pub fn job_started(&mut self, id: impl Into<String>) {
        self.job = Some(DownloadJob::new(id));
        self.progress_visible = true;
    }

    /// Stop showing the current job. Returns its id if one was active.
    pub fn abandon_job(&mut self) -> Option<String> {
        self.progress_visible = false;
        self.job.take().map(|job| job.id)
    }

    // ---- polling ------------------------------------------------------

    fn active_job_mut(&mut self, job_id: &str) -> Option<&mut DownloadJob> {
        self.job
            .as_mut()
            .filter(|job| job.id == job_id && !job.status.is_terminal())
    }

    /// Count a tick; past the attempt cap the job times out.
    pub fn begin_tick(&mut self, job_id: &str) -> TickStart {
        let max_attempts = self.max_attempts;
        let Some(job) = self.active_job_mut(job_id) else {
            return TickStart::Stale;
        };

        job.attempts += 1;
        if job.attempts <= max_attempts {
            return TickStart::Poll;
        }

        job.status = JobStatus::TimedOut;
        job.error_message = Some(ClientError::TimedOut.to_string());
        self.fail(ClientError::TimedOut);
        TickStart::TimedOut
    }

    /// Apply one progress report to the active job
    pub fn apply_report(&mut self, job_id: &str, report: &ProgressReport) -> TickOutcome {
        let Some(job) = self.active_job_mut(job_id) else {
            return TickOutcome::Stale;
        };

        let status = report.status.as_deref().map(str::trim);
        let progress = report.progress.filter(|p| p.is_finite());

        let failure = match (&report.error, status) {
            (Some(msg), _) if !msg.trim().is_empty() => Some(msg.clone()),
            (_, Some("error")) => Some("Download failed".to_string()),
            _ => None,
        };
        if let Some(message) = failure {
            job.status = JobStatus::Error;
            job.error_message = Some(message.clone());
            self.fail(ClientError::JobFailed(message.clone()));
            return TickOutcome::Failed(message);
        }

        if status == Some("finished") || progress.is_some_and(|p| p >= 100.0) {
            job.progress_percent = 100.0;
            job.status = JobStatus::Finished;
            job.status_label = "Download completed!".to_string();
            return TickOutcome::Finished;
        }

        let (next_status, label, fallback) = match status {
            Some("queued") => (JobStatus::Queued, "Queued...", None),
            Some("downloading") => (JobStatus::Downloading, "Downloading...", None),
            Some("converting") => (
                JobStatus::Converting,
                "Converting to selected format...",
                Some(90.0),
            ),
            Some(_) => (job.status, "Processing...", None),
            None if progress.is_some() => (JobStatus::Downloading, "Downloading...", None),
            None => return TickOutcome::Continue,
        };

        let percent = progress.or(fallback).unwrap_or(job.progress_percent);
        job.progress_percent = percent.clamp(0.0, 100.0);
        job.status = next_status;
        job.status_label = label.to_string();
        TickOutcome::Continue
    }

    /// A progress request for the active job failed. `None` when the job
    /// is no longer the active one.
    pub fn tracking_failed(&mut self, job_id: &str) -> Option<ClientError> {
        let job = self.active_job_mut(job_id)?;
        let err = ClientError::TrackingFailed;
        job.status = JobStatus::Error;
        job.error_message = Some(err.to_string());
        Some(self.fail(err))
    }

    /// Retrieval after a finished job failed
    pub fn retrieval_failed(&mut self, err: ClientError) -> ClientError {
        if let Some(job) = self.job.as_mut() {
            job.error_message = Some(err.user_message());
        }
        self.fail(err)
    }
}
