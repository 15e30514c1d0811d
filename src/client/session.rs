// Async session driver
//
// Owns the controller, the backend, the presenter and the single poll
// loop. Every state change is followed by a render of the projection.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::backend::HttpBackend;
use super::controller::{Controller, SubmitMode, TickOutcome, TickStart};
use super::errors::{ClientError, Result};
use super::format_selector::{ContainerOption, QualityOption};
use super::models::{MediaKind, QualityToken};
use super::platform::Platform;
use super::traits::{BackendApi, Presenter};
use super::view::{self, View};
use crate::config::ClientConfig;

/// How a polled job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// File retrieved and delivered to the given location
    Finished(PathBuf),
    Failed(String),
    TimedOut,
    /// Loop stopped by a new submission, a tab switch or a new analysis
    Cancelled,
}

struct PollHandle {
    job_id: String,
    task: JoinHandle<JobOutcome>,
}

fn lock(state: &Mutex<Controller>) -> MutexGuard<'_, Controller> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn render(state: &Mutex<Controller>, presenter: &dyn Presenter) {
    let view = view::project(&lock(state));
    presenter.render(&view);
}

/// Clears the busy flag however the analysis ends, including when the
/// future is dropped mid-request
struct BusyGuard {
    state: Arc<Mutex<Controller>>,
    presenter: Arc<dyn Presenter>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        let was_busy = {
            let mut controller = lock(&self.state);
            let busy = controller.is_busy();
            controller.end_busy();
            busy
        };
        if was_busy {
            render(&self.state, self.presenter.as_ref());
        }
    }
}

pub struct Session {
    config: ClientConfig,
    state: Arc<Mutex<Controller>>,
    backend: Arc<dyn BackendApi>,
    presenter: Arc<dyn Presenter>,
    poller: Option<PollHandle>,
}

impl Session {
    pub fn new(
        config: ClientConfig,
        backend: Arc<dyn BackendApi>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        let controller = Controller::new(config.variant, config.max_attempts);
        Self {
            config,
            state: Arc::new(Mutex::new(controller)),
            backend,
            presenter,
            poller: None,
        }
    }

    /// Session talking to the configured server over HTTP
    pub fn connect(config: ClientConfig, presenter: Arc<dyn Presenter>) -> Result<Self> {
        let backend = HttpBackend::new(&config)?;
        Ok(Self::new(config, Arc::new(backend), presenter))
    }

    pub fn view(&self) -> View {
        view::project(&lock(&self.state))
    }

    /// Copy of the controller state
    pub fn snapshot(&self) -> Controller {
        lock(&self.state).clone()
    }

    fn render(&self) {
        render(&self.state, self.presenter.as_ref());
    }

    fn update<R>(&self, f: impl FnOnce(&mut Controller) -> R) -> R {
        let result = f(&mut lock(&self.state));
        self.render();
        result
    }

    // ---- tabs ---------------------------------------------------------

    pub fn set_url(&self, platform: Platform, url: &str) {
        self.update(|c| c.set_url(platform, url));
    }

    /// Switch tabs. Stops polling client-side; the server keeps working.
    pub fn switch_platform(&mut self, platform: Platform) {
        self.stop_polling();
        let abandoned = self.update(|c| c.switch_platform(platform));
        if let Some(job_id) = abandoned {
            debug!(target: "ytdown::session", %job_id, %platform, "abandoned job on tab switch");
        }
    }

    // ---- phase (a) ----------------------------------------------------

    pub async fn analyze(&mut self, url: &str) -> Result<()> {
        self.stop_polling();
        let url = self.update(|c| c.begin_analyze(url))?;
        let _busy = BusyGuard {
            state: Arc::clone(&self.state),
            presenter: Arc::clone(&self.presenter),
        };

        info!(target: "ytdown::session", backend = self.backend.name(), %url, "analyzing");
        let result = self.backend.get_video_info(&url).await;

        let outcome = self.update(|c| c.finish_analyze(result));
        match &outcome {
            Ok(()) => info!(target: "ytdown::session", "video info ready"),
            Err(err) => warn!(target: "ytdown::session", error = %err, "analysis failed"),
        }
        outcome
    }

    // ---- phase (b) ----------------------------------------------------

    pub fn select_media_kind(&self, kind: MediaKind) -> Vec<QualityOption> {
        self.update(|c| c.select_media_kind(kind))
    }

    pub fn select_quality(&self, token: QualityToken) -> Result<Vec<ContainerOption>> {
        self.update(|c| c.select_quality(token))
    }

    pub fn select_container(&self, format: &str) -> Result<()> {
        self.update(|c| c.select_container(format))
    }

    // ---- phase (c) ----------------------------------------------------

    /// Submit the current selection and start polling. Any previous poll
    /// loop is stopped first. Returns the new job id.
    pub async fn submit_download(&mut self, mode: SubmitMode) -> Result<String> {
        self.stop_polling();
        let request = self.update(|c| c.prepare_submission(mode))?;

        info!(
            target: "ytdown::session",
            format_id = request.format_id.as_deref().unwrap_or("<auto>"),
            file_format = request.file_format.as_deref().unwrap_or("<auto>"),
            audio_only = request.audio_only,
            "submitting download"
        );

        let job_id = match self.backend.submit_download(&request).await {
            Ok(id) => id,
            Err(err) => {
                warn!(target: "ytdown::session", error = %err, "submission failed");
                return Err(self.update(|c| c.fail(err)));
            }
        };

        self.update(|c| c.job_started(job_id.clone()));
        self.start_polling(job_id.clone());
        Ok(job_id)
    }

    fn start_polling(&mut self, job_id: String) {
        let task = tokio::spawn(run_poll_loop(
            job_id.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.backend),
            Arc::clone(&self.presenter),
            self.config.poll_interval,
            self.config.completion_delay,
        ));
        debug!(target: "ytdown::session", %job_id, "poll loop started");
        self.poller = Some(PollHandle { job_id, task });
    }

    /// Stop the active poll loop, if any. Idempotent.
    pub fn stop_polling(&mut self) {
        if let Some(handle) = self.poller.take() {
            handle.task.abort();
            debug!(target: "ytdown::session", job_id = %handle.job_id, "poll loop stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Wait for the active poll loop to end. `None` when nothing polls.
    pub async fn wait_for_job(&mut self) -> Option<JobOutcome> {
        let handle = self.poller.take()?;
        match handle.task.await {
            Ok(outcome) => Some(outcome),
            Err(err) if err.is_cancelled() => Some(JobOutcome::Cancelled),
            Err(err) => {
                warn!(target: "ytdown::session", error = %err, "poll loop panicked");
                Some(JobOutcome::Failed(ClientError::TrackingFailed.to_string()))
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop_polling();
    }
}

async fn run_poll_loop(
    job_id: String,
    state: Arc<Mutex<Controller>>,
    backend: Arc<dyn BackendApi>,
    presenter: Arc<dyn Presenter>,
    interval: Duration,
    completion_delay: Duration,
) -> JobOutcome {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the first request goes out
    // one interval after submission.
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let start = lock(&state).begin_tick(&job_id);
        match start {
            TickStart::Poll => {}
            TickStart::Stale => return JobOutcome::Cancelled,
            TickStart::TimedOut => {
                warn!(target: "ytdown::poll", %job_id, "attempt cap reached");
                render(&state, presenter.as_ref());
                return JobOutcome::TimedOut;
            }
        }

        // A request still pending at the next tick is dropped; the tick
        // already counted as an attempt.
        let report = match tokio::time::timeout(interval, backend.get_progress(&job_id)).await {
            Ok(Ok(report)) => report,
            Ok(Err(err)) => {
                warn!(target: "ytdown::poll", %job_id, error = %err, "progress request failed");
                let failed = {
                    let mut controller = lock(&state);
                    controller.tracking_failed(&job_id)
                };
                return match failed {
                    Some(err) => {
                        render(&state, presenter.as_ref());
                        JobOutcome::Failed(err.user_message())
                    }
                    None => JobOutcome::Cancelled,
                };
            }
            Err(_) => {
                debug!(target: "ytdown::poll", %job_id, "progress request outlived its tick");
                continue;
            }
        };

        let outcome = {
            let mut controller = lock(&state);
            controller.apply_report(&job_id, &report)
        };
        render(&state, presenter.as_ref());

        match outcome {
            TickOutcome::Continue => continue,
            TickOutcome::Finished => break,
            TickOutcome::Stale => return JobOutcome::Cancelled,
            TickOutcome::Failed(message) => {
                warn!(target: "ytdown::poll", %job_id, error = %message, "job failed");
                return JobOutcome::Failed(message);
            }
        }
    }

    info!(target: "ytdown::poll", %job_id, "job finished");
    tokio::time::sleep(completion_delay).await;

    let delivered = match backend.fetch_file(&job_id).await {
        Ok(file) => presenter.deliver(file).await,
        Err(err) => Err(err),
    };

    match delivered {
        Ok(path) => {
            info!(target: "ytdown::poll", %job_id, path = %path.display(), "file saved");
            JobOutcome::Finished(path)
        }
        Err(err) => {
            warn!(target: "ytdown::poll", %job_id, error = %err, "file retrieval failed");
            let err: ClientError = {
                let mut controller = lock(&state);
                controller.retrieval_failed(err)
            };
            render(&state, presenter.as_ref());
            JobOutcome::Failed(err.user_message())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::models::{
        FormatDescriptor, JobRequest, ProgressReport, RetrievedFile, VideoMetadata,
    };
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct FakeBackend {
        info_error: Mutex<Option<ClientError>>,
        job_ids: Mutex<VecDeque<String>>,
        reports: Mutex<VecDeque<Result<ProgressReport>>>,
        polled: Mutex<Vec<String>>,
        fetched: AtomicUsize,
        /// Requests that never answer
        stall_info: AtomicBool,
        stall_progress: AtomicBool,
    }

    impl FakeBackend {
        fn with_reports(reports: Vec<Result<ProgressReport>>) -> Self {
            Self {
                reports: Mutex::new(reports.into()),
                job_ids: Mutex::new(VecDeque::from(vec!["job-1".to_string(), "job-2".to_string()])),
                ..Default::default()
            }
        }

        fn polls_for(&self, id: &str) -> usize {
            self.polled.lock().unwrap().iter().filter(|p| *p == id).count()
        }
    }

    #[async_trait::async_trait]
    impl BackendApi for FakeBackend {
        fn name(&self) -> &'static str {
            "fake"
        }

        async fn get_video_info(&self, _url: &str) -> Result<VideoMetadata> {
            if self.stall_info.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if let Some(err) = self.info_error.lock().unwrap().take() {
                return Err(err);
            }
            Ok(VideoMetadata {
                title: "Clip".to_string(),
                formats: vec![FormatDescriptor {
                    format_id: "22".to_string(),
                    height: Some(720),
                    ext: "mp4".to_string(),
                    resolution: None,
                    filesize: None,
                    kind: Some("video".to_string()),
                }],
                ..Default::default()
            })
        }

        async fn submit_download(&self, _request: &JobRequest) -> Result<String> {
            Ok(self
                .job_ids
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "job-x".to_string()))
        }

        async fn get_progress(&self, download_id: &str) -> Result<ProgressReport> {
            self.polled.lock().unwrap().push(download_id.to_string());
            if self.stall_progress.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            self.reports
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(ProgressReport::default().with_status("queued")))
        }

        async fn fetch_file(&self, _download_id: &str) -> Result<RetrievedFile> {
            self.fetched.fetch_add(1, Ordering::SeqCst);
            Ok(RetrievedFile {
                filename: Some("clip.mp4".to_string()),
                bytes: b"data".to_vec(),
            })
        }
    }

    #[derive(Default)]
    struct RecordingPresenter {
        views: Mutex<Vec<View>>,
        delivered: AtomicUsize,
    }

    impl RecordingPresenter {
        fn percents(&self) -> Vec<f64> {
            let mut seen: Vec<f64> = Vec::new();
            for view in self.views.lock().unwrap().iter() {
                if let Some(p) = view.progress.as_ref().map(|p| p.percent) {
                    if seen.last() != Some(&p) {
                        seen.push(p);
                    }
                }
            }
            seen
        }
    }

    #[async_trait::async_trait]
    impl Presenter for RecordingPresenter {
        fn render(&self, view: &View) {
            self.views.lock().unwrap().push(view.clone());
        }

        async fn deliver(&self, file: RetrievedFile) -> Result<PathBuf> {
            self.delivered.fetch_add(1, Ordering::SeqCst);
            Ok(PathBuf::from(file.filename.unwrap_or_default()))
        }
    }

    fn fast_config() -> ClientConfig {
        ClientConfig::default()
            .with_poll_interval(Duration::from_millis(2))
            .with_completion_delay(Duration::from_millis(1))
    }

    async fn ready_session(
        config: ClientConfig,
        backend: Arc<FakeBackend>,
    ) -> (Session, Arc<RecordingPresenter>) {
        let presenter = Arc::new(RecordingPresenter::default());
        let mut session = Session::new(config, backend, presenter.clone());
        session.analyze("https://youtu.be/abc").await.unwrap();
        session.select_media_kind(MediaKind::Video);
        session.select_quality(QualityToken::expr("22")).unwrap();
        session.select_container("mp4").unwrap();
        (session, presenter)
    }

    #[tokio::test]
    async fn progress_until_finished_fetches_once() {
        let backend = Arc::new(FakeBackend::with_reports(vec![
            Ok(ProgressReport::at(10.0).with_status("downloading")),
            Ok(ProgressReport::at(55.0).with_status("downloading")),
            Ok(ProgressReport::at(100.0).with_status("finished")),
        ]));
        let (mut session, presenter) = ready_session(fast_config(), backend.clone()).await;

        let id = session.submit_download(SubmitMode::Standard).await.unwrap();
        assert_eq!(id, "job-1");

        let outcome = session.wait_for_job().await;
        assert_eq!(outcome, Some(JobOutcome::Finished(PathBuf::from("clip.mp4"))));
        assert_eq!(presenter.percents(), vec![0.0, 10.0, 55.0, 100.0]);
        assert_eq!(backend.fetched.load(Ordering::SeqCst), 1);
        assert_eq!(presenter.delivered.load(Ordering::SeqCst), 1);
        assert_eq!(backend.polls_for("job-1"), 3);
    }

    #[tokio::test]
    async fn attempt_cap_times_out_without_fetch() {
        let backend = Arc::new(FakeBackend::with_reports(Vec::new()));
        let config = fast_config().with_max_attempts(5);
        let (mut session, _presenter) = ready_session(config, backend.clone()).await;

        session.submit_download(SubmitMode::Standard).await.unwrap();
        assert_eq!(session.wait_for_job().await, Some(JobOutcome::TimedOut));

        assert_eq!(backend.polls_for("job-1"), 5);
        assert_eq!(backend.fetched.load(Ordering::SeqCst), 0);
        let view = session.view();
        assert_eq!(view.error.as_deref(), Some("Download timeout. Please try again."));
        assert!(view.progress.is_none());
    }

    #[tokio::test]
    async fn failed_progress_request_ends_tracking() {
        let backend = Arc::new(FakeBackend::with_reports(vec![
            Err(ClientError::Server { status: 502 }),
            Ok(ProgressReport::default().with_status("finished")),
        ]));
        let (mut session, _presenter) = ready_session(fast_config(), backend.clone()).await;

        session.submit_download(SubmitMode::Standard).await.unwrap();
        assert_eq!(
            session.wait_for_job().await,
            Some(JobOutcome::Failed(
                "Download tracking failed. Please try again.".to_string()
            ))
        );
        assert_eq!(backend.polls_for("job-1"), 1);
        assert_eq!(backend.fetched.load(Ordering::SeqCst), 0);

        let view = session.view();
        assert_eq!(
            view.error.as_deref(),
            Some("Download tracking failed. Please try again.")
        );
        assert!(view.progress.is_none());
    }

    #[tokio::test]
    async fn unanswered_progress_requests_still_time_out() {
        let backend = Arc::new(FakeBackend::with_reports(Vec::new()));
        backend.stall_progress.store(true, Ordering::SeqCst);
        let config = fast_config()
            .with_poll_interval(Duration::from_millis(10))
            .with_max_attempts(4);
        let (mut session, _presenter) = ready_session(config, backend.clone()).await;

        session.submit_download(SubmitMode::Standard).await.unwrap();
        let outcome = tokio::time::timeout(Duration::from_secs(2), session.wait_for_job())
            .await
            .expect("poll loop outlived its attempt cap");

        assert_eq!(outcome, Some(JobOutcome::TimedOut));
        assert_eq!(backend.polls_for("job-1"), 4);
        assert_eq!(backend.fetched.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn job_error_stops_polling() {
        let backend = Arc::new(FakeBackend::with_reports(vec![Ok(ProgressReport::failed(
            "ffmpeg exited",
        ))]));
        let (mut session, _presenter) = ready_session(fast_config(), backend.clone()).await;

        session.submit_download(SubmitMode::Standard).await.unwrap();
        assert_eq!(
            session.wait_for_job().await,
            Some(JobOutcome::Failed("ffmpeg exited".to_string()))
        );
        assert_eq!(backend.fetched.load(Ordering::SeqCst), 0);
        assert_eq!(session.view().error.as_deref(), Some("ffmpeg exited"));
    }

    #[tokio::test]
    async fn resubmission_replaces_previous_loop() {
        let backend = Arc::new(FakeBackend::with_reports(Vec::new()));
        let (mut session, _presenter) = ready_session(fast_config(), backend.clone()).await;

        session.submit_download(SubmitMode::Standard).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = session.submit_download(SubmitMode::Standard).await.unwrap();
        assert_eq!(second, "job-2");
        let first_polls = backend.polls_for("job-1");

        backend
            .reports
            .lock()
            .unwrap()
            .push_back(Ok(ProgressReport::at(100.0)));
        assert!(matches!(session.wait_for_job().await, Some(JobOutcome::Finished(_))));

        assert_eq!(backend.polls_for("job-1"), first_polls);
        assert_eq!(backend.fetched.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn switching_tabs_stops_polling() {
        let backend = Arc::new(FakeBackend::with_reports(Vec::new()));
        let (mut session, _presenter) = ready_session(fast_config(), backend.clone()).await;

        session.submit_download(SubmitMode::Standard).await.unwrap();
        assert!(session.is_polling());

        session.switch_platform(Platform::Instagram);
        assert!(!session.is_polling());
        assert!(session.view().progress.is_none());
        assert_eq!(session.wait_for_job().await, None);

        let polls = backend.polls_for("job-1");
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.polls_for("job-1"), polls);

        session.stop_polling();
    }

    #[tokio::test]
    async fn failed_analysis_clears_busy() {
        let backend = Arc::new(FakeBackend::default());
        *backend.info_error.lock().unwrap() = Some(ClientError::Extraction {
            message: "ERROR: Private video".to_string(),
            code: None,
        });
        let presenter = Arc::new(RecordingPresenter::default());
        let mut session = Session::new(fast_config(), backend, presenter.clone());

        assert!(session.analyze("https://youtu.be/abc").await.is_err());
        let view = session.view();
        assert!(!view.busy);
        assert!(view.error.is_some());
        assert!(view.options.is_none());
        assert!(presenter.views.lock().unwrap().iter().any(|v| v.busy));
    }

    #[tokio::test]
    async fn dropped_analysis_renders_idle_view() {
        let backend = Arc::new(FakeBackend::default());
        backend.stall_info.store(true, Ordering::SeqCst);
        let presenter = Arc::new(RecordingPresenter::default());
        let mut session = Session::new(fast_config(), backend, presenter.clone());

        let pending =
            tokio::time::timeout(Duration::from_millis(20), session.analyze("https://youtu.be/abc"))
                .await;
        assert!(pending.is_err());

        let views = presenter.views.lock().unwrap();
        assert!(views.iter().any(|v| v.busy));
        assert!(!views.last().unwrap().busy);
        drop(views);
        assert!(!session.view().busy);
    }

    #[tokio::test]
    async fn blank_url_never_reaches_backend() {
        let backend = Arc::new(FakeBackend::default());
        let presenter = Arc::new(RecordingPresenter::default());
        let mut session = Session::new(fast_config(), backend, presenter);

        let err = session.analyze("   ").await.unwrap_err();
        assert!(err.is_local());
        assert!(!session.view().busy);
    }
}
