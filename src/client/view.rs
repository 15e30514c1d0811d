// View projection
//
// `project` is the only way display state is produced: the controller
// owns the data, presenters only ever see a `View`.

use serde::Serialize;

use super::controller::{Controller, UiVariant};
use super::format_selector::{ContainerOption, QualityOption};
use super::models::{FormatDescriptor, JobStatus, MediaKind};
use super::platform::Platform;
use super::utils::{format_duration, format_file_size, format_number};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TabView {
    pub platform: Platform,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub url: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoCard {
    pub title: String,
    pub uploader: String,
    pub duration: String,
    pub views: String,
    pub thumbnail: Option<String>,
}

/// One line of the grouped format list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatRow {
    pub format_id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormatGroups {
    pub video: Vec<FormatRow>,
    pub audio: Vec<FormatRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsView {
    pub media_kind: Option<MediaKind>,
    /// Empty until a media kind is chosen
    pub qualities: Vec<QualityOption>,
    /// Index into `qualities` of the current choice
    pub selected_quality: Option<usize>,
    /// Empty until the layout allows picking a container
    pub containers: Vec<ContainerOption>,
    pub selected_container: Option<String>,
    pub status_line: String,
    pub ready: bool,
    pub download_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressView {
    pub percent: f64,
    /// Rounded percentage text, e.g. "55%"
    pub percent_text: String,
    pub status: String,
    pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct View {
    pub tabs: Vec<TabView>,
    pub busy: bool,
    pub error: Option<String>,
    pub video: Option<VideoCard>,
    pub formats: Option<FormatGroups>,
    pub options: Option<OptionsView>,
    pub progress: Option<ProgressView>,
}

/// Project controller state into what should be on screen
pub fn project(state: &Controller) -> View {
    let tabs = Platform::ALL
        .iter()
        .map(|&platform| TabView {
            platform,
            label: platform.display_name(),
            placeholder: platform.placeholder(),
            url: state.url(platform).to_string(),
            active: platform == state.active_platform(),
        })
        .collect();

    let metadata = state.metadata().filter(|_| state.options_visible());

    let video = metadata.map(|m| VideoCard {
        title: if m.title.is_empty() {
            "Unknown Title".to_string()
        } else {
            m.title.clone()
        },
        uploader: if m.uploader.is_empty() {
            "Unknown".to_string()
        } else {
            m.uploader.clone()
        },
        duration: format_duration(m.duration),
        views: format_number(m.view_count),
        thumbnail: m.thumbnail.clone().filter(|t| !t.is_empty()),
    });

    let formats = metadata.map(|m| group_formats(&m.formats));

    let options = metadata.map(|_| project_options(state));

    let progress = state
        .job()
        .filter(|_| state.progress_visible())
        .map(|job| ProgressView {
            percent: job.progress_percent,
            percent_text: format!("{}%", job.progress_percent.round() as u32),
            status: job.status_label.clone(),
            complete: job.status == JobStatus::Finished,
        })
        .or_else(|| {
            // Submitted, no job id yet
            (state.progress_visible() && state.job().is_none()).then(|| ProgressView {
                percent: 0.0,
                percent_text: "0%".to_string(),
                status: "Preparing download...".to_string(),
                complete: false,
            })
        });

    View {
        tabs,
        busy: state.is_busy(),
        error: state.error().map(str::to_string),
        video,
        formats,
        options,
        progress,
    }
}

fn project_options(state: &Controller) -> OptionsView {
    let selection = state.selection();
    let qualities = state.quality_options();
    let selected_quality = selection
        .quality
        .as_ref()
        .and_then(|token| qualities.iter().position(|q| &q.quality_token() == token));

    let missing = state.missing_steps();
    let done: Vec<&str> = [
        (selection.media_kind.is_some(), "Format"),
        (selection.has_quality(), "Quality"),
        (selection.has_container(), "File Format"),
    ]
    .iter()
    .filter(|(set, _)| *set)
    .map(|(_, name)| *name)
    .collect();

    let ready = missing.is_empty();
    let status_line = match state.variant() {
        UiVariant::Simple if ready => "Ready to download!".to_string(),
        UiVariant::Simple => format!(
            "Complete: {} | Missing: {} step(s)",
            done.join(", "),
            missing.len()
        ),
        UiVariant::QuickAdvanced => "Quick download uses the best defaults".to_string(),
    };

    OptionsView {
        media_kind: selection.media_kind,
        qualities,
        selected_quality,
        containers: state.container_options(),
        selected_container: selection.container.clone(),
        status_line,
        ready,
        download_enabled: state.download_enabled(),
    }
}

/// Split formats by reported type, labelled `<resolution> - <EXT> (<size>)`
fn group_formats(formats: &[FormatDescriptor]) -> FormatGroups {
    let row = |f: &FormatDescriptor| {
        let resolution = f
            .resolution
            .clone()
            .or_else(|| f.height.map(|h| format!("{}p", h)))
            .unwrap_or_else(|| "unknown".to_string());
        let size = format_file_size(f.filesize);
        let label = if size.is_empty() {
            format!("{} - {}", resolution, f.ext.to_uppercase())
        } else {
            format!("{} - {} ({})", resolution, f.ext.to_uppercase(), size)
        };
        FormatRow {
            format_id: f.format_id.clone(),
            label,
        }
    };

    FormatGroups {
        video: formats
            .iter()
            .filter(|f| f.media_kind() == Some(MediaKind::Video))
            .map(row)
            .collect(),
        audio: formats
            .iter()
            .filter(|f| f.media_kind() == Some(MediaKind::Audio))
            .map(row)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::controller::SubmitMode;
    use crate::client::models::{ProgressReport, QualityToken, VideoMetadata};

    fn analyzed() -> Controller {
        let mut c = Controller::default();
        c.begin_analyze("https://youtu.be/abc").unwrap();
        c.finish_analyze(Ok(VideoMetadata {
            title: "Clip".to_string(),
            uploader: String::new(),
            duration: Some(125.0),
            view_count: Some(1_234_567),
            thumbnail: Some("https://i.ytimg.com/x.jpg".to_string()),
            formats: vec![
                FormatDescriptor {
                    format_id: "22".to_string(),
                    height: Some(720),
                    ext: "mp4".to_string(),
                    resolution: Some("1280x720".to_string()),
                    filesize: Some(10_485_760.0),
                    kind: Some("video".to_string()),
                },
                FormatDescriptor {
                    format_id: "140".to_string(),
                    height: None,
                    ext: "m4a".to_string(),
                    resolution: Some("audio only".to_string()),
                    filesize: None,
                    kind: Some("audio".to_string()),
                },
            ],
        }))
        .unwrap();
        c
    }

    #[test]
    fn busy_view_hides_options() {
        let mut c = Controller::default();
        c.begin_analyze("https://youtu.be/abc").unwrap();
        let view = project(&c);
        assert!(view.busy);
        assert!(view.video.is_none());
        assert!(view.options.is_none());
        assert_eq!(view.tabs.iter().filter(|t| t.active).count(), 1);
        assert_eq!(view.tabs[0].url, "https://youtu.be/abc");
    }

    #[test]
    fn video_card_formatting() {
        let view = project(&analyzed());
        let card = view.video.unwrap();
        assert_eq!(card.title, "Clip");
        assert_eq!(card.uploader, "Unknown");
        assert_eq!(card.duration, "2:05");
        assert_eq!(card.views, "1.2M");

        let formats = view.formats.unwrap();
        assert_eq!(formats.video[0].label, "1280x720 - MP4 (10.0 MB)");
        assert_eq!(formats.audio[0].label, "audio only - M4A");
    }

    #[test]
    fn selection_status_line() {
        let mut c = analyzed();
        let options = project(&c).options.unwrap();
        assert!(options.qualities.is_empty());
        assert_eq!(options.status_line, "Complete:  | Missing: 3 step(s)");

        c.select_media_kind(MediaKind::Video);
        c.select_quality(QualityToken::expr("22")).unwrap();
        let options = project(&c).options.unwrap();
        assert_eq!(options.status_line, "Complete: Format, Quality | Missing: 1 step(s)");
        assert_eq!(options.selected_quality, Some(0));
        assert_eq!(options.containers.len(), 2);
        assert!(!options.download_enabled);

        c.select_container("mp4").unwrap();
        let options = project(&c).options.unwrap();
        assert_eq!(options.status_line, "Ready to download!");
        assert!(options.download_enabled);
    }

    #[test]
    fn progress_panel_follows_job() {
        let mut c = analyzed();
        c.select_media_kind(MediaKind::Audio);
        c.select_quality(QualityToken::expr("bestaudio")).unwrap();
        c.select_container("mp3").unwrap();
        c.prepare_submission(SubmitMode::Standard).unwrap();

        let progress = project(&c).progress.unwrap();
        assert_eq!(progress.percent_text, "0%");
        assert_eq!(progress.status, "Preparing download...");

        c.job_started("job-9");
        c.apply_report("job-9", &ProgressReport::at(55.4).with_status("downloading"));
        let progress = project(&c).progress.unwrap();
        assert_eq!(progress.percent_text, "55%");
        assert_eq!(progress.status, "Downloading...");
        assert!(!progress.complete);

        c.apply_report("job-9", &ProgressReport::at(100.0).with_status("finished"));
        let progress = project(&c).progress.unwrap();
        assert!(progress.complete);
        assert_eq!(progress.status, "Download completed!");
    }

    #[test]
    fn errors_hide_everything_but_the_message() {
        let mut c = analyzed();
        c.job_started("job-1");
        c.apply_report("job-1", &ProgressReport::failed("disk full"));
        let view = project(&c);
        assert_eq!(view.error.as_deref(), Some("disk full"));
        assert!(view.progress.is_none());
        assert!(view.options.is_none());
    }
}
