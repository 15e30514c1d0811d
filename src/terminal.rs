// Terminal presenter for the ytdown binary

use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::client::errors::Result;
use crate::client::models::RetrievedFile;
use crate::client::traits::Presenter;
use crate::client::utils::{sanitize_filename, unique_path};
use crate::client::view::View;

const FALLBACK_FILENAME: &str = "download";

/// Prints one status line per change to stderr and writes finished files
/// into `output_dir`
pub struct TerminalPresenter {
    output_dir: PathBuf,
    last_line: Mutex<Option<String>>,
}

impl TerminalPresenter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            last_line: Mutex::new(None),
        }
    }

    /// The single line describing `view`, if there is anything to say
    pub fn status_line(view: &View) -> Option<String> {
        if let Some(error) = &view.error {
            return Some(format!("Error: {}", error));
        }
        if let Some(progress) = &view.progress {
            return Some(format!("[{:>4}] {}", progress.percent_text, progress.status));
        }
        if view.busy {
            return Some("Analyzing...".to_string());
        }
        None
    }
}

#[async_trait]
impl Presenter for TerminalPresenter {
    fn render(&self, view: &View) {
        let Some(line) = Self::status_line(view) else {
            return;
        };

        let mut last = self
            .last_line
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if last.as_deref() != Some(line.as_str()) {
            eprintln!("{}", line);
            *last = Some(line);
        }
    }

    async fn deliver(&self, file: RetrievedFile) -> Result<PathBuf> {
        let name = file
            .filename
            .as_deref()
            .map(sanitize_filename)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| FALLBACK_FILENAME.to_string());

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = unique_path(&self.output_dir, &name);
        tokio::fs::write(&path, &file.bytes).await?;

        debug!(target: "ytdown::terminal", path = %path.display(), size = file.bytes.len(), "file written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::controller::Controller;
    use crate::client::view::project;
    use tempfile::TempDir;

    #[test]
    fn status_line_prefers_errors() {
        let mut controller = Controller::default();
        assert_eq!(TerminalPresenter::status_line(&project(&controller)), None);

        controller.begin_analyze("https://youtu.be/abc").unwrap();
        assert_eq!(
            TerminalPresenter::status_line(&project(&controller)).as_deref(),
            Some("Analyzing...")
        );

        let _ = controller.begin_analyze(" ");
        assert_eq!(
            TerminalPresenter::status_line(&project(&controller)).as_deref(),
            Some("Error: Please enter a valid URL")
        );
    }

    #[tokio::test]
    async fn deliver_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let presenter = TerminalPresenter::new(dir.path().join("out"));

        let first = presenter
            .deliver(RetrievedFile {
                filename: Some("clip.mp4".to_string()),
                bytes: b"one".to_vec(),
            })
            .await
            .unwrap();
        let second = presenter
            .deliver(RetrievedFile {
                filename: Some("clip.mp4".to_string()),
                bytes: b"two".to_vec(),
            })
            .await
            .unwrap();

        assert_eq!(first.file_name().unwrap(), "clip.mp4");
        assert_eq!(second.file_name().unwrap(), "clip (1).mp4");
        assert_eq!(std::fs::read(&second).unwrap(), b"two");
    }

    #[tokio::test]
    async fn deliver_without_name_uses_fallback() {
        let dir = TempDir::new().unwrap();
        let presenter = TerminalPresenter::new(dir.path());

        let path = presenter
            .deliver(RetrievedFile {
                filename: None,
                bytes: Vec::new(),
            })
            .await
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "download");
    }
}
