// Client configuration

use std::path::PathBuf;
use std::time::Duration;

use crate::client::controller::{UiVariant, DEFAULT_MAX_ATTEMPTS};

pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

/// Configuration for a download session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the download service
    pub base_url: String,
    /// SOCKS5/HTTP proxy URL (e.g., "socks5h://127.0.0.1:1080")
    pub proxy: Option<String>,
    /// Request timeout in seconds
    pub timeout_seconds: u32,
    /// Delay between two progress requests
    pub poll_interval: Duration,
    /// Poll ticks before the job is given up
    pub max_attempts: u32,
    /// Pause between "complete" and fetching the file
    pub completion_delay: Duration,
    pub variant: UiVariant,
    /// Where retrieved files are written
    pub output_dir: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SERVER.to_string(),
            proxy: None,
            timeout_seconds: 30,
            poll_interval: Duration::from_millis(500),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            completion_delay: Duration::from_millis(500),
            variant: UiVariant::Simple,
            output_dir: dirs::download_dir().unwrap_or_else(|| PathBuf::from(".")),
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.proxy = proxy.filter(|p| !p.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = delay;
        self
    }

    pub fn with_variant(mut self, variant: UiVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Base URL without a trailing slash
    pub fn server(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}
