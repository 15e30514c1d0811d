// Error types for the download client

use std::fmt;

use thiserror::Error;

use super::diagnostics;

/// One of the three selection steps the user walks through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStep {
    Format,
    Quality,
    FileFormat,
}

impl SelectionStep {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Format => "Format",
            Self::Quality => "Quality",
            Self::FileFormat => "File Format",
        }
    }
}

impl fmt::Display for SelectionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// Local input problem (blank URL), never reaches the network
    #[error("{0}")]
    Validation(String),

    /// Download requested before every selection step was made
    #[error("Please complete all 3 selection steps (missing: {})", join_steps(.missing))]
    IncompleteSelection { missing: Vec<SelectionStep> },

    /// Non-2xx HTTP status
    #[error("Server error: {status}")]
    Server { status: u16 },

    /// Metadata endpoint answered with a body-level `error`
    #[error("{message}")]
    Extraction {
        message: String,
        code: Option<String>,
    },

    /// Job submission was rejected
    #[error("{0}")]
    Submission(String),

    /// The server reported the job as failed while polling
    #[error("{0}")]
    JobFailed(String),

    /// Poll attempt cap exceeded
    #[error("Download timeout. Please try again.")]
    TimedOut,

    /// A progress request failed; polling stops
    #[error("Download tracking failed. Please try again.")]
    TrackingFailed,

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid server response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

fn join_steps(steps: &[SelectionStep]) -> String {
    steps
        .iter()
        .map(SelectionStep::label)
        .collect::<Vec<_>>()
        .join(", ")
}

impl ClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Message shown to the user.
    ///
    /// Extraction failures go through the friendly translation table,
    /// everything else uses its `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            Self::Extraction { message, code } => {
                diagnostics::friendly_message(message, code.as_deref())
            }
            other => other.to_string(),
        }
    }

    /// Errors raised before any request was sent
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::IncompleteSelection { .. })
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_selection_names_missing_steps() {
        let err = ClientError::IncompleteSelection {
            missing: vec![SelectionStep::Quality, SelectionStep::FileFormat],
        };
        assert_eq!(
            err.to_string(),
            "Please complete all 3 selection steps (missing: Quality, File Format)"
        );
        assert!(err.is_local());
    }

    #[test]
    fn server_error_carries_status() {
        let err = ClientError::Server { status: 502 };
        assert_eq!(err.user_message(), "Server error: 502");
        assert!(!err.is_local());
    }

    #[test]
    fn extraction_message_is_translated() {
        let err = ClientError::Extraction {
            message: "ERROR: Private video".to_string(),
            code: None,
        };
        assert_eq!(
            err.user_message(),
            "This video is private and cannot be downloaded."
        );
    }
}
