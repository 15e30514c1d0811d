// Extraction error diagnostics
//
// Turns a backend failure into text a user can act on. A structured
// `error_code` from the server wins; older servers only send free text,
// so the substring table is kept as a fallback.

use serde::{Deserialize, Serialize};

/// Known reasons the backend fails to extract a video
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Platform flagged the server as automated traffic
    BotDetection,

    /// Platform wants a signed-in session ("Sign in to confirm ...")
    SignInRequired,

    PrivateVideo,

    /// Deleted, region-locked or otherwise gone
    VideoUnavailable,

    AgeRestricted,
}

impl FailureReason {
    /// Parse the structured `error_code` field
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "bot_detection" => Some(Self::BotDetection),
            "sign_in_required" => Some(Self::SignInRequired),
            "private_video" => Some(Self::PrivateVideo),
            "video_unavailable" => Some(Self::VideoUnavailable),
            "age_restricted" => Some(Self::AgeRestricted),
            _ => None,
        }
    }

    /// Whether trying another platform tab is a reasonable suggestion
    pub fn suggests_platform_switch(&self) -> bool {
        matches!(self, Self::BotDetection | Self::SignInRequired)
    }

    /// Fixed replacement text, `None` when the raw message is kept and
    /// guidance is appended instead
    pub fn fixed_text(&self) -> Option<&'static str> {
        match self {
            Self::PrivateVideo => Some("This video is private and cannot be downloaded."),
            Self::VideoUnavailable => Some(
                "This video is not available. It may have been deleted or restricted in your region.",
            ),
            Self::AgeRestricted => Some(
                "This video is age-restricted and cannot be accessed without authentication.",
            ),
            Self::BotDetection | Self::SignInRequired => None,
        }
    }
}

/// Classify a free-text backend error.
///
/// Matching is case-sensitive on purpose: the phrases are the ones the
/// extractor emits verbatim.
pub fn diagnose_message(message: &str) -> Option<FailureReason> {
    if message.contains("blocking automated requests") || message.contains("bot") {
        return Some(FailureReason::BotDetection);
    }

    if message.contains("Sign in to confirm") {
        return Some(FailureReason::SignInRequired);
    }

    if message.contains("Private video") {
        return Some(FailureReason::PrivateVideo);
    }

    if message.contains("Video unavailable") {
        return Some(FailureReason::VideoUnavailable);
    }

    if message.contains("Age-restricted") {
        return Some(FailureReason::AgeRestricted);
    }

    None
}

/// Resolve the reason, preferring the structured code
pub fn diagnose(message: &str, code: Option<&str>) -> Option<FailureReason> {
    code.and_then(FailureReason::from_code)
        .or_else(|| diagnose_message(message))
}

/// Build the message shown to the user for an extraction failure
pub fn friendly_message(message: &str, code: Option<&str>) -> String {
    let message = if message.trim().is_empty() {
        "Failed to analyze video. Please check the URL and try again."
    } else {
        message
    };

    match diagnose(message, code) {
        Some(reason) if reason.suggests_platform_switch() => format!(
            "YouTube Access Issue: {}\n\n\
             This happens on some cloud hosting platforms. You can try:\n\
             • Using a different video URL\n\
             • Waiting a few minutes and trying again\n\
             • Using videos from other platforms (Instagram, Facebook, etc.)",
            message
        ),
        Some(reason) => reason.fixed_text().unwrap_or(message).to_string(),
        None => message.to_string(),
    }
}
