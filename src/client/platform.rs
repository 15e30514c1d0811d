// Platform tabs

use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    YouTube,
    Instagram,
    Facebook,
    Twitter,
    TikTok,
    Other,
}

impl Platform {
    /// Tabs in display order
    pub const ALL: [Platform; 6] = [
        Self::YouTube,
        Self::Instagram,
        Self::Facebook,
        Self::Twitter,
        Self::TikTok,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YouTube => "youtube",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
            Self::Twitter => "twitter",
            Self::TikTok => "tiktok",
            Self::Other => "other",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::YouTube => "YouTube",
            Self::Instagram => "Instagram",
            Self::Facebook => "Facebook",
            Self::Twitter => "Twitter",
            Self::TikTok => "TikTok",
            Self::Other => "Other",
        }
    }

    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::YouTube => "Paste YouTube URL here (e.g., https://youtube.com/watch?v=...)",
            Self::Instagram => "Paste Instagram URL here (e.g., https://instagram.com/p/...)",
            Self::Facebook => "Paste Facebook URL here (e.g., https://facebook.com/...)",
            Self::Twitter => "Paste Twitter URL here (e.g., https://twitter.com/...)",
            Self::TikTok => "Paste TikTok URL here (e.g., https://tiktok.com/@...)",
            Self::Other => "Paste video URL from any supported platform...",
        }
    }

    /// Guess the tab a URL belongs to from its host
    pub fn detect(url: &str) -> Self {
        lazy_static::lazy_static! {
            static ref HOST_RE: Regex =
                Regex::new(r"(?i)^(?:[a-z][a-z0-9+.-]*://)?(?:[^@/]*@)?([^/:?#]+)").unwrap();
        }

        let host = match HOST_RE.captures(url.trim()) {
            Some(caps) => caps[1].to_ascii_lowercase(),
            None => return Self::Other,
        };

        let matches = |domain: &str| host == domain || host.ends_with(&format!(".{}", domain));

        if matches("youtube.com") || matches("youtu.be") {
            Self::YouTube
        } else if matches("instagram.com") {
            Self::Instagram
        } else if matches("facebook.com") || matches("fb.watch") {
            Self::Facebook
        } else if matches("twitter.com") || matches("x.com") {
            Self::Twitter
        } else if matches("tiktok.com") {
            Self::TikTok
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown platform: {}", s))
    }
}
