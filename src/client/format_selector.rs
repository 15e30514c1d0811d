// FormatSelector - turns server formats into selectable options
//
// Handles:
// - Quality tiers per distinct height (4K down to 144p)
// - Synthetic `best[height<=N]` tiers when the server lists no formats
// - Fixed audio bitrate tiers
// - Container lists (server extensions or fixed fallbacks)

use serde::{Deserialize, Serialize};

use super::models::{FormatDescriptor, MediaKind, QualityToken};

/// Quality option for display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityOption {
    /// Display label (e.g., "1080p", "320 kbps")
    pub label: String,

    /// Short description (e.g., "Full HD")
    pub description: String,

    /// Token sent as `format_id`; `None` lets the server choose
    pub token: Option<String>,

    /// Height in pixels, video only
    pub height: Option<u32>,
}

impl QualityOption {
    pub fn quality_token(&self) -> QualityToken {
        match &self.token {
            Some(t) => QualityToken::expr(t.clone()),
            None => QualityToken::Auto,
        }
    }
}

/// Container (output file type) option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerOption {
    pub format: String,
    pub label: String,
    pub description: Option<String>,
}

/// Video tiers used for labelling and as the synthetic fallback list
const VIDEO_TIERS: [(u32, &str, &str); 8] = [
    (2160, "4K", "Ultra HD"),
    (1440, "2K", "Quad HD"),
    (1080, "1080p", "Full HD"),
    (720, "720p", "HD Ready"),
    (480, "480p", "Standard"),
    (360, "360p", "Low"),
    (240, "240p", "Mobile"),
    (144, "144p", "Data Saver"),
];

const AUDIO_TIERS: [(&str, &str, &str); 4] = [
    ("Best Quality", "bestaudio", "Highest Available"),
    ("320 kbps", "bestaudio[abr<=320]", "Premium"),
    ("192 kbps", "bestaudio[abr<=192]", "High Quality"),
    ("128 kbps", "bestaudio[abr<=128]", "Standard"),
];

const VIDEO_CONTAINERS: [(&str, &str, &str); 6] = [
    ("mp4", "MP4", "Most Compatible"),
    ("mkv", "MKV", "High Quality"),
    ("webm", "WebM", "Web Optimized"),
    ("avi", "AVI", "Classic Format"),
    ("3gp", "3GP", "Mobile Device"),
    ("flv", "FLV", "Flash Video"),
];

const AUDIO_CONTAINERS: [&str; 4] = ["mp3", "m4a", "ogg", "wav"];

/// Defaults used when a quick download leaves a field unset
pub const QUICK_VIDEO_QUALITY: &str = "best[height<=720]";
pub const CUSTOM_VIDEO_QUALITY: &str = "best[height<=1080]/best";
pub const DEFAULT_AUDIO_QUALITY: &str = "bestaudio";
pub const DEFAULT_VIDEO_CONTAINER: &str = "mp4";
pub const DEFAULT_AUDIO_CONTAINER: &str = "mp3";

pub struct FormatSelector;

impl FormatSelector {
    /// Map a pixel height to its tier label and description
    pub fn height_label(height: u32) -> (&'static str, &'static str) {
        VIDEO_TIERS
            .iter()
            .find(|(min, _, _)| height >= *min)
            .map(|(_, label, desc)| (*label, *desc))
            .unwrap_or(("144p", "Data Saver"))
    }

    /// Quality options for the three-step flow
    pub fn quality_options(kind: MediaKind, formats: &[FormatDescriptor]) -> Vec<QualityOption> {
        match kind {
            MediaKind::Audio => Self::audio_tiers(),
            MediaKind::Video => {
                let derived = Self::video_tiers_from(formats);
                if derived.is_empty() {
                    Self::synthetic_video_tiers()
                } else {
                    derived
                }
            }
        }
    }

    /// One option per distinct height, highest first. The token is the
    /// `format_id` of the first format listed at that height.
    fn video_tiers_from(formats: &[FormatDescriptor]) -> Vec<QualityOption> {
        let mut heights: Vec<u32> = formats.iter().filter_map(|f| f.height).collect();
        heights.sort_unstable_by(|a, b| b.cmp(a));
        heights.dedup();

        heights
            .into_iter()
            .filter_map(|height| {
                let format = formats.iter().find(|f| f.height == Some(height))?;
                let (label, desc) = Self::height_label(height);
                Some(QualityOption {
                    label: label.to_string(),
                    description: desc.to_string(),
                    token: Some(format.format_id.clone()),
                    height: Some(height),
                })
            })
            .collect()
    }

    fn synthetic_video_tiers() -> Vec<QualityOption> {
        VIDEO_TIERS
            .iter()
            .map(|(height, label, desc)| QualityOption {
                label: label.to_string(),
                description: desc.to_string(),
                token: Some(format!("best[height<={}]", height)),
                height: Some(*height),
            })
            .collect()
    }

    fn audio_tiers() -> Vec<QualityOption> {
        AUDIO_TIERS
            .iter()
            .map(|(label, token, desc)| QualityOption {
                label: label.to_string(),
                description: desc.to_string(),
                token: Some(token.to_string()),
                height: None,
            })
            .collect()
    }

    /// Container options for the three-step flow
    pub fn container_options(kind: MediaKind, formats: &[FormatDescriptor]) -> Vec<ContainerOption> {
        match kind {
            MediaKind::Audio => Self::audio_containers(),
            MediaKind::Video => {
                let mut seen: Vec<&str> = Vec::new();
                for f in formats {
                    let ext = f.ext.trim();
                    if !ext.is_empty() && !seen.contains(&ext) {
                        seen.push(ext);
                    }
                }

                if seen.is_empty() {
                    Self::video_containers()
                } else {
                    seen.into_iter()
                        .map(|ext| ContainerOption {
                            format: ext.to_string(),
                            label: ext.to_uppercase(),
                            description: None,
                        })
                        .collect()
                }
            }
        }
    }

    fn video_containers() -> Vec<ContainerOption> {
        VIDEO_CONTAINERS
            .iter()
            .map(|(format, label, desc)| ContainerOption {
                format: format.to_string(),
                label: label.to_string(),
                description: Some(desc.to_string()),
            })
            .collect()
    }

    fn audio_containers() -> Vec<ContainerOption> {
        AUDIO_CONTAINERS
            .iter()
            .map(|format| ContainerOption {
                format: format.to_string(),
                label: format.to_uppercase(),
                description: None,
            })
            .collect()
    }

    /// Quality dropdown of the quick/advanced layout.
    ///
    /// Video lists every format by height (no dedup), preceded by a
    /// "Best Available" entry that leaves the choice to the server.
    pub fn advanced_quality_options(
        kind: MediaKind,
        formats: &[FormatDescriptor],
    ) -> Vec<QualityOption> {
        if kind == MediaKind::Audio {
            return Self::audio_tiers();
        }

        let best_available = QualityOption {
            label: "Best Available".to_string(),
            description: String::new(),
            token: None,
            height: None,
        };

        if formats.is_empty() {
            return vec![
                best_available,
                QualityOption {
                    label: "Best Available".to_string(),
                    description: String::new(),
                    token: Some("best".to_string()),
                    height: None,
                },
                QualityOption {
                    label: "Lowest Quality".to_string(),
                    description: String::new(),
                    token: Some("worst".to_string()),
                    height: None,
                },
            ];
        }

        let mut sorted: Vec<&FormatDescriptor> = formats.iter().collect();
        sorted.sort_by(|a, b| b.height.unwrap_or(0).cmp(&a.height.unwrap_or(0)));

        std::iter::once(best_available)
            .chain(sorted.into_iter().map(|f| QualityOption {
                label: match f.height {
                    Some(h) => format!("{}p", h),
                    None => f.format_id.clone(),
                },
                description: f.ext.to_uppercase(),
                token: Some(f.format_id.clone()),
                height: f.height,
            }))
            .collect()
    }

    /// Container dropdown of the quick/advanced layout
    pub fn advanced_container_options(kind: MediaKind) -> Vec<ContainerOption> {
        match kind {
            MediaKind::Video => Self::video_containers(),
            MediaKind::Audio => Self::audio_containers(),
        }
    }

    /// Quality used when the quick/advanced layout leaves it unset
    pub fn default_quality(kind: MediaKind, quick: bool) -> &'static str {
        match (kind, quick) {
            (MediaKind::Audio, _) => DEFAULT_AUDIO_QUALITY,
            (MediaKind::Video, true) => QUICK_VIDEO_QUALITY,
            (MediaKind::Video, false) => CUSTOM_VIDEO_QUALITY,
        }
    }

    pub fn default_container(kind: MediaKind) -> &'static str {
        match kind {
            MediaKind::Video => DEFAULT_VIDEO_CONTAINER,
            MediaKind::Audio => DEFAULT_AUDIO_CONTAINER,
        }
    }
}
