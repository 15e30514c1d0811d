// Display formatting and small response helpers

use std::path::{Path, PathBuf};

use regex::Regex;

/// Format a duration in seconds as `H:MM:SS` or `M:SS`
pub fn format_duration(seconds: Option<f64>) -> String {
    let total = match seconds {
        Some(s) if s > 0.0 => s.floor() as u64,
        _ => return "Unknown".to_string(),
    };

    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}

/// Compact view counter (`1.2M`, `3.4K`)
pub fn format_number(num: Option<u64>) -> String {
    match num {
        None | Some(0) => "0".to_string(),
        Some(n) if n >= 1_000_000 => format!("{:.1}M", n as f64 / 1_000_000.0),
        Some(n) if n >= 1_000 => format!("{:.1}K", n as f64 / 1_000.0),
        Some(n) => n.to_string(),
    }
}

/// Human file size, empty when unknown
pub fn format_file_size(bytes: Option<f64>) -> String {
    const SIZES: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    let bytes = match bytes {
        Some(b) if b >= 1.0 => b,
        _ => return String::new(),
    };

    let i = ((bytes.ln() / 1024f64.ln()).floor() as usize).min(SIZES.len() - 1);
    format!("{:.1} {}", bytes / 1024f64.powi(i as i32), SIZES[i])
}

/// Pull the filename out of a `Content-Disposition` header.
///
/// RFC 5987 `filename*=` wins over the plain `filename=` form.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    lazy_static::lazy_static! {
        static ref EXTENDED_RE: Regex =
            Regex::new(r#"(?i)filename\*\s*=\s*[^']*'[^']*'([^;]+)"#).unwrap();
        static ref PLAIN_RE: Regex =
            Regex::new(r#"(?i)filename\s*=\s*(?:"([^"]*)"|([^;]+))"#).unwrap();
    }

    if let Some(caps) = EXTENDED_RE.captures(header) {
        let encoded = caps.get(1)?.as_str().trim();
        if let Ok(decoded) = urlencoding::decode(encoded) {
            if !decoded.is_empty() {
                return Some(decoded.into_owned());
            }
        }
    }

    let caps = PLAIN_RE.captures(header)?;
    let name = caps
        .get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().trim().to_string())?;

    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

/// Strip path components and characters that are unsafe in file names
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let trimmed = cleaned.trim().trim_start_matches('.');
    if trimmed.is_empty() {
        "download".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Pick a target path in `dir`, never overwriting an existing file
pub fn unique_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (filename, None),
    };

    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{} ({}).{}", stem, n, ext)),
            None => dir.join(format!("{} ({})", stem, n)),
        })
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}
