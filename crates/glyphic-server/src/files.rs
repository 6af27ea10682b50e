//! Filename classification and temp-file bookkeeping helpers.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

use crate::models::{FileType, IMAGE_EXTENSIONS, PDF_EXTENSIONS};

/// Lowercased extension including the leading dot, or an empty string when
/// the filename has none.
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(OsStr::to_str)
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Classifies a filename by extension, case-insensitively. `None` means the
/// service does not handle this input.
pub fn file_type(filename: &str) -> Option<FileType> {
    let extension = file_extension(filename);
    if IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        Some(FileType::Image)
    } else if PDF_EXTENSIONS.contains(&extension.as_str()) {
        Some(FileType::Pdf)
    } else {
        None
    }
}

pub fn is_supported_file_type(filename: &str) -> bool {
    file_type(filename).is_some()
}

/// Union of every accepted extension, image set first.
pub fn supported_extensions() -> Vec<&'static str> {
    let mut extensions = Vec::with_capacity(IMAGE_EXTENSIONS.len() + PDF_EXTENSIONS.len());
    extensions.extend_from_slice(&IMAGE_EXTENSIONS);
    extensions.extend_from_slice(&PDF_EXTENSIONS);
    extensions
}

/// Builds `{unix_timestamp}_{8-hex-id}{lowercased_extension}`. Collisions are
/// possible in principle but need two calls in the same second to draw the
/// same 8 hex characters; callers needing a hard guarantee should key on a
/// full identifier instead.
pub fn generate_unique_filename(original_filename: &str) -> String {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let unique_id = Uuid::new_v4().simple().to_string();
    debug_assert!(unique_id.len() >= 8);
    let extension = file_extension(original_filename);
    format!("{timestamp}_{}{extension}", &unique_id[..8])
}

/// Inclusive upper bound: a file of exactly `max_size` bytes passes.
pub fn validate_file_size(file_size: u64, max_size: u64) -> bool {
    file_size <= max_size
}

/// Parses a page-range expression (`"1-3,5"`) into sorted, deduplicated page
/// numbers within `[1, total_pages]`. Range endpoints are clamped into
/// bounds and out-of-bound single pages dropped. Any token that fails to
/// parse as an integer discards the whole expression and yields every page;
/// an absent or empty expression does the same. Malformed input is therefore
/// never an error at this layer.
pub fn parse_page_range(page_range: Option<&str>, total_pages: u32) -> Vec<u32> {
    let raw = match page_range.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return all_pages(total_pages),
    };

    match parse_tokens(raw, total_pages) {
        Some(mut pages) => {
            pages.sort_unstable();
            pages.dedup();
            pages
        }
        None => all_pages(total_pages),
    }
}

fn all_pages(total_pages: u32) -> Vec<u32> {
    (1..=total_pages).collect()
}

fn parse_tokens(raw: &str, total_pages: u32) -> Option<Vec<u32>> {
    let mut pages = Vec::new();
    for token in raw.split(',') {
        let token = token.trim();
        if let Some((start, end)) = token.split_once('-') {
            let start: i64 = start.trim().parse().ok()?;
            let end: i64 = end.trim().parse().ok()?;
            let first = start.max(1);
            let last = end.min(i64::from(total_pages));
            for page in first..=last {
                pages.push(page as u32);
            }
        } else {
            let page: i64 = token.parse().ok()?;
            if page >= 1 && page <= i64::from(total_pages) {
                pages.push(page as u32);
            }
        }
    }
    Some(pages)
}

/// Renders a byte count with the largest unit keeping the mantissa below
/// 1024, one decimal place. Zero is special-cased as `"0B"`.
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0B".to_string();
    }

    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1}{}", UNITS[unit])
}

pub fn ensure_directory_exists(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Best-effort removal for housekeeping call sites: returns whether the file
/// was deleted. The underlying OS error is logged rather than propagated so
/// cleanup failures stay non-fatal.
pub fn cleanup_file(path: &Path) -> bool {
    if !path.exists() {
        return false;
    }
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(error) => {
            tracing::debug!(path = %path.display(), %error, "file cleanup failed");
            false
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileInfo {
    pub size: u64,
    pub modified: SystemTime,
}

/// Size and mtime for an existing file, `None` when it cannot be stat'ed.
pub fn file_info(path: &Path) -> Option<FileInfo> {
    let metadata = fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    Some(FileInfo {
        size: metadata.len(),
        modified,
    })
}
