//! Summary reports over the collected result records.

pub mod html;
pub mod pdf;

use crate::config::Config;
use crate::record::ResultRecord;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const REPORT_TITLE: &str = "Face Verification Results";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("cannot write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("PDF generation failed: {0}")]
    Pdf(String),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Table shape shared by the HTML and PDF renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportLayout {
    /// Width every image is scaled to for the "resized" column.
    pub report_width: u32,
    pub images_per_row: usize,
}

impl From<&Config> for ReportLayout {
    fn from(config: &Config) -> Self {
        Self {
            report_width: config.report_width,
            images_per_row: config.images_per_row.max(1),
        }
    }
}

impl Default for ReportLayout {
    fn default() -> Self {
        Self { report_width: 500, images_per_row: 1 }
    }
}

/// One record, resolved for display.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub image_src: String,
    pub name: String,
    /// Original pixel dimensions; `None` if the file can no longer be read.
    pub original: Option<(u32, u32)>,
    pub resized: Option<(u32, u32)>,
    pub distance: String,
    pub label: &'static str,
}

impl ReportRow {
    pub fn original_text(&self) -> String {
        dims_text(self.original)
    }

    pub fn resized_text(&self) -> String {
        dims_text(self.resized)
    }
}

fn dims_text(dims: Option<(u32, u32)>) -> String {
    match dims {
        Some((w, h)) => format!("{w}x{h}"),
        None => "-".to_string(),
    }
}

/// Height after scaling `width × height` to `target_width`, keeping aspect ratio.
pub fn resized_height(width: u32, height: u32, target_width: u32) -> Option<u32> {
    if width == 0 {
        return None;
    }
    Some((target_width as f64 / width as f64 * height as f64).round() as u32)
}

/// Distance to two decimals; infinity prints as `inf`.
pub fn format_distance(distance: f32) -> String {
    format!("{distance:.2}")
}

/// `file://` URL for an image, so names with `#`, `%` or `?` still load.
///
/// Relative paths are resolved against the working directory. Falls back to
/// the plain path when no URL can be formed.
pub fn image_src(path: &Path) -> String {
    let absolute = std::fs::canonicalize(path)
        .or_else(|_| std::env::current_dir().map(|cwd| cwd.join(path)))
        .unwrap_or_else(|_| path.to_path_buf());
    match Url::from_file_path(&absolute) {
        Ok(url) => url.into(),
        Err(()) => path.display().to_string(),
    }
}

/// Resolve records into rows, reading each image's dimensions from disk.
pub fn build_rows(records: &[ResultRecord], layout: ReportLayout) -> Vec<ReportRow> {
    records
        .iter()
        .map(|record| {
            let original = match image::image_dimensions(&record.image_path) {
                Ok(dims) => Some(dims),
                Err(e) => {
                    tracing::debug!(path = %record.image_path.display(), error = %e, "no dimensions for report");
                    None
                }
            };
            let resized = original
                .and_then(|(w, h)| resized_height(w, h, layout.report_width))
                .map(|h| (layout.report_width, h));

            ReportRow {
                image_src: image_src(&record.image_path),
                name: record.file_name(),
                original,
                resized,
                distance: format_distance(record.distance),
                label: record.verdict.label(),
            }
        })
        .collect()
}

/// Write all records as pretty JSON.
pub fn write_json(path: &Path, records: &[ResultRecord]) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
