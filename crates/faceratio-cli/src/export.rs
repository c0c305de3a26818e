//! Output file naming and the JSON metrics export.

use anyhow::{Context, Result};
use faceratio_core::FacialMetrics;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Where one run writes its artifacts, derived from the input image path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub metrics: PathBuf,
    pub annotated: PathBuf,
    pub chart: PathBuf,
}

impl OutputPaths {
    /// `<stem>_metrics.json`, `<stem>_annotated.jpg` (unless overridden) and
    /// `<stem>_chart.png`, next to the image.
    pub fn for_image(image: &Path, annotated: Option<&Path>) -> Self {
        Self {
            metrics: with_suffix(image, "_metrics.json"),
            annotated: annotated
                .map(Path::to_path_buf)
                .unwrap_or_else(|| with_suffix(image, "_annotated.jpg")),
            chart: with_suffix(image, "_chart.png"),
        }
    }
}

/// The image path with its extension replaced by `suffix`.
fn with_suffix(image: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = image.with_extension("").into_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Write the record as pretty-printed UTF-8 JSON.
pub fn write_metrics_json(metrics: &FacialMetrics, path: &Path) -> Result<String> {
    let json = metrics
        .to_json_pretty()
        .context("failed to serialize metrics")?;
    std::fs::write(path, &json)
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "metrics written");
    Ok(json)
}
