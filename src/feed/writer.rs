//! Feed artifacts: the JSON document and the data block inlined into the
//! HTML dashboard.

use std::path::{Path, PathBuf};

use tracing::info;

use super::types::FeedDocument;
use crate::config::FeedsConfig;
use crate::error::{PresswatchError, Result};

/// Writes a feed document to its artifacts.
#[derive(Debug, Clone)]
pub struct FeedWriter {
    json_path: PathBuf,
    html_path: PathBuf,
    marker_start: String,
    marker_end: String,
}

impl FeedWriter {
    /// Create a writer from explicit paths and markers.
    pub fn new(
        json_path: impl Into<PathBuf>,
        html_path: impl Into<PathBuf>,
        marker_start: impl Into<String>,
        marker_end: impl Into<String>,
    ) -> Self {
        Self {
            json_path: json_path.into(),
            html_path: html_path.into(),
            marker_start: marker_start.into(),
            marker_end: marker_end.into(),
        }
    }

    /// Create a writer from the feeds configuration.
    pub fn from_config(config: &FeedsConfig) -> Self {
        Self::new(
            &config.json_output,
            &config.html_output,
            &config.marker_start,
            &config.marker_end,
        )
    }

    /// Write the JSON artifact, then refresh the HTML data block.
    pub fn write(&self, doc: &FeedDocument) -> Result<()> {
        write_json(&self.json_path, doc)?;
        info!(path = %self.json_path.display(), "Wrote feed document");

        inject_html(&self.html_path, doc, &self.marker_start, &self.marker_end)?;
        info!(path = %self.html_path.display(), "Updated inline feed data");

        Ok(())
    }
}

/// Serialize the document as pretty JSON, replacing the file.
pub fn write_json(path: &Path, doc: &FeedDocument) -> Result<()> {
    let mut json = serde_json::to_string_pretty(doc)?;
    json.push('\n');
    write_atomic(path, json.as_bytes())
}

/// Compact JSON that is safe to embed inside a `<script>` element.
pub fn script_safe_json(doc: &FeedDocument) -> Result<String> {
    let json = serde_json::to_string(doc)?;
    Ok(json.replace("</", "<\\/"))
}

/// The full replacement for a marker block, markers included.
pub fn render_inline_block(doc: &FeedDocument, marker_start: &str, marker_end: &str) -> Result<String> {
    Ok(format!(
        "{marker_start}\n  var __FEEDS__ = {};\n  {marker_end}",
        script_safe_json(doc)?
    ))
}

/// Replace every `start ... end` block in `html` with `replacement`.
///
/// Text outside the blocks is preserved byte for byte. Fails if no complete
/// block exists.
pub fn splice(html: &str, marker_start: &str, marker_end: &str, replacement: &str) -> Result<String> {
    let mut out = String::with_capacity(html.len() + replacement.len());
    let mut rest = html;
    let mut replaced = 0usize;

    while let Some(start) = rest.find(marker_start) {
        let after_start = start + marker_start.len();
        let Some(end_rel) = rest[after_start..].find(marker_end) else {
            break;
        };
        let end = after_start + end_rel + marker_end.len();

        out.push_str(&rest[..start]);
        out.push_str(replacement);
        rest = &rest[end..];
        replaced += 1;
    }

    if replaced == 0 {
        return Err(PresswatchError::Artifact(format!(
            "markers {:?} ... {:?} not found",
            marker_start, marker_end
        )));
    }

    out.push_str(rest);
    Ok(out)
}

/// Rewrite the data block in the HTML file at `path`.
pub fn inject_html(path: &Path, doc: &FeedDocument, marker_start: &str, marker_end: &str) -> Result<()> {
    let html = std::fs::read_to_string(path).map_err(|e| {
        PresswatchError::Artifact(format!("could not read {}: {}", path.display(), e))
    })?;

    let block = render_inline_block(doc, marker_start, marker_end)?;
    let updated = splice(&html, marker_start, marker_end, &block)
        .map_err(|e| PresswatchError::Artifact(format!("{} in {}", e, path.display())))?;

    write_atomic(path, updated.as_bytes())
}

/// Write to a temporary sibling file, then rename over the target.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}
