//! Writing the shutdown report.

use std::fs;
use std::path::Path;

use crate::config::ReportFormat;
use crate::stats::TopNSnapshot;

/// Error type for report output.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode report: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Render the snapshot in the requested format.
pub fn render(snapshot: &TopNSnapshot, format: ReportFormat) -> Result<String, ReportError> {
    match format {
        ReportFormat::Text => Ok(snapshot.to_string()),
        ReportFormat::Json => {
            let mut out = serde_json::to_string_pretty(snapshot)?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Write the snapshot to `path`, creating its parent directory if needed.
pub fn write_report(
    snapshot: &TopNSnapshot,
    path: &Path,
    format: ReportFormat,
) -> Result<(), ReportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, render(snapshot, format)?)?;

    tracing::info!(
        path = %path.display(),
        entries = snapshot.len(),
        "Access report written"
    );
    Ok(())
}

/// Emit the snapshot as structured log events.
pub fn log_snapshot(snapshot: &TopNSnapshot) {
    for (rank, entry) in snapshot.iter().enumerate() {
        tracing::info!(rank = rank + 1, path = %entry.path, count = entry.count, "Top accessed URL");
    }
}
