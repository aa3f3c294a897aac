//! FFmpeg single-frame extraction.
//!
//! Wraps the external `ffmpeg` binary to grab one JPEG from a remote video
//! URL. Failures are split into permanent ones (the source will never
//! yield a frame) and transient ones (worth retrying later); the generate
//! worker maps the former to a stored placeholder and the latter to a
//! failed attempt.

use std::path::Path;
use std::time::Duration;

/// Error type for frame extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("ffmpeg binary not found: {0}")]
    NotFound(std::io::Error),

    #[error("source has no extractable video stream (exit code {exit_code:?}): {stderr}")]
    Permanent {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("frame extraction failed (exit code {exit_code:?}): {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("frame extraction timed out after {0:?}")]
    TimedOut(Duration),

    #[error("extractor wrote an empty frame file")]
    EmptyOutput,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractError {
    /// Whether retrying against the same source is pointless.
    pub fn is_permanent(&self) -> bool {
        matches!(self, ExtractError::Permanent { .. })
    }
}

/// stderr markers that identify a source which will never produce a frame:
/// not a media container, no video stream, or a definitive HTTP rejection.
/// Network flakiness and timeouts never match these.
const PERMANENT_MARKERS: &[&str] = &[
    "Invalid data found when processing input",
    "does not contain any stream",
    "Output file does not contain any stream",
    "Protocol not found",
    "Server returned 400",
    "Server returned 403 Forbidden",
    "Server returned 404 Not Found",
    "Server returned 410 Gone",
];

/// Classify a non-zero ffmpeg exit into a permanent or transient error.
pub fn classify_failure(exit_code: Option<i32>, stderr: &str) -> ExtractError {
    let stderr = stderr.trim().to_string();
    if PERMANENT_MARKERS.iter().any(|m| stderr.contains(m)) {
        ExtractError::Permanent { exit_code, stderr }
    } else {
        ExtractError::Failed { exit_code, stderr }
    }
}

/// Extract a single JPEG frame from `source_url` at `timestamp`
/// (`HH:MM:SS`), writing it to `output_path` and returning the bytes.
///
/// The whole invocation runs under a hard wall-clock `timeout`; an elapsed
/// timeout kills the process and reports a transient failure.
pub async fn extract_frame(
    source_url: &str,
    timestamp: &str,
    output_path: &Path,
    timeout: Duration,
) -> Result<Vec<u8>, ExtractError> {
    let mut command = tokio::process::Command::new("ffmpeg");
    command
        .args(["-y", "-loglevel", "error", "-ss", timestamp, "-i"])
        .arg(source_url)
        .args(["-frames:v", "1", "-q:v", "2", "-f", "image2"])
        .arg(output_path)
        .kill_on_drop(true);

    let output = match tokio::time::timeout(timeout, command.output()).await {
        Ok(result) => result.map_err(ExtractError::NotFound)?,
        Err(_) => return Err(ExtractError::TimedOut(timeout)),
    };

    if !output.status.success() {
        return Err(classify_failure(
            output.status.code(),
            &String::from_utf8_lossy(&output.stderr),
        ));
    }

    let bytes = tokio::fs::read(output_path).await?;
    if bytes.is_empty() {
        return Err(ExtractError::EmptyOutput);
    }
    Ok(bytes)
}
