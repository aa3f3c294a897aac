//! Frame extractor port and its ffmpeg implementation.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use previewd_core::ffmpeg::{self, ExtractError};

/// Produces a single JPEG frame from a remote video source.
#[async_trait]
pub trait FrameExtractor: Send + Sync {
    /// Capture one frame at `timestamp` (`HH:MM:SS`), writing it to
    /// `output_path` and returning the bytes.
    async fn extract(
        &self,
        source_url: &str,
        timestamp: &str,
        output_path: &Path,
    ) -> Result<Vec<u8>, ExtractError>;
}

/// Extractor shelling out to the `ffmpeg` binary.
pub struct FfmpegExtractor {
    timeout: Duration,
}

impl FfmpegExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl FrameExtractor for FfmpegExtractor {
    async fn extract(
        &self,
        source_url: &str,
        timestamp: &str,
        output_path: &Path,
    ) -> Result<Vec<u8>, ExtractError> {
        ffmpeg::extract_frame(source_url, timestamp, output_path, self.timeout).await
    }
}
