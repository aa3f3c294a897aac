//! Preview pipeline configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Tunables shared by the service façade and the workers.
///
/// All fields have defaults suitable for local development; override via
/// environment variables in production.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// URL returned until a real frame exists.
    pub placeholder_url: String,
    /// Storage key prefix for uploaded frames.
    pub blob_prefix: String,
    /// Host composing the public URL for a storage key.
    pub blob_public_host: String,
    /// How long a liveness verification stays fresh.
    pub check_ttl: Duration,
    /// HEAD probe timeout.
    pub head_timeout: Duration,
    /// Hard wall-clock timeout for the frame extractor.
    pub extract_timeout: Duration,
    /// Timestamp (`HH:MM:SS`) of the frame to grab.
    pub extract_ts: String,
    /// Queue-level retry count for generation jobs.
    pub generate_retries: i32,
    /// Queue-level fixed retry delay.
    pub generate_retry_delay: Duration,
    /// Lifetime of the `queued:*` dedup keys.
    pub queued_ttl: Duration,
    /// Lifetime of the `checking:*` dedup keys.
    pub checking_ttl: Duration,
    /// Scratch directory for extracted frames.
    pub work_dir: PathBuf,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            placeholder_url: "https://cdn.lessonview.app/static/preview-placeholder.jpg".into(),
            blob_prefix: "previews/".into(),
            blob_public_host: "https://cdn.lessonview.app".into(),
            check_ttl: Duration::from_secs(6 * 60 * 60),
            head_timeout: Duration::from_secs(4),
            extract_timeout: Duration::from_secs(30),
            extract_ts: "00:00:01".into(),
            generate_retries: 3,
            generate_retry_delay: Duration::from_secs(60),
            queued_ttl: Duration::from_secs(45 * 60),
            checking_ttl: Duration::from_secs(10 * 60),
            work_dir: PathBuf::from("/tmp/previewd"),
        }
    }
}

impl PreviewConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                            | Default                         |
    /// |------------------------------------|---------------------------------|
    /// | `PREVIEW_PLACEHOLDER_URL`          | CDN placeholder image           |
    /// | `PREVIEW_BLOB_PREFIX`              | `previews/`                     |
    /// | `PREVIEW_BLOB_PUBLIC_HOST`         | `https://cdn.lessonview.app`    |
    /// | `PREVIEW_CHECK_TTL_SECS`           | `21600`                         |
    /// | `PREVIEW_HEAD_TIMEOUT_SECS`        | `4`                             |
    /// | `PREVIEW_EXTRACT_TIMEOUT_SECS`     | `30`                            |
    /// | `PREVIEW_EXTRACT_TS`               | `00:00:01`                      |
    /// | `PREVIEW_GENERATE_RETRIES`         | `3`                             |
    /// | `PREVIEW_GENERATE_RETRY_DELAY_SECS`| `60`                            |
    /// | `PREVIEW_QUEUED_TTL_SECS`          | `2700`                          |
    /// | `PREVIEW_CHECKING_TTL_SECS`        | `600`                           |
    /// | `PREVIEW_WORK_DIR`                 | `/tmp/previewd`                 |
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            placeholder_url: env_string("PREVIEW_PLACEHOLDER_URL", &defaults.placeholder_url),
            blob_prefix: env_string("PREVIEW_BLOB_PREFIX", &defaults.blob_prefix),
            blob_public_host: env_string("PREVIEW_BLOB_PUBLIC_HOST", &defaults.blob_public_host),
            check_ttl: env_secs("PREVIEW_CHECK_TTL_SECS", defaults.check_ttl),
            head_timeout: env_secs("PREVIEW_HEAD_TIMEOUT_SECS", defaults.head_timeout),
            extract_timeout: env_secs("PREVIEW_EXTRACT_TIMEOUT_SECS", defaults.extract_timeout),
            extract_ts: env_string("PREVIEW_EXTRACT_TS", &defaults.extract_ts),
            generate_retries: env_i32("PREVIEW_GENERATE_RETRIES", defaults.generate_retries),
            generate_retry_delay: env_secs(
                "PREVIEW_GENERATE_RETRY_DELAY_SECS",
                defaults.generate_retry_delay,
            ),
            queued_ttl: env_secs("PREVIEW_QUEUED_TTL_SECS", defaults.queued_ttl),
            checking_ttl: env_secs("PREVIEW_CHECKING_TTL_SECS", defaults.checking_ttl),
            work_dir: PathBuf::from(env_string(
                "PREVIEW_WORK_DIR",
                &defaults.work_dir.to_string_lossy(),
            )),
        }
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_secs(name: &str, default: Duration) -> Duration {
    match std::env::var(name) {
        Ok(value) => Duration::from_secs(
            value
                .parse()
                .unwrap_or_else(|_| panic!("{name} must be a valid number of seconds")),
        ),
        Err(_) => default,
    }
}

fn env_i32(name: &str, default: i32) -> i32 {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid integer")),
        Err(_) => default,
    }
}
