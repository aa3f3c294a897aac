//! Deterministic identities derived from the raw video link.
//!
//! The SHA-1 hex digest of the untouched link is the single identity used
//! everywhere: queue task ids, dedup registry keys, and storage keys. The
//! link is never normalised before hashing, so two URLs that differ only in
//! percent-encoding get independent previews.

use sha1::{Digest, Sha1};

/// Compute a SHA-1 hex digest of the given bytes.
pub fn sha1_hex(data: &[u8]) -> String {
    let hash = Sha1::digest(data);
    format!("{hash:x}")
}

/// Queue task id for a generation job.
pub fn generate_task_id(video_link: &str) -> String {
    sha1_hex(video_link.as_bytes())
}

/// Queue task id for a liveness-check job.
pub fn check_task_id(video_link: &str) -> String {
    format!("check_{}", sha1_hex(video_link.as_bytes()))
}

/// Dedup registry key guarding generation dispatch.
pub fn queued_key(video_link: &str) -> String {
    format!("queued:{}", sha1_hex(video_link.as_bytes()))
}

/// Dedup registry key guarding liveness-check dispatch.
pub fn checking_key(video_link: &str) -> String {
    format!("checking:{}", sha1_hex(video_link.as_bytes()))
}

/// Storage key for the frame uploaded for `video_link`.
pub fn storage_key(prefix: &str, video_link: &str) -> String {
    format!("{prefix}{}.jpg", sha1_hex(video_link.as_bytes()))
}
