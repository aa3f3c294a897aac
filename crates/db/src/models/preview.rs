//! Preview record entity model.

use serde::Serialize;
use sqlx::FromRow;

use previewd_core::status::{PreviewStatus, StatusId};
use previewd_core::types::{DbId, Timestamp};

/// A row from the `lesson_previews` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PreviewRecord {
    pub id: DbId,
    /// Raw video link as received from the caller (trimmed, never
    /// normalised further).
    pub video_link: String,
    /// URL to display right now. Holds the placeholder until a real frame
    /// exists, so it is never empty.
    pub preview_url: String,
    pub status: StatusId,
    /// Failed generation attempts since the last success.
    pub attempts: i32,
    pub enqueued_at: Option<Timestamp>,
    pub checked_at: Option<Timestamp>,
    pub generated_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl PreviewRecord {
    /// Decoded lifecycle status.
    pub fn status(&self) -> PreviewStatus {
        PreviewStatus::from_id(self.status)
    }

    /// Whether this record holds a real generated frame rather than the
    /// configured placeholder.
    pub fn has_real_frame(&self, placeholder_url: &str) -> bool {
        self.status() == PreviewStatus::Success && self.preview_url != placeholder_url
    }
}
