//! Preview lifecycle status mapping to the SMALLINT `status` column.
//!
//! The discriminants are part of the storage contract: they match the
//! 1-based ids persisted in `lesson_previews.status` and must never be
//! reordered.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Lifecycle status of a preview record.
///
/// `Success` is not terminal: a liveness check can demote a row back to
/// `Failed` when its stored URL stops answering.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStatus {
    /// Created or re-queued; a generation job has been dispatched.
    Pending = 1,
    /// A worker is currently extracting and uploading a frame.
    Running = 2,
    /// A frame exists (or a permanent failure was mapped to the placeholder).
    Success = 3,
    /// The last generation attempt failed; retried after a backoff.
    Failed = 4,
}

impl PreviewStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }

    /// Parse a stored status ID.
    ///
    /// Unknown ids read as `Pending`: callers treat anything non-`Success`
    /// as "still loading, show the placeholder", so this is the safe
    /// interpretation of a value written by a newer schema.
    pub fn from_id(id: StatusId) -> Self {
        match id {
            2 => PreviewStatus::Running,
            3 => PreviewStatus::Success,
            4 => PreviewStatus::Failed,
            _ => PreviewStatus::Pending,
        }
    }

    /// Lowercase name for logging.
    pub fn as_str(self) -> &'static str {
        match self {
            PreviewStatus::Pending => "pending",
            PreviewStatus::Running => "running",
            PreviewStatus::Success => "success",
            PreviewStatus::Failed => "failed",
        }
    }

    /// Returns the set of statuses reachable from `self`.
    pub fn valid_transitions(self) -> &'static [PreviewStatus] {
        match self {
            // Pending -> Running (worker pickup)
            PreviewStatus::Pending => &[PreviewStatus::Running],
            // Running -> Success (frame stored, or permanent giveup) | Failed
            PreviewStatus::Running => &[PreviewStatus::Success, PreviewStatus::Failed],
            // Success -> Failed (liveness found a dead URL); the
            // checked_at-only self-loop is not a transition.
            PreviewStatus::Success => &[PreviewStatus::Failed],
            // Failed -> Pending (re-queued after backoff) | Running
            // (a still-queued job picked the row up directly)
            PreviewStatus::Failed => &[PreviewStatus::Pending, PreviewStatus::Running],
        }
    }

    /// Check whether a transition from `self` to `to` is valid.
    pub fn can_transition(self, to: PreviewStatus) -> bool {
        self.valid_transitions().contains(&to)
    }
}

impl From<PreviewStatus> for StatusId {
    fn from(value: PreviewStatus) -> Self {
        value as StatusId
    }
}
