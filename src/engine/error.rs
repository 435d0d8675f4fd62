use crate::model::{minute_label, EntrySource, OccupancyEntry};

#[derive(Debug)]
pub enum EngineError {
    /// A read feed failed. Never to be read as "the space is free".
    FeedUnavailable { feed: &'static str, reason: String },
    /// Candidate range overlaps an existing occupancy entry.
    Conflict(OccupancyEntry),
    /// Malformed candidate, rejected before any lookup.
    Validation { field: &'static str, reason: String },
    /// The write path failed after local validation passed.
    Submission(String),
}

impl EngineError {
    /// Whether retrying the same request later can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::FeedUnavailable { .. } | EngineError::Submission(_)
        )
    }

    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        EngineError::Validation {
            field,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::FeedUnavailable { feed, reason } => {
                write!(f, "{feed} feed unavailable: {reason}")
            }
            EngineError::Conflict(entry) => {
                let kind = match entry.source {
                    EntrySource::ScheduleBlock(_) => "class",
                    EntrySource::Loan(_) => "loan",
                };
                write!(
                    f,
                    "conflicts with {kind} '{}' on {} [{}, {})",
                    entry.label,
                    entry.date,
                    minute_label(entry.span.start),
                    minute_label(entry.span.end)
                )
            }
            EngineError::Validation { field, reason } => write!(f, "invalid {field}: {reason}"),
            EngineError::Submission(e) => write!(f, "submission failed: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}
