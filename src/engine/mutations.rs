use chrono::NaiveTime;
use tracing::{info, warn};

use crate::feed::SubmitError;
use crate::model::*;

use super::conflict::{check_no_conflict, validate_request};
use super::{Engine, EngineError};

impl Engine {
    /// Validate, re-aggregate, conflict-check, then hand the loan to the writer.
    ///
    /// The timeline is read fresh; it may have changed since the selector
    /// gated the start cell.
    pub async fn submit(&self, request: LoanRequest) -> Result<LoanId, EngineError> {
        let started = std::time::Instant::now();
        let result = self.submit_inner(request).await;
        let outcome = match &result {
            Ok(_) => "ok",
            Err(EngineError::Conflict(_)) => "conflict",
            Err(EngineError::Validation { .. }) => "invalid",
            Err(EngineError::FeedUnavailable { .. }) => "feed_unavailable",
            Err(EngineError::Submission(_)) => "submission_failed",
        };
        metrics::counter!(crate::observability::SUBMISSIONS_TOTAL, "outcome" => outcome).increment(1);
        metrics::histogram!(crate::observability::SUBMIT_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        result
    }

    async fn submit_inner(&self, request: LoanRequest) -> Result<LoanId, EngineError> {
        let span = validate_request(&request)?;
        let timeline = self.aggregate(request.space_id, request.date).await?;
        check_no_conflict(&timeline, &span)?;

        let space_id = request.space_id;
        let date = request.date;
        match self.writer.submit_loan(request).await {
            Ok(id) => {
                info!(
                    "loan {id} submitted for space {space_id} on {date} [{}, {})",
                    minute_label(span.start),
                    minute_label(span.end)
                );
                Ok(id)
            }
            Err(SubmitError::Conflict(msg)) => {
                // Someone else got there between our read and the write.
                // Re-read so the caller sees the clashing entry.
                warn!("upstream conflict for space {space_id} on {date}: {msg}");
                let timeline = self.aggregate(space_id, date).await?;
                match super::first_conflict(&timeline, &span) {
                    Some(entry) => Err(EngineError::Conflict(entry.clone())),
                    None => Err(EngineError::Submission(format!("rejected as conflicting: {msg}"))),
                }
            }
            Err(SubmitError::Invalid { field, reason }) => Err(EngineError::Validation {
                field: upstream_field(&field),
                reason,
            }),
            Err(SubmitError::Unavailable(msg)) => Err(EngineError::Submission(msg)),
        }
    }
}

fn upstream_field(field: &str) -> &'static str {
    match field {
        "space_id" => "space_id",
        "date" => "date",
        "start" => "start",
        "end" => "end",
        "motive" => "motive",
        "requester" => "requester",
        _ => "request",
    }
}

/// Turn a selector draft plus form input into a loan request.
pub fn request_from_draft(
    draft: &ReservationDraft,
    motive: impl Into<String>,
    requester: impl Into<String>,
) -> Result<LoanRequest, EngineError> {
    Ok(LoanRequest {
        space_id: draft.space_id,
        date: draft.date,
        start: parse_hhmm("start", &draft.start)?,
        end: parse_hhmm("end", &draft.end)?,
        motive: motive.into(),
        requester: requester.into(),
    })
}

fn parse_hhmm(field: &'static str, s: &str) -> Result<NaiveTime, EngineError> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .map_err(|_| EngineError::validation(field, format!("'{s}' is not HH:MM")))
}

