use crate::limits::*;
use crate::model::*;

use super::EngineError;

/// `[s1, e1)` and `[s2, e2)` overlap iff `s1 < e2 && s2 < e1`.
/// Back-to-back ranges are legitimate and do not overlap.
pub fn overlaps(a: &Span, b: &Span) -> bool {
    a.overlaps(b)
}

/// First entry of the timeline that overlaps `candidate`, in timeline order.
pub fn first_conflict<'a>(timeline: &'a [OccupancyEntry], candidate: &Span) -> Option<&'a OccupancyEntry> {
    timeline.iter().find(|e| overlaps(&e.span, candidate))
}

pub fn is_free(timeline: &[OccupancyEntry], candidate: &Span) -> bool {
    first_conflict(timeline, candidate).is_none()
}

pub(crate) fn check_no_conflict(timeline: &[OccupancyEntry], candidate: &Span) -> Result<(), EngineError> {
    match first_conflict(timeline, candidate) {
        Some(entry) => Err(EngineError::Conflict(entry.clone())),
        None => Ok(()),
    }
}

/// Shape checks on a loan request. Runs before any feed is consulted.
pub(crate) fn validate_request(req: &LoanRequest) -> Result<Span, EngineError> {
    if req.motive.trim().is_empty() {
        return Err(EngineError::validation("motive", "required"));
    }
    if req.motive.len() > MAX_MOTIVE_LEN {
        return Err(EngineError::validation("motive", "too long"));
    }
    if req.requester.trim().is_empty() {
        return Err(EngineError::validation("requester", "required"));
    }
    if req.requester.len() > MAX_REQUESTER_LEN {
        return Err(EngineError::validation("requester", "too long"));
    }
    if !is_whole_minute(req.start) {
        return Err(EngineError::validation("start", "must be a whole minute"));
    }
    if !is_whole_minute(req.end) {
        return Err(EngineError::validation("end", "must be a whole minute"));
    }
    let start = minute_of_day(req.start);
    let end = minute_of_day(req.end);
    if start >= end {
        return Err(EngineError::validation(
            "end",
            format!("{} is not after {}", minute_label(end), minute_label(start)),
        ));
    }
    let span = Span::new(start, end);
    if !day_window().contains_span(&span) {
        return Err(EngineError::validation(
            "start",
            format!(
                "[{}, {}) is outside {}-{}",
                minute_label(start),
                minute_label(end),
                hour_label(DAY_START_HOUR),
                hour_label(DAY_END_HOUR)
            ),
        ));
    }
    Ok(span)
}
