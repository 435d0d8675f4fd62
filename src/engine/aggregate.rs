use chrono::NaiveDate;
use tracing::warn;

use crate::model::*;

use super::availability::overlapping_pairs;

/// Which loan statuses take up room on the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OccupancyPolicy {
    /// Count Pending loans as occupying. Off by default: only Approved loans
    /// occupy, and approval re-checks conflicts.
    pub include_pending: bool,
}

impl OccupancyPolicy {
    pub fn occupies(&self, status: LoanStatus) -> bool {
        match status {
            LoanStatus::Approved => true,
            LoanStatus::Pending => self.include_pending,
            LoanStatus::Rejected | LoanStatus::Expired => false,
        }
    }
}

/// Merge one day's schedule blocks and loans for a space into a single
/// timeline sorted by `(start, end)`.
///
/// Blocks and loans that belong to another space, weekday or date are dropped.
/// Overlaps are kept as-is and reported; they mean the upstream data is broken.
pub fn build_timeline(
    space_id: SpaceId,
    date: NaiveDate,
    blocks: &[ScheduleBlock],
    loans: &[Loan],
    policy: OccupancyPolicy,
) -> Vec<OccupancyEntry> {
    let weekday = Weekday::of_date(date);
    let mut timeline: Vec<OccupancyEntry> = Vec::with_capacity(blocks.len() + loans.len());

    if let Some(day) = weekday {
        for block in blocks
            .iter()
            .filter(|b| b.space_id == space_id && b.weekday == day && b.start_hour < b.end_hour)
        {
            timeline.push(OccupancyEntry {
                space_id,
                date,
                weekday,
                span: block.span(),
                source: EntrySource::ScheduleBlock(block.id),
                label: block.label.clone(),
            });
        }
    }

    for loan in loans.iter().filter(|l| {
        l.space_id == space_id && l.date == date && policy.occupies(l.status) && l.start < l.end
    }) {
        timeline.push(OccupancyEntry {
            space_id,
            date,
            weekday,
            span: loan.span(),
            source: EntrySource::Loan(loan.id),
            label: loan.motive.clone(),
        });
    }

    timeline.sort_by_key(|e| (e.span.start, e.span.end));

    let pairs = overlapping_pairs(&timeline);
    if !pairs.is_empty() {
        metrics::counter!(crate::observability::TIMELINE_OVERLAPS_TOTAL).increment(pairs.len() as u64);
        for (a, b) in pairs {
            warn!(
                "overlapping occupancy for space {space_id} on {date}: '{}' [{}, {}) vs '{}' [{}, {})",
                a.label,
                minute_label(a.span.start),
                minute_label(a.span.end),
                b.label,
                minute_label(b.span.start),
                minute_label(b.span.end),
            );
        }
    }

    timeline
}
