mod aggregate;
mod availability;
mod conflict;
mod error;
mod mutations;

pub use aggregate::{build_timeline, OccupancyPolicy};
pub use availability::{free_spans, merge_overlapping, overlapping_pairs, subtract_intervals};
pub use conflict::{first_conflict, is_free, overlaps};
pub use error::EngineError;
pub use mutations::request_from_draft;

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::feed::{FeedError, LoanFeed, LoanWriter, ScheduleFeed};
use crate::model::*;
use crate::selector::next_occurrence_of;

/// Occupancy engine for one session: reads both feeds, builds timelines,
/// and guards the loan write path.
pub struct Engine {
    schedules: Arc<dyn ScheduleFeed>,
    loans: Arc<dyn LoanFeed>,
    writer: Arc<dyn LoanWriter>,
    policy: OccupancyPolicy,
}

impl Engine {
    pub fn new(
        schedules: Arc<dyn ScheduleFeed>,
        loans: Arc<dyn LoanFeed>,
        writer: Arc<dyn LoanWriter>,
        policy: OccupancyPolicy,
    ) -> Self {
        Self {
            schedules,
            loans,
            writer,
            policy,
        }
    }

    pub fn policy(&self) -> OccupancyPolicy {
        self.policy
    }

    /// Occupancy timeline of `space_id` on `date`, sorted by start.
    ///
    /// Both feeds are queried concurrently; if either fails the whole call fails
    /// with `FeedUnavailable` rather than reporting a partial (falsely free) day.
    pub async fn aggregate(
        &self,
        space_id: SpaceId,
        date: NaiveDate,
    ) -> Result<Vec<OccupancyEntry>, EngineError> {
        let weekday = Weekday::of_date(date);
        let blocks = async {
            match weekday {
                Some(day) => self.schedules.fetch_schedule(space_id, day).await,
                None => Ok(Vec::new()),
            }
        };
        let (blocks, loans) = futures::join!(blocks, self.loans.fetch_loans(space_id, date));

        let blocks = blocks.map_err(|e| feed_unavailable("schedule", e))?;
        let loans = loans.map_err(|e| feed_unavailable("loan", e))?;

        let timeline = build_timeline(space_id, date, &blocks, &loans, self.policy);
        debug!(
            "aggregated {} entries for space {space_id} on {date}",
            timeline.len()
        );
        Ok(timeline)
    }

    /// Timeline the weekly grid should gate against for `weekday`: the next
    /// occurrence of that day on or after `today`.
    pub async fn weekday_timeline(
        &self,
        space_id: SpaceId,
        weekday: Weekday,
        today: NaiveDate,
    ) -> Result<Vec<OccupancyEntry>, EngineError> {
        self.aggregate(space_id, next_occurrence_of(weekday, today))
            .await
    }

    /// Free gaps of the bookable day.
    pub async fn free_slots(
        &self,
        space_id: SpaceId,
        date: NaiveDate,
    ) -> Result<Vec<Span>, EngineError> {
        let timeline = self.aggregate(space_id, date).await?;
        Ok(free_spans(&timeline, &day_window()))
    }

    /// `is_free` against a freshly aggregated timeline.
    pub async fn check_range(
        &self,
        space_id: SpaceId,
        date: NaiveDate,
        span: Span,
    ) -> Result<(), EngineError> {
        let timeline = self.aggregate(space_id, date).await?;
        conflict::check_no_conflict(&timeline, &span)
    }
}

fn feed_unavailable(feed: &'static str, e: FeedError) -> EngineError {
    metrics::counter!(crate::observability::FEED_FAILURES_TOTAL, "feed" => feed).increment(1);
    EngineError::FeedUnavailable {
        feed,
        reason: e.0,
    }
}
