//! Seams to the backing store. Everything the engine reads or writes goes through
//! these traits; `store::MemoryFeed` is the in-process implementation.

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::model::*;

/// A read feed could not be reached or answered garbage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedError(pub String);

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feed error: {}", self.0)
    }
}

impl std::error::Error for FeedError {}

/// Rejection from the loan write path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The store found an overlapping occupancy on its side.
    Conflict(String),
    /// The store refused the payload.
    Invalid { field: String, reason: String },
    /// Transport or storage failure.
    Unavailable(String),
}

impl std::fmt::Display for SubmitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmitError::Conflict(msg) => write!(f, "conflict: {msg}"),
            SubmitError::Invalid { field, reason } => write!(f, "invalid {field}: {reason}"),
            SubmitError::Unavailable(msg) => write!(f, "unavailable: {msg}"),
        }
    }
}

impl std::error::Error for SubmitError {}

#[async_trait]
pub trait ScheduleFeed: Send + Sync {
    async fn fetch_schedule(
        &self,
        space_id: SpaceId,
        weekday: Weekday,
    ) -> Result<Vec<ScheduleBlock>, FeedError>;
}

#[async_trait]
pub trait LoanFeed: Send + Sync {
    /// Loans of any status for the space and date. Callers filter.
    async fn fetch_loans(&self, space_id: SpaceId, date: NaiveDate) -> Result<Vec<Loan>, FeedError>;
}

#[async_trait]
pub trait ActionFeed: Send + Sync {
    async fn fetch_upcoming_actions(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<UpcomingAction>, FeedError>;
}

#[async_trait]
pub trait LoanWriter: Send + Sync {
    async fn submit_loan(&self, request: LoanRequest) -> Result<LoanId, SubmitError>;
}
