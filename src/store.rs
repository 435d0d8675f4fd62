use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use dashmap::DashMap;
use serde::Deserialize;
use tracing::info;
use ulid::Ulid;

use crate::engine::{build_timeline, first_conflict, merge_overlapping, OccupancyPolicy};
use crate::feed::*;
use crate::limits::{DAY_END_HOUR, DAY_START_HOUR};
use crate::model::*;

/// In-process backing store implementing every feed trait. Used by tests,
/// the stress bench, and the service binary (loaded from a JSON fixture).
pub struct MemoryFeed {
    spaces: DashMap<SpaceId, Space>,
    blocks: DashMap<SpaceId, Vec<ScheduleBlock>>,
    loans: DashMap<LoanId, Loan>,
    loans_by_day: DashMap<(SpaceId, NaiveDate), Vec<LoanId>>,
    /// Serializes check-then-write on one space's day.
    day_locks: DashMap<(SpaceId, NaiveDate), Arc<Mutex<()>>>,
    unavailable: AtomicBool,
    policy: OccupancyPolicy,
}

#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    pub spaces: Vec<Space>,
    #[serde(default)]
    pub blocks: Vec<ScheduleBlock>,
    #[serde(default)]
    pub loans: Vec<Loan>,
}

impl Default for MemoryFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::with_policy(OccupancyPolicy::default())
    }

    /// `policy` governs the store's own authoritative conflict check on submit.
    pub fn with_policy(policy: OccupancyPolicy) -> Self {
        Self {
            spaces: DashMap::new(),
            blocks: DashMap::new(),
            loans: DashMap::new(),
            loans_by_day: DashMap::new(),
            day_locks: DashMap::new(),
            unavailable: AtomicBool::new(false),
            policy,
        }
    }

    pub fn from_fixture(fixture: Fixture) -> Result<Self, SubmitError> {
        Self::from_fixture_with_policy(fixture, OccupancyPolicy::default())
    }

    pub fn from_fixture_with_policy(fixture: Fixture, policy: OccupancyPolicy) -> Result<Self, SubmitError> {
        let feed = Self::with_policy(policy);
        for space in fixture.spaces {
            feed.insert_space(space);
        }
        for block in fixture.blocks {
            feed.insert_block(block)?;
        }
        for loan in fixture.loans {
            feed.insert_loan(loan);
        }
        Ok(feed)
    }

    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        Self::from_json_with_policy(json, OccupancyPolicy::default())
    }

    pub fn from_json_with_policy(
        json: &str,
        policy: OccupancyPolicy,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let fixture: Fixture = serde_json::from_str(json)?;
        Ok(Self::from_fixture_with_policy(fixture, policy)?)
    }

    pub fn policy(&self) -> OccupancyPolicy {
        self.policy
    }

    /// Simulate an outage of every read feed.
    pub fn set_unavailable(&self, down: bool) {
        self.unavailable.store(down, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), FeedError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FeedError("backing store unreachable".into()));
        }
        Ok(())
    }

    // ── Spaces ───────────────────────────────────────────────

    pub fn insert_space(&self, space: Space) {
        self.spaces.insert(space.id, space);
    }

    pub fn space(&self, id: &SpaceId) -> Option<Space> {
        self.spaces.get(id).map(|e| e.value().clone())
    }

    pub fn space_count(&self) -> usize {
        self.spaces.len()
    }

    /// All spaces, ordered by name.
    pub fn spaces(&self) -> Vec<Space> {
        let mut spaces: Vec<Space> = self.spaces.iter().map(|e| e.value().clone()).collect();
        spaces.sort_by(|a, b| a.name.cmp(&b.name));
        spaces
    }

    // ── Schedule blocks ──────────────────────────────────────

    pub fn insert_block(&self, block: ScheduleBlock) -> Result<(), SubmitError> {
        if block.start_hour >= block.end_hour
            || block.start_hour < DAY_START_HOUR
            || block.end_hour > DAY_END_HOUR
        {
            return Err(SubmitError::Invalid {
                field: "start_hour".into(),
                reason: format!(
                    "block [{}, {}) is not a valid range inside {}-{}",
                    block.start_hour, block.end_hour, DAY_START_HOUR, DAY_END_HOUR
                ),
            });
        }
        self.blocks.entry(block.space_id).or_default().push(block);
        Ok(())
    }

    fn blocks_for(&self, space_id: SpaceId, weekday: Weekday) -> Vec<ScheduleBlock> {
        self.blocks
            .get(&space_id)
            .map(|bs| bs.iter().filter(|b| b.weekday == weekday).cloned().collect())
            .unwrap_or_default()
    }

    // ── Loans ────────────────────────────────────────────────

    /// Store a loan as-is, without any checks (fixtures, upstream imports).
    pub fn insert_loan(&self, loan: Loan) {
        self.loans_by_day
            .entry((loan.space_id, loan.date))
            .or_default()
            .push(loan.id);
        self.loans.insert(loan.id, loan);
    }

    pub fn loan(&self, id: &LoanId) -> Option<Loan> {
        self.loans.get(id).map(|e| e.value().clone())
    }

    fn loans_for(&self, space_id: SpaceId, date: NaiveDate) -> Vec<Loan> {
        self.loans_by_day
            .get(&(space_id, date))
            .map(|ids| ids.iter().filter_map(|id| self.loan(id)).collect())
            .unwrap_or_default()
    }

    fn day_lock(&self, space_id: SpaceId, date: NaiveDate) -> Arc<Mutex<()>> {
        self.day_locks.entry((space_id, date)).or_default().clone()
    }

    fn timeline(&self, space_id: SpaceId, date: NaiveDate, policy: OccupancyPolicy) -> Vec<OccupancyEntry> {
        let blocks = Weekday::of_date(date)
            .map(|d| self.blocks_for(space_id, d))
            .unwrap_or_default();
        let loans = self.loans_for(space_id, date);
        build_timeline(space_id, date, &blocks, &loans, policy)
    }

    /// Approve a pending loan. Conflicts are re-checked against approved
    /// occupancy, so two pending requests for one slot cannot both pass.
    pub fn approve_loan(&self, id: LoanId) -> Result<(), SubmitError> {
        let loan = self.pending(id)?;
        let lock = self.day_lock(loan.space_id, loan.date);
        let _guard = lock_day(&lock);
        // Status may have moved while waiting for the lock.
        let loan = self.pending(loan.id)?;
        let approved_only = OccupancyPolicy::default();
        let timeline = self.timeline(loan.space_id, loan.date, approved_only);
        if let Some(entry) = first_conflict(&timeline, &loan.span()) {
            return Err(SubmitError::Conflict(format!(
                "overlaps '{}' [{}, {})",
                entry.label,
                minute_label(entry.span.start),
                minute_label(entry.span.end)
            )));
        }
        self.set_status(id, LoanStatus::Approved);
        info!("loan {id} approved");
        Ok(())
    }

    pub fn reject_loan(&self, id: LoanId) -> Result<(), SubmitError> {
        let loan = self.pending(id)?;
        let lock = self.day_lock(loan.space_id, loan.date);
        let _guard = lock_day(&lock);
        self.pending(id)?;
        self.set_status(id, LoanStatus::Rejected);
        Ok(())
    }

    fn pending(&self, id: LoanId) -> Result<Loan, SubmitError> {
        let loan = self.loan(&id).ok_or_else(|| SubmitError::Invalid {
            field: "id".into(),
            reason: format!("loan {id} not found"),
        })?;
        if loan.status != LoanStatus::Pending {
            return Err(SubmitError::Invalid {
                field: "status".into(),
                reason: format!("loan {id} is {:?}, not Pending", loan.status),
            });
        }
        Ok(loan)
    }

    fn set_status(&self, id: LoanId, status: LoanStatus) {
        if let Some(mut loan) = self.loans.get_mut(&id) {
            loan.status = status;
        }
    }

    // ── Upcoming actions ─────────────────────────────────────

    /// Next open/close action of `space_id` at `now`, derived from the day's
    /// occupancy. Back-to-back entries form one open run.
    pub fn next_action(&self, space: &Space, now: NaiveDateTime) -> Option<UpcomingAction> {
        let timeline = self.timeline(space.id, now.date(), OccupancyPolicy::default());
        let mut spans: Vec<Span> = timeline.iter().map(|e| e.span).collect();
        spans.sort_by_key(|s| s.start);
        let runs = merge_overlapping(&spans);

        let t = minute_of_day(now.time());
        let (action, at) = runs.iter().find_map(|run| {
            if run.start <= t && t < run.end {
                Some((Action::Close, run.end))
            } else if t < run.start {
                Some((Action::Open, run.start))
            } else {
                None
            }
        })?;
        Some(UpcomingAction {
            space_id: space.id,
            space_name: space.name.clone(),
            action,
            minutes_remaining: i64::from(at - t),
        })
    }
}

/// A poisoned lock guards no data, so the poison is ignored.
fn lock_day(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl ScheduleFeed for MemoryFeed {
    async fn fetch_schedule(
        &self,
        space_id: SpaceId,
        weekday: Weekday,
    ) -> Result<Vec<ScheduleBlock>, FeedError> {
        self.check_available()?;
        Ok(self.blocks_for(space_id, weekday))
    }
}

#[async_trait]
impl LoanFeed for MemoryFeed {
    async fn fetch_loans(&self, space_id: SpaceId, date: NaiveDate) -> Result<Vec<Loan>, FeedError> {
        self.check_available()?;
        Ok(self.loans_for(space_id, date))
    }
}

#[async_trait]
impl ActionFeed for MemoryFeed {
    async fn fetch_upcoming_actions(
        &self,
        now: NaiveDateTime,
    ) -> Result<Vec<UpcomingAction>, FeedError> {
        self.check_available()?;
        let mut upcoming: Vec<UpcomingAction> = self
            .spaces
            .iter()
            .filter_map(|e| self.next_action(e.value(), now))
            .collect();
        upcoming.sort_by(|a, b| a.space_name.cmp(&b.space_name));
        Ok(upcoming)
    }
}

#[async_trait]
impl LoanWriter for MemoryFeed {
    async fn submit_loan(&self, request: LoanRequest) -> Result<LoanId, SubmitError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(SubmitError::Unavailable("backing store unreachable".into()));
        }
        if !self.spaces.contains_key(&request.space_id) {
            return Err(SubmitError::Invalid {
                field: "space_id".into(),
                reason: format!("unknown space {}", request.space_id),
            });
        }
        for (field, t) in [("start", request.start), ("end", request.end)] {
            if !is_whole_minute(t) {
                return Err(SubmitError::Invalid {
                    field: field.into(),
                    reason: format!("{t} is not a whole minute"),
                });
            }
        }
        if minute_of_day(request.start) >= minute_of_day(request.end) {
            return Err(SubmitError::Invalid {
                field: "end".into(),
                reason: "end must be after start".into(),
            });
        }
        let span = Span::from_times(request.start, request.end);
        let lock = self.day_lock(request.space_id, request.date);
        let _guard = lock_day(&lock);
        let timeline = self.timeline(request.space_id, request.date, self.policy);
        if let Some(entry) = first_conflict(&timeline, &span) {
            return Err(SubmitError::Conflict(format!("overlaps '{}'", entry.label)));
        }

        let id = Ulid::new();
        self.insert_loan(Loan {
            id,
            space_id: request.space_id,
            date: request.date,
            start: request.start,
            end: request.end,
            status: LoanStatus::Pending,
            requester: request.requester,
            motive: request.motive,
        });
        Ok(id)
    }
}
