use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::limits::{DAY_END_HOUR, DAY_START_HOUR};

/// Minutes since midnight. The only intra-day time type.
pub type Minute = u32;

pub type SpaceId = Ulid;
pub type LoanId = Ulid;
pub type BlockId = Ulid;

pub const MINUTES_PER_HOUR: Minute = 60;

/// Half-open interval `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Minute,
    pub end: Minute,
}

impl Span {
    pub fn new(start: Minute, end: Minute) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// Whole-hour span `[start_hour:00, end_hour:00)`.
    pub fn hours(start_hour: u32, end_hour: u32) -> Self {
        Self::new(start_hour * MINUTES_PER_HOUR, end_hour * MINUTES_PER_HOUR)
    }

    pub fn from_times(start: NaiveTime, end: NaiveTime) -> Self {
        Self::new(minute_of_day(start), minute_of_day(end))
    }

    pub fn duration_minutes(&self) -> Minute {
        self.end - self.start
    }

    /// Touching spans (`self.end == other.start`) do not overlap.
    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// The bookable part of a day, `[06:00, 22:00)`.
pub fn day_window() -> Span {
    Span::hours(DAY_START_HOUR, DAY_END_HOUR)
}

pub fn minute_of_day(t: NaiveTime) -> Minute {
    t.hour() * MINUTES_PER_HOUR + t.minute()
}

/// No seconds or sub-second part. Loans are stored at minute precision.
pub fn is_whole_minute(t: NaiveTime) -> bool {
    t.second() == 0 && t.nanosecond() == 0
}

/// Render an hour as `HH:00`.
pub fn hour_label(hour: u32) -> String {
    format!("{hour:02}:00")
}

pub fn minute_label(m: Minute) -> String {
    format!("{:02}:{:02}", m / MINUTES_PER_HOUR, m % MINUTES_PER_HOUR)
}

/// Working days. Sunday carries no academic schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 6] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn from_chrono(day: chrono::Weekday) -> Option<Self> {
        match day {
            chrono::Weekday::Mon => Some(Weekday::Monday),
            chrono::Weekday::Tue => Some(Weekday::Tuesday),
            chrono::Weekday::Wed => Some(Weekday::Wednesday),
            chrono::Weekday::Thu => Some(Weekday::Thursday),
            chrono::Weekday::Fri => Some(Weekday::Friday),
            chrono::Weekday::Sat => Some(Weekday::Saturday),
            chrono::Weekday::Sun => None,
        }
    }

    pub fn of_date(date: NaiveDate) -> Option<Self> {
        Self::from_chrono(date.weekday())
    }

    pub fn to_chrono(self) -> chrono::Weekday {
        match self {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpaceCategory {
    Classroom,
    Lab,
    Auditorium,
    Other(String),
}

/// A physical room. Read-only from this crate's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub id: SpaceId,
    pub name: String,
    pub capacity: u32,
    pub category: SpaceCategory,
    pub site: String,
    /// Reference to the open/close policy managed upstream.
    #[serde(default)]
    pub policy: Option<String>,
}

/// Recurring weekly academic occupation, `[start_hour, end_hour)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: BlockId,
    pub space_id: SpaceId,
    pub weekday: Weekday,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Subject / group.
    pub label: String,
}

impl ScheduleBlock {
    pub fn span(&self) -> Span {
        Span::hours(self.start_hour, self.end_hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

/// One-off, date-specific reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub space_id: SpaceId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub status: LoanStatus,
    pub requester: String,
    pub motive: String,
}

impl Loan {
    pub fn span(&self) -> Span {
        Span::from_times(self.start, self.end)
    }
}

/// Where an occupancy entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntrySource {
    ScheduleBlock(BlockId),
    Loan(LoanId),
}

/// A date-anchored occupied span, derived from a schedule block or a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyEntry {
    pub space_id: SpaceId,
    pub date: NaiveDate,
    pub weekday: Option<Weekday>,
    pub span: Span,
    pub source: EntrySource,
    pub label: String,
}

impl OccupancyEntry {
    pub fn is_loan(&self) -> bool {
        matches!(self.source, EntrySource::Loan(_))
    }
}

/// A grid cell of the weekly selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub space_id: SpaceId,
    pub weekday: Weekday,
    pub hour: u32,
}

/// Hour range picked on the weekly grid, `[start_hour, end_hour)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRange {
    pub space_id: SpaceId,
    pub weekday: Weekday,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl SelectionRange {
    pub fn span(&self) -> Span {
        Span::hours(self.start_hour, self.end_hour)
    }
}

/// Reservation draft handed to the create-reservation form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationDraft {
    pub space_id: SpaceId,
    pub date: NaiveDate,
    /// `HH:00`
    pub start: String,
    /// `HH:00`
    pub end: String,
}

/// Payload of the loan write path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub space_id: SpaceId,
    pub date: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub motive: String,
    pub requester: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Open,
    Close,
}

impl Action {
    pub fn verb(self) -> &'static str {
        match self {
            Action::Open => "opens",
            Action::Close => "closes",
        }
    }
}

/// Next scheduled action for a supervised space, precomputed upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingAction {
    pub space_id: SpaceId,
    pub space_name: String,
    pub action: Action,
    pub minutes_remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProximityAlert {
    pub space_id: SpaceId,
    pub space_name: String,
    pub action: Action,
    pub threshold: i64,
    pub minutes_remaining: i64,
    pub message: String,
}
