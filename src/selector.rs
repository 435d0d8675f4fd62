//! Drag-to-select over the weekly (space, weekday, hour) grid.
//!
//! Idle ─down on free cell─▶ Dragging ─up─▶ (draft emitted) ─▶ Idle
//!                              └─cancel─▶ (nothing emitted) ─▶ Idle
//!
//! Only the starting cell is checked against the timeline. The final range is
//! re-validated on submission, since occupancy may change mid-drag.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::engine::is_free;
use crate::limits::{DAY_END_HOUR, DAY_START_HOUR};
use crate::model::*;

/// Nearest date on or after `reference` falling on `weekday`. A day earlier in
/// the week than `reference` rolls over to next week.
pub fn next_occurrence_of(weekday: Weekday, reference: NaiveDate) -> NaiveDate {
    let target = weekday.to_chrono().num_days_from_monday();
    let current = reference.weekday().num_days_from_monday();
    let ahead = (target + 7 - current) % 7;
    reference + Days::new(u64::from(ahead))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    Idle,
    Dragging { start: Cell, current_hour: u32 },
}

#[derive(Debug)]
pub struct RangeSelector {
    state: SelectorState,
}

impl Default for RangeSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl RangeSelector {
    pub fn new() -> Self {
        Self {
            state: SelectorState::Idle,
        }
    }

    pub fn state(&self) -> SelectorState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, SelectorState::Dragging { .. })
    }

    /// Start a drag on `cell` if that hour is free in `timeline`.
    /// Returns whether the drag started. Ignored while another drag is in flight.
    pub fn pointer_down(&mut self, cell: Cell, timeline: &[OccupancyEntry]) -> bool {
        if self.is_dragging() || !in_day(cell.hour) {
            return false;
        }
        let hour = Span::hours(cell.hour, cell.hour + 1);
        let own: Vec<OccupancyEntry> = timeline
            .iter()
            .filter(|e| e.space_id == cell.space_id)
            .cloned()
            .collect();
        if !is_free(&own, &hour) {
            debug!(
                "drag rejected: {:?} {} is occupied for space {}",
                cell.weekday,
                hour_label(cell.hour),
                cell.space_id
            );
            return false;
        }
        self.state = SelectorState::Dragging {
            start: cell,
            current_hour: cell.hour,
        };
        true
    }

    /// Extend the live range. Moves onto another space or weekday are ignored
    /// without aborting the drag.
    pub fn pointer_move(&mut self, cell: Cell) -> Option<SelectionRange> {
        let SelectorState::Dragging { start, .. } = self.state else {
            return None;
        };
        if cell.space_id != start.space_id || cell.weekday != start.weekday || !in_day(cell.hour) {
            return self.selection();
        }
        self.state = SelectorState::Dragging {
            start,
            current_hour: cell.hour,
        };
        self.selection()
    }

    /// Live range: `[min(start, current), max(start, current) + 1)`.
    pub fn selection(&self) -> Option<SelectionRange> {
        match self.state {
            SelectorState::Idle => None,
            SelectorState::Dragging {
                start,
                current_hour,
            } => Some(SelectionRange {
                space_id: start.space_id,
                weekday: start.weekday,
                start_hour: start.hour.min(current_hour),
                end_hour: start.hour.max(current_hour) + 1,
            }),
        }
    }

    /// Finish the drag and emit a draft dated to the next occurrence of the
    /// selected weekday that has not started yet. `None` when no drag was in
    /// flight.
    pub fn pointer_up(&mut self, now: NaiveDateTime) -> Option<ReservationDraft> {
        let range = self.selection()?;
        self.state = SelectorState::Idle;
        let today = now.date();
        let mut date = next_occurrence_of(range.weekday, today);
        if date == today && range.span().start < minute_of_day(now.time()) {
            date = date + Days::new(7);
        }
        Some(ReservationDraft {
            space_id: range.space_id,
            date,
            start: hour_label(range.start_hour),
            end: hour_label(range.end_hour),
        })
    }

    /// Pointer left the grid or the view was reset. Nothing is emitted.
    pub fn cancel(&mut self) {
        self.state = SelectorState::Idle;
    }
}

fn in_day(hour: u32) -> bool {
    (DAY_START_HOUR..DAY_END_HOUR).contains(&hour)
}
