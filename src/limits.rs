/// First bookable hour of the day.
pub const DAY_START_HOUR: u32 = 6;
/// End of the bookable day (exclusive).
pub const DAY_END_HOUR: u32 = 22;

pub const MAX_MOTIVE_LEN: usize = 500;
pub const MAX_REQUESTER_LEN: usize = 200;

/// Minutes after an action's due time before its alert keys are forgotten.
pub const ALERT_GRACE_MINUTES: i64 = 2;

pub const DEFAULT_TICK_SECS: u64 = 30;
