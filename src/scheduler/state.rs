use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

/// Everything the scheduler remembers between ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchState {
    /// Local date of the last report that was delivered
    pub last_sent: Option<NaiveDate>,
    /// Local date the `attempts` counter belongs to
    pub attempt_date: Option<NaiveDate>,
    pub attempts: u32,
}

impl DispatchState {
    pub fn attempts_on(&self, date: NaiveDate) -> u32 {
        if self.attempt_date == Some(date) {
            self.attempts
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickDecision {
    Dispatch { date: NaiveDate, attempt: u32 },
    TooEarly,
    AlreadySent,
    AttemptsExhausted,
}

/// Once-a-day dispatch decision, free of clocks and I/O
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyGate {
    send_at: NaiveTime,
    timezone: Tz,
    max_attempts: u32,
}

impl DailyGate {
    pub fn new(send_at: NaiveTime, timezone: Tz, max_attempts: u32) -> Self {
        Self {
            send_at,
            timezone,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn send_at(&self) -> NaiveTime {
        self.send_at
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone).date_naive()
    }

    /// Decide what this tick does. A dispatch counts as an attempt immediately,
    /// so the returned state must be stored before the report runs.
    pub fn evaluate(&self, state: DispatchState, now: DateTime<Utc>) -> (TickDecision, DispatchState) {
        let local = now.with_timezone(&self.timezone);
        let today = local.date_naive();

        if state.last_sent == Some(today) {
            return (TickDecision::AlreadySent, state);
        }
        if local.time() < self.send_at {
            return (TickDecision::TooEarly, state);
        }

        let attempts = state.attempts_on(today);
        if attempts >= self.max_attempts {
            return (TickDecision::AttemptsExhausted, state);
        }

        let attempt = attempts + 1;
        let next = DispatchState {
            attempt_date: Some(today),
            attempts: attempt,
            ..state
        };
        (TickDecision::Dispatch { date: today, attempt }, next)
    }

    pub fn record_sent(&self, state: DispatchState, date: NaiveDate) -> DispatchState {
        DispatchState {
            last_sent: Some(date),
            ..state
        }
    }
}
