use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Unix milliseconds — the only time type the engine computes with.
/// `chrono` is used at the edges to turn wall-clock rules into these.
pub type Ms = i64;

pub type UserId = Ulid;
pub type RuleId = Ulid;
pub type BookingId = Ulid;

pub const MINUTE_MS: Ms = 60_000;

/// One recurring weekly window a mentor takes bookings in.
///
/// `start`/`end` are mentor-local wall-clock times; the engine's configured
/// UTC offset decides what instant they land on for a given calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: RuleId,
    pub mentor_id: UserId,
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    /// Accepted and stored, but occupancy is currently binary per occurrence.
    pub max_bookings: u32,
    pub active: bool,
    /// Occurrences strictly before this instant are never offered.
    pub effective_from: Ms,
}

impl AvailabilityRule {
    pub fn session_minutes(&self) -> u32 {
        (self.end - self.start).num_minutes().max(0) as u32
    }
}

/// Mentor-supplied template row. Ids and bookkeeping are assigned on save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub weekday: Weekday,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub max_bookings: u32,
    /// Defaults to save time when absent.
    #[serde(default)]
    pub effective_from: Option<Ms>,
}

/// One concrete, bookable occurrence of a rule. Derived per query, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedSlot {
    pub mentor_id: UserId,
    pub rule_id: RuleId,
    pub weekday: Weekday,
    pub starts_at: Ms,
    pub ends_at: Ms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    Requested,
    Confirmed,
    Declined,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Requested => "requested",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Declined => "declined",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A student's claim on one occurrence slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub student_id: UserId,
    pub mentor_id: UserId,
    pub status: BookingStatus,
    pub requested_at: Ms,
    pub scheduled_at: Ms,
    pub duration_minutes: u32,
    pub topic: Option<String>,
    pub decline_reason: Option<String>,
    pub completed_at: Option<Ms>,
    pub rating: Option<u8>,
}

/// All of one mentor's scheduling state. The engine guards each instance
/// with a single RwLock, which is what makes write-time re-checks atomic.
#[derive(Debug, Clone)]
pub struct MentorState {
    pub id: UserId,
    /// Weekly template, sorted by (weekday, start).
    pub rules: Vec<AvailabilityRule>,
    /// Bookings against this mentor, sorted by `scheduled_at`.
    pub bookings: Vec<Booking>,
}

impl MentorState {
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            rules: Vec::new(),
            bookings: Vec::new(),
        }
    }

    /// Insert a rule maintaining (weekday, start) order.
    pub fn insert_rule(&mut self, rule: AvailabilityRule) {
        let key = (rule.weekday.num_days_from_monday(), rule.start);
        let pos = self
            .rules
            .binary_search_by_key(&key, |r| (r.weekday.num_days_from_monday(), r.start))
            .unwrap_or_else(|e| e);
        self.rules.insert(pos, rule);
    }

    pub fn rule(&self, id: RuleId) -> Option<&AvailabilityRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn rule_mut(&mut self, id: RuleId) -> Option<&mut AvailabilityRule> {
        self.rules.iter_mut().find(|r| r.id == id)
    }

    pub fn remove_rule(&mut self, id: RuleId) -> Option<AvailabilityRule> {
        if let Some(pos) = self.rules.iter().position(|r| r.id == id) {
            Some(self.rules.remove(pos))
        } else {
            None
        }
    }

    /// Insert a booking maintaining `scheduled_at` order.
    pub fn insert_booking(&mut self, booking: Booking) {
        let pos = self
            .bookings
            .binary_search_by_key(&booking.scheduled_at, |b| b.scheduled_at)
            .unwrap_or_else(|e| e);
        self.bookings.insert(pos, booking);
    }

    pub fn booking(&self, id: BookingId) -> Option<&Booking> {
        self.bookings.iter().find(|b| b.id == id)
    }

    pub fn booking_mut(&mut self, id: BookingId) -> Option<&mut Booking> {
        self.bookings.iter_mut().find(|b| b.id == id)
    }
}
