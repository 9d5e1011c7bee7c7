use std::collections::HashSet;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, TimeZone};

use crate::model::*;

// ── Slot Expansion ────────────────────────────────────────────────

/// Expand a weekly template into concrete bookable occurrences.
///
/// Pure: `(rules, bookings, window, tz, now)` in, chronologically ordered
/// slots out. The window bounds are interpreted date-granularly: every
/// calendar date they touch under `tz` is expanded, both ends inclusive.
/// An occurrence is dropped when it lies in the past, precedes its rule's
/// `effective_from`, or collides with a confirmed booking at the exact
/// same instant. Only `Confirmed` bookings block; requested, declined and
/// cancelled ones leave the slot on offer.
pub fn resolve_slots(
    rules: &[AvailabilityRule],
    bookings: &[Booking],
    window_start: Ms,
    window_end: Ms,
    tz: FixedOffset,
    now: Ms,
) -> Vec<ResolvedSlot> {
    if window_end < window_start {
        return Vec::new();
    }
    let (Some(first), Some(last)) = (local_date(window_start, tz), local_date(window_end, tz))
    else {
        return Vec::new();
    };

    let taken: HashSet<Ms> = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Confirmed)
        .map(|b| b.scheduled_at)
        .collect();

    let mut slots = Vec::new();
    for date in first.iter_days().take_while(|d| *d <= last) {
        let weekday = date.weekday();
        for rule in rules {
            if !rule.active || rule.weekday != weekday {
                continue;
            }
            let Some(starts_at) = local_timestamp(date, rule.start, tz) else {
                continue;
            };
            if starts_at < now || starts_at < rule.effective_from {
                continue;
            }
            if taken.contains(&starts_at) {
                continue;
            }
            let Some(ends_at) = local_timestamp(date, rule.end, tz) else {
                continue;
            };
            slots.push(ResolvedSlot {
                mentor_id: rule.mentor_id,
                rule_id: rule.id,
                weekday,
                starts_at,
                ends_at,
            });
        }
    }
    slots.sort_by_key(|s| s.starts_at);
    slots
}

/// The rule a concrete occurrence was expanded from, if the template
/// still carries one matching its weekday and start time.
pub(super) fn rule_for_occurrence(
    rules: &[AvailabilityRule],
    starts_at: Ms,
    tz: FixedOffset,
) -> Option<&AvailabilityRule> {
    let local = DateTime::from_timestamp_millis(starts_at)?.with_timezone(&tz);
    let (weekday, time) = (local.weekday(), local.time());
    rules
        .iter()
        .find(|r| r.active && r.weekday == weekday && r.start == time)
}

fn local_date(t: Ms, tz: FixedOffset) -> Option<NaiveDate> {
    Some(DateTime::from_timestamp_millis(t)?.with_timezone(&tz).date_naive())
}

fn local_timestamp(date: NaiveDate, time: NaiveTime, tz: FixedOffset) -> Option<Ms> {
    // Always unambiguous under a fixed offset.
    tz.from_local_datetime(&date.and_time(time))
        .single()
        .map(|dt| dt.timestamp_millis())
}
