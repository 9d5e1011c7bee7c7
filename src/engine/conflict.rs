use crate::limits::*;
use crate::model::*;

use super::EngineError;

pub(crate) fn now_ms() -> Ms {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis() as Ms
}

pub(crate) fn validate_timestamp(t: Ms) -> Result<(), EngineError> {
    if !(MIN_VALID_TIMESTAMP_MS..=MAX_VALID_TIMESTAMP_MS).contains(&t) {
        return Err(EngineError::LimitExceeded("timestamp out of range"));
    }
    Ok(())
}

pub(crate) fn validate_rule_spec(spec: &RuleSpec) -> Result<(), EngineError> {
    if spec.start >= spec.end {
        return Err(EngineError::Validation("rule start must be before its end"));
    }
    if spec.max_bookings < 1 {
        return Err(EngineError::Validation("max_bookings must be at least 1"));
    }
    if let Some(t) = spec.effective_from {
        validate_timestamp(t)?;
    }
    Ok(())
}

/// The booking currently holding a confirmed claim on `(mentor, instant)`.
///
/// Occupancy is binary per occurrence: one confirmed booking takes the slot
/// no matter what the rule's `max_bookings` says.
/// TODO: count confirmed claims against `max_bookings` once parallel
/// sessions at the same instant are supported.
pub(crate) fn confirmed_at(state: &MentorState, scheduled_at: Ms) -> Option<BookingId> {
    state
        .bookings
        .iter()
        .find(|b| b.scheduled_at == scheduled_at && b.status == BookingStatus::Confirmed)
        .map(|b| b.id)
}

/// Write-time re-check: the slot list a student acted on may be stale.
pub(crate) fn check_slot_free(state: &MentorState, scheduled_at: Ms) -> Result<(), EngineError> {
    match confirmed_at(state, scheduled_at) {
        Some(holder) => Err(EngineError::Conflict(holder)),
        None => Ok(()),
    }
}
