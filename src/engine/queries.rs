use crate::auth::{Caller, Role};
use crate::limits::*;
use crate::model::*;
use crate::observability;

use super::conflict::now_ms;
use super::slots::resolve_slots;
use super::{Engine, EngineError};

impl Engine {
    /// A mentor's currently active weekly template, as students see it.
    /// Unknown mentors have no availability rather than being an error.
    pub async fn get_availability(&self, mentor_id: UserId) -> Vec<AvailabilityRule> {
        let Some(rs) = self.mentor_state(&mentor_id) else {
            return Vec::new();
        };
        let guard = rs.read().await;
        guard.rules.iter().filter(|r| r.active).cloned().collect()
    }

    /// The caller's own full template, inactive rules included.
    pub async fn list_rules(&self, caller: &Caller) -> Result<Vec<AvailabilityRule>, EngineError> {
        caller.require_role(Role::Mentor, "list own availability")?;
        let Some(rs) = self.mentor_state(&caller.user_id) else {
            return Ok(Vec::new());
        };
        let guard = rs.read().await;
        Ok(guard.rules.clone())
    }

    /// Expand a mentor's template into bookable occurrences for a window.
    /// Read-only; recomputed per call against a consistent snapshot.
    pub async fn available_slots(
        &self,
        mentor_id: UserId,
        window_start: Ms,
        window_end: Ms,
    ) -> Result<Vec<ResolvedSlot>, EngineError> {
        if window_end.saturating_sub(window_start) > MAX_QUERY_WINDOW_MS {
            return Err(EngineError::LimitExceeded("query window too wide"));
        }
        let Some(rs) = self.mentor_state(&mentor_id) else {
            return Ok(Vec::new());
        };
        let guard = rs.read().await;

        let started = std::time::Instant::now();
        let slots = resolve_slots(
            &guard.rules,
            &guard.bookings,
            window_start,
            window_end,
            self.config.tz(),
            now_ms(),
        );
        metrics::counter!(observability::SLOT_QUERIES_TOTAL).increment(1);
        metrics::histogram!(observability::SLOT_QUERY_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        Ok(slots)
    }

    /// Visible to the two parties and admins only.
    pub async fn get_booking(
        &self,
        caller: &Caller,
        booking_id: BookingId,
    ) -> Result<Booking, EngineError> {
        let mentor_id = self
            .mentor_for_booking(&booking_id)
            .ok_or(EngineError::NotFound(booking_id))?;
        let rs = self
            .mentor_state(&mentor_id)
            .ok_or(EngineError::NotFound(mentor_id))?;
        let guard = rs.read().await;
        let b = guard.booking(booking_id).ok_or(EngineError::NotFound(booking_id))?;
        if caller.user_id != b.student_id && caller.user_id != b.mentor_id && !caller.is_admin() {
            return Err(EngineError::Authorization("view this booking"));
        }
        Ok(b.clone())
    }

    /// All bookings against the calling mentor, soonest first.
    pub async fn bookings_for_mentor(&self, caller: &Caller) -> Result<Vec<Booking>, EngineError> {
        caller.require_role(Role::Mentor, "list mentor bookings")?;
        let Some(rs) = self.mentor_state(&caller.user_id) else {
            return Ok(Vec::new());
        };
        let guard = rs.read().await;
        Ok(guard.bookings.clone())
    }

    /// Pending requests awaiting the calling mentor's answer.
    pub async fn pending_requests(&self, caller: &Caller) -> Result<Vec<Booking>, EngineError> {
        caller.require_role(Role::Mentor, "list pending requests")?;
        let Some(rs) = self.mentor_state(&caller.user_id) else {
            return Ok(Vec::new());
        };
        let guard = rs.read().await;
        Ok(guard
            .bookings
            .iter()
            .filter(|b| b.status == BookingStatus::Requested)
            .cloned()
            .collect())
    }

    /// The calling student's bookings across every mentor, soonest first.
    pub async fn bookings_for_student(&self, caller: &Caller) -> Vec<Booking> {
        let mut out = Vec::new();
        for rs in self.mentor_states() {
            let guard = rs.read().await;
            out.extend(
                guard
                    .bookings
                    .iter()
                    .filter(|b| b.student_id == caller.user_id)
                    .cloned(),
            );
        }
        out.sort_by_key(|b| b.scheduled_at);
        out
    }
}
