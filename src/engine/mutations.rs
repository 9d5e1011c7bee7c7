use tracing::warn;
use ulid::Ulid;

use crate::auth::{Caller, Role};
use crate::limits::*;
use crate::model::*;
use crate::notify::NotificationKind;
use crate::observability;

use super::conflict::{check_slot_free, confirmed_at, now_ms, validate_rule_spec, validate_timestamp};
use super::slots::rule_for_occurrence;
use super::{Engine, EngineError};

impl Engine {
    // ── Availability template ────────────────────────────────

    /// Replace the caller's whole weekly template. Any rule absent from the
    /// new set stops generating occurrences immediately; bookings already
    /// confirmed against old occurrences are untouched.
    pub async fn set_availability(
        &self,
        caller: &Caller,
        specs: Vec<RuleSpec>,
    ) -> Result<Vec<RuleId>, EngineError> {
        caller.require_role(Role::Mentor, "save availability")?;
        if specs.len() > MAX_RULES_PER_MENTOR {
            return Err(EngineError::LimitExceeded("too many rules in template"));
        }
        for spec in &specs {
            validate_rule_spec(spec)?;
        }

        let now = now_ms();
        let rs = self.mentor_state_or_create(caller.user_id);
        let mut guard = rs.write().await;

        for old in guard.rules.drain(..) {
            self.unmap_rule(&old.id);
        }
        let mut ids = Vec::with_capacity(specs.len());
        for spec in specs {
            let rule = AvailabilityRule {
                id: Ulid::new(),
                mentor_id: caller.user_id,
                weekday: spec.weekday,
                start: spec.start,
                end: spec.end,
                max_bookings: spec.max_bookings,
                active: true,
                effective_from: spec.effective_from.unwrap_or(now),
            };
            self.map_rule(rule.id, caller.user_id);
            ids.push(rule.id);
            guard.insert_rule(rule);
        }

        metrics::counter!(observability::TEMPLATES_SAVED_TOTAL).increment(1);
        Ok(ids)
    }

    /// Flip a single rule on or off. Returns the new `active` state.
    pub async fn toggle_rule(&self, caller: &Caller, rule_id: RuleId) -> Result<bool, EngineError> {
        let mentor_id = self
            .mentor_for_rule(&rule_id)
            .ok_or(EngineError::NotFound(rule_id))?;
        caller.require_owner(mentor_id, "toggle availability rule")?;

        let rs = self
            .mentor_state(&mentor_id)
            .ok_or(EngineError::NotFound(mentor_id))?;
        let mut guard = rs.write().await;
        let rule = guard.rule_mut(rule_id).ok_or(EngineError::NotFound(rule_id))?;
        rule.active = !rule.active;
        Ok(rule.active)
    }

    pub async fn delete_rule(&self, caller: &Caller, rule_id: RuleId) -> Result<(), EngineError> {
        let mentor_id = self
            .mentor_for_rule(&rule_id)
            .ok_or(EngineError::NotFound(rule_id))?;
        caller.require_owner(mentor_id, "delete availability rule")?;

        let rs = self
            .mentor_state(&mentor_id)
            .ok_or(EngineError::NotFound(mentor_id))?;
        let mut guard = rs.write().await;
        guard.remove_rule(rule_id).ok_or(EngineError::NotFound(rule_id))?;
        self.unmap_rule(&rule_id);
        Ok(())
    }

    // ── Booking lifecycle ────────────────────────────────────

    /// Claim a resolved occurrence. The slot list the student acted on may
    /// be stale, so the confirmed-collision check is re-run here under the
    /// mentor's write lock.
    pub async fn request_booking(
        &self,
        caller: &Caller,
        mentor_id: UserId,
        starts_at: Ms,
        topic: Option<String>,
    ) -> Result<BookingId, EngineError> {
        caller.require_role(Role::Student, "request a booking")?;
        validate_timestamp(starts_at)?;
        if let Some(t) = &topic
            && t.len() > MAX_TOPIC_LEN
        {
            return Err(EngineError::LimitExceeded("topic too long"));
        }
        let now = now_ms();
        if starts_at < now {
            return Err(EngineError::Validation("cannot book a slot in the past"));
        }

        let rs = self
            .mentor_state(&mentor_id)
            .ok_or(EngineError::NotFound(mentor_id))?;
        let mut guard = rs.write().await;

        if let Err(e) = check_slot_free(&guard, starts_at) {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(e);
        }

        // Template may have changed since the student resolved slots; fall
        // back to the default session length rather than rejecting.
        let duration_minutes = rule_for_occurrence(&guard.rules, starts_at, self.config.tz())
            .map(|r| r.session_minutes())
            .unwrap_or(self.config.default_session_minutes);

        let booking = Booking {
            id: Ulid::new(),
            student_id: caller.user_id,
            mentor_id,
            status: BookingStatus::Requested,
            requested_at: now,
            scheduled_at: starts_at,
            duration_minutes,
            topic: topic.clone(),
            decline_reason: None,
            completed_at: None,
            rating: None,
        };
        let booking_id = booking.id;
        self.map_booking(booking_id, mentor_id);
        guard.insert_booking(booking);
        drop(guard);

        metrics::counter!(observability::BOOKINGS_REQUESTED_TOTAL).increment(1);
        let when = self.fmt_local(starts_at);
        let message = match topic {
            Some(t) => format!("A student requested a session on {when} about {t}"),
            None => format!("A student requested a session on {when}"),
        };
        self.notify.push(
            mentor_id,
            NotificationKind::BookingRequested,
            "New booking request",
            message,
            Some(booking_id),
        );
        Ok(booking_id)
    }

    /// Mentor accepts a pending request. Two requests can both sit in
    /// `Requested` for the same instant; only the first confirm wins.
    pub async fn confirm_booking(
        &self,
        caller: &Caller,
        booking_id: BookingId,
    ) -> Result<(), EngineError> {
        let (mentor_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        caller.require_user(mentor_id, "confirm this booking")?;

        let (status, scheduled_at, student_id) = {
            let b = guard.booking(booking_id).ok_or(EngineError::NotFound(booking_id))?;
            (b.status, b.scheduled_at, b.student_id)
        };
        if status != BookingStatus::Requested {
            return Err(EngineError::InvalidState {
                status,
                action: "confirm",
            });
        }
        if let Some(holder) = confirmed_at(&guard, scheduled_at)
            && holder != booking_id
        {
            metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
            return Err(EngineError::Conflict(holder));
        }

        let snapshot = {
            let b = guard.booking_mut(booking_id).ok_or(EngineError::NotFound(booking_id))?;
            b.status = BookingStatus::Confirmed;
            b.clone()
        };
        drop(guard);

        metrics::counter!(observability::BOOKINGS_CONFIRMED_TOTAL).increment(1);
        let when = self.fmt_local(scheduled_at);
        self.notify.push(
            student_id,
            NotificationKind::BookingConfirmed,
            "Booking confirmed",
            format!("Your session on {when} is confirmed"),
            Some(booking_id),
        );
        if let Err(e) = self.mailer.booking_confirmed(&snapshot).await {
            metrics::counter!(observability::MAIL_FAILURES_TOTAL).increment(1);
            warn!("confirmation mail failed for {booking_id}: {e}");
        }
        Ok(())
    }

    pub async fn decline_booking(
        &self,
        caller: &Caller,
        booking_id: BookingId,
        reason: Option<String>,
    ) -> Result<(), EngineError> {
        if let Some(r) = &reason
            && r.len() > MAX_REASON_LEN
        {
            return Err(EngineError::LimitExceeded("decline reason too long"));
        }
        let (mentor_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        caller.require_user(mentor_id, "decline this booking")?;

        let b = guard.booking_mut(booking_id).ok_or(EngineError::NotFound(booking_id))?;
        if b.status != BookingStatus::Requested {
            return Err(EngineError::InvalidState {
                status: b.status,
                action: "decline",
            });
        }
        b.status = BookingStatus::Declined;
        b.decline_reason = reason.clone();
        let (student_id, scheduled_at) = (b.student_id, b.scheduled_at);
        drop(guard);

        metrics::counter!(observability::BOOKINGS_DECLINED_TOTAL).increment(1);
        let when = self.fmt_local(scheduled_at);
        let message = match reason {
            Some(r) => format!("Your request for {when} was declined: {r}"),
            None => format!("Your request for {when} was declined"),
        };
        self.notify.push(
            student_id,
            NotificationKind::BookingDeclined,
            "Booking declined",
            message,
            Some(booking_id),
        );
        Ok(())
    }

    /// Mark a session as having happened. Idempotent: completing a booking
    /// that is already `Completed` is a no-op.
    pub async fn complete_booking(
        &self,
        caller: &Caller,
        booking_id: BookingId,
    ) -> Result<(), EngineError> {
        let (mentor_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let now = now_ms();

        let b = guard.booking_mut(booking_id).ok_or(EngineError::NotFound(booking_id))?;
        if caller.user_id != b.student_id && caller.user_id != mentor_id && !caller.is_admin() {
            return Err(EngineError::Authorization("complete this booking"));
        }
        match b.status {
            BookingStatus::Completed => return Ok(()),
            BookingStatus::Confirmed => {}
            status => {
                return Err(EngineError::InvalidState {
                    status,
                    action: "complete",
                });
            }
        }
        if b.scheduled_at >= now {
            return Err(EngineError::Validation(
                "cannot complete a session before its scheduled time",
            ));
        }
        b.status = BookingStatus::Completed;
        b.completed_at = Some(now);
        let (student_id, scheduled_at) = (b.student_id, b.scheduled_at);
        drop(guard);

        metrics::counter!(observability::BOOKINGS_COMPLETED_TOTAL).increment(1);
        let when = self.fmt_local(scheduled_at);
        self.notify.push(
            student_id,
            NotificationKind::SessionCompleted,
            "Session completed",
            format!("Your session on {when} is complete. Leave a rating when you get a chance"),
            Some(booking_id),
        );
        Ok(())
    }

    /// Either party backs out of a confirmed session before it starts.
    /// The occurrence goes back on offer: the collision filter only counts
    /// confirmed bookings.
    pub async fn cancel_booking(
        &self,
        caller: &Caller,
        booking_id: BookingId,
    ) -> Result<(), EngineError> {
        let (mentor_id, mut guard) = self.resolve_booking_write(&booking_id).await?;
        let now = now_ms();

        let b = guard.booking_mut(booking_id).ok_or(EngineError::NotFound(booking_id))?;
        if caller.user_id != b.student_id && caller.user_id != mentor_id {
            return Err(EngineError::Authorization("cancel this booking"));
        }
        if b.status != BookingStatus::Confirmed {
            return Err(EngineError::InvalidState {
                status: b.status,
                action: "cancel",
            });
        }
        if b.scheduled_at <= now {
            return Err(EngineError::Validation(
                "cannot cancel a session that has already started",
            ));
        }
        b.status = BookingStatus::Cancelled;
        let (student_id, scheduled_at) = (b.student_id, b.scheduled_at);
        drop(guard);

        metrics::counter!(observability::BOOKINGS_CANCELLED_TOTAL).increment(1);
        let counterparty = if caller.user_id == student_id {
            mentor_id
        } else {
            student_id
        };
        let when = self.fmt_local(scheduled_at);
        self.notify.push(
            counterparty,
            NotificationKind::BookingCancelled,
            "Booking cancelled",
            format!("The session on {when} was cancelled"),
            Some(booking_id),
        );
        Ok(())
    }

    /// Student rates a completed session, once.
    pub async fn rate_booking(
        &self,
        caller: &Caller,
        booking_id: BookingId,
        rating: u8,
    ) -> Result<(), EngineError> {
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(EngineError::Validation("rating must be between 1 and 5"));
        }
        let (_mentor_id, mut guard) = self.resolve_booking_write(&booking_id).await?;

        let b = guard.booking_mut(booking_id).ok_or(EngineError::NotFound(booking_id))?;
        caller.require_user(b.student_id, "rate this booking")?;
        if b.status != BookingStatus::Completed {
            return Err(EngineError::InvalidState {
                status: b.status,
                action: "rate",
            });
        }
        if b.rating.is_some() {
            return Err(EngineError::InvalidState {
                status: b.status,
                action: "rate again",
            });
        }
        b.rating = Some(rating);
        Ok(())
    }

    // ── Maintenance ──────────────────────────────────────────

    /// Pending requests whose slot time has passed; the reaper feeds these
    /// to [`Engine::expire_request`].
    pub fn collect_overdue_requests(&self, now: Ms) -> Vec<BookingId> {
        let mut overdue = Vec::new();
        for rs in self.mentor_states() {
            if let Ok(guard) = rs.try_read() {
                for b in &guard.bookings {
                    if b.status == BookingStatus::Requested && b.scheduled_at <= now {
                        overdue.push(b.id);
                    }
                }
            }
        }
        overdue
    }

    /// Auto-decline a request the mentor never answered. Callers decide
    /// overdue-ness; this only guards the state transition.
    pub async fn expire_request(&self, booking_id: BookingId) -> Result<(), EngineError> {
        let (_mentor_id, mut guard) = self.resolve_booking_write(&booking_id).await?;

        let b = guard.booking_mut(booking_id).ok_or(EngineError::NotFound(booking_id))?;
        if b.status != BookingStatus::Requested {
            return Err(EngineError::InvalidState {
                status: b.status,
                action: "expire",
            });
        }
        b.status = BookingStatus::Declined;
        b.decline_reason = Some("scheduled time passed before the mentor responded".into());
        let (student_id, scheduled_at) = (b.student_id, b.scheduled_at);
        drop(guard);

        metrics::counter!(observability::REQUESTS_EXPIRED_TOTAL).increment(1);
        let when = self.fmt_local(scheduled_at);
        self.notify.push(
            student_id,
            NotificationKind::BookingDeclined,
            "Booking declined",
            format!("Your request for {when} expired before the mentor responded"),
            Some(booking_id),
        );
        Ok(())
    }
}
