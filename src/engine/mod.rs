mod conflict;
mod error;
mod mutations;
mod queries;
mod slots;

pub use error::EngineError;
pub use slots::resolve_slots;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::config::EngineConfig;
use crate::mail::{LogMailer, Mailer};
use crate::model::*;
use crate::notify::NotificationHub;
use crate::observability;

pub type SharedMentorState = Arc<RwLock<MentorState>>;

/// The availability/booking core. One instance per process; hosts call its
/// methods in-process from their request handlers.
pub struct Engine {
    mentors: DashMap<UserId, SharedMentorState>,
    /// Reverse lookup: booking id → mentor id.
    booking_to_mentor: DashMap<BookingId, UserId>,
    /// Reverse lookup: rule id → mentor id.
    rule_to_mentor: DashMap<RuleId, UserId>,
    pub notify: Arc<NotificationHub>,
    pub config: EngineConfig,
    mailer: Arc<dyn Mailer>,
}

impl Engine {
    pub fn new(config: EngineConfig, notify: Arc<NotificationHub>) -> Self {
        Self::with_mailer(config, notify, Arc::new(LogMailer))
    }

    pub fn with_mailer(
        config: EngineConfig,
        notify: Arc<NotificationHub>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            mentors: DashMap::new(),
            booking_to_mentor: DashMap::new(),
            rule_to_mentor: DashMap::new(),
            notify,
            config,
            mailer,
        }
    }

    pub fn mentor_state(&self, id: &UserId) -> Option<SharedMentorState> {
        self.mentors.get(id).map(|e| e.value().clone())
    }

    pub fn mentor_for_booking(&self, booking_id: &BookingId) -> Option<UserId> {
        self.booking_to_mentor.get(booking_id).map(|e| *e.value())
    }

    /// Lazily create a mentor's scheduling state on first template save.
    pub(super) fn mentor_state_or_create(&self, id: UserId) -> SharedMentorState {
        if let Some(rs) = self.mentors.get(&id) {
            return rs.value().clone();
        }
        let created: SharedMentorState = Arc::new(RwLock::new(MentorState::new(id)));
        let state = self.mentors.entry(id).or_insert(created).value().clone();
        metrics::gauge!(observability::MENTORS_ACTIVE).set(self.mentors.len() as f64);
        state
    }

    /// Lookup booking → mentor, acquire the mentor's write lock.
    pub(super) async fn resolve_booking_write(
        &self,
        booking_id: &BookingId,
    ) -> Result<(UserId, tokio::sync::OwnedRwLockWriteGuard<MentorState>), EngineError> {
        let mentor_id = self
            .mentor_for_booking(booking_id)
            .ok_or(EngineError::NotFound(*booking_id))?;
        let rs = self
            .mentor_state(&mentor_id)
            .ok_or(EngineError::NotFound(mentor_id))?;
        Ok((mentor_id, rs.write_owned().await))
    }

    pub(super) fn map_booking(&self, booking_id: BookingId, mentor_id: UserId) {
        self.booking_to_mentor.insert(booking_id, mentor_id);
    }

    pub(super) fn map_rule(&self, rule_id: RuleId, mentor_id: UserId) {
        self.rule_to_mentor.insert(rule_id, mentor_id);
    }

    pub(super) fn unmap_rule(&self, rule_id: &RuleId) {
        self.rule_to_mentor.remove(rule_id);
    }

    pub(super) fn mentor_for_rule(&self, rule_id: &RuleId) -> Option<UserId> {
        self.rule_to_mentor.get(rule_id).map(|e| *e.value())
    }

    pub(super) fn mentor_states(&self) -> Vec<SharedMentorState> {
        self.mentors.iter().map(|e| e.value().clone()).collect()
    }

    /// Mentor-local rendering of an instant, for notification copy.
    pub(super) fn fmt_local(&self, t: Ms) -> String {
        chrono::DateTime::from_timestamp_millis(t)
            .map(|dt| {
                dt.with_timezone(&self.config.tz())
                    .format("%Y-%m-%d %H:%M")
                    .to_string()
            })
            .unwrap_or_else(|| t.to_string())
    }
}
