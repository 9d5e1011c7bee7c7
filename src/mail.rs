use async_trait::async_trait;
use tracing::info;

use crate::model::Booking;

#[derive(Debug)]
pub struct MailError(pub String);

impl std::fmt::Display for MailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "mail dispatch failed: {}", self.0)
    }
}

impl std::error::Error for MailError {}

/// Outbound mail collaborator. Called after a transition has committed;
/// errors are logged by the engine and never roll the transition back.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), MailError>;
}

/// Default collaborator: writes the would-be mail to the log.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn booking_confirmed(&self, booking: &Booking) -> Result<(), MailError> {
        info!(
            booking = %booking.id,
            student = %booking.student_id,
            "booking confirmation mail queued"
        );
        Ok(())
    }
}
