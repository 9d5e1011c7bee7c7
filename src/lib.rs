//! In-process availability and booking core for a mentorship platform.
//!
//! A mentor saves a recurring weekly template; [`engine::resolve_slots`]
//! expands it on demand into concrete, collision-free, future-only slots,
//! and [`engine::Engine`] drives each booking through its lifecycle
//! (requested, confirmed or declined, completed or cancelled) while
//! enforcing at most one confirmed booking per slot.

pub mod auth;
pub mod config;
pub mod engine;
pub mod limits;
pub mod mail;
pub mod model;
pub mod notify;
pub mod observability;
pub mod reaper;

pub use auth::{Caller, Role};
pub use config::EngineConfig;
pub use engine::{Engine, EngineError, resolve_slots};
pub use model::{AvailabilityRule, Booking, BookingStatus, ResolvedSlot, RuleSpec};
pub use notify::{Notification, NotificationHub, NotificationKind};
