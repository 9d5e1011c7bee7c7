//! Hard caps guarding the engine against unbounded input.

use crate::model::Ms;

pub const MAX_RULES_PER_MENTOR: usize = 64;

pub const MAX_TOPIC_LEN: usize = 200;

pub const MAX_REASON_LEN: usize = 500;

/// Widest slot query window: just over eight weeks.
pub const MAX_QUERY_WINDOW_MS: Ms = 62 * 24 * 3_600_000;

/// Per-user inbox cap; oldest notifications are dropped past this.
pub const MAX_INBOX_NOTIFICATIONS: usize = 500;

pub const MIN_VALID_TIMESTAMP_MS: Ms = 0;

/// 2100-01-01T00:00:00Z.
pub const MAX_VALID_TIMESTAMP_MS: Ms = 4_102_444_800_000;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
