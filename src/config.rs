use std::time::Duration;

use chrono::FixedOffset;

/// Engine tuning, read once at startup. All knobs have `TANDEM_*`
/// environment overrides.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Offset of mentor-local wall-clock time from UTC, in minutes.
    /// Rule times ("09:00 on Mondays") are interpreted under this offset;
    /// a fixed offset keeps occurrence construction total (no DST gaps).
    pub tz_offset_minutes: i32,
    /// Session length assumed when a request no longer matches any rule.
    pub default_session_minutes: u32,
    /// How often the reaper sweeps for overdue pending requests.
    pub sweep_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tz_offset_minutes: 0,
            default_session_minutes: 60,
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let tz_offset_minutes: i32 = std::env::var("TANDEM_TZ_OFFSET_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.tz_offset_minutes);
        let default_session_minutes: u32 = std::env::var("TANDEM_DEFAULT_SESSION_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.default_session_minutes);
        let sweep_secs: u64 = std::env::var("TANDEM_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.sweep_interval.as_secs());
        Self {
            tz_offset_minutes,
            default_session_minutes,
            sweep_interval: Duration::from_secs(sweep_secs),
        }
    }

    /// The configured offset as a chrono timezone. Out-of-range values are
    /// clamped to the real-world band so construction cannot fail.
    pub fn tz(&self) -> FixedOffset {
        let clamped = self.tz_offset_minutes.clamp(-14 * 60, 14 * 60);
        FixedOffset::east_opt(clamped * 60).expect("clamped offset within ±14h")
    }
}
