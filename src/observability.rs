use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: slot resolution queries served.
pub const SLOT_QUERIES_TOTAL: &str = "tandem_slot_queries_total";

/// Histogram: slot resolution latency in seconds.
pub const SLOT_QUERY_DURATION_SECONDS: &str = "tandem_slot_query_duration_seconds";

pub const BOOKINGS_REQUESTED_TOTAL: &str = "tandem_bookings_requested_total";
pub const BOOKINGS_CONFIRMED_TOTAL: &str = "tandem_bookings_confirmed_total";
pub const BOOKINGS_DECLINED_TOTAL: &str = "tandem_bookings_declined_total";
pub const BOOKINGS_CANCELLED_TOTAL: &str = "tandem_bookings_cancelled_total";
pub const BOOKINGS_COMPLETED_TOTAL: &str = "tandem_bookings_completed_total";

/// Counter: write-time collision re-checks that rejected a mutation.
pub const BOOKING_CONFLICTS_TOTAL: &str = "tandem_booking_conflicts_total";

/// Counter: pending requests auto-declined after their slot time passed.
pub const REQUESTS_EXPIRED_TOTAL: &str = "tandem_requests_expired_total";

pub const TEMPLATES_SAVED_TOTAL: &str = "tandem_templates_saved_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: mentors with live scheduling state.
pub const MENTORS_ACTIVE: &str = "tandem_mentors_active";

/// Counter: notifications dropped to keep an inbox under its cap.
pub const NOTIFICATIONS_DROPPED_TOTAL: &str = "tandem_notifications_dropped_total";

/// Counter: confirmation mails the collaborator failed to take.
pub const MAIL_FAILURES_TOTAL: &str = "tandem_mail_failures_total";

/// Install the fmt tracing subscriber and, when a port is given, the
/// Prometheus metrics exporter. Call once from the host process.
pub fn init(metrics_port: Option<u16>) {
    tracing_subscriber::fmt::init();
    let Some(port) = metrics_port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus metrics exporter");
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
