use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: bookings created.
pub const BOOKINGS_CREATED_TOTAL: &str = "roomkit_bookings_created_total";

/// Counter: bookings cancelled (idempotent repeats not counted).
pub const BOOKINGS_CANCELLED_TOTAL: &str = "roomkit_bookings_cancelled_total";

/// Counter: create/update attempts rejected with a conflict.
pub const BOOKING_CONFLICTS_TOTAL: &str = "roomkit_booking_conflicts_total";

/// Counter: invitations created or refreshed.
pub const INVITATIONS_SENT_TOTAL: &str = "roomkit_invitations_sent_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Counter: room-lock acquisitions that exceeded the policy wait.
pub const LOCK_TIMEOUTS_TOTAL: &str = "roomkit_lock_timeouts_total";

/// Counter: notification deliveries that failed (logged, never raised).
pub const NOTIFICATIONS_FAILED_TOTAL: &str = "roomkit_notifications_failed_total";

/// Install the fmt tracing subscriber.
pub fn init_tracing() {
    tracing_subscriber::fmt::init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        tracing::error!("failed to install Prometheus metrics exporter: {e}");
        return;
    }
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}
