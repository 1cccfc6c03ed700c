use tracing::{info, warn};

const KNOWN_PATHS: [&str; 6] = ["/", "/health", "/analyze", "/stats", "/forecast/arima", "/metrics"];

/// Collapses unknown paths so they cannot blow up label cardinality.
#[cfg_attr(not(feature = "metrics"), allow(dead_code))]
pub fn route_label(path: &str) -> &'static str {
    KNOWN_PATHS
        .iter()
        .find(|known| **known == path)
        .copied()
        .unwrap_or("other")
}

/// Writes one structured line per completed request.
pub fn log_request(info: &warp::log::Info<'_>) {
    let status = info.status();
    let elapsed_ms = info.elapsed().as_secs_f64() * 1000.0;

    if status.is_server_error() {
        warn!(
            method = %info.method(),
            path = info.path(),
            status = status.as_u16(),
            elapsed_ms,
            "request failed"
        );
    } else {
        info!(
            method = %info.method(),
            path = info.path(),
            status = status.as_u16(),
            elapsed_ms,
            "request"
        );
    }
}
