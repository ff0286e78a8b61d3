//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: &'static str,
    /// Crate version.
    pub version: &'static str,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Build a health response.
pub fn health_check(start_time: Instant) -> HealthResponse {
    HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: start_time.elapsed().as_secs(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_server_is_ok() {
        let resp = health_check(Instant::now());
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now().checked_sub(std::time::Duration::from_secs(60)).unwrap();
        assert!(health_check(start).uptime_secs >= 59);
    }

    #[test]
    fn serializes_camel_case() {
        let parsed = serde_json::to_value(health_check(Instant::now())).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["version"], env!("CARGO_PKG_VERSION"));
        assert!(parsed["uptimeSecs"].is_number());
    }
}
