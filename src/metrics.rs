//! Prometheus exposition for the service counters.
//!
//! Counters are registered with the default registry where they are
//! declared; this module only renders them for the `/metrics` endpoint.

use prometheus::{Encoder, TextEncoder};

/// Gathers every registered metric as Prometheus text format.
pub fn gather_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
