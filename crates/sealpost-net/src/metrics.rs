//! Listener metrics (prometheus-client)
//!
//! A `ListenerMetrics` that was never registered still counts; it simply is
//! not exported anywhere.

use prometheus_client::{
    metrics::{counter::Counter, family::Family, gauge::Gauge},
    registry::Registry,
};
use sealpost_store::SizeDelta;

type Labels = Vec<(String, String)>;

#[derive(Clone, Debug, Default)]
pub struct ListenerMetrics {
    frames: Family<Labels, Counter>,
    connection_errors: Family<Labels, Counter>,
    connections_active: Gauge,
    store_blobs: Gauge,
    store_bytes: Gauge,
}

impl ListenerMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let metrics = Self::default();

        registry.register(
            "sealpost_frames",
            "Exchanges served, by request message type",
            metrics.frames.clone(),
        );
        registry.register(
            "sealpost_connection_errors",
            "Connections aborted, by error kind",
            metrics.connection_errors.clone(),
        );
        registry.register(
            "sealpost_connections_active",
            "Connections currently being served",
            metrics.connections_active.clone(),
        );
        registry.register(
            "sealpost_store_blobs",
            "Blobs held in the store",
            metrics.store_blobs.clone(),
        );
        registry.register(
            "sealpost_store_bytes",
            "Total bytes held in the store",
            metrics.store_bytes.clone(),
        );

        metrics
    }

    pub fn record_frame(&self, message_type: &str) {
        self.frames
            .get_or_create(&labels("type", message_type))
            .inc();
    }

    pub fn record_error(&self, kind: &str) {
        self.connection_errors
            .get_or_create(&labels("kind", kind))
            .inc();
    }

    pub fn connection_opened(&self) {
        self.connections_active.inc();
    }

    pub fn connection_closed(&self) {
        self.connections_active.dec();
    }

    /// Apply the size change from one store write to the store gauges.
    pub fn record_store_change(&self, delta: SizeDelta) {
        self.store_blobs.inc_by(delta.blobs);
        self.store_bytes.inc_by(delta.bytes);
    }

    pub fn store_blobs(&self) -> i64 {
        self.store_blobs.get()
    }

    pub fn store_bytes(&self) -> i64 {
        self.store_bytes.get()
    }

    pub fn frames_served(&self, message_type: &str) -> u64 {
        self.frames
            .get_or_create(&labels("type", message_type))
            .get()
    }

    pub fn errors_seen(&self, kind: &str) -> u64 {
        self.connection_errors
            .get_or_create(&labels("kind", kind))
            .get()
    }
}

fn labels(key: &str, value: &str) -> Labels {
    vec![(key.to_string(), value.to_string())]
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn test_counts_and_encodes() {
        let mut registry = Registry::default();
        let metrics = ListenerMetrics::new(&mut registry);

        metrics.record_frame("transfer");
        metrics.record_frame("transfer");
        metrics.record_error("framing");
        metrics.record_store_change(SizeDelta { blobs: 3, bytes: 1024 });

        assert_eq!(metrics.frames_served("transfer"), 2);
        assert_eq!(metrics.frames_served("request"), 0);
        assert_eq!(metrics.errors_seen("framing"), 1);

        let mut body = String::new();
        encode(&mut body, &registry).unwrap();
        assert!(body.contains("sealpost_frames"));
        assert!(body.contains("sealpost_store_bytes 1024"));
    }

    #[test]
    fn test_store_gauges_follow_deltas() {
        let metrics = ListenerMetrics::default();
        metrics.record_store_change(SizeDelta { blobs: 1, bytes: 10 });
        metrics.record_store_change(SizeDelta { blobs: 1, bytes: 4 });
        // Overwrite of the first blob with a smaller one
        metrics.record_store_change(SizeDelta { blobs: 0, bytes: -6 });

        assert_eq!(metrics.store_blobs(), 2);
        assert_eq!(metrics.store_bytes(), 8);
    }

    #[test]
    fn test_clones_share_counters() {
        let metrics = ListenerMetrics::default();
        let clone = metrics.clone();
        clone.record_frame("request");

        assert_eq!(metrics.frames_served("request"), 1);
    }
}
