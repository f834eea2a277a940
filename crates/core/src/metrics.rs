//! Metric names and descriptions.
//!
//! Every component records through the `metrics` facade using these
//! constants; the collector binary installs the Prometheus recorder.
//!
//! # Naming
//!
//! - prefix: `lumen_`
//! - stage: `receiver_`, `analyzer_`, `enrichment_`, `metadata_`, `exporter_`
//! - suffix: `_total` for counters, none for gauges
//!
//! ```ignore
//! metrics::counter!(lumen_core::metrics::RECEIVER_EVENTS_TOTAL).increment(1);
//! ```

// ─── Label keys ──────────────────────────────────────────────────────

/// Component name label key.
pub const LABEL_COMPONENT: &str = "component";

/// Notification kind label key (add, update, delete).
pub const LABEL_KIND: &str = "kind";

/// Event name label key.
pub const LABEL_EVENT: &str = "event";

// ─── Receiver ────────────────────────────────────────────────────────

/// Events decoded and dispatched by receivers (counter, label: component).
pub const RECEIVER_EVENTS_TOTAL: &str = "lumen_receiver_events_total";

/// Messages that failed to decode (counter, label: component).
pub const RECEIVER_DECODE_ERRORS_TOTAL: &str = "lumen_receiver_decode_errors_total";

/// Open receiver connections (gauge, label: component).
pub const RECEIVER_CONNECTIONS: &str = "lumen_receiver_connections";

// ─── Analyzer ────────────────────────────────────────────────────────

/// Events delivered to an analyzer (counter, label: component).
pub const ANALYZER_EVENTS_DISPATCHED_TOTAL: &str = "lumen_analyzer_events_dispatched_total";

/// Events no analyzer subscribed to (counter, label: event).
pub const ANALYZER_EVENTS_UNROUTED_TOTAL: &str = "lumen_analyzer_events_unrouted_total";

/// Analyzer failures while consuming an event (counter, label: component).
pub const ANALYZER_ERRORS_TOTAL: &str = "lumen_analyzer_errors_total";

// ─── Enrichment ──────────────────────────────────────────────────────

/// Groups resolved to a workload (counter).
pub const ENRICHMENT_HITS_TOTAL: &str = "lumen_enrichment_hits_total";

/// Groups with no cached workload (counter).
pub const ENRICHMENT_MISSES_TOTAL: &str = "lumen_enrichment_misses_total";

// ─── Metadata ────────────────────────────────────────────────────────

/// Entries in the workload cache (gauge).
pub const METADATA_CACHE_ENTRIES: &str = "lumen_metadata_cache_entries";

/// Watch notifications applied to the cache (counter, label: kind).
pub const METADATA_NOTIFICATIONS_TOTAL: &str = "lumen_metadata_notifications_total";

/// Watch stream errors (counter).
pub const METADATA_WATCH_ERRORS_TOTAL: &str = "lumen_metadata_watch_errors_total";

// ─── Exporter ────────────────────────────────────────────────────────

/// Groups written by exporters (counter, label: component).
pub const EXPORTER_GROUPS_TOTAL: &str = "lumen_exporter_groups_total";

// ─── Collector ───────────────────────────────────────────────────────

/// Process uptime (gauge, seconds).
pub const COLLECTOR_UPTIME_SECONDS: &str = "lumen_collector_uptime_seconds";

/// Registered components (gauge).
pub const COLLECTOR_COMPONENTS_REGISTERED: &str = "lumen_collector_components_registered";

/// Build information (gauge, always 1, label: version).
pub const COLLECTOR_BUILD_INFO: &str = "lumen_collector_build_info";

/// Registers descriptions for every metric above.
///
/// Harmless without an installed recorder.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        RECEIVER_EVENTS_TOTAL,
        "Events decoded and dispatched by receivers"
    );
    describe_counter!(
        RECEIVER_DECODE_ERRORS_TOTAL,
        "Receiver messages that failed to decode"
    );
    describe_gauge!(RECEIVER_CONNECTIONS, "Open receiver connections");

    describe_counter!(
        ANALYZER_EVENTS_DISPATCHED_TOTAL,
        "Events delivered to analyzers"
    );
    describe_counter!(
        ANALYZER_EVENTS_UNROUTED_TOTAL,
        "Events no analyzer subscribed to"
    );
    describe_counter!(ANALYZER_ERRORS_TOTAL, "Analyzer failures while consuming");

    describe_counter!(ENRICHMENT_HITS_TOTAL, "Groups resolved to a workload");
    describe_counter!(ENRICHMENT_MISSES_TOTAL, "Groups with no cached workload");

    describe_gauge!(METADATA_CACHE_ENTRIES, "Entries in the workload cache");
    describe_counter!(
        METADATA_NOTIFICATIONS_TOTAL,
        "Watch notifications applied to the workload cache"
    );
    describe_counter!(METADATA_WATCH_ERRORS_TOTAL, "Workload watch stream errors");

    describe_counter!(EXPORTER_GROUPS_TOTAL, "Metric groups written by exporters");

    describe_gauge!(COLLECTOR_UPTIME_SECONDS, "Collector uptime in seconds");
    describe_gauge!(
        COLLECTOR_COMPONENTS_REGISTERED,
        "Number of registered components"
    );
    describe_gauge!(COLLECTOR_BUILD_INFO, "Build information");
}
