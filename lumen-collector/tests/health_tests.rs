//! Health aggregation tests.

use lumen_collector::health::{ComponentHealth, aggregate_status};
use lumen_core::pipeline::HealthStatus;

#[test]
fn all_healthy_is_healthy() {
    let components = vec![
        ComponentHealth::enabled("network", HealthStatus::Healthy),
        ComponentHealth::enabled("tcpmetric", HealthStatus::Healthy),
        ComponentHealth::enabled("uds", HealthStatus::Healthy),
    ];
    assert!(aggregate_status(&components).is_healthy());
}

#[test]
fn empty_component_list_is_healthy() {
    assert!(aggregate_status(&[]).is_healthy());
}

#[test]
fn degraded_reason_names_component() {
    let components = vec![
        ComponentHealth::enabled("network", HealthStatus::Healthy),
        ComponentHealth::enabled("metadata-watch", HealthStatus::Degraded("lagging".to_owned())),
    ];

    match aggregate_status(&components) {
        HealthStatus::Degraded(reason) => assert_eq!(reason, "metadata-watch: lagging"),
        other => panic!("expected Degraded, got {other:?}"),
    }
}

#[test]
fn unhealthy_wins_and_lists_only_unhealthy_reasons() {
    let components = vec![
        ComponentHealth::enabled("network", HealthStatus::Degraded("slow".to_owned())),
        ComponentHealth::enabled("tcpmetric", HealthStatus::Unhealthy("stopped".to_owned())),
        ComponentHealth::enabled("uds", HealthStatus::Degraded("busy".to_owned())),
        ComponentHealth::enabled("metadata-watch", HealthStatus::Unhealthy("not synced".to_owned())),
    ];

    match aggregate_status(&components) {
        HealthStatus::Unhealthy(reason) => {
            assert_eq!(reason, "tcpmetric: stopped; metadata-watch: not synced");
        }
        other => panic!("expected Unhealthy, got {other:?}"),
    }
}

#[test]
fn disabled_components_are_ignored() {
    let mut watch = ComponentHealth::disabled("metadata-watch");
    watch.status = HealthStatus::Unhealthy("not synced".to_owned());

    let components = vec![ComponentHealth::enabled("network", HealthStatus::Healthy), watch];
    assert!(aggregate_status(&components).is_healthy());
}

#[test]
fn health_report_serializes() {
    let component = ComponentHealth::enabled("uds", HealthStatus::Unhealthy("not running".to_owned()));
    let json = serde_json::to_value(&component).unwrap();
    assert_eq!(json["name"], "uds");
    assert_eq!(json["enabled"], true);
    assert_eq!(json["status"]["Unhealthy"], "not running");
}
