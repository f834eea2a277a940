//! Analysis layer of the lumen collector.
//!
//! The [`AnalyzerManager`] owns every analyzer, coordinates their lifecycle
//! and routes raw events to them by name. Built-in analyzers:
//!
//! - [`NetworkAnalyzer`] (`network`): request events
//! - [`TcpMetricAnalyzer`] (`tcpmetric`): TCP retransmit/drop/rtt events
//! - [`UprobeAnalyzer`] (`uprobe`): gRPC calls captured by uprobes

mod lifecycle;
pub mod manager;
pub mod network;
pub mod tcp_metric;
pub mod uprobe;

pub use manager::AnalyzerManager;
pub use network::{NETWORK_ANALYZER, NetworkAnalyzer, NetworkAnalyzerConfig};
pub use tcp_metric::{TCP_METRIC_ANALYZER, TcpMetricAnalyzer, TcpMetricAnalyzerConfig};
pub use uprobe::{UPROBE_ANALYZER, UprobeAnalyzer, UprobeAnalyzerConfig};
