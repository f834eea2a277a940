//! Exporters: terminal consumers.

pub mod stdout;

pub use stdout::{ExportFormat, STDOUT_EXPORTER, StdoutExporter, StdoutExporterConfig};
