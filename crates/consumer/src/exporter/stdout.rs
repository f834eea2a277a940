//! Line-oriented exporter writing to stdout or any writer.
//!
//! JSON format writes one serialized [`MetricGroup`] per line. Text format
//! writes `name ts=<ts> k="v",... | metric=value ...`.

use std::fmt::Write as _;
use std::io::{self, Write};

use lumen_core::error::CollectorError;
use lumen_core::event::MetricGroup;
use lumen_core::metrics as m;
use lumen_core::pipeline::Consumer;
use parking_lot::Mutex;
use serde::Deserialize;

/// Registry identifier.
pub const STDOUT_EXPORTER: &str = "stdout";

/// Output encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable single line.
    Text,
}

/// `[exporters.stdout]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StdoutExporterConfig {
    /// Output encoding.
    pub format: ExportFormat,
}

/// Writes every group it receives as one line.
pub struct StdoutExporter {
    format: ExportFormat,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl StdoutExporter {
    /// Creates an exporter writing to stdout.
    pub fn new(config: StdoutExporterConfig) -> Self {
        Self::with_writer(config, Box::new(io::stdout()))
    }

    /// Creates an exporter writing to `writer`.
    pub fn with_writer(config: StdoutExporterConfig, writer: Box<dyn Write + Send>) -> Self {
        Self {
            format: config.format,
            writer: Mutex::new(writer),
        }
    }

    fn encode(&self, group: &MetricGroup) -> Result<String, CollectorError> {
        match self.format {
            ExportFormat::Json => serde_json::to_string(group)
                .map_err(|e| CollectorError::Io(io::Error::new(io::ErrorKind::InvalidData, e))),
            ExportFormat::Text => Ok(text_line(group)),
        }
    }
}

fn text_line(group: &MetricGroup) -> String {
    let mut line = format!("{} ts={}", group.name, group.timestamp);
    let labels: Vec<String> = group
        .labels
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\""))
        .collect();
    if !labels.is_empty() {
        let _ = write!(line, " {}", labels.join(","));
    }
    line.push_str(" |");
    for (name, value) in &group.values {
        let _ = write!(line, " {name}={value}");
    }
    line
}

impl Consumer for StdoutExporter {
    fn consume(&self, group: MetricGroup) -> Result<(), CollectorError> {
        let line = self.encode(&group)?;
        {
            let mut writer = self.writer.lock();
            writeln!(writer, "{line}")?;
            writer.flush()?;
        }
        metrics::counter!(m::EXPORTER_GROUPS_TOTAL, m::LABEL_COMPONENT => STDOUT_EXPORTER)
            .increment(1);
        Ok(())
    }
}
