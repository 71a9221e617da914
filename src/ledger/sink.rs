use std::{fs::OpenOptions, io::Write, path::Path, sync::Arc};

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::ledger::ledger::PatternReport;

/// Receiver of "pattern confirmed" events.
pub trait ReportSink: Send + Sync {
    fn report(&self, report: &PatternReport);
}

/// Emits each report as a structured log event.
pub struct TracingSink;

impl ReportSink for TracingSink {
    fn report(&self, report: &PatternReport) {
        info!(
            target: "bookcover::report",
            signature = %report.signature,
            tag = %report.tag,
            selectors = ?report.selectors,
            sample = %report.sample_text,
            children = report.structure.len(),
            "pattern report"
        );
    }
}

/// Appends each report as one JSON line to a file.
pub struct JsonlSink {
    file: Option<Mutex<std::fs::File>>,
}

impl JsonlSink {
    pub fn new(path: &Path) -> Self {
        let file = OpenOptions::new().create(true).append(true).open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open report file");
                Self { file: None }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }
}

impl ReportSink for JsonlSink {
    fn report(&self, report: &PatternReport) {
        let Some(file) = &self.file else {
            return; // reporting disabled
        };

        let json = match serde_json::to_string(report) {
            Ok(j) => j,
            Err(e) => {
                warn!(error = %e, "failed to serialize pattern report");
                return;
            }
        };

        if let Err(e) = writeln!(file.lock(), "{}", json) {
            warn!(error = %e, "failed to write pattern report");
        }
    }
}

/// Keeps reports in memory, for embedders that poll rather than stream.
#[derive(Default)]
pub struct MemorySink {
    reports: Mutex<Vec<PatternReport>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> Vec<PatternReport> {
        self.reports.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }
}

impl ReportSink for MemorySink {
    fn report(&self, report: &PatternReport) {
        self.reports.lock().push(report.clone());
    }
}

/// Forwards every report to each inner sink in order.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn ReportSink>>) -> Self {
        FanoutSink { sinks }
    }
}

impl ReportSink for FanoutSink {
    fn report(&self, report: &PatternReport) {
        for sink in &self.sinks {
            sink.report(report);
        }
    }
}
