use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info};

use crate::dom::dom_model::{Document, NodeId};
use crate::ledger::selectors::generate_selectors;
use crate::ledger::sink::ReportSink;
use crate::signature::signature_model::{ChildShape, ElementSignature};

pub const DEFAULT_PROMOTION_THRESHOLD: u64 = 3;
pub const SAMPLE_TEXT_LIMIT: usize = 200;

#[derive(Debug, Clone)]
pub struct PatternRecord {
    pub observation_count: u64,
    pub first_seen_selectors: Vec<String>,
    pub sample_text: String,
    pub structure: Vec<ChildShape>,
    pub reported: bool,
}

/// One-time "pattern confirmed" event handed to the report sink.
#[derive(Debug, Clone, Serialize)]
pub struct PatternReport {
    pub timestamp_ms: u128,
    pub signature: String,
    pub tag: String,
    pub selectors: Vec<String>,
    pub sample_text: String,
    pub structure: Vec<ChildShape>,
    pub observation_count: u64,
}

/// Counts repeated signatures and promotes each one exactly once, when its
/// count first reaches the threshold.
///
/// Detection and reporting only: what to do with a confirmed pattern is up to
/// whoever consumes the reports.
pub struct PatternLedger {
    threshold: u64,
    records: HashMap<ElementSignature, PatternRecord>,
    sink: Arc<dyn ReportSink>,
}

impl PatternLedger {
    pub fn new(threshold: u64, sink: Arc<dyn ReportSink>) -> Self {
        PatternLedger {
            threshold: threshold.max(1),
            records: HashMap::new(),
            sink,
        }
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }

    pub fn observe(
        &mut self,
        signature: ElementSignature,
        doc: &Document,
        node: NodeId,
    ) -> Option<PatternReport> {
        let threshold = self.threshold;
        let record = self.records.entry(signature.clone()).or_insert_with(|| {
            debug!(signature = %signature.digest(), "new signature observed");
            PatternRecord {
                observation_count: 0,
                first_seen_selectors: generate_selectors(doc, node),
                sample_text: sample_text(&doc.text_content(node)),
                structure: signature.children.clone(),
                reported: false,
            }
        });

        record.observation_count += 1;
        if record.reported || record.observation_count < threshold {
            return None;
        }
        record.reported = true;

        let report = PatternReport {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            signature: signature.digest(),
            tag: signature.tag.clone(),
            selectors: record.first_seen_selectors.clone(),
            sample_text: record.sample_text.clone(),
            structure: record.structure.clone(),
            observation_count: record.observation_count,
        };
        info!(
            signature = %report.signature,
            selectors = ?report.selectors,
            count = report.observation_count,
            "new pattern confirmed"
        );
        self.sink.report(&report);
        Some(report)
    }

    pub fn record(&self, signature: &ElementSignature) -> Option<&PatternRecord> {
        self.records.get(signature)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records that have been promoted, in no particular order.
    pub fn confirmed(&self) -> impl Iterator<Item = (&ElementSignature, &PatternRecord)> {
        self.records.iter().filter(|(_, r)| r.reported)
    }
}

/// Whitespace-collapsed text, cut to [`SAMPLE_TEXT_LIMIT`] characters.
pub fn sample_text(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(SAMPLE_TEXT_LIMIT)
        .collect()
}
