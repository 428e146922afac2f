//! Projection of validation findings onto an editor's marker API.

use serde::Serialize;
use tracing::debug;

use crate::analysis::text::offset_to_position;
use crate::validation::{RuleId, ValidationFinding};

/// Marker severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// An editor marker. Lines and columns are 1-based; columns count UTF-16
/// code units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub message: String,
    pub severity: Severity,
    pub source: String,
    pub code: RuleId,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

/// The host editor's marker surface.
pub trait DiagnosticSink {
    fn set_diagnostics(&mut self, markers: Vec<Marker>);
    fn clear_diagnostics(&mut self);
}

/// Converts findings to markers and pushes them to a sink.
#[derive(Debug, Clone)]
pub struct DiagnosticsProjector {
    source: String,
}

impl DiagnosticsProjector {
    /// `source` names the producer shown next to each marker.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn to_markers(&self, text: &str, findings: &[ValidationFinding]) -> Vec<Marker> {
        findings
            .iter()
            .map(|finding| {
                let (start_line, start_column) = offset_to_position(text, finding.start);
                let (end_line, end_column) = offset_to_position(text, finding.end);
                Marker {
                    message: finding.message.clone(),
                    severity: severity_of(finding.rule),
                    source: self.source.clone(),
                    code: finding.rule,
                    start_line: start_line + 1,
                    start_column: start_column + 1,
                    end_line: end_line + 1,
                    end_column: end_column + 1,
                }
            })
            .collect()
    }

    /// Replace every marker in `sink` with the markers for `findings`.
    ///
    /// Always clears first, so markers of a fixed query never linger.
    pub fn project(&self, sink: &mut dyn DiagnosticSink, text: &str, findings: &[ValidationFinding]) {
        let markers = self.to_markers(text, findings);
        debug!(markers = markers.len(), "projecting diagnostics");
        sink.clear_diagnostics();
        sink.set_diagnostics(markers);
    }
}

impl Default for DiagnosticsProjector {
    fn default() -> Self {
        Self::new("promql")
    }
}

/// Metric presence is a substring heuristic and only warns.
pub fn severity_of(rule: RuleId) -> Severity {
    match rule {
        RuleId::MetricPresence => Severity::Warning,
        _ => Severity::Error,
    }
}
