//! Diagnostic channel for alignment runs
//!
//! Every pipeline stage receives a `&mut dyn DiagnosticSink` and reports
//! human-readable progress through it. The sink is purely observational:
//! nothing in the algorithm reads back what was emitted.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pipeline stage that produced a diagnostic message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Load,
    EdgeExtraction,
    BoundaryDetection,
    NotchDetection,
    Orientation,
    Transform,
    Artifacts,
    Complete,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::EdgeExtraction => "edge_extraction",
            Stage::BoundaryDetection => "boundary_detection",
            Stage::NotchDetection => "notch_detection",
            Stage::Orientation => "orientation",
            Stage::Transform => "transform",
            Stage::Artifacts => "artifacts",
            Stage::Complete => "complete",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of per-stage diagnostic messages
pub trait DiagnosticSink {
    fn emit(&mut self, stage: Stage, detail: &str);
}

/// A single timestamped log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub stage: Stage,
    pub message: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.stage,
            self.message
        )
    }
}

/// Ordered, append-only record of one alignment run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlignmentLog {
    entries: Vec<LogEntry>,
}

impl AlignmentLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stages in the order they first reported
    pub fn stages(&self) -> Vec<Stage> {
        let mut seen = Vec::new();
        for entry in &self.entries {
            if !seen.contains(&entry.stage) {
                seen.push(entry.stage);
            }
        }
        seen
    }

    pub fn messages_for(&self, stage: Stage) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(move |e| e.stage == stage)
            .map(|e| e.message.as_str())
    }
}

impl DiagnosticSink for AlignmentLog {
    fn emit(&mut self, stage: Stage, detail: &str) {
        self.entries.push(LogEntry {
            timestamp: Local::now(),
            stage,
            message: detail.to_string(),
        });
    }
}

/// Forwards diagnostics to `tracing` at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&mut self, stage: Stage, detail: &str) {
        tracing::info!(stage = %stage, "{}", detail);
    }
}

/// Discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _stage: Stage, _detail: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_preserves_order() {
        let mut log = AlignmentLog::new();
        log.emit(Stage::Load, "loaded");
        log.emit(Stage::BoundaryDetection, "circle found");
        log.emit(Stage::Load, "again");

        assert_eq!(log.len(), 3);
        assert_eq!(log.entries()[1].message, "circle found");
        assert_eq!(log.stages(), vec![Stage::Load, Stage::BoundaryDetection]);
        assert_eq!(log.messages_for(Stage::Load).collect::<Vec<_>>(), vec!["loaded", "again"]);
    }

    #[test]
    fn test_entry_display_contains_stage() {
        let mut log = AlignmentLog::new();
        log.emit(Stage::Orientation, "angle 12.5");
        let line = log.entries()[0].to_string();
        assert!(line.contains("orientation: angle 12.5"), "got {}", line);
    }
}
