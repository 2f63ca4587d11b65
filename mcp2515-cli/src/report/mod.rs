//! Report generation
//!
//! Generates TXT and JSON reports: the decoded events of every capture plus a summary
//! section (events per instruction kind, warnings, frames).

pub mod json;
pub mod txt;

use crate::config::{OutputConfig, OutputFormat};
use anyhow::Result;
use mcp2515_decoder::{InstructionKind, OutputEvent};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// Events decoded from one capture file
#[derive(Debug, Serialize)]
pub struct CaptureReport {
    pub source: PathBuf,
    pub summary: Summary,
    pub events: Vec<OutputEvent>,
}

impl CaptureReport {
    pub fn new(source: PathBuf, events: Vec<OutputEvent>) -> Self {
        let summary = Summary::from_events(&events);
        Self {
            source,
            summary,
            events,
        }
    }
}

/// Number of events of one instruction kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindCount {
    pub kind: InstructionKind,
    pub count: usize,
}

/// Summary section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub events: usize,
    /// Kinds that occurred, in datasheet order
    pub per_kind: Vec<KindCount>,
    pub warnings: usize,
    pub events_with_warnings: usize,
    pub frames: usize,
    pub truncated_frames: usize,
}

impl Summary {
    pub fn from_events(events: &[OutputEvent]) -> Self {
        let per_kind = InstructionKind::ALL
            .iter()
            .map(|&kind| KindCount {
                kind,
                count: events.iter().filter(|e| e.kind() == kind).count(),
            })
            .filter(|c| c.count > 0)
            .collect();

        Self {
            events: events.len(),
            per_kind,
            warnings: events.iter().map(|e| e.warnings.len()).sum(),
            events_with_warnings: events.iter().filter(|e| e.has_warnings()).count(),
            frames: events.iter().filter(|e| e.frame.is_some()).count(),
            truncated_frames: events
                .iter()
                .filter(|e| e.frame.as_ref().is_some_and(|f| f.truncated))
                .count(),
        }
    }
}

/// Write all capture reports in the configured format
pub fn write_report(out: &mut dyn Write, reports: &[CaptureReport], config: &OutputConfig) -> Result<()> {
    match config.format {
        OutputFormat::Txt => txt::write(out, reports, config),
        OutputFormat::Json => json::write(out, reports),
    }
}

/// Nanoseconds as seconds with nanosecond precision
pub fn format_time(ns: u64) -> String {
    format!("{}.{:09}", ns / 1_000_000_000, ns % 1_000_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp2515_decoder::{Decoder, RawTransaction};

    pub(crate) fn sample_events() -> Vec<OutputEvent> {
        let decoder = Decoder::new();
        vec![
            RawTransaction::from_mosi(0, &[0xC0]),
            RawTransaction::from_mosi(10_000, &[0x02, 0x0E, 0x80]),
            RawTransaction::from_mosi(20_000, &[0x40, 0x12, 0x34, 0x00, 0x00, 0x08, 0x01]),
            RawTransaction::from_mosi(30_000, &[0xFF]),
        ]
        .iter()
        .map(|tx| decoder.decode_transaction(tx))
        .collect()
    }

    #[test]
    fn test_summary_counts() {
        let summary = Summary::from_events(&sample_events());
        assert_eq!(summary.events, 4);
        assert_eq!(summary.per_kind.len(), 4);
        assert_eq!(summary.per_kind[0], KindCount { kind: InstructionKind::Reset, count: 1 });
        assert_eq!(summary.events_with_warnings, 2);
        assert_eq!(summary.frames, 1);
        assert_eq!(summary.truncated_frames, 1);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0), "0.000000000");
        assert_eq!(format_time(1_500_000_123), "1.500000123");
    }
}
