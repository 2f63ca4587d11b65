//! Plain text report

use super::{format_time, CaptureReport, Summary};
use crate::config::OutputConfig;
use anyhow::Result;
use mcp2515_decoder::OutputEvent;
use std::io::Write;

const RULE: &str = "═══════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────";

pub fn write(out: &mut dyn Write, reports: &[CaptureReport], config: &OutputConfig) -> Result<()> {
    writeln!(out, "{}", RULE)?;
    writeln!(out, "  MCP2515 SPI Decode Report")?;
    writeln!(out, "  Generated: {}", chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"))?;
    writeln!(out, "{}", RULE)?;

    for report in reports {
        writeln!(out)?;
        writeln!(out, "Capture: {}", report.source.display())?;
        writeln!(out, "{}", THIN_RULE)?;

        if report.events.is_empty() {
            writeln!(out, "  (no events)")?;
        }
        for event in &report.events {
            write_event(out, event, config)?;
        }

        writeln!(out)?;
        write_summary(out, &report.summary)?;
    }

    Ok(())
}

fn write_event(out: &mut dyn Write, event: &OutputEvent, config: &OutputConfig) -> Result<()> {
    let marker = if event.has_warnings() { '!' } else { ' ' };
    writeln!(out, "{} {:>14}s  {}", marker, format_time(event.start_ns), event.label)?;

    if config.show_details {
        for line in event.detail_lines() {
            writeln!(out, "{:20}{}", "", line)?;
        }
    }
    if config.show_segments {
        for segment in &event.segments {
            writeln!(
                out,
                "{:20}[{} .. {}] {}",
                "",
                format_time(segment.start_ns),
                format_time(segment.end_ns),
                segment.text
            )?;
        }
    }
    Ok(())
}

fn write_summary(out: &mut dyn Write, summary: &Summary) -> Result<()> {
    writeln!(out, "Summary:")?;
    writeln!(out, "  Events:   {}", summary.events)?;
    for count in &summary.per_kind {
        writeln!(out, "    {:<16} {}", count.kind.name(), count.count)?;
    }
    writeln!(
        out,
        "  Warnings: {} (in {} events)",
        summary.warnings, summary.events_with_warnings
    )?;
    writeln!(
        out,
        "  Frames:   {} ({} truncated)",
        summary.frames, summary.truncated_frames
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_events;
    use std::path::PathBuf;

    fn render(config: &OutputConfig) -> String {
        let reports = vec![CaptureReport::new(PathBuf::from("capture.csv"), sample_events())];
        let mut buf = Vec::new();
        write(&mut buf, &reports, config).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_text_report_lists_events_and_summary() {
        let text = render(&OutputConfig::default());
        assert!(text.contains("Capture: capture.csv"));
        assert!(text.contains("RESET"));
        assert!(text.contains("WRITE CANCTRL"));
        assert!(text.contains("0.000010000s"));
        assert!(text.contains("Events:   4"));
        assert!(text.contains("Frames:   1 (1 truncated)"));
        assert!(text.contains("warning:"));
    }

    #[test]
    fn test_details_can_be_hidden() {
        let config = OutputConfig {
            show_details: false,
            ..OutputConfig::default()
        };
        let text = render(&config);
        assert!(text.contains("WRITE CANCTRL"));
        assert!(!text.contains("warning:"));
    }

    #[test]
    fn test_segments_are_printed_when_enabled() {
        let config = OutputConfig {
            show_segments: true,
            ..OutputConfig::default()
        };
        let text = render(&config);
        assert!(text.contains("Data: 0x80"));
    }
}
