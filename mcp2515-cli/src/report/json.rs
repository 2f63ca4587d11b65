//! JSON report

use super::CaptureReport;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: String,
    decoder_version: &'static str,
    captures: &'a [CaptureReport],
}

pub fn write(out: &mut dyn Write, reports: &[CaptureReport]) -> Result<()> {
    let report = JsonReport {
        generated_at: chrono::Utc::now().to_rfc3339(),
        decoder_version: mcp2515_decoder::VERSION,
        captures: reports,
    };
    serde_json::to_writer_pretty(&mut *out, &report)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_events;
    use std::path::PathBuf;

    #[test]
    fn test_json_report_structure() {
        let reports = vec![CaptureReport::new(PathBuf::from("capture.json"), sample_events())];
        let mut buf = Vec::new();
        write(&mut buf, &reports).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
        let capture = &value["captures"][0];
        assert_eq!(capture["source"], "capture.json");
        assert_eq!(capture["summary"]["events"], 4);
        assert_eq!(capture["events"][1]["label"], "WRITE CANCTRL");
        assert_eq!(capture["events"][0]["instruction"]["instruction"], "reset");
        assert!(value["generated_at"].is_string());
    }
}
