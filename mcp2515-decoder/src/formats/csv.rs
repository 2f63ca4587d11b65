//! SPI analyzer CSV export reader
//!
//! Logic analyzer software exports the SPI analyzer's frames as CSV with one row per
//! frame:
//!
//! ```text
//! name,type,start_time,duration,mosi,miso
//! SPI,enable,0.0010,0,,
//! SPI,result,0.0011,0.000008,0x02,0xFF
//! SPI,disable,0.0012,0,,
//! ```
//!
//! Times are seconds; byte columns are hex with or without a `0x` prefix. Columns are
//! matched by header name, so their order does not matter and extra columns are
//! ignored.

use super::{seconds_to_ns, SpiFrame, TransactionFramer};
use crate::types::{DecoderError, RawTransaction, Result, SpiByte};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "type")]
    frame_type: String,
    start_time: f64,
    #[serde(default)]
    duration: f64,
    #[serde(default)]
    mosi: Option<String>,
    #[serde(default)]
    miso: Option<String>,
}

/// Reads CSV frame exports into transactions
pub struct CsvCaptureReader;

impl CsvCaptureReader {
    /// Read a CSV export from disk
    pub fn read_file(path: &Path) -> Result<Vec<RawTransaction>> {
        if !path.exists() {
            return Err(DecoderError::CaptureParseError(format!(
                "Capture file not found: {:?}",
                path
            )));
        }

        let file = File::open(path)?;
        Self::read(BufReader::new(file))
    }

    /// Read a CSV export from any reader
    pub fn read<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
        let mut csv_reader = ::csv::ReaderBuilder::new()
            .trim(::csv::Trim::All)
            .from_reader(reader);

        let mut framer = TransactionFramer::new();
        let mut transactions = Vec::new();

        for (index, row) in csv_reader.deserialize::<CsvRow>().enumerate() {
            let row = row?;
            // Header is line 1
            let frame = Self::parse_row(&row, index + 2)?;
            transactions.extend(framer.push(frame));
        }
        transactions.extend(framer.finish());

        Ok(transactions)
    }

    fn parse_row(row: &CsvRow, line: usize) -> Result<SpiFrame> {
        let time_ns = seconds_to_ns(row.start_time);

        match row.frame_type.as_str() {
            "enable" => Ok(SpiFrame::Enable { time_ns }),
            "disable" => Ok(SpiFrame::Disable { time_ns }),
            "result" => {
                let mosi = Self::parse_byte(row.mosi.as_deref(), "mosi", line)?;
                let miso = Self::parse_byte(row.miso.as_deref(), "miso", line)?;
                let end_ns = seconds_to_ns(row.start_time + row.duration.max(0.0));
                log::trace!("line {}: mosi 0x{:02X} miso 0x{:02X}", line, mosi, miso);
                Ok(SpiFrame::Result(SpiByte::new(mosi, miso, time_ns, end_ns)))
            }
            other => Err(DecoderError::CaptureParseError(format!(
                "line {}: unexpected frame type '{}', expected enable/result/disable",
                line, other
            ))),
        }
    }

    fn parse_byte(value: Option<&str>, column: &str, line: usize) -> Result<u8> {
        let value = value.filter(|v| !v.is_empty()).ok_or_else(|| {
            DecoderError::CaptureParseError(format!("line {}: missing {} byte", line, column))
        })?;
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);

        u8::from_str_radix(digits, 16).map_err(|e| {
            DecoderError::InvalidData(format!("line {}: {} byte '{}': {}", line, column, value, e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPTURE: &str = "\
name,type,start_time,duration,mosi,miso
SPI,enable,0.000001,0,,
SPI,result,0.000002,0.000001,0x02,0xFF
SPI,result,0.000003,0.000001,0x0E,0xFF
SPI,result,0.000004,0.000001,0x80,0xFF
SPI,disable,0.000006,0,,
SPI,enable,0.000010,0,,
SPI,result,0.000011,0.000001,C0,FF
SPI,disable,0.000013,0,,
";

    #[test]
    fn test_read_capture() {
        let transactions = CsvCaptureReader::read(CAPTURE.as_bytes()).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].mosi(), vec![0x02, 0x0E, 0x80]);
        assert_eq!(transactions[0].start_ns, 1_000);
        assert_eq!(transactions[0].end_ns, 6_000);
        assert_eq!(transactions[0].bytes[0].end_ns, 3_000);
        assert_eq!(transactions[1].mosi(), vec![0xC0]);
        assert_eq!(transactions[1].miso(), vec![0xFF]);
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let capture = "type,miso,mosi,start_time,duration\nresult,0x11,0x03,0.0,0.0\n";
        let transactions = CsvCaptureReader::read(capture.as_bytes()).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].bytes[0].mosi, 0x03);
        assert_eq!(transactions[0].bytes[0].miso, 0x11);
    }

    #[test]
    fn test_unknown_frame_type() {
        let capture = "name,type,start_time,duration,mosi,miso\nSPI,error,0.0,0.0,,\n";
        let err = CsvCaptureReader::read(capture.as_bytes()).unwrap_err();
        assert!(matches!(err, DecoderError::CaptureParseError(_)));
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_bad_byte() {
        let capture = "name,type,start_time,duration,mosi,miso\nSPI,result,0.0,0.0,0xZZ,0x00\n";
        let err = CsvCaptureReader::read(capture.as_bytes()).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidData(_)));
    }
}
