//! JSON transaction reader
//!
//! Reads captures that were already split into chip-select bounded transactions:
//!
//! ```json
//! [
//!   { "start_ns": 0, "end_ns": 4000,
//!     "bytes": [ { "mosi": 192, "miso": 255, "start_ns": 100, "end_ns": 900 } ] }
//! ]
//! ```

use crate::types::{DecoderError, RawTransaction, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Reads JSON transaction arrays
pub struct JsonCaptureReader;

impl JsonCaptureReader {
    /// Read a JSON capture from disk
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

    /// Read a JSON capture from any reader
    pub fn read<R: Read>(reader: R) -> Result<Vec<RawTransaction>> {
        let transactions: Vec<RawTransaction> = serde_json::from_reader(reader)?;

        for (index, transaction) in transactions.iter().enumerate() {
            if let Some(byte) = transaction.bytes.iter().find(|b| b.end_ns < b.start_ns) {
                return Err(DecoderError::InvalidData(format!(
                    "transaction {}: byte ends at {} ns before it starts at {} ns",
                    index, byte.end_ns, byte.start_ns
                )));
            }
        }

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_transactions() {
        let json = r#"[
            {"start_ns": 0, "end_ns": 4000,
             "bytes": [{"mosi": 192, "miso": 255, "start_ns": 100, "end_ns": 900}]},
            {"start_ns": 5000, "end_ns": 5100}
        ]"#;
        let transactions = JsonCaptureReader::read(json.as_bytes()).unwrap();
        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].opcode(), Some(0xC0));
        assert!(transactions[1].is_empty());
    }

    #[test]
    fn test_reversed_byte_times() {
        let json = r#"[{"start_ns": 0, "end_ns": 10,
            "bytes": [{"mosi": 1, "miso": 2, "start_ns": 9, "end_ns": 3}]}]"#;
        let err = JsonCaptureReader::read(json.as_bytes()).unwrap_err();
        assert!(matches!(err, DecoderError::InvalidData(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = JsonCaptureReader::read("{not json".as_bytes()).unwrap_err();
        assert!(matches!(err, DecoderError::Json(_)));
    }
}
