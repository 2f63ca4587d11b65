//! Core types for the MCP2515 decoder library
//!
//! This module defines the input side of the decoder (bytes exchanged on the SPI bus,
//! grouped into chip-select bounded transactions), the warnings attached to decoded
//! events, and the error type for the fallible host-side operations (reading capture
//! files). Decoding a transaction itself never fails.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// One byte exchanged on the SPI bus
///
/// Every SPI clock burst moves a byte in both directions at once: `mosi` is what the
/// host sent to the controller, `miso` is what the controller returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiByte {
    /// Byte sent by the host (master out, slave in)
    pub mosi: u8,
    /// Byte returned by the controller (master in, slave out)
    pub miso: u8,
    /// Start of the byte in nanoseconds since capture start
    pub start_ns: u64,
    /// End of the byte in nanoseconds since capture start
    pub end_ns: u64,
}

impl SpiByte {
    /// Create a byte pair with its time bounds
    pub fn new(mosi: u8, miso: u8, start_ns: u64, end_ns: u64) -> Self {
        Self {
            mosi,
            miso,
            start_ns,
            end_ns,
        }
    }
}

/// All bytes exchanged during one chip-select active interval
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawTransaction {
    /// Chip-select assertion time in nanoseconds
    pub start_ns: u64,
    /// Chip-select deassertion time in nanoseconds
    pub end_ns: u64,
    /// Exchanged bytes, in bus order
    #[serde(default)]
    pub bytes: Vec<SpiByte>,
}

impl RawTransaction {
    /// Create a transaction from its chip-select bounds and bytes
    pub fn new(start_ns: u64, end_ns: u64, bytes: Vec<SpiByte>) -> Self {
        Self {
            start_ns,
            end_ns,
            bytes,
        }
    }

    /// Build a transaction from host-sent bytes only, with synthetic 1 µs byte slots
    ///
    /// The controller side of every byte is left at 0xFF, which is what an idle MISO
    /// line reads as. Mostly useful for tests and hand-written captures.
    pub fn from_mosi(start_ns: u64, mosi: &[u8]) -> Self {
        Self::from_pairs(start_ns, mosi.iter().map(|&b| (b, 0xFF)))
    }

    /// Build a transaction from `(mosi, miso)` pairs with synthetic 1 µs byte slots
    pub fn from_pairs(start_ns: u64, pairs: impl IntoIterator<Item = (u8, u8)>) -> Self {
        const SLOT_NS: u64 = 1_000;

        let bytes: Vec<SpiByte> = pairs
            .into_iter()
            .enumerate()
            .map(|(i, (mosi, miso))| {
                let start = start_ns + i as u64 * SLOT_NS;
                SpiByte::new(mosi, miso, start, start + SLOT_NS)
            })
            .collect();
        let end_ns = bytes.last().map_or(start_ns, |b| b.end_ns);

        Self::new(start_ns, end_ns, bytes)
    }

    /// True if no byte was exchanged while chip-select was asserted
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Number of exchanged bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Opcode byte (first host-sent byte), if any
    pub fn opcode(&self) -> Option<u8> {
        self.bytes.first().map(|b| b.mosi)
    }

    /// Host-sent bytes in bus order
    pub fn mosi(&self) -> Vec<u8> {
        self.bytes.iter().map(|b| b.mosi).collect()
    }

    /// Controller-returned bytes in bus order
    pub fn miso(&self) -> Vec<u8> {
        self.bytes.iter().map(|b| b.miso).collect()
    }

    /// Time bounds of the transaction: first byte start to last byte end, falling back
    /// to the chip-select bounds when no byte was exchanged
    pub fn time_bounds(&self) -> (u64, u64) {
        match (self.bytes.first(), self.bytes.last()) {
            (Some(first), Some(last)) => (first.start_ns, last.end_ns),
            _ => (self.start_ns, self.end_ns),
        }
    }
}

/// Anomalies found while decoding a transaction
///
/// Capture data can be cut short or corrupted; all of these are reported on the event
/// and never stop decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecodeWarning {
    /// Chip-select toggled without any byte being exchanged
    EmptyTransaction,
    /// The opcode byte matches no MCP2515 instruction
    UnknownOpcode { opcode: u8 },
    /// The transaction ended before a required field was transferred
    MissingField { field: &'static str },
    /// Bytes beyond what the instruction defines
    TrailingBytes { count: usize },
    /// The addressed register is outside the MCP2515 register map
    UnresolvedRegister { address: u16 },
    /// DLC nibble above 8; payload extraction is clamped to 8 bytes
    InvalidDlc { dlc: u8 },
    /// Fewer payload bytes were transferred than the DLC declares
    TruncatedFrame { expected: usize, actual: usize },
}

impl fmt::Display for DecodeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeWarning::EmptyTransaction => write!(f, "empty transaction"),
            DecodeWarning::UnknownOpcode { opcode } => write!(f, "unknown opcode 0x{:02X}", opcode),
            DecodeWarning::MissingField { field } => write!(f, "missing {}", field),
            DecodeWarning::TrailingBytes { count } => write!(f, "{} unexpected trailing byte(s)", count),
            DecodeWarning::UnresolvedRegister { address } => {
                write!(f, "register 0x{:02X} is outside the register map", address)
            }
            DecodeWarning::InvalidDlc { dlc } => write!(f, "invalid DLC {} (clamped to 8)", dlc),
            DecodeWarning::TruncatedFrame { expected, actual } => {
                write!(f, "truncated frame: {} of {} payload byte(s)", actual, expected)
            }
        }
    }
}

/// Errors that can occur while reading captures
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Failed to parse capture: {0}")]
    CaptureParseError(String),

    #[error("Unsupported capture format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Format bytes the way analyzer annotations show them: `0x12 0x34`
pub fn format_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}
