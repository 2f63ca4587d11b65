//! Capture readers (CSV, JSON)
//!
//! The decoder starts from chip-select bounded transactions. Captures exported from an
//! SPI analyzer are a flat stream of frames instead: `enable` when chip-select
//! asserts, one `result` per byte, `disable` when it deasserts. `TransactionFramer`
//! groups that stream into transactions; the format modules feed it.

use crate::types::{DecoderError, RawTransaction, Result, SpiByte};
use std::path::Path;

pub mod csv;
pub mod json;

pub use self::csv::CsvCaptureReader;
pub use self::json::JsonCaptureReader;

/// One frame of an SPI analyzer stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpiFrame {
    /// Chip-select asserted
    Enable { time_ns: u64 },
    /// One byte exchanged
    Result(SpiByte),
    /// Chip-select deasserted
    Disable { time_ns: u64 },
}

/// Groups an SPI frame stream into transactions
#[derive(Debug, Default)]
pub struct TransactionFramer {
    open: Option<RawTransaction>,
}

impl TransactionFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one frame; returns a transaction when one is closed
    pub fn push(&mut self, frame: SpiFrame) -> Option<RawTransaction> {
        match frame {
            SpiFrame::Enable { time_ns } => {
                let previous = self.open.take();
                if previous.is_some() {
                    log::debug!("Enable at {} ns without disable, closing previous transaction", time_ns);
                }
                self.open = Some(RawTransaction::new(time_ns, time_ns, Vec::new()));
                previous.map(Self::close_unterminated)
            }
            SpiFrame::Result(byte) => {
                let transaction = self.open.get_or_insert_with(|| {
                    log::debug!("Byte at {} ns outside chip-select, opening transaction", byte.start_ns);
                    RawTransaction::new(byte.start_ns, byte.start_ns, Vec::new())
                });
                transaction.end_ns = transaction.end_ns.max(byte.end_ns);
                transaction.bytes.push(byte);
                None
            }
            SpiFrame::Disable { time_ns } => match self.open.take() {
                Some(mut transaction) => {
                    transaction.end_ns = transaction.end_ns.max(time_ns);
                    Some(transaction)
                }
                None => {
                    log::trace!("Disable at {} ns without enable, ignored", time_ns);
                    None
                }
            },
        }
    }

    /// Close the transaction still open at end of capture, if any
    pub fn finish(&mut self) -> Option<RawTransaction> {
        self.open.take().map(Self::close_unterminated)
    }

    fn close_unterminated(transaction: RawTransaction) -> RawTransaction {
        log::debug!("Transaction at {} ns closed without disable", transaction.start_ns);
        transaction
    }

    /// Frame a whole stream
    pub fn frame_all(frames: impl IntoIterator<Item = SpiFrame>) -> Vec<RawTransaction> {
        let mut framer = Self::new();
        let mut transactions: Vec<RawTransaction> =
            frames.into_iter().filter_map(|frame| framer.push(frame)).collect();
        transactions.extend(framer.finish());
        transactions
    }
}

/// Supported capture file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    /// SPI analyzer frame export
    Csv,
    /// Array of transactions
    Json,
}

impl CaptureFormat {
    /// Detect the format from the file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(CaptureFormat::Csv),
            Some("json") => Ok(CaptureFormat::Json),
            _ => Err(DecoderError::UnsupportedFormat(format!("{:?}", extension))),
        }
    }
}

/// Read all transactions from a capture file
pub fn read_capture(path: &Path) -> Result<Vec<RawTransaction>> {
    log::info!("Reading capture: {:?}", path);

    let transactions = match CaptureFormat::from_path(path)? {
        CaptureFormat::Csv => CsvCaptureReader::read_file(path)?,
        CaptureFormat::Json => JsonCaptureReader::read_file(path)?,
    };

    log::info!("Read {} transactions from {:?}", transactions.len(), path);
    Ok(transactions)
}

/// Convert analyzer seconds to nanoseconds; times before the trigger clamp to zero
pub(crate) fn seconds_to_ns(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1e9).round() as u64
}
