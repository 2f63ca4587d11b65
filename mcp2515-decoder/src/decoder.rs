//! Main decoder API
//!
//! This module provides the primary interface for the decoder library.
//! The Decoder struct holds the configuration and turns transactions, or whole
//! capture files, into output events.

use crate::config::DecoderConfig;
use crate::event::{EventEmitter, OutputEvent};
use crate::instruction_decoder::InstructionDecoder;
use crate::types::{RawTransaction, Result};
use std::path::Path;

/// The main decoder struct - entry point for all decoding operations
///
/// Decoding keeps no state between transactions, so a `Decoder` can be shared by
/// reference across threads.
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a new decoder with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with a custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode one transaction into exactly one event
    ///
    /// # Example
    /// ```
    /// use mcp2515_decoder::{Decoder, RawTransaction};
    ///
    /// let decoder = Decoder::new();
    /// let event = decoder.decode_transaction(&RawTransaction::from_mosi(0, &[0x02, 0x0E, 0x80]));
    /// assert_eq!(event.label, "WRITE CANCTRL");
    /// ```
    pub fn decode_transaction(&self, transaction: &RawTransaction) -> OutputEvent {
        let decoded = InstructionDecoder::decode(transaction, &self.config);
        log::debug!(
            "{} ns: {} ({} bytes)",
            transaction.start_ns,
            decoded.instruction.kind(),
            transaction.len()
        );
        EventEmitter::emit(transaction, decoded, &self.config)
    }

    /// Decode a sequence of transactions, one event each, in input order
    ///
    /// The kind filter is not applied here; every transaction yields its event.
    pub fn decode_all<'a, I>(&'a self, transactions: I) -> impl Iterator<Item = OutputEvent> + 'a
    where
        I: IntoIterator<Item = RawTransaction>,
        I::IntoIter: 'a,
    {
        DecodingIterator::new(transactions.into_iter(), self)
    }

    /// Decode a capture file and return an iterator of events
    ///
    /// The format is chosen by extension (`.csv`, `.json`). Events are filtered by
    /// the configured instruction kinds.
    ///
    /// # Example
    /// ```no_run
    /// use mcp2515_decoder::Decoder;
    /// use std::path::Path;
    ///
    /// let decoder = Decoder::new();
    /// for event in decoder.decode_file(Path::new("capture.csv")).unwrap() {
    ///     println!("{} {}", event.start_ns, event.label);
    /// }
    /// ```
    pub fn decode_file(&self, path: &Path) -> Result<Box<dyn Iterator<Item = OutputEvent> + '_>> {
        log::info!("Decoding capture: {:?}", path);

        let transactions = crate::formats::read_capture(path)?;
        let events = DecodingIterator::new(transactions.into_iter(), self)
            .filter(move |event| self.config.should_emit(event.kind()));

        Ok(Box::new(events))
    }
}

/// Iterator that decodes transactions into events
struct DecodingIterator<'a, I>
where
    I: Iterator<Item = RawTransaction>,
{
    transactions: I,
    decoder: &'a Decoder,
}

impl<'a, I> DecodingIterator<'a, I>
where
    I: Iterator<Item = RawTransaction>,
{
    fn new(transactions: I, decoder: &'a Decoder) -> Self {
        Self {
            transactions,
            decoder,
        }
    }
}

impl<'a, I> Iterator for DecodingIterator<'a, I>
where
    I: Iterator<Item = RawTransaction>,
{
    type Item = OutputEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let transaction = self.transactions.next()?;
        Some(self.decoder.decode_transaction(&transaction))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.transactions.size_hint()
    }
}
