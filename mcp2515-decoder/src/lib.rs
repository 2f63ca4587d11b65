//! MCP2515 SPI Decoder Library
//!
//! A stateless, reusable library for decoding SPI traffic exchanged with an MCP2515
//! CAN controller into labeled protocol events.
//!
//! # Architecture
//!
//! Decoding starts from chip-select bounded transactions (ordered MOSI/MISO byte
//! pairs with timestamps) and proceeds in stages:
//! - The opcode byte is classified into an instruction kind
//! - One decoder per instruction consumes the remaining bytes, resolving register
//!   addresses and bit fields through a static catalog
//! - Buffer instructions rebuild the CAN frame held in the transmit/receive buffer
//! - Everything is assembled into one `OutputEvent` per transaction
//!
//! Truncated, unknown or malformed transactions still produce an event; anomalies are
//! attached to it as warnings instead of aborting the run.
//!
//! The library does NOT:
//! - Sample or frame the electrical SPI signals
//! - Render annotations
//! - Interpret application-defined CAN payloads
//!
//! Reporting is in the application layer (mcp2515-cli).
//!
//! # Example Usage
//!
//! ```
//! use mcp2515_decoder::{Decoder, DecoderConfig, RawTransaction};
//!
//! let decoder = Decoder::with_config(DecoderConfig::new().with_segments(false));
//!
//! let transactions = vec![
//!     RawTransaction::from_mosi(0, &[0xC0]),
//!     RawTransaction::from_mosi(10_000, &[0x02, 0x0E, 0x80]),
//! ];
//!
//! for event in decoder.decode_all(transactions) {
//!     println!("{:>10} ns  {}", event.start_ns, event.label);
//!     for line in event.detail_lines() {
//!         println!("              {}", line);
//!     }
//! }
//! ```

// Public modules
pub mod catalog;
pub mod config;
pub mod decoder;
pub mod event;
pub mod formats;
pub mod frame_assembler;
pub mod instruction;
pub mod instruction_decoder;
pub mod types;

// Re-export main types for convenience
pub use catalog::RegisterRef;
pub use config::DecoderConfig;
pub use decoder::Decoder;
pub use event::{OutputEvent, Segment, SegmentKind};
pub use frame_assembler::{CanFrame, CanId};
pub use instruction::{BufferSelect, BufferStart, InstructionKind, Opcode};
pub use instruction_decoder::{DecodedInstruction, FieldEdit, RegisterValue, StatusByte};
pub use types::{DecodeWarning, DecoderError, RawTransaction, Result, SpiByte};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: a reset decodes cleanly
        let decoder = Decoder::new();
        let event = decoder.decode_transaction(&RawTransaction::from_mosi(0, &[0xC0]));
        assert_eq!(event.kind(), InstructionKind::Reset);
        assert!(!event.has_warnings());
    }
}
