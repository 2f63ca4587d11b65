//! Instruction classification
//!
//! The first byte of every transaction is the opcode. Six instructions use a fixed
//! byte; the buffer instructions and RTS carry a buffer selector in their low bits.

use crate::catalog::RegisterRef;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const OP_RESET: u8 = 0b1100_0000;
pub const OP_READ: u8 = 0b0000_0011;
pub const OP_WRITE: u8 = 0b0000_0010;
pub const OP_READ_STATUS: u8 = 0b1010_0000;
pub const OP_RX_STATUS: u8 = 0b1011_0000;
pub const OP_BIT_MODIFY: u8 = 0b0000_0101;

/// READ RX BUFFER: `1001 0nm0`
const READ_RX_PREFIX: u8 = 0b1001_0000;
const READ_RX_MASK: u8 = 0b1111_1001;
/// LOAD TX BUFFER: `0100 0abc`, with `abc` up to 0b101
const LOAD_TX_PREFIX: u8 = 0b0100_0000;
const LOAD_TX_MASK: u8 = 0b1111_1000;
/// RTS: `1000 0nnn`
const RTS_PREFIX: u8 = 0b1000_0000;
const RTS_MASK: u8 = 0b1111_1000;

/// Base address (the CTRL register) of each transmit buffer
const TX_BUFFER_BASE: [u16; 3] = [0x30, 0x40, 0x50];
/// Base address (the CTRL register) of each receive buffer
const RX_BUFFER_BASE: [u16; 2] = [0x60, 0x70];

/// MCP2515 instruction kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionKind {
    Reset,
    Read,
    ReadRxBuffer,
    Write,
    WriteTxBuffer,
    RequestToSend,
    ReadStatus,
    RxStatus,
    BitModify,
    Unknown,
}

impl InstructionKind {
    /// All kinds, in datasheet order
    pub const ALL: [InstructionKind; 10] = [
        InstructionKind::Reset,
        InstructionKind::Read,
        InstructionKind::ReadRxBuffer,
        InstructionKind::Write,
        InstructionKind::WriteTxBuffer,
        InstructionKind::RequestToSend,
        InstructionKind::ReadStatus,
        InstructionKind::RxStatus,
        InstructionKind::BitModify,
        InstructionKind::Unknown,
    ];

    /// Instruction name as used in annotation labels
    pub fn name(&self) -> &'static str {
        match self {
            InstructionKind::Reset => "RESET",
            InstructionKind::Read => "READ",
            InstructionKind::ReadRxBuffer => "READ RX BUFFER",
            InstructionKind::Write => "WRITE",
            InstructionKind::WriteTxBuffer => "LOAD TX BUFFER",
            InstructionKind::RequestToSend => "RTS",
            InstructionKind::ReadStatus => "READ STATUS",
            InstructionKind::RxStatus => "RX STATUS",
            InstructionKind::BitModify => "BIT MODIFY",
            InstructionKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a buffer instruction starts inside the selected buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferStart {
    /// At SIDH: the full identifier, DLC and payload follow
    Header,
    /// At D0: payload only
    Data,
}

impl BufferStart {
    /// Offset of the start position within the 13-byte buffer layout
    pub fn layout_offset(&self) -> usize {
        match self {
            BufferStart::Header => 0,
            BufferStart::Data => 5,
        }
    }
}

/// Transmit or receive buffer selected by a buffer instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferSelect {
    /// Buffer index (0-2 for transmit, 0-1 for receive)
    pub buffer: u8,
    pub start: BufferStart,
}

impl BufferSelect {
    /// First register addressed by a READ RX BUFFER with this selector
    pub fn rx_start_register(&self) -> RegisterRef {
        Self::start_register(RX_BUFFER_BASE[self.buffer as usize & 1], self.start)
    }

    /// First register addressed by a LOAD TX BUFFER with this selector
    pub fn tx_start_register(&self) -> RegisterRef {
        Self::start_register(TX_BUFFER_BASE[(self.buffer as usize).min(2)], self.start)
    }

    fn start_register(base: u16, start: BufferStart) -> RegisterRef {
        // SIDH sits right after the CTRL register
        RegisterRef::resolve(base + 1 + start.layout_offset() as u16)
    }
}

/// Result of classifying an opcode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Reset,
    Read,
    Write,
    ReadStatus,
    RxStatus,
    BitModify,
    ReadRxBuffer(BufferSelect),
    WriteTxBuffer(BufferSelect),
    /// Bitmask over TX buffers 0-2
    RequestToSend(u8),
    Unknown(u8),
}

impl Opcode {
    /// Classify an opcode byte
    ///
    /// Exact opcodes are matched first, then the prefix-coded ones. Bytes matching no
    /// pattern classify as `Unknown`.
    pub fn classify(byte: u8) -> Self {
        match byte {
            OP_RESET => return Opcode::Reset,
            OP_READ => return Opcode::Read,
            OP_WRITE => return Opcode::Write,
            OP_READ_STATUS => return Opcode::ReadStatus,
            OP_RX_STATUS => return Opcode::RxStatus,
            OP_BIT_MODIFY => return Opcode::BitModify,
            _ => {}
        }

        if byte & READ_RX_MASK == READ_RX_PREFIX {
            return Opcode::ReadRxBuffer(BufferSelect {
                buffer: (byte >> 2) & 0x01,
                start: Self::buffer_start(byte & 0b10 != 0),
            });
        }

        if byte & LOAD_TX_MASK == LOAD_TX_PREFIX && byte & 0x07 <= 0b101 {
            return Opcode::WriteTxBuffer(BufferSelect {
                buffer: (byte >> 1) & 0x03,
                start: Self::buffer_start(byte & 0b01 != 0),
            });
        }

        if byte & RTS_MASK == RTS_PREFIX {
            return Opcode::RequestToSend(byte & 0x07);
        }

        Opcode::Unknown(byte)
    }

    fn buffer_start(at_data: bool) -> BufferStart {
        if at_data {
            BufferStart::Data
        } else {
            BufferStart::Header
        }
    }

    /// Instruction kind of this opcode
    pub fn kind(&self) -> InstructionKind {
        match self {
            Opcode::Reset => InstructionKind::Reset,
            Opcode::Read => InstructionKind::Read,
            Opcode::Write => InstructionKind::Write,
            Opcode::ReadStatus => InstructionKind::ReadStatus,
            Opcode::RxStatus => InstructionKind::RxStatus,
            Opcode::BitModify => InstructionKind::BitModify,
            Opcode::ReadRxBuffer(_) => InstructionKind::ReadRxBuffer,
            Opcode::WriteTxBuffer(_) => InstructionKind::WriteTxBuffer,
            Opcode::RequestToSend(_) => InstructionKind::RequestToSend,
            Opcode::Unknown(_) => InstructionKind::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_opcodes() {
        assert_eq!(Opcode::classify(0xC0), Opcode::Reset);
        assert_eq!(Opcode::classify(0x03), Opcode::Read);
        assert_eq!(Opcode::classify(0x02), Opcode::Write);
        assert_eq!(Opcode::classify(0xA0), Opcode::ReadStatus);
        assert_eq!(Opcode::classify(0xB0), Opcode::RxStatus);
        assert_eq!(Opcode::classify(0x05), Opcode::BitModify);
    }

    #[test]
    fn test_read_rx_buffer_selectors() {
        let expected = [
            (0x90, 0, BufferStart::Header, "RXB0SIDH"),
            (0x92, 0, BufferStart::Data, "RXB0D0"),
            (0x94, 1, BufferStart::Header, "RXB1SIDH"),
            (0x96, 1, BufferStart::Data, "RXB1D0"),
        ];
        for (byte, buffer, start, register) in expected {
            match Opcode::classify(byte) {
                Opcode::ReadRxBuffer(select) => {
                    assert_eq!(select.buffer, buffer);
                    assert_eq!(select.start, start);
                    assert_eq!(select.rx_start_register().name, Some(register));
                }
                other => panic!("0x{:02X} classified as {:?}", byte, other),
            }
        }
    }

    #[test]
    fn test_load_tx_buffer_selectors() {
        let expected = [
            (0x40, 0, BufferStart::Header, "TXB0SIDH"),
            (0x41, 0, BufferStart::Data, "TXB0D0"),
            (0x42, 1, BufferStart::Header, "TXB1SIDH"),
            (0x43, 1, BufferStart::Data, "TXB1D0"),
            (0x44, 2, BufferStart::Header, "TXB2SIDH"),
            (0x45, 2, BufferStart::Data, "TXB2D0"),
        ];
        for (byte, buffer, start, register) in expected {
            match Opcode::classify(byte) {
                Opcode::WriteTxBuffer(select) => {
                    assert_eq!(select.buffer, buffer);
                    assert_eq!(select.start, start);
                    assert_eq!(select.tx_start_register().name, Some(register));
                }
                other => panic!("0x{:02X} classified as {:?}", byte, other),
            }
        }
    }

    #[test]
    fn test_request_to_send() {
        assert_eq!(Opcode::classify(0x81), Opcode::RequestToSend(0b001));
        assert_eq!(Opcode::classify(0x87), Opcode::RequestToSend(0b111));
        assert_eq!(Opcode::classify(0x80), Opcode::RequestToSend(0));
    }

    #[test]
    fn test_unknown_opcodes() {
        for byte in [0xFF, 0x00, 0x46, 0x47, 0x91, 0x98, 0x88, 0x04] {
            assert_eq!(Opcode::classify(byte), Opcode::Unknown(byte));
            assert_eq!(Opcode::classify(byte).kind(), InstructionKind::Unknown);
        }
    }

    #[test]
    fn test_every_byte_classifies() {
        let known = (0..=255u8)
            .filter(|&b| Opcode::classify(b).kind() != InstructionKind::Unknown)
            .count();
        // 6 exact + 4 RX buffer + 6 TX buffer + 8 RTS
        assert_eq!(known, 24);
    }
}
