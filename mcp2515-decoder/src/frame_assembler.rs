//! CAN frame reconstruction from MCP2515 buffer bytes
//!
//! Transmit and receive buffers share one 13-byte layout:
//!
//! ```text
//! offset  0     1     2     3     4    5..=12
//!         SIDH  SIDL  EID8  EID0  DLC  D0..D7
//! ```
//!
//! Buffer instructions may start at SIDH or skip straight to D0, and the transaction
//! may end anywhere, so the assembler works on whatever bytes were transferred and
//! never fails.

use crate::instruction::BufferStart;
use crate::types::DecodeWarning;
use serde::Serialize;
use std::fmt;

/// Size of the buffer layout starting at SIDH
pub const BUFFER_LAYOUT_LEN: usize = 13;
/// Bytes before the payload (SIDH, SIDL, EID8, EID0, DLC)
pub const HEADER_LEN: usize = 5;
/// Maximum payload length of a classic CAN frame
pub const CAN_MAX_DLEN: usize = 8;

/// SIDL: extended identifier enable (EXIDE on transmit, IDE on receive)
const SIDL_EXIDE: u8 = 1 << 3;
/// SIDL: standard remote request, receive buffers only
const SIDL_SRR: u8 = 1 << 4;
/// SIDL: identifier extension bits 17..16
const SIDL_EID_MASK: u8 = 0x03;
/// DLC: remote transmission request
const DLC_RTR: u8 = 1 << 6;
/// DLC: data length code nibble
const DLC_MASK: u8 = 0x0F;

/// Which side of the controller the buffer belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferDirection {
    Receive,
    Transmit,
}

/// CAN identifier as stored in the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "format", content = "value", rename_all = "snake_case")]
pub enum CanId {
    /// 11-bit identifier
    Standard(u16),
    /// 29-bit identifier
    Extended(u32),
}

impl CanId {
    /// Raw identifier value
    pub fn raw(&self) -> u32 {
        match self {
            CanId::Standard(id) => *id as u32,
            CanId::Extended(id) => *id,
        }
    }

    /// True for a 29-bit identifier
    pub fn is_extended(&self) -> bool {
        matches!(self, CanId::Extended(_))
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanId::Standard(id) => write!(f, "0x{:03X}", id),
            CanId::Extended(id) => write!(f, "0x{:08X}", id),
        }
    }
}

/// A CAN frame rebuilt from buffer bytes
///
/// Header fields are `None` when the instruction started at D0 or the transaction
/// ended before they were transferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CanFrame {
    /// Where the transfer started inside the buffer
    pub start: BufferStart,
    pub id: Option<CanId>,
    /// Remote transmission request
    pub rtr: Option<bool>,
    /// Raw DLC nibble, including invalid values 9-15
    pub dlc: Option<u8>,
    /// Payload bytes actually transferred
    pub payload: Vec<u8>,
    /// True if fewer bytes were transferred than the frame declares
    pub truncated: bool,
}

impl CanFrame {
    /// Payload length declared by the DLC, clamped to 8
    pub fn data_length(&self) -> Option<usize> {
        self.dlc.map(dlc_to_len)
    }

    /// True for a 29-bit identifier
    pub fn is_extended(&self) -> Option<bool> {
        self.id.map(|id| id.is_extended())
    }
}

impl fmt::Display for CanFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "ID {}", id)?,
            None => write!(f, "ID ?")?,
        }
        match self.dlc {
            Some(dlc) => write!(f, " [{}]", dlc)?,
            None => write!(f, " [?]")?,
        }
        if self.rtr == Some(true) {
            write!(f, " remote request")?;
        } else if !self.payload.is_empty() {
            let data = self
                .payload
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            write!(f, " {}", data)?;
        }
        if self.truncated {
            write!(f, " (truncated)")?;
        }
        Ok(())
    }
}

/// Convert a DLC nibble to a payload length
pub fn dlc_to_len(dlc: u8) -> usize {
    (dlc as usize).min(CAN_MAX_DLEN)
}

/// Output of one assembly
#[derive(Debug, Clone, PartialEq)]
pub struct Assembled {
    pub frame: CanFrame,
    /// Bytes that fell inside the buffer layout
    pub consumed: usize,
    pub warnings: Vec<DecodeWarning>,
}

/// Rebuilds CAN frames from buffer instruction bytes
pub struct FrameAssembler;

impl FrameAssembler {
    /// Assemble a frame from bytes transferred starting at `start`
    ///
    /// # Arguments
    /// * `bytes` - Buffer bytes in transfer order (after the opcode)
    /// * `start` - Position of the first byte in the buffer layout
    /// * `direction` - Receive buffers also carry the standard remote flag in SIDL
    pub fn assemble(bytes: &[u8], start: BufferStart, direction: BufferDirection) -> Assembled {
        let offset = start.layout_offset();
        let consumed = bytes.len().min(BUFFER_LAYOUT_LEN - offset);
        let bytes = &bytes[..consumed];
        let mut warnings = Vec::new();

        let frame = match start {
            BufferStart::Header => Self::assemble_full(bytes, direction, &mut warnings),
            BufferStart::Data => CanFrame {
                start,
                id: None,
                rtr: None,
                dlc: None,
                payload: bytes.to_vec(),
                truncated: false,
            },
        };

        log::trace!("Assembled frame: {}", frame);

        Assembled {
            frame,
            consumed,
            warnings,
        }
    }

    fn assemble_full(
        bytes: &[u8],
        direction: BufferDirection,
        warnings: &mut Vec<DecodeWarning>,
    ) -> CanFrame {
        let id = match bytes {
            [sidh, sidl, rest @ ..] => Self::decode_id(*sidh, *sidl, rest),
            _ => None,
        };
        let dlc_byte = bytes.get(4).copied();

        if bytes.len() < HEADER_LEN {
            warnings.push(DecodeWarning::MissingField { field: "frame header" });
        }

        let dlc = dlc_byte.map(|b| b & DLC_MASK);
        // Receive buffers flag standard remote frames in SIDL.SRR; DLC.RTR only
        // applies to extended frames there.
        let rtr = dlc_byte.map(|b| match (direction, id) {
            (BufferDirection::Receive, Some(CanId::Standard(_))) => bytes[1] & SIDL_SRR != 0,
            _ => b & DLC_RTR != 0,
        });

        let available = &bytes[bytes.len().min(HEADER_LEN)..];
        let (payload, truncated) = match dlc {
            Some(dlc) => {
                if dlc as usize > CAN_MAX_DLEN {
                    warnings.push(DecodeWarning::InvalidDlc { dlc });
                }
                let payload: Vec<u8> = available.iter().take(dlc_to_len(dlc)).copied().collect();
                // Remote frames carry no data
                let expected = if rtr == Some(true) { 0 } else { dlc_to_len(dlc) };
                let truncated = payload.len() < expected;
                if truncated {
                    warnings.push(DecodeWarning::TruncatedFrame {
                        expected,
                        actual: payload.len(),
                    });
                }
                (payload, truncated)
            }
            None => (Vec::new(), true),
        };

        CanFrame {
            start: BufferStart::Header,
            id,
            rtr,
            dlc,
            payload,
            truncated,
        }
    }

    /// Build the identifier from SIDH, SIDL and, for extended frames, EID8/EID0
    fn decode_id(sidh: u8, sidl: u8, rest: &[u8]) -> Option<CanId> {
        let standard = ((sidh as u16) << 3) | ((sidl as u16) >> 5);

        if sidl & SIDL_EXIDE == 0 {
            return Some(CanId::Standard(standard));
        }

        match rest {
            [eid8, eid0, ..] => {
                let extension = (((sidl & SIDL_EID_MASK) as u32) << 16)
                    | ((*eid8 as u32) << 8)
                    | *eid0 as u32;
                Some(CanId::Extended(((standard as u32) << 18) | extension))
            }
            _ => None,
        }
    }
}
