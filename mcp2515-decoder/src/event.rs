//! Output events
//!
//! Each transaction produces exactly one `OutputEvent`: the decoded instruction, the
//! frame rebuilt by buffer instructions, any warnings, and the time bounds taken from
//! the transaction's bytes. Events also carry per-field segments (opcode, register,
//! mask, data) so a display layer can annotate the individual bytes.

use crate::catalog::{self, RegisterRef};
use crate::config::DecoderConfig;
use crate::frame_assembler::{CanFrame, CanId};
use crate::instruction::InstructionKind;
use crate::instruction_decoder::{Decoded, DecodedInstruction, RegisterValue, StatusByte};
use crate::types::{format_bytes, DecodeWarning, RawTransaction};
use serde::Serialize;

/// Which part of an instruction a segment covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    Instruction,
    Register,
    Mask,
    Data,
}

/// Sub-annotation covering one field of an instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start_ns: u64,
    pub end_ns: u64,
    pub text: String,
}

/// One decoded transaction, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputEvent {
    pub start_ns: u64,
    pub end_ns: u64,
    /// Short label: instruction name plus key parameter
    pub label: String,
    pub instruction: DecodedInstruction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame: Option<CanFrame>,
    pub warnings: Vec<DecodeWarning>,
    /// Host-sent bytes, opcode included
    pub mosi: Vec<u8>,
    /// Controller-returned bytes
    pub miso: Vec<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<Segment>,
}

impl OutputEvent {
    pub fn kind(&self) -> InstructionKind {
        self.instruction.kind()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Event duration in nanoseconds
    pub fn duration_ns(&self) -> u64 {
        self.end_ns.saturating_sub(self.start_ns)
    }

    /// Human-readable detail lines (registers, fields, frame, warnings)
    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();

        match &self.instruction {
            DecodedInstruction::Reset => {}
            DecodedInstruction::Read { registers, .. }
            | DecodedInstruction::Write { registers, .. }
            | DecodedInstruction::ReadRxBuffer { registers, .. }
            | DecodedInstruction::WriteTxBuffer { registers, .. } => {
                lines.extend(registers.iter().map(register_line));
            }
            DecodedInstruction::RequestToSend { buffers } => {
                lines.push(format!("buffers: {}", rts_buffers(buffers)));
            }
            DecodedInstruction::ReadStatus { status } => {
                lines.push(status_line(status));
            }
            DecodedInstruction::RxStatus { status, info } => {
                lines.push(status_line(status));
                if let Some(info) = info {
                    lines.push(info.to_string());
                }
            }
            DecodedInstruction::BitModify { register, edit } => {
                if let Some(register) = register {
                    lines.push(format!("register {} (0x{:02X})", register, register.address));
                }
                lines.push(format!("mask {}", optional_byte(edit.mask)));
                lines.push(format!("data {}", optional_byte(edit.data)));
                if let (Some(register), Some(mask), Some(data)) = (register, edit.mask, edit.data) {
                    let changes: Vec<String> = register
                        .name
                        .map(|name| catalog::decode_fields(name, data))
                        .unwrap_or_default()
                        .into_iter()
                        .filter(|field| mask & (1 << field.bit) != 0)
                        .map(|field| format!("{}={}", field.name, u8::from(field.set)))
                        .collect();
                    if !changes.is_empty() {
                        lines.push(format!("fields: {}", changes.join(" ")));
                    }
                }
            }
            DecodedInstruction::Unknown { .. } => {
                lines.push(format!("mosi: {}", format_bytes(&self.mosi)));
                lines.push(format!("miso: {}", format_bytes(&self.miso)));
            }
        }

        if let Some(frame) = &self.frame {
            lines.push(frame_line(frame));
        }

        lines.extend(self.warnings.iter().map(|w| format!("warning: {}", w)));
        lines
    }
}

fn optional_byte(value: Option<u8>) -> String {
    match value {
        Some(value) => format!("0x{:02X}", value),
        None => "absent".to_string(),
    }
}

fn register_line(value: &RegisterValue) -> String {
    let mut line = format!(
        "{} (0x{:02X}) = 0x{:02X}",
        value.register, value.register.address, value.value
    );
    if let Some(name) = value.register.name {
        let set: Vec<&str> = catalog::decode_fields(name, value.value)
            .into_iter()
            .filter(|field| field.set)
            .map(|field| field.name)
            .collect();
        if !set.is_empty() {
            line.push_str(&format!(" [{}]", set.join(" ")));
        }
    }
    line
}

fn status_line(status: &StatusByte) -> String {
    match status.raw {
        Some(raw) => format!("status 0x{:02X}: {}", raw, status.set_flags().join(" ")),
        None => "status absent: all flags unknown".to_string(),
    }
}

fn rts_buffers(buffers: &[u8]) -> String {
    if buffers.is_empty() {
        return "none".to_string();
    }
    buffers
        .iter()
        .map(|b| format!("TXB{}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

fn frame_line(frame: &CanFrame) -> String {
    let format = match frame.id {
        Some(CanId::Standard(_)) => " standard",
        Some(CanId::Extended(_)) => " extended",
        None => "",
    };
    let dlc_note = match frame.dlc {
        Some(dlc) if dlc > 8 => " (invalid DLC)",
        _ => "",
    };
    format!("frame{}: {}{}", format, frame, dlc_note)
}

/// Builds the short label for an instruction
pub fn label(instruction: &DecodedInstruction) -> String {
    let name = instruction.kind().name();

    match instruction {
        DecodedInstruction::Reset
        | DecodedInstruction::ReadStatus { .. }
        | DecodedInstruction::RxStatus { .. } => name.to_string(),
        DecodedInstruction::Read { start, registers }
        | DecodedInstruction::Write { start, registers } => match start {
            Some(start) => format!("{} {}", name, register_range(*start, registers)),
            None => name.to_string(),
        },
        DecodedInstruction::ReadRxBuffer { select, registers } => {
            format!("{} {}", name, register_range(select.rx_start_register(), registers))
        }
        DecodedInstruction::WriteTxBuffer { select, registers } => {
            format!("{} {}", name, register_range(select.tx_start_register(), registers))
        }
        DecodedInstruction::RequestToSend { buffers } => format!("{} {}", name, rts_buffers(buffers)),
        DecodedInstruction::BitModify { register, .. } => match register {
            Some(register) => format!("{} {}", name, register),
            None => name.to_string(),
        },
        DecodedInstruction::Unknown { opcode } => match opcode {
            Some(opcode) => format!("{} 0x{:02X}", name, opcode),
            None => name.to_string(),
        },
    }
}

/// `FIRST..LAST` over the touched registers, or just the start register
fn register_range(start: RegisterRef, registers: &[RegisterValue]) -> String {
    match (registers.first(), registers.last()) {
        (Some(first), Some(last)) if registers.len() > 1 => {
            format!("{}..{}", first.register, last.register)
        }
        _ => start.to_string(),
    }
}

/// Assembles output events from decoded transactions
pub struct EventEmitter;

impl EventEmitter {
    /// Combine a decoded instruction with its transaction into one event
    pub fn emit(transaction: &RawTransaction, decoded: Decoded, config: &DecoderConfig) -> OutputEvent {
        let (start_ns, end_ns) = transaction.time_bounds();
        let segments = if config.include_segments {
            Self::segments(transaction, &decoded.instruction)
        } else {
            Vec::new()
        };

        OutputEvent {
            start_ns,
            end_ns,
            label: label(&decoded.instruction),
            instruction: decoded.instruction,
            frame: decoded.frame,
            warnings: decoded.warnings,
            mosi: transaction.mosi(),
            miso: transaction.miso(),
            segments,
        }
    }

    /// Split the transaction into instruction, register, mask and data segments
    fn segments(transaction: &RawTransaction, instruction: &DecodedInstruction) -> Vec<Segment> {
        let bytes = &transaction.bytes;
        let Some(first) = bytes.first() else {
            return Vec::new();
        };

        let mut segments = vec![Segment {
            kind: SegmentKind::Instruction,
            start_ns: first.start_ns,
            end_ns: first.end_ns,
            text: instruction.kind().name().to_string(),
        }];

        let (has_address, has_mask, reads_miso) = match instruction {
            DecodedInstruction::Read { .. } => (true, false, true),
            DecodedInstruction::Write { .. } => (true, false, false),
            DecodedInstruction::BitModify { .. } => (true, true, false),
            DecodedInstruction::ReadRxBuffer { .. }
            | DecodedInstruction::ReadStatus { .. }
            | DecodedInstruction::RxStatus { .. } => (false, false, true),
            _ => (false, false, false),
        };

        let mut index = 1;
        if has_address {
            if let Some(byte) = bytes.get(index) {
                segments.push(Segment {
                    kind: SegmentKind::Register,
                    start_ns: byte.start_ns,
                    end_ns: byte.end_ns,
                    text: RegisterRef::resolve(byte.mosi as u16).to_string(),
                });
                index += 1;
            }
        }
        if has_mask {
            if let Some(byte) = bytes.get(index) {
                segments.push(Segment {
                    kind: SegmentKind::Mask,
                    start_ns: byte.start_ns,
                    end_ns: byte.end_ns,
                    text: format!("Mask: 0x{:02X}", byte.mosi),
                });
                index += 1;
            }
        }

        if let (Some(data), Some(last)) = (bytes.get(index..), bytes.last()) {
            if let Some(data_first) = data.first() {
                let values: Vec<u8> = data
                    .iter()
                    .map(|b| if reads_miso { b.miso } else { b.mosi })
                    .collect();
                segments.push(Segment {
                    kind: SegmentKind::Data,
                    start_ns: data_first.start_ns,
                    end_ns: last.end_ns,
                    text: format!("Data: {}", format_bytes(&values)),
                });
            }
        }

        segments
    }
}
