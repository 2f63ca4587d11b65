//! Instruction decoding engine
//!
//! Turns the bytes of one chip-select bounded transaction into a typed instruction.
//! The length of an instruction is never encoded on the bus: chip-select deassertion
//! ends it. Every decoder therefore works on whatever bytes are available, reports
//! missing fields as absent and surplus bytes as warnings.
//!
//! Host-driven fields (addresses, mask, written data) come from MOSI; anything the
//! controller returns (read data, status bytes) comes from MISO.

use crate::catalog::{self, RegisterRef, READ_STATUS_REGISTER, RX_STATUS_REGISTER};
use crate::config::DecoderConfig;
use crate::frame_assembler::{BufferDirection, CanFrame, FrameAssembler};
use crate::instruction::{BufferSelect, InstructionKind, Opcode};
use crate::types::{DecodeWarning, RawTransaction};
use serde::Serialize;
use std::fmt;

/// A register touched by a READ/WRITE or buffer instruction, with the byte moved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterValue {
    pub register: RegisterRef,
    pub value: u8,
}

/// Mask and data of a BIT MODIFY instruction
///
/// Either byte is `None` when the transaction ended before it was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FieldEdit {
    pub mask: Option<u8>,
    pub data: Option<u8>,
}

impl FieldEdit {
    pub fn new(mask: u8, data: u8) -> Self {
        Self {
            mask: Some(mask),
            data: Some(data),
        }
    }

    /// Register value after the edit: masked bits come from `data`, the rest are kept
    ///
    /// Returns `None` for a truncated edit.
    pub fn apply(&self, current: u8) -> Option<u8> {
        let (mask, data) = (self.mask?, self.data?);
        Some((current & !mask) | (data & mask))
    }

    pub fn is_complete(&self) -> bool {
        self.mask.is_some() && self.data.is_some()
    }
}

/// One named bit of a status byte
///
/// `set` is `None` when the status byte was never transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusFlag {
    pub bit: u8,
    pub name: &'static str,
    pub set: Option<bool>,
}

/// Status byte returned by READ STATUS or RX STATUS
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusByte {
    /// Raw byte, `None` if the transaction ended before the response
    pub raw: Option<u8>,
    /// Every named bit, most significant first
    pub flags: Vec<StatusFlag>,
}

impl StatusByte {
    fn resolve(register: &'static str, raw: Option<u8>) -> Self {
        let flags = (0..8u8)
            .rev()
            .filter_map(|bit| {
                catalog::field_name(register, bit).map(|name| StatusFlag {
                    bit,
                    name,
                    set: raw.map(|value| value & (1 << bit) != 0),
                })
            })
            .collect();
        Self { raw, flags }
    }

    /// Names of the bits that are set
    pub fn set_flags(&self) -> Vec<&'static str> {
        self.flags
            .iter()
            .filter(|flag| flag.set == Some(true))
            .map(|flag| flag.name)
            .collect()
    }
}

/// RX STATUS bits 7..6: buffers holding a received message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceivedBuffers {
    None,
    Rxb0,
    Rxb1,
    Both,
}

/// RX STATUS bits 4..3: type of the received message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RxMessageType {
    StandardData,
    StandardRemote,
    ExtendedData,
    ExtendedRemote,
}

/// RX STATUS decoded into its three fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RxStatusInfo {
    pub received: ReceivedBuffers,
    pub message_type: RxMessageType,
    /// Filter match code, bits 2..0
    pub filter: u8,
}

impl RxStatusInfo {
    pub fn from_byte(value: u8) -> Self {
        let received = match value >> 6 {
            0 => ReceivedBuffers::None,
            1 => ReceivedBuffers::Rxb0,
            2 => ReceivedBuffers::Rxb1,
            _ => ReceivedBuffers::Both,
        };
        let message_type = match (value >> 3) & 0x03 {
            0 => RxMessageType::StandardData,
            1 => RxMessageType::StandardRemote,
            2 => RxMessageType::ExtendedData,
            _ => RxMessageType::ExtendedRemote,
        };
        Self {
            received,
            message_type,
            filter: value & 0x07,
        }
    }

    /// Filter that accepted the message
    pub fn filter_name(&self) -> &'static str {
        match self.filter {
            0 => "RXF0",
            1 => "RXF1",
            2 => "RXF2",
            3 => "RXF3",
            4 => "RXF4",
            5 => "RXF5",
            6 => "RXF0 (rollover to RXB1)",
            _ => "RXF1 (rollover to RXB1)",
        }
    }
}

impl fmt::Display for RxStatusInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received {:?}, {:?}, filter {}",
            self.received,
            self.message_type,
            self.filter_name()
        )
    }
}

/// A decoded MCP2515 instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "instruction", rename_all = "snake_case")]
pub enum DecodedInstruction {
    Reset,
    Read {
        /// Start address, `None` if the transaction ended after the opcode
        start: Option<RegisterRef>,
        /// Registers read, in auto-increment order
        registers: Vec<RegisterValue>,
    },
    Write {
        start: Option<RegisterRef>,
        registers: Vec<RegisterValue>,
    },
    ReadRxBuffer {
        select: BufferSelect,
        registers: Vec<RegisterValue>,
    },
    WriteTxBuffer {
        select: BufferSelect,
        registers: Vec<RegisterValue>,
    },
    RequestToSend {
        /// Indices of the transmit buffers requested
        buffers: Vec<u8>,
    },
    ReadStatus {
        status: StatusByte,
    },
    RxStatus {
        status: StatusByte,
        info: Option<RxStatusInfo>,
    },
    BitModify {
        register: Option<RegisterRef>,
        edit: FieldEdit,
    },
    Unknown {
        /// Opcode byte, `None` for an empty transaction
        opcode: Option<u8>,
    },
}

impl DecodedInstruction {
    pub fn kind(&self) -> InstructionKind {
        match self {
            DecodedInstruction::Reset => InstructionKind::Reset,
            DecodedInstruction::Read { .. } => InstructionKind::Read,
            DecodedInstruction::Write { .. } => InstructionKind::Write,
            DecodedInstruction::ReadRxBuffer { .. } => InstructionKind::ReadRxBuffer,
            DecodedInstruction::WriteTxBuffer { .. } => InstructionKind::WriteTxBuffer,
            DecodedInstruction::RequestToSend { .. } => InstructionKind::RequestToSend,
            DecodedInstruction::ReadStatus { .. } => InstructionKind::ReadStatus,
            DecodedInstruction::RxStatus { .. } => InstructionKind::RxStatus,
            DecodedInstruction::BitModify { .. } => InstructionKind::BitModify,
            DecodedInstruction::Unknown { .. } => InstructionKind::Unknown,
        }
    }

    /// Registers touched in order, empty for instructions without register access
    pub fn registers(&self) -> &[RegisterValue] {
        match self {
            DecodedInstruction::Read { registers, .. }
            | DecodedInstruction::Write { registers, .. }
            | DecodedInstruction::ReadRxBuffer { registers, .. }
            | DecodedInstruction::WriteTxBuffer { registers, .. } => registers,
            _ => &[],
        }
    }
}

/// Everything decoded from one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub instruction: DecodedInstruction,
    /// Frame rebuilt by READ RX BUFFER / LOAD TX BUFFER
    pub frame: Option<CanFrame>,
    pub warnings: Vec<DecodeWarning>,
}

/// Instruction decoder - turns transactions into instructions
pub struct InstructionDecoder;

impl InstructionDecoder {
    /// Decode one transaction
    ///
    /// Never fails: empty transactions and unknown opcodes decode to
    /// `DecodedInstruction::Unknown` with a warning.
    pub fn decode(transaction: &RawTransaction, config: &DecoderConfig) -> Decoded {
        let mut warnings = Vec::new();

        let Some(opcode_byte) = transaction.opcode() else {
            warnings.push(DecodeWarning::EmptyTransaction);
            return Decoded {
                instruction: DecodedInstruction::Unknown { opcode: None },
                frame: None,
                warnings,
            };
        };

        let mosi_bytes = transaction.mosi();
        let miso_bytes = transaction.miso();
        let (mosi, miso) = (&mosi_bytes[1..], &miso_bytes[1..]);
        let mut frame = None;

        let instruction = match Opcode::classify(opcode_byte) {
            Opcode::Reset => {
                Self::check_trailing(mosi.len(), &mut warnings);
                DecodedInstruction::Reset
            }
            Opcode::Read => {
                let (start, registers) = Self::decode_register_access(mosi, miso, config, &mut warnings);
                DecodedInstruction::Read { start, registers }
            }
            Opcode::Write => {
                let (start, registers) = Self::decode_register_access(mosi, mosi, config, &mut warnings);
                DecodedInstruction::Write { start, registers }
            }
            Opcode::ReadRxBuffer(select) => {
                let (registers, assembled) = Self::decode_buffer(
                    select,
                    select.rx_start_register(),
                    miso,
                    BufferDirection::Receive,
                    &mut warnings,
                );
                frame = Some(assembled);
                DecodedInstruction::ReadRxBuffer { select, registers }
            }
            Opcode::WriteTxBuffer(select) => {
                let (registers, assembled) = Self::decode_buffer(
                    select,
                    select.tx_start_register(),
                    mosi,
                    BufferDirection::Transmit,
                    &mut warnings,
                );
                frame = Some(assembled);
                DecodedInstruction::WriteTxBuffer { select, registers }
            }
            Opcode::RequestToSend(mask) => {
                Self::check_trailing(mosi.len(), &mut warnings);
                let buffers = (0..3u8).filter(|i| mask & (1 << i) != 0).collect();
                DecodedInstruction::RequestToSend { buffers }
            }
            Opcode::ReadStatus => {
                let status = Self::decode_status(READ_STATUS_REGISTER, miso, config, &mut warnings);
                DecodedInstruction::ReadStatus { status }
            }
            Opcode::RxStatus => {
                let status = Self::decode_status(RX_STATUS_REGISTER, miso, config, &mut warnings);
                let info = status.raw.map(RxStatusInfo::from_byte);
                DecodedInstruction::RxStatus { status, info }
            }
            Opcode::BitModify => {
                let (register, edit) = Self::decode_bit_modify(mosi, config, &mut warnings);
                DecodedInstruction::BitModify { register, edit }
            }
            Opcode::Unknown(opcode) => {
                warnings.push(DecodeWarning::UnknownOpcode { opcode });
                DecodedInstruction::Unknown {
                    opcode: Some(opcode),
                }
            }
        };

        for warning in &warnings {
            log::warn!("{} at {} ns: {}", instruction.kind(), transaction.start_ns, warning);
        }

        Decoded {
            instruction,
            frame,
            warnings,
        }
    }

    /// READ and WRITE: address byte, then one value per register in auto-increment order
    ///
    /// The address pointer increments linearly; registers past 0x7F are unresolved.
    fn decode_register_access(
        mosi: &[u8],
        values: &[u8],
        config: &DecoderConfig,
        warnings: &mut Vec<DecodeWarning>,
    ) -> (Option<RegisterRef>, Vec<RegisterValue>) {
        let Some(&address) = mosi.first() else {
            warnings.push(DecodeWarning::MissingField { field: "address" });
            return (None, Vec::new());
        };

        let start = RegisterRef::resolve(address as u16);
        let registers: Vec<RegisterValue> = values
            .iter()
            .skip(1)
            .enumerate()
            .map(|(i, &value)| RegisterValue {
                register: start.offset(i),
                value,
            })
            .collect();

        if config.warn_unresolved_registers {
            let first_unresolved = std::iter::once(start)
                .chain(registers.iter().map(|r| r.register))
                .find(|r| !r.is_resolved());
            if let Some(register) = first_unresolved {
                warnings.push(DecodeWarning::UnresolvedRegister {
                    address: register.address,
                });
            }
        }

        (Some(start), registers)
    }

    /// READ RX BUFFER and LOAD TX BUFFER: hand the buffer bytes to the frame assembler
    fn decode_buffer(
        select: BufferSelect,
        start: RegisterRef,
        bytes: &[u8],
        direction: BufferDirection,
        warnings: &mut Vec<DecodeWarning>,
    ) -> (Vec<RegisterValue>, CanFrame) {
        let assembled = FrameAssembler::assemble(bytes, select.start, direction);

        let registers = bytes[..assembled.consumed]
            .iter()
            .enumerate()
            .map(|(i, &value)| RegisterValue {
                register: start.offset(i),
                value,
            })
            .collect();

        warnings.extend(assembled.warnings);
        Self::check_trailing(bytes.len() - assembled.consumed, warnings);

        (registers, assembled.frame)
    }

    /// READ STATUS and RX STATUS: one response byte on MISO
    fn decode_status(
        register: &'static str,
        miso: &[u8],
        config: &DecoderConfig,
        warnings: &mut Vec<DecodeWarning>,
    ) -> StatusByte {
        let raw = miso.first().copied();

        match raw {
            None => warnings.push(DecodeWarning::MissingField { field: "status byte" }),
            Some(first) => {
                let repeats = &miso[1..];
                let only_repeats = repeats.iter().all(|&b| b == first);
                if !(config.accept_repeated_status && only_repeats) {
                    Self::check_trailing(repeats.len(), warnings);
                }
            }
        }

        StatusByte::resolve(register, raw)
    }

    /// BIT MODIFY: address, mask, data
    fn decode_bit_modify(
        mosi: &[u8],
        config: &DecoderConfig,
        warnings: &mut Vec<DecodeWarning>,
    ) -> (Option<RegisterRef>, FieldEdit) {
        let register = mosi.first().map(|&address| RegisterRef::resolve(address as u16));
        let edit = FieldEdit {
            mask: mosi.get(1).copied(),
            data: mosi.get(2).copied(),
        };

        for (field, present) in [
            ("address", register.is_some()),
            ("mask", edit.mask.is_some()),
            ("data", edit.data.is_some()),
        ] {
            if !present {
                warnings.push(DecodeWarning::MissingField { field });
            }
        }

        if let Some(register) = register {
            if config.warn_unresolved_registers && !register.is_resolved() {
                warnings.push(DecodeWarning::UnresolvedRegister {
                    address: register.address,
                });
            }
        }

        Self::check_trailing(mosi.len().saturating_sub(3), warnings);

        (register, edit)
    }

    fn check_trailing(count: usize, warnings: &mut Vec<DecodeWarning>) {
        if count > 0 {
            warnings.push(DecodeWarning::TrailingBytes { count });
        }
    }
}
