//! MCP2515 register and bit-field catalog
//!
//! Static lookup tables for the controller's register map (addresses 0x00-0x7F) and
//! the per-bit field names of its control and status registers. The tables are plain
//! `'static` data, so lookups are pure and can be shared freely between threads.
//!
//! Lookups never fail: an address outside the map resolves to `None`, which callers
//! report as an unresolved register.

use serde::Serialize;
use std::fmt;

/// Highest address of the register map
pub const LAST_REGISTER: u16 = 0x7F;

/// Name used for the status byte returned by the READ STATUS instruction
pub const READ_STATUS_REGISTER: &str = "STATUS";

/// Name used for the status byte returned by the RX STATUS instruction
pub const RX_STATUS_REGISTER: &str = "RXSTATUS";

/// Register names indexed by `[address >> 4][address & 0x0F]`
///
/// CANCTRL (xE) and CANSTAT (xF) are mirrored at the end of every 16-byte row.
const REGISTERS: [[&str; 16]; 8] = [
    [
        "RXF0SIDH", "RXF0SIDL", "RXF0EID8", "RXF0EID0", "RXF1SIDH", "RXF1SIDL", "RXF1EID8",
        "RXF1EID0", "RXF2SIDH", "RXF2SIDL", "RXF2EID8", "RXF2EID0", "BFPCTRL", "TXRTSCTRL",
        "CANCTRL", "CANSTAT",
    ],
    [
        "RXF3SIDH", "RXF3SIDL", "RXF3EID8", "RXF3EID0", "RXF4SIDH", "RXF4SIDL", "RXF4EID8",
        "RXF4EID0", "RXF5SIDH", "RXF5SIDL", "RXF5EID8", "RXF5EID0", "TEC", "REC", "CANCTRL",
        "CANSTAT",
    ],
    [
        "RXM0SIDH", "RXM0SIDL", "RXM0EID8", "RXM0EID0", "RXM1SIDH", "RXM1SIDL", "RXM1EID8",
        "RXM1EID0", "CNF3", "CNF2", "CNF1", "CANINTE", "CANINTF", "EFLG", "CANCTRL", "CANSTAT",
    ],
    [
        "TXB0CTRL", "TXB0SIDH", "TXB0SIDL", "TXB0EID8", "TXB0EID0", "TXB0DLC", "TXB0D0",
        "TXB0D1", "TXB0D2", "TXB0D3", "TXB0D4", "TXB0D5", "TXB0D6", "TXB0D7", "CANCTRL",
        "CANSTAT",
    ],
    [
        "TXB1CTRL", "TXB1SIDH", "TXB1SIDL", "TXB1EID8", "TXB1EID0", "TXB1DLC", "TXB1D0",
        "TXB1D1", "TXB1D2", "TXB1D3", "TXB1D4", "TXB1D5", "TXB1D6", "TXB1D7", "CANCTRL",
        "CANSTAT",
    ],
    [
        "TXB2CTRL", "TXB2SIDH", "TXB2SIDL", "TXB2EID8", "TXB2EID0", "TXB2DLC", "TXB2D0",
        "TXB2D1", "TXB2D2", "TXB2D3", "TXB2D4", "TXB2D5", "TXB2D6", "TXB2D7", "CANCTRL",
        "CANSTAT",
    ],
    [
        "RXB0CTRL", "RXB0SIDH", "RXB0SIDL", "RXB0EID8", "RXB0EID0", "RXB0DLC", "RXB0D0",
        "RXB0D1", "RXB0D2", "RXB0D3", "RXB0D4", "RXB0D5", "RXB0D6", "RXB0D7", "CANCTRL",
        "CANSTAT",
    ],
    [
        "RXB1CTRL", "RXB1SIDH", "RXB1SIDL", "RXB1EID8", "RXB1EID0", "RXB1DLC", "RXB1D0",
        "RXB1D1", "RXB1D2", "RXB1D3", "RXB1D4", "RXB1D5", "RXB1D6", "RXB1D7", "CANCTRL",
        "CANSTAT",
    ],
];

/// Field names of one bit-field register, indexed by bit number (bit 0 first)
///
/// Multi-bit fields are listed per bit, the way the datasheet names them
/// (`REQOP2`, `REQOP1`, `REQOP0`). Unimplemented bits are `None`.
pub type FieldTable = [Option<&'static str>; 8];

const BFPCTRL: FieldTable = [
    Some("B0BFM"), Some("B1BFM"), Some("B0BFE"), Some("B1BFE"),
    Some("B0BFS"), Some("B1BFS"), None, None,
];

const TXRTSCTRL: FieldTable = [
    Some("B0RTSM"), Some("B1RTSM"), Some("B2RTSM"), Some("B0RTS"),
    Some("B1RTS"), Some("B2RTS"), None, None,
];

const CANSTAT: FieldTable = [
    None, Some("ICOD0"), Some("ICOD1"), Some("ICOD2"),
    None, Some("OPMOD0"), Some("OPMOD1"), Some("OPMOD2"),
];

const CANCTRL: FieldTable = [
    Some("CLKPRE0"), Some("CLKPRE1"), Some("CLKEN"), Some("OSM"),
    Some("ABAT"), Some("REQOP0"), Some("REQOP1"), Some("REQOP2"),
];

const CNF1: FieldTable = [
    Some("BRP0"), Some("BRP1"), Some("BRP2"), Some("BRP3"),
    Some("BRP4"), Some("BRP5"), Some("SJW0"), Some("SJW1"),
];

const CNF2: FieldTable = [
    Some("PRSEG0"), Some("PRSEG1"), Some("PRSEG2"), Some("PHSEG10"),
    Some("PHSEG11"), Some("PHSEG12"), Some("SAM"), Some("BTLMODE"),
];

const CNF3: FieldTable = [
    Some("PHSEG20"), Some("PHSEG21"), Some("PHSEG22"), None,
    None, None, Some("WAKFIL"), Some("SOF"),
];

const CANINTE: FieldTable = [
    Some("RX0IE"), Some("RX1IE"), Some("TX0IE"), Some("TX1IE"),
    Some("TX2IE"), Some("ERRIE"), Some("WAKIE"), Some("MERRE"),
];

const CANINTF: FieldTable = [
    Some("RX0IF"), Some("RX1IF"), Some("TX0IF"), Some("TX1IF"),
    Some("TX2IF"), Some("ERRIF"), Some("WAKIF"), Some("MERRF"),
];

const EFLG: FieldTable = [
    Some("EWARN"), Some("RXWAR"), Some("TXWAR"), Some("RXEP"),
    Some("TXEP"), Some("TXBO"), Some("RX0OVR"), Some("RX1OVR"),
];

const TXBCTRL: FieldTable = [
    Some("TXP0"), Some("TXP1"), None, Some("TXREQ"),
    Some("TXERR"), Some("MLOA"), Some("ABTF"), None,
];

const RXB0CTRL: FieldTable = [
    Some("FILHIT0"), Some("BUKT1"), Some("BUKT"), Some("RXRTR"),
    None, Some("RXM0"), Some("RXM1"), None,
];

const RXB1CTRL: FieldTable = [
    Some("FILHIT0"), Some("FILHIT1"), Some("FILHIT2"), Some("RXRTR"),
    None, Some("RXM0"), Some("RXM1"), None,
];

/// READ STATUS response: interrupt flags and transmit requests in one byte
const READ_STATUS: FieldTable = [
    Some("RX0IF"), Some("RX1IF"), Some("TX0REQ"), Some("TX0IF"),
    Some("TX1REQ"), Some("TX1IF"), Some("TX2REQ"), Some("TX2IF"),
];

/// RX STATUS response: filter match, message type and receive buffer fields
const RX_STATUS: FieldTable = [
    Some("FILTER0"), Some("FILTER1"), Some("FILTER2"), Some("MSGTYPE0"),
    Some("MSGTYPE1"), None, Some("RXBUF0"), Some("RXBUF1"),
];

/// Resolve an address to its register name
///
/// Returns `None` for addresses beyond the register map.
pub fn register_name(address: u16) -> Option<&'static str> {
    if address > LAST_REGISTER {
        return None;
    }
    Some(REGISTERS[(address >> 4) as usize][(address & 0x0F) as usize])
}

/// Field table of a bit-field register, or `None` for plain data registers
pub fn field_table(register: &str) -> Option<&'static FieldTable> {
    let table = match register {
        "BFPCTRL" => &BFPCTRL,
        "TXRTSCTRL" => &TXRTSCTRL,
        "CANSTAT" => &CANSTAT,
        "CANCTRL" => &CANCTRL,
        "CNF1" => &CNF1,
        "CNF2" => &CNF2,
        "CNF3" => &CNF3,
        "CANINTE" => &CANINTE,
        "CANINTF" => &CANINTF,
        "EFLG" => &EFLG,
        "TXB0CTRL" | "TXB1CTRL" | "TXB2CTRL" => &TXBCTRL,
        "RXB0CTRL" => &RXB0CTRL,
        "RXB1CTRL" => &RXB1CTRL,
        READ_STATUS_REGISTER => &READ_STATUS,
        RX_STATUS_REGISTER => &RX_STATUS,
        _ => return None,
    };
    Some(table)
}

/// Name of bit `bit` (0 = LSB) of a bit-field register
pub fn field_name(register: &str, bit: u8) -> Option<&'static str> {
    field_table(register)?.get(bit as usize).copied().flatten()
}

/// A register address with its resolved name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegisterRef {
    /// Register address; wider than a byte because auto-increment can run past 0xFF
    pub address: u16,
    /// Symbolic name, `None` when the address is outside the register map
    pub name: Option<&'static str>,
}

impl RegisterRef {
    /// Look up an address in the catalog
    pub fn resolve(address: u16) -> Self {
        Self {
            address,
            name: register_name(address),
        }
    }

    /// True if the address maps to a known register
    pub fn is_resolved(&self) -> bool {
        self.name.is_some()
    }

    /// The register `offset` positions further in auto-increment order
    pub fn offset(&self, offset: usize) -> Self {
        let address = u16::try_from(offset).map_or(u16::MAX, |o| self.address.saturating_add(o));
        Self::resolve(address)
    }
}

impl fmt::Display for RegisterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{:02X}", self.address),
        }
    }
}

/// One bit of a bit-field register with its name and value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldBit {
    pub bit: u8,
    pub name: &'static str,
    pub set: bool,
}

/// Split a register value into its named bits, most significant first
///
/// Returns an empty list for registers without a field table.
pub fn decode_fields(register: &str, value: u8) -> Vec<FieldBit> {
    let Some(table) = field_table(register) else {
        return Vec::new();
    };

    (0..8u8)
        .rev()
        .filter_map(|bit| {
            table[bit as usize].map(|name| FieldBit {
                bit,
                name,
                set: value & (1 << bit) != 0,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_names() {
        assert_eq!(register_name(0x00), Some("RXF0SIDH"));
        assert_eq!(register_name(0x0E), Some("CANCTRL"));
        assert_eq!(register_name(0x0F), Some("CANSTAT"));
        assert_eq!(register_name(0x2A), Some("CNF1"));
        assert_eq!(register_name(0x2C), Some("CANINTF"));
        assert_eq!(register_name(0x31), Some("TXB0SIDH"));
        assert_eq!(register_name(0x66), Some("RXB0D0"));
        assert_eq!(register_name(0x7D), Some("RXB1D7"));
    }

    #[test]
    fn test_mirrored_status_and_control() {
        for row in 0..8u16 {
            assert_eq!(register_name((row << 4) | 0x0E), Some("CANCTRL"));
            assert_eq!(register_name((row << 4) | 0x0F), Some("CANSTAT"));
        }
    }

    #[test]
    fn test_unresolved_addresses() {
        assert_eq!(register_name(0x80), None);
        assert_eq!(register_name(0xFF), None);
        assert_eq!(register_name(0x100), None);
        let reg = RegisterRef::resolve(0x90);
        assert!(!reg.is_resolved());
        assert_eq!(reg.to_string(), "0x90");
    }

    #[test]
    fn test_field_names() {
        assert_eq!(field_name("CANCTRL", 7), Some("REQOP2"));
        assert_eq!(field_name("CANINTF", 0), Some("RX0IF"));
        assert_eq!(field_name("EFLG", 5), Some("TXBO"));
        assert_eq!(field_name("TXB1CTRL", 3), Some("TXREQ"));
        assert_eq!(field_name("TXB1CTRL", 7), None);
        assert_eq!(field_name(READ_STATUS_REGISTER, 2), Some("TX0REQ"));
        assert_eq!(field_name("RXB0D0", 0), None);
        assert_eq!(field_name("CANCTRL", 8), None);
    }

    #[test]
    fn test_decode_fields_msb_first() {
        let fields = decode_fields("CANINTF", 0b0000_0101);
        assert_eq!(fields.len(), 8);
        assert_eq!(fields[0].name, "MERRF");
        assert!(!fields[0].set);
        let set: Vec<_> = fields.iter().filter(|f| f.set).map(|f| f.name).collect();
        assert_eq!(set, vec!["TX0IF", "RX0IF"]);

        assert!(decode_fields("TXB0D3", 0xFF).is_empty());
    }

    #[test]
    fn test_register_offset() {
        let start = RegisterRef::resolve(0x7E);
        assert_eq!(start.name, Some("CANCTRL"));
        assert_eq!(start.offset(1).name, Some("CANSTAT"));
        assert_eq!(start.offset(2).address, 0x80);
        assert!(!start.offset(2).is_resolved());

        // Huge offsets saturate instead of wrapping back into the map
        let wrapped = RegisterRef::resolve(0x00).offset(0x1_0000 + 0x0E);
        assert_eq!(wrapped.address, u16::MAX);
        assert!(!wrapped.is_resolved());
    }
}
