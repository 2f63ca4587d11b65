// End-to-end decoding scenarios through the public API
use mcp2515_decoder::{
    CanId, DecodeWarning, DecodedInstruction, Decoder, FieldEdit, InstructionKind, RawTransaction,
};
use std::io::Write;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn decode(tx: &RawTransaction) -> mcp2515_decoder::OutputEvent {
    init_logging();
    Decoder::new().decode_transaction(tx)
}

#[test]
fn reset_alone() {
    let event = decode(&RawTransaction::from_mosi(0, &[0xC0]));
    assert_eq!(event.label, "RESET");
    assert_eq!(event.instruction, DecodedInstruction::Reset);
    assert!(event.frame.is_none());
    assert!(event.warnings.is_empty());
}

#[test]
fn write_canctrl() {
    let event = decode(&RawTransaction::from_mosi(0, &[0x02, 0x0E, 0x80]));
    assert_eq!(event.label, "WRITE CANCTRL");
    assert!(event.warnings.is_empty());
    let registers = event.instruction.registers();
    assert_eq!(registers.len(), 1);
    assert_eq!(registers[0].register.address, 0x0E);
    assert_eq!(registers[0].value, 0x80);

    let event = decode(&RawTransaction::from_mosi(0, &[0x02, 0x0F, 0x00]));
    assert_eq!(event.label, "WRITE CANSTAT");
}

#[test]
fn read_three_registers() {
    let tx = RawTransaction::from_pairs(
        0,
        [(0x03, 0xFF), (0x30, 0xFF), (0x00, 0xD0), (0x00, 0xD1), (0x00, 0xD2)],
    );
    let event = decode(&tx);
    let registers = event.instruction.registers();
    let addresses: Vec<_> = registers.iter().map(|r| r.register.address).collect();
    let names: Vec<_> = registers.iter().map(|r| r.register.name).collect();
    let values: Vec<_> = registers.iter().map(|r| r.value).collect();
    assert_eq!(addresses, vec![0x30, 0x31, 0x32]);
    assert_eq!(names, vec![Some("TXB0CTRL"), Some("TXB0SIDH"), Some("TXB0SIDL")]);
    assert_eq!(values, vec![0xD0, 0xD1, 0xD2]);
    assert_eq!(event.label, "READ TXB0CTRL..TXB0SIDL");
}

#[test]
fn bit_modify_full_and_empty_masks() {
    for current in [0x00u8, 0x5A, 0xFF] {
        assert_eq!(FieldEdit::new(0xFF, 0x3C).apply(current), Some(0x3C));
        assert_eq!(FieldEdit::new(0x00, 0x3C).apply(current), Some(current));
    }
}

#[test]
fn standard_identifier_from_tx_buffer() {
    let event = decode(&RawTransaction::from_mosi(0, &[0x40, 0x12, 0x34, 0x00, 0x00, 0x00]));
    let frame = event.frame.expect("frame");
    assert_eq!(frame.id, Some(CanId::Standard((0x12 << 3) | (0x34 >> 5))));
    assert!(event.warnings.is_empty());
}

#[test]
fn extended_identifier_from_rx_buffer() {
    let sidl = 0x08 | 0x03;
    let miso = [0xFF, 0x01, sidl, 0xFF, 0x00, 0x00];
    let tx = RawTransaction::from_pairs(0, miso.iter().enumerate().map(|(i, &m)| (if i == 0 { 0x94 } else { 0 }, m)));
    let frame = decode(&tx).frame.expect("frame");
    let base = (0x01u32 << 3) | (sidl as u32 >> 5);
    let expected = (base << 18) | (0b11 << 16) | (0xFF << 8) | 0x00;
    assert_eq!(frame.id, Some(CanId::Extended(expected)));
}

#[test]
fn invalid_dlc_is_clamped() {
    let mut mosi = vec![0x40, 0x00, 0x00, 0x00, 0x00, 0x0D];
    mosi.extend(1..=8u8);
    let event = decode(&RawTransaction::from_mosi(0, &mosi));
    let frame = event.frame.as_ref().expect("frame");
    assert_eq!(frame.dlc, Some(13));
    assert_eq!(frame.payload.len(), 8);
    assert!(event.warnings.contains(&DecodeWarning::InvalidDlc { dlc: 13 }));
    assert!(event.detail_lines().iter().any(|l| l.contains("[13]")));
}

#[test]
fn truncated_tx_buffer_write() {
    let event = decode(&RawTransaction::from_mosi(
        0,
        &[0x40, 0x00, 0x00, 0x00, 0x00, 0x08, 0xA1, 0xA2, 0xA3],
    ));
    let frame = event.frame.expect("frame");
    assert!(frame.truncated);
    assert_eq!(frame.payload, vec![0xA1, 0xA2, 0xA3]);
    assert_eq!(
        event.warnings,
        vec![DecodeWarning::TruncatedFrame { expected: 8, actual: 3 }]
    );
}

#[test]
fn remote_frame_load_is_not_truncated() {
    let event = decode(&RawTransaction::from_mosi(0, &[0x40, 0x12, 0x20, 0x00, 0x00, 0x44]));
    let frame = event.frame.as_ref().expect("frame");
    assert_eq!(frame.rtr, Some(true));
    assert_eq!(frame.dlc, Some(4));
    assert!(!frame.truncated);
    assert!(event.warnings.is_empty());
}

#[test]
fn unknown_opcode_keeps_raw_bytes() {
    let event = decode(&RawTransaction::from_mosi(0, &[0xFF, 0x12, 0x34]));
    assert_eq!(event.kind(), InstructionKind::Unknown);
    assert_eq!(event.mosi, vec![0xFF, 0x12, 0x34]);
    assert!(event.has_warnings());
}

#[test]
fn every_transaction_yields_one_event() {
    let transactions: Vec<RawTransaction> = (0..=255u8)
        .map(|op| RawTransaction::from_mosi(op as u64 * 100_000, &[op, 0x2C, 0x01]))
        .chain(std::iter::once(RawTransaction::new(0, 0, Vec::new())))
        .collect();
    let decoder = Decoder::new();
    let events: Vec<_> = decoder.decode_all(transactions.clone()).collect();
    assert_eq!(events.len(), transactions.len());
    for (event, tx) in events.iter().zip(&transactions) {
        assert_eq!((event.start_ns, event.end_ns), tx.time_bounds());
    }
}

#[test]
fn csv_capture_end_to_end() {
    init_logging();
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "name,type,start_time,duration,mosi,miso").unwrap();
    writeln!(file, "SPI,enable,0.000000,0,,").unwrap();
    writeln!(file, "SPI,result,0.000001,0.000001,0x05,0xFF").unwrap();
    writeln!(file, "SPI,result,0.000002,0.000001,0x2C,0xFF").unwrap();
    writeln!(file, "SPI,result,0.000003,0.000001,0x01,0xFF").unwrap();
    writeln!(file, "SPI,result,0.000004,0.000001,0x00,0xFF").unwrap();
    writeln!(file, "SPI,disable,0.000006,0,,").unwrap();
    writeln!(file, "SPI,enable,0.000010,0,,").unwrap();
    writeln!(file, "SPI,result,0.000011,0.000001,0xA0,0xFF").unwrap();
    writeln!(file, "SPI,result,0.000012,0.000001,0x00,0x03").unwrap();
    writeln!(file, "SPI,disable,0.000014,0,,").unwrap();
    file.flush().unwrap();

    let events: Vec<_> = Decoder::new().decode_file(file.path()).unwrap().collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].label, "BIT MODIFY CANINTF");
    assert_eq!((events[0].start_ns, events[0].end_ns), (1_000, 5_000));
    assert_eq!(events[1].label, "READ STATUS");
    assert!(events.iter().all(|e| e.warnings.is_empty()));
}
