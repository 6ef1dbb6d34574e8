mod common;
use common::*;

use lumentree_bridge::lumentree::packet::{checksum, Frame, FrameKind, ReadCommand};

#[test]
fn checksum_of_device_info_command_body() {
    assert_eq!(checksum(&[0x01, 0x03, 0x00, 0x00, 0x00, 0x5f]), [0x05, 0xf2]);
}

#[test]
fn checksum_of_empty_input_is_the_split_seed() {
    assert_eq!(checksum(&[]), [0xff, 0xff]);
}

#[test]
fn device_info_command_bytes() {
    let bytes = ReadCommand::device_info().to_bytes();
    assert_eq!(bytes, [0x01, 0x03, 0x00, 0x00, 0x00, 0x5f, 0x05, 0xf2]);
}

#[test]
fn battery_cells_command_bytes() {
    let bytes = ReadCommand::battery_cells().to_bytes();
    assert_eq!(bytes, [0x01, 0x03, 0x00, 0xfa, 0x00, 0x32, 0xe4, 0x2e]);
}

#[test]
fn read_command_is_always_eight_bytes() {
    assert_eq!(ReadCommand::new(0xffff, 0xffff).to_bytes().len(), 8);
    assert_eq!(ReadCommand::new(0, 0).to_bytes().len(), 8);
}

#[test]
fn extraction_strips_everything_through_the_keepalive_marker() {
    let frame_hex = Factory::response_hex(&Factory::battery_registers());
    let payload = format!("deadbeef2b2b2b2b{}", frame_hex);

    let frame = Frame::from_hex(&payload).expect("frame after marker");
    assert_eq!(frame.as_hex(), frame_hex);
}

#[test]
fn extraction_without_marker_uses_whole_payload() {
    let frame_hex = Factory::response_hex(&Factory::battery_registers());
    let frame = Frame::from_hex(&frame_hex).expect("frame");
    assert_eq!(frame.as_hex(), frame_hex);
}

#[test]
fn extraction_is_case_insensitive() {
    let frame_hex = Factory::response_hex(&Factory::battery_registers()).to_uppercase();
    let frame = Frame::from_hex(&frame_hex).expect("mixed-case frame");
    assert!(frame.as_hex().starts_with("0103"));
}

#[test]
fn wrong_prefix_yields_no_frame() {
    assert_eq!(Frame::from_hex("0203001400010002"), None);
    // error-function echo is dropped too
    assert_eq!(Frame::from_hex("018302c0f1"), None);
    // marker followed by garbage
    assert_eq!(Frame::from_hex("2b2b2b2bffff0103"), None);
}

#[test]
fn extraction_from_raw_bytes() {
    let mut payload = b"++++".to_vec();
    payload.extend_from_slice(&[0x01, 0x03, 0x04, 0x0c, 0xe4, 0x0c, 0xe5, 0xab, 0xcd]);

    let frame = Frame::extract(&payload).expect("frame from bytes");
    assert_eq!(frame.as_hex(), "0103040ce40ce5abcd");
    assert_eq!(frame.kind(), FrameKind::BatteryCells);
}

#[test]
fn short_frames_classify_as_battery_cells() {
    let frame = Factory::frame(&Factory::battery_registers());
    // 50 registers: 210 hex chars, below the 300-char split
    assert_eq!(frame.kind(), FrameKind::BatteryCells);
}

#[test]
fn long_frames_classify_as_device_telemetry() {
    let frame = Factory::frame(&Factory::device_registers());
    // 95 registers: 390 hex chars
    assert_eq!(frame.kind(), FrameKind::DeviceTelemetry);
}

#[test]
fn register_table_matches_declared_length() {
    let frame = Factory::frame(&Factory::device_registers());
    assert_eq!(frame.registers().len(), 95);

    let frame = Factory::frame(&Factory::battery_registers());
    assert_eq!(frame.registers().len(), 50);
}

#[test]
fn declared_length_is_clamped_to_available_data() {
    // declares 0x20 bytes but carries only two registers
    let frame = Frame::from_hex("01032000010002").expect("frame");
    let table = frame.registers();
    assert_eq!(table.len(), 2);
    assert_eq!(table.value(0), Some(1));
    assert_eq!(table.value(1), Some(2));
}

#[test]
fn trailing_checksum_stays_out_of_the_register_table() {
    let frame = Factory::frame(&[0x0ce4, 0x0ce5]);
    let table = frame.registers();
    assert_eq!(table.len(), 2);
    assert_eq!(table.value(1), Some(0x0ce5));
}
