// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Unit tests for the command table and encoder.

use cdc_bridge_common::protocol::{
    encode, parse_hex_byte, Command, CommandKind, ProtocolError, MAX_FRAME, MAX_PAYLOAD,
    OPCODE_PREFIX,
};

const NO_ARGS: [&str; 0] = [];

// --- Command table ---

#[test]
fn test_every_fixed_command_payload() {
    let table: [(&str, &[u8], bool); 10] = [
        ("read_sw_version", &[0xFF, 0xC0], true),
        ("request_jump_to_bootloader_app", &[0xFF, 0xB0], true),
        ("request_to_reset_device", &[0xFF, 0xB1], true),
        ("query_device_mode", &[0xFF, 0xB2], true),
        ("enable_CANbus", &[0xFF, 0x00, 0x01], false),
        ("disable_CANbus", &[0xFF, 0x00, 0x00], false),
        ("enable_loopback_mode", &[0xFF, 0x02, 0x01], false),
        ("disable_loopback_mode", &[0xFF, 0x02, 0x00], false),
        ("CANbus_status", &[0xFF, 0x06], true),
        ("CANbus_err_count", &[0xFF, 0x07], true),
    ];

    for (name, payload, expects_reply) in table {
        let cmd = encode(name, &NO_ARGS).unwrap();
        assert_eq!(cmd.payload(), payload, "{name}");
        assert_eq!(cmd.expects_reply(), expects_reply, "{name}");
        assert_eq!(cmd.echo_prefix(), [payload[0], payload[1]], "{name}");
    }
}

#[test]
fn test_names_round_trip_through_table() {
    for kind in CommandKind::ALL {
        assert_eq!(CommandKind::from_name(kind.name()), Some(kind));
    }
}

#[test]
fn test_every_payload_within_bounds() {
    for kind in CommandKind::ALL {
        let args = vec!["01"; kind.arity()];
        let cmd = Command::new(kind, args.as_slice()).unwrap();
        assert!((2..=MAX_PAYLOAD).contains(&cmd.payload().len()));
        assert_eq!(cmd.payload()[0], OPCODE_PREFIX);
    }
}

#[test]
fn test_only_prog_takes_arguments() {
    for kind in CommandKind::ALL {
        let expected = if kind == CommandKind::Prog { 2 } else { 0 };
        assert_eq!(kind.arity(), expected, "{:?}", kind);
    }
}

#[test]
fn test_usage_lines() {
    assert_eq!(CommandKind::Prog.usage(), "prog <byte1> <byte2>");
    assert_eq!(CommandKind::CanBusStatus.usage(), "CANbus_status");
}

// --- Encoder ---

#[test]
fn test_read_sw_version_scenario() {
    let cmd = encode("read_sw_version", &NO_ARGS).unwrap();
    assert_eq!(cmd.kind(), CommandKind::ReadSwVersion);
    assert_eq!(cmd.payload(), &[0xFF, 0xC0]);
    assert_eq!(cmd.echo_prefix(), [0xFF, 0xC0]);
    assert!(cmd.expects_reply());
}

#[test]
fn test_prog_builds_payload_from_args() {
    let cmd = encode("prog", &["0A", "1B"]).unwrap();
    assert_eq!(cmd.kind(), CommandKind::Prog);
    assert_eq!(cmd.payload(), &[0xFF, 0x0A, 0x1B]);
    assert_eq!(cmd.echo_prefix(), [0xFF, 0x0A]);
    assert!(!cmd.expects_reply());
}

#[test]
fn test_prog_accepts_owned_strings() {
    let args = vec![String::from("aa"), String::from("0xbb")];
    let cmd = encode("prog", args.as_slice()).unwrap();
    assert_eq!(cmd.payload(), &[0xFF, 0xAA, 0xBB]);
}

#[test]
fn test_prog_invalid_args_parse_to_zero() {
    let cmd = encode("prog", &["zz", "1FF"]).unwrap();
    assert_eq!(cmd.payload(), &[0xFF, 0x00, 0x00]);
}

#[test]
fn test_prog_requires_exactly_two_args() {
    assert_eq!(
        encode("prog", &["0A"]),
        Err(ProtocolError::WrongArgumentCount {
            command: "prog",
            expected: 2,
            got: 1,
        })
    );
    assert_eq!(
        encode("prog", &["0A", "0B", "0C"]),
        Err(ProtocolError::WrongArgumentCount {
            command: "prog",
            expected: 2,
            got: 3,
        })
    );
    assert!(encode("prog", &NO_ARGS).is_err());
}

#[test]
fn test_extra_args_ignored_for_fixed_commands() {
    let cmd = encode("query_device_mode", &["12", "34"]).unwrap();
    assert_eq!(cmd.payload(), &[0xFF, 0xB2]);
}

#[test]
fn test_unknown_command() {
    assert_eq!(
        encode("flash_everything", &NO_ARGS),
        Err(ProtocolError::UnknownCommand)
    );
    assert_eq!(encode("", &NO_ARGS), Err(ProtocolError::UnknownCommand));
}

#[test]
fn test_names_are_case_sensitive() {
    assert_eq!(
        encode("enable_canbus", &NO_ARGS),
        Err(ProtocolError::UnknownCommand)
    );
    assert_eq!(
        encode("READ_SW_VERSION", &NO_ARGS),
        Err(ProtocolError::UnknownCommand)
    );
}

#[test]
fn test_out_frame_is_zero_padded() {
    let cmd = encode("enable_loopback_mode", &NO_ARGS).unwrap();
    let frame = cmd.out_frame();
    assert_eq!(frame.len(), MAX_FRAME);
    assert_eq!(&frame[..3], &[0xFF, 0x02, 0x01]);
    assert!(frame[3..].iter().all(|&b| b == 0));
}

#[test]
fn test_error_messages() {
    assert_eq!(ProtocolError::UnknownCommand.to_string(), "unknown command");
    let err = ProtocolError::WrongArgumentCount {
        command: "prog",
        expected: 2,
        got: 0,
    };
    assert_eq!(err.to_string(), "`prog` takes 2 arguments, got 0");
}

// --- Hex parsing ---

#[test]
fn test_parse_hex_byte_plain() {
    assert_eq!(parse_hex_byte("0A"), 0x0A);
    assert_eq!(parse_hex_byte("ff"), 0xFF);
    assert_eq!(parse_hex_byte("7"), 0x07);
    assert_eq!(parse_hex_byte("00ff"), 0xFF);
}

#[test]
fn test_parse_hex_byte_prefix_and_whitespace() {
    assert_eq!(parse_hex_byte("0x1b"), 0x1B);
    assert_eq!(parse_hex_byte("0XC0"), 0xC0);
    assert_eq!(parse_hex_byte("  b0"), 0xB0);
}

#[test]
fn test_parse_hex_byte_stops_at_first_non_digit() {
    assert_eq!(parse_hex_byte("1g"), 0x01);
    assert_eq!(parse_hex_byte("a5 "), 0xA5);
}

#[test]
fn test_parse_hex_byte_invalid_is_zero() {
    assert_eq!(parse_hex_byte(""), 0);
    assert_eq!(parse_hex_byte("xyz"), 0);
    assert_eq!(parse_hex_byte("-1"), 0);
    assert_eq!(parse_hex_byte("0x"), 0);
}

#[test]
fn test_parse_hex_byte_out_of_range_is_zero() {
    assert_eq!(parse_hex_byte("100"), 0);
    assert_eq!(parse_hex_byte("FFFFFFFFFFFFFFFFFFFF"), 0);
}
