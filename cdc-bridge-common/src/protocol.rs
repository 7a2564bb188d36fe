// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command table and encoder for the host <-> device request/response protocol.
//!
//! Every command is a fixed two-byte opcode optionally followed by one
//! parameter byte. The device echoes the opcode at the start of its reply.

use thiserror::Error;

// --- Wire constants ---

/// Transfer unit for both bulk endpoints.
pub const MAX_FRAME: usize = 64;
/// Longest command payload on the wire.
pub const MAX_PAYLOAD: usize = 3;
/// Leading bytes the device repeats in a reply.
pub const ECHO_PREFIX_LEN: usize = 2;
/// First byte of every built-in opcode.
pub const OPCODE_PREFIX: u8 = 0xFF;

pub const RECEIVE_TIMEOUT_MS: u64 = 1000;

// --- Device defaults ---

pub const DEFAULT_VENDOR_ID: u16 = 0x03EB; // Atmel Corp.
pub const DEFAULT_PRODUCT_ID: u16 = 0x2404; // CAN bus adapter
pub const DEFAULT_EP_IN: u8 = 0x81;
pub const DEFAULT_EP_OUT: u8 = 0x02;
/// CDC-ACM control + data interface.
pub const CDC_INTERFACES: u8 = 2;

/// Errors raised while turning user input into a [`Command`].
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unknown command")]
    UnknownCommand,
    #[error("`{command}` takes {expected} arguments, got {got}")]
    WrongArgumentCount {
        command: &'static str,
        expected: usize,
        got: usize,
    },
}

/// Every operation the device understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Raw opcode/parameter pair supplied on the command line.
    Prog,
    ReadSwVersion,
    RequestJumpToBootloaderApp,
    RequestToResetDevice,
    QueryDeviceMode,
    EnableCanBus,
    DisableCanBus,
    EnableLoopbackMode,
    DisableLoopbackMode,
    CanBusStatus,
    CanBusErrCount,
}

impl CommandKind {
    /// All commands, in usage order.
    pub const ALL: [CommandKind; 11] = [
        CommandKind::Prog,
        CommandKind::ReadSwVersion,
        CommandKind::RequestJumpToBootloaderApp,
        CommandKind::RequestToResetDevice,
        CommandKind::QueryDeviceMode,
        CommandKind::EnableCanBus,
        CommandKind::DisableCanBus,
        CommandKind::EnableLoopbackMode,
        CommandKind::DisableLoopbackMode,
        CommandKind::CanBusStatus,
        CommandKind::CanBusErrCount,
    ];

    /// Name as typed on the command line (case-sensitive).
    pub fn name(self) -> &'static str {
        match self {
            CommandKind::Prog => "prog",
            CommandKind::ReadSwVersion => "read_sw_version",
            CommandKind::RequestJumpToBootloaderApp => "request_jump_to_bootloader_app",
            CommandKind::RequestToResetDevice => "request_to_reset_device",
            CommandKind::QueryDeviceMode => "query_device_mode",
            CommandKind::EnableCanBus => "enable_CANbus",
            CommandKind::DisableCanBus => "disable_CANbus",
            CommandKind::EnableLoopbackMode => "enable_loopback_mode",
            CommandKind::DisableLoopbackMode => "disable_loopback_mode",
            CommandKind::CanBusStatus => "CANbus_status",
            CommandKind::CanBusErrCount => "CANbus_err_count",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// Number of hex arguments the command takes.
    pub fn arity(self) -> usize {
        match self {
            CommandKind::Prog => 2,
            _ => 0,
        }
    }

    /// Whether the device answers this command.
    ///
    /// Kept per command rather than inferred from the payload length so that
    /// a future three-byte request can still expect a reply.
    pub fn expects_reply(self) -> bool {
        match self {
            CommandKind::Prog
            | CommandKind::EnableCanBus
            | CommandKind::DisableCanBus
            | CommandKind::EnableLoopbackMode
            | CommandKind::DisableLoopbackMode => false,
            CommandKind::ReadSwVersion
            | CommandKind::RequestJumpToBootloaderApp
            | CommandKind::RequestToResetDevice
            | CommandKind::QueryDeviceMode
            | CommandKind::CanBusStatus
            | CommandKind::CanBusErrCount => true,
        }
    }

    /// Fixed payload bytes, or `None` for commands built from arguments.
    fn fixed_payload(self) -> Option<&'static [u8]> {
        let bytes: &'static [u8] = match self {
            CommandKind::Prog => return None,
            CommandKind::ReadSwVersion => &[OPCODE_PREFIX, 0xC0],
            CommandKind::RequestJumpToBootloaderApp => &[OPCODE_PREFIX, 0xB0],
            CommandKind::RequestToResetDevice => &[OPCODE_PREFIX, 0xB1],
            CommandKind::QueryDeviceMode => &[OPCODE_PREFIX, 0xB2],
            CommandKind::EnableCanBus => &[OPCODE_PREFIX, 0x00, 0x01],
            CommandKind::DisableCanBus => &[OPCODE_PREFIX, 0x00, 0x00],
            CommandKind::EnableLoopbackMode => &[OPCODE_PREFIX, 0x02, 0x01],
            CommandKind::DisableLoopbackMode => &[OPCODE_PREFIX, 0x02, 0x00],
            CommandKind::CanBusStatus => &[OPCODE_PREFIX, 0x06],
            CommandKind::CanBusErrCount => &[OPCODE_PREFIX, 0x07],
        };
        Some(bytes)
    }

    /// One line of usage text, without the program name.
    pub fn usage(self) -> &'static str {
        match self {
            CommandKind::Prog => "prog <byte1> <byte2>",
            other => other.name(),
        }
    }
}

/// A fully encoded request, immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    kind: CommandKind,
    payload: heapless::Vec<u8, MAX_PAYLOAD>,
    expects_reply: bool,
    echo_prefix: [u8; ECHO_PREFIX_LEN],
}

impl Command {
    /// Build a command of the given kind.
    ///
    /// `args` must hold exactly [`CommandKind::arity`] hex strings for
    /// parametrized commands. Commands without parameters ignore `args`.
    pub fn new<S: AsRef<str>>(kind: CommandKind, args: &[S]) -> Result<Self, ProtocolError> {
        let mut payload = heapless::Vec::new();

        match kind.fixed_payload() {
            Some(bytes) => {
                // Fixed payloads are at most MAX_PAYLOAD bytes.
                let _ = payload.extend_from_slice(bytes);
            }
            None => {
                if args.len() != kind.arity() {
                    return Err(ProtocolError::WrongArgumentCount {
                        command: kind.name(),
                        expected: kind.arity(),
                        got: args.len(),
                    });
                }
                let _ = payload.push(OPCODE_PREFIX);
                for arg in args {
                    let _ = payload.push(parse_hex_byte(arg.as_ref()));
                }
            }
        }

        let echo_prefix = [payload[0], payload[1]];
        Ok(Self {
            kind,
            payload,
            expects_reply: kind.expects_reply(),
            echo_prefix,
        })
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn expects_reply(&self) -> bool {
        self.expects_reply
    }

    /// Bytes a matching reply starts with.
    pub fn echo_prefix(&self) -> [u8; ECHO_PREFIX_LEN] {
        self.echo_prefix
    }

    /// The payload zero-padded to a full OUT transfer.
    pub fn out_frame(&self) -> [u8; MAX_FRAME] {
        let mut frame = [0u8; MAX_FRAME];
        frame[..self.payload.len()].copy_from_slice(&self.payload);
        frame
    }
}

/// Encode a command from its name and command-line arguments.
pub fn encode<S: AsRef<str>>(name: &str, args: &[S]) -> Result<Command, ProtocolError> {
    let kind = CommandKind::from_name(name).ok_or(ProtocolError::UnknownCommand)?;
    Command::new(kind, args)
}

/// Parse a base-16 byte, permissively.
///
/// Leading whitespace and an optional `0x` prefix are skipped, then the
/// longest run of hex digits is read. No digits, or a value above `0xFF`,
/// yields 0.
pub fn parse_hex_byte(text: &str) -> u8 {
    let text = text.trim_start();
    let text = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);

    let mut value: u32 = 0;
    for c in text.chars() {
        let Some(digit) = c.to_digit(16) else {
            break;
        };
        value = value * 16 + digit;
        if value > u8::MAX as u32 {
            return 0;
        }
    }
    value as u8
}
