// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Transport errors and their process exit codes.

use std::io;

use thiserror::Error;

use cdc_bridge_common::transceiver::ExchangeError;

const LIBUSB_ERROR_IO: i32 = -1;
const LIBUSB_ERROR_ACCESS: i32 = -3;
const LIBUSB_ERROR_NO_DEVICE: i32 = -4;
const LIBUSB_ERROR_NOT_FOUND: i32 = -5;
const LIBUSB_ERROR_TIMEOUT: i32 = -7;
const LIBUSB_ERROR_PIPE: i32 = -9;
const LIBUSB_ERROR_INTERRUPTED: i32 = -10;
const LIBUSB_ERROR_OTHER: i32 = -99;

/// Failure to bring up the link before any command is sent.
#[derive(Error, Debug)]
pub enum TransportInitError {
    #[error("failed to initialize libusb: {0}")]
    Context(#[source] rusb::Error),

    #[error("USB device {vid:04x}:{pid:04x} not found")]
    DeviceNotFound { vid: u16, pid: u16 },

    #[error("failed to open USB device: {0}")]
    Open(#[source] rusb::Error),

    #[error("failed to claim interface {interface}: {source}")]
    Claim { interface: u8, source: rusb::Error },

    #[error("failed to open serial port {port}: {source}")]
    SerialOpen {
        port: String,
        source: serialport::Error,
    },
}

impl TransportInitError {
    /// libusb-style error code describing the failure.
    pub fn code(&self) -> i32 {
        match self {
            TransportInitError::Context(e)
            | TransportInitError::Open(e)
            | TransportInitError::Claim { source: e, .. } => libusb_code(e),
            TransportInitError::DeviceNotFound { .. } => LIBUSB_ERROR_NOT_FOUND,
            TransportInitError::SerialOpen { source, .. } => match source.kind() {
                serialport::ErrorKind::NoDevice => LIBUSB_ERROR_NOT_FOUND,
                serialport::ErrorKind::Io(kind) => io_kind_code(kind),
                _ => LIBUSB_ERROR_OTHER,
            },
        }
    }
}

/// Map an rusb error back to the libusb return code it came from.
pub fn libusb_code(err: &rusb::Error) -> i32 {
    match err {
        rusb::Error::Io => LIBUSB_ERROR_IO,
        rusb::Error::InvalidParam => -2,
        rusb::Error::Access => LIBUSB_ERROR_ACCESS,
        rusb::Error::NoDevice => LIBUSB_ERROR_NO_DEVICE,
        rusb::Error::NotFound => LIBUSB_ERROR_NOT_FOUND,
        rusb::Error::Busy => -6,
        rusb::Error::Timeout => LIBUSB_ERROR_TIMEOUT,
        rusb::Error::Overflow => -8,
        rusb::Error::Pipe => LIBUSB_ERROR_PIPE,
        rusb::Error::Interrupted => LIBUSB_ERROR_INTERRUPTED,
        rusb::Error::NoMem => -11,
        rusb::Error::NotSupported => -12,
        _ => LIBUSB_ERROR_OTHER,
    }
}

/// Closest libusb code for a tty I/O error.
fn io_kind_code(kind: io::ErrorKind) -> i32 {
    match kind {
        io::ErrorKind::NotFound => LIBUSB_ERROR_NOT_FOUND,
        io::ErrorKind::PermissionDenied => LIBUSB_ERROR_ACCESS,
        io::ErrorKind::TimedOut => LIBUSB_ERROR_TIMEOUT,
        io::ErrorKind::BrokenPipe => LIBUSB_ERROR_PIPE,
        io::ErrorKind::Interrupted => LIBUSB_ERROR_INTERRUPTED,
        io::ErrorKind::NotConnected => LIBUSB_ERROR_NO_DEVICE,
        _ => LIBUSB_ERROR_IO,
    }
}

/// Transport errors that carry a libusb-style return code.
pub trait TransportErrorCode {
    fn libusb_code(&self) -> i32;
}

impl TransportErrorCode for rusb::Error {
    fn libusb_code(&self) -> i32 {
        libusb_code(self)
    }
}

impl TransportErrorCode for io::Error {
    fn libusb_code(&self) -> i32 {
        io_kind_code(self.kind())
    }
}

/// A command exchange that stopped on a transport error or the poll limit.
#[derive(Error, Debug)]
#[error("{command} failed")]
pub struct ExchangeFailure {
    command: &'static str,
    code: i32,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
}

impl ExchangeFailure {
    pub fn new<E>(command: &'static str, err: ExchangeError<E>) -> Self
    where
        E: TransportErrorCode + std::error::Error + Send + Sync + 'static,
    {
        let code = match &err {
            ExchangeError::Send(e) | ExchangeError::Receive(e) => e.libusb_code(),
            ExchangeError::PollLimit { .. } => LIBUSB_ERROR_TIMEOUT,
        };
        Self {
            command,
            code,
            source: Box::new(err),
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }
}

/// Process exit status for a failed run.
///
/// Transport failures, during setup or mid-exchange, exit with their libusb
/// code truncated to a byte, the way a C `return rc` would. Anything else
/// exits with 1.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(init) = err.downcast_ref::<TransportInitError>() {
        return init.code() as u8;
    }
    match err.downcast_ref::<ExchangeFailure>() {
        Some(failure) => failure.code() as u8,
        None => 1,
    }
}
